//! Byte stream over a foreign address space.
//!
//! The stream position is an absolute virtual address in the target process.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::Result;
use crate::memory::{ReadMemory, WriteMemory};

pub struct MemoryStream<'a, M: ?Sized> {
    memory: &'a M,
    position: u64,
}

impl<'a, M: ?Sized> MemoryStream<'a, M> {
    pub fn new(memory: &'a M) -> Self {
        Self {
            memory,
            position: 0,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn seek_to(&mut self, address: u64) {
        self.position = address;
    }

    pub fn skip(&mut self, count: u64) {
        self.position = self.position.wrapping_add(count);
    }

    pub fn memory(&self) -> &'a M {
        self.memory
    }
}

impl<M: ReadMemory + ?Sized> MemoryStream<'_, M> {
    /// Read exactly `buffer.len()` bytes and advance.
    pub fn read_exact_at_position(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.memory.read_into(self.position, buffer)?;
        self.skip(buffer.len() as u64);
        Ok(())
    }

    pub fn read_bytes(&mut self, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        self.read_exact_at_position(&mut buffer)?;
        Ok(buffer)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let value = self.memory.read_u16(self.position)?;
        self.skip(2);
        Ok(value)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let value = self.memory.read_i16(self.position)?;
        self.skip(2);
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let value = self.memory.read_u32(self.position)?;
        self.skip(4);
        Ok(value)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let value = self.memory.read_i32(self.position)?;
        self.skip(4);
        Ok(value)
    }
}

impl<M: WriteMemory + ?Sized> MemoryStream<'_, M> {
    pub fn write_all_at_position(&mut self, data: &[u8]) -> Result<()> {
        self.memory.write_bytes(self.position, data)?;
        self.skip(data.len() as u64);
        Ok(())
    }
}

impl<M: ReadMemory + ?Sized> Read for MemoryStream<'_, M> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_exact_at_position(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }
}

impl<M: WriteMemory + ?Sized> Write for MemoryStream<'_, M> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_all_at_position(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    /// Writes go straight to the target; there is nothing buffered.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<M: ?Sized> Seek for MemoryStream<'_, M> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let next = match pos {
            SeekFrom::Start(address) => Some(address),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "a process address space has no end to seek from",
                ));
            }
        };

        match next {
            Some(address) => {
                self.position = address;
                Ok(address)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before address 0 or past the end of the address space",
            )),
        }
    }
}
