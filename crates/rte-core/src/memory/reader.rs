use crate::error::{Error, Result};

/// Read access to a process address space.
///
/// Multi-byte values are little-endian, matching the target platform.
pub trait ReadMemory {
    /// Fill `buffer` with the bytes at `address`. Partial reads are errors.
    fn read_into(&self, address: u64, buffer: &mut [u8]) -> Result<()>;

    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        self.read_into(address, &mut buffer)?;
        Ok(buffer)
    }

    fn read_u16(&self, address: u64) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_into(address, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_i16(&self, address: u64) -> Result<i16> {
        let mut buf = [0u8; 2];
        self.read_into(address, &mut buf)?;
        Ok(i16::from_le_bytes(buf))
    }

    fn read_u32(&self, address: u64) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(address, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_i32(&self, address: u64) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_into(address, &mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }
}

/// Write access to a process address space.
pub trait WriteMemory {
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()>;
}

/// Coarse-grained process suspension: every thread stops, no partial states.
pub trait SuspendProcess {
    fn pid(&self) -> u32;

    fn suspend(&self) -> Result<()>;

    fn resume(&self) -> Result<()>;
}

/// Everything a poke needs from an opened target.
pub trait ProcessMemory: ReadMemory + WriteMemory + SuspendProcess {}

impl<T: ReadMemory + WriteMemory + SuspendProcess + ?Sized> ProcessMemory for T {}

/// Opens a target process by id.
///
/// Implementations must fail with [`Error::TargetNotAvailable`] when the
/// process has exited or cannot be opened with the required rights.
pub trait ProcessOpener {
    type Process: ProcessMemory;

    fn open(&self, pid: u32) -> Result<Self::Process>;
}

impl<T: ReadMemory + ?Sized> ReadMemory for &T {
    fn read_into(&self, address: u64, buffer: &mut [u8]) -> Result<()> {
        (**self).read_into(address, buffer)
    }
}

impl<T: WriteMemory + ?Sized> WriteMemory for &T {
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        (**self).write_bytes(address, data)
    }
}

impl<T: SuspendProcess + ?Sized> SuspendProcess for &T {
    fn pid(&self) -> u32 {
        (**self).pid()
    }

    fn suspend(&self) -> Result<()> {
        (**self).suspend()
    }

    fn resume(&self) -> Result<()> {
        (**self).resume()
    }
}

/// Reject reads of a zero address before they hit the OS.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn check_address(address: u64) -> Result<()> {
    if address == 0 {
        return Err(Error::MemoryReadFailed {
            address,
            message: "null address".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;

    #[test]
    fn test_little_endian_helpers() {
        let process = MockMemoryBuilder::new()
            .bytes(0x1000, &[0xFE, 0xFF, 0x78, 0x56, 0x34, 0x12])
            .build();

        assert_eq!(process.read_u16(0x1000).unwrap(), 0xFFFE);
        assert_eq!(process.read_i16(0x1000).unwrap(), -2);
        assert_eq!(process.read_u32(0x1002).unwrap(), 0x1234_5678);
        assert_eq!(process.read_bytes(0x1001, 2).unwrap(), vec![0xFF, 0x78]);
    }

    #[test]
    fn test_reads_through_reference() {
        let process = MockMemoryBuilder::new().i32_at(0x2000, -1).build();
        let by_ref = &process;
        assert_eq!(by_ref.read_i32(0x2000).unwrap(), -1);
        assert_eq!(SuspendProcess::pid(&by_ref), process.pid());
    }

    #[test]
    fn test_null_address_rejected() {
        assert!(check_address(0).is_err());
        assert!(check_address(0x1000).is_ok());
    }
}
