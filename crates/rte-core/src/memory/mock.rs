//! In-memory stand-in for a target process, for tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::memory::{
    ProcessInfo, ProcessOpener, ProcessProvider, ReadMemory, SuspendProcess, WriteMemory,
};

/// Sparse byte-addressed memory with call counters and fault injection.
#[derive(Debug, Default)]
pub struct MockProcess {
    pid: u32,
    bytes: RefCell<BTreeMap<u64, u8>>,
    suspended: Cell<bool>,
    suspend_calls: Cell<u32>,
    resume_calls: Cell<u32>,
    write_calls: Cell<u32>,
    fail_writes: bool,
    fail_suspend: bool,
    /// Reads touching any of these addresses fail
    failing_reads: Vec<u64>,
    /// Addresses written while the process was not suspended
    writes_while_running: RefCell<Vec<u64>>,
}

impl MockProcess {
    pub fn suspend_calls(&self) -> u32 {
        self.suspend_calls.get()
    }

    pub fn resume_calls(&self) -> u32 {
        self.resume_calls.get()
    }

    pub fn write_calls(&self) -> u32 {
        self.write_calls.get()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.get()
    }

    pub fn writes_while_running(&self) -> Vec<u64> {
        self.writes_while_running.borrow().clone()
    }

    /// Direct write that bypasses counters and fault injection.
    pub fn poke_raw(&self, address: u64, data: &[u8]) {
        let mut bytes = self.bytes.borrow_mut();
        for (i, b) in data.iter().enumerate() {
            bytes.insert(address + i as u64, *b);
        }
    }

    pub fn peek_raw(&self, address: u64, size: usize) -> Vec<u8> {
        let bytes = self.bytes.borrow();
        (0..size as u64)
            .map(|i| bytes.get(&(address + i)).copied().unwrap_or(0))
            .collect()
    }
}

impl ReadMemory for MockProcess {
    fn read_into(&self, address: u64, buffer: &mut [u8]) -> Result<()> {
        let end = address + buffer.len() as u64;
        if let Some(&at) = self.failing_reads.iter().find(|&&a| (address..end).contains(&a)) {
            return Err(Error::MemoryReadFailed {
                address: at,
                message: "injected read failure".to_string(),
            });
        }

        let bytes = self.bytes.borrow();
        for (i, slot) in buffer.iter_mut().enumerate() {
            let at = address + i as u64;
            *slot = *bytes.get(&at).ok_or_else(|| Error::MemoryReadFailed {
                address: at,
                message: "unmapped".to_string(),
            })?;
        }
        Ok(())
    }
}

impl WriteMemory for MockProcess {
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        self.write_calls.set(self.write_calls.get() + 1);
        if self.fail_writes {
            return Err(Error::MemoryWriteFailed {
                address,
                message: "injected write failure".to_string(),
            });
        }
        if !self.suspended.get() {
            self.writes_while_running.borrow_mut().push(address);
        }

        let mut bytes = self.bytes.borrow_mut();
        for i in 0..data.len() as u64 {
            if !bytes.contains_key(&(address + i)) {
                return Err(Error::MemoryWriteFailed {
                    address: address + i,
                    message: "unmapped".to_string(),
                });
            }
        }
        for (i, b) in data.iter().enumerate() {
            bytes.insert(address + i as u64, *b);
        }
        Ok(())
    }
}

impl SuspendProcess for MockProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn suspend(&self) -> Result<()> {
        self.suspend_calls.set(self.suspend_calls.get() + 1);
        if self.fail_suspend {
            return Err(Error::SuspendFailed {
                pid: self.pid,
                message: "injected suspend failure".to_string(),
            });
        }
        self.suspended.set(true);
        Ok(())
    }

    fn resume(&self) -> Result<()> {
        self.resume_calls.set(self.resume_calls.get() + 1);
        self.suspended.set(false);
        Ok(())
    }
}

/// Builder for [`MockProcess`]
#[derive(Debug, Default)]
pub struct MockMemoryBuilder {
    process: MockProcess,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self {
            process: MockProcess {
                pid: 1234,
                ..Default::default()
            },
        }
    }

    pub fn pid(mut self, pid: u32) -> Self {
        self.process.pid = pid;
        self
    }

    pub fn bytes(self, address: u64, data: &[u8]) -> Self {
        self.process.poke_raw(address, data);
        self
    }

    pub fn zeroed(self, address: u64, size: usize) -> Self {
        self.bytes(address, &vec![0u8; size])
    }

    pub fn u32_at(self, address: u64, value: u32) -> Self {
        self.bytes(address, &value.to_le_bytes())
    }

    pub fn i32_at(self, address: u64, value: i32) -> Self {
        self.bytes(address, &value.to_le_bytes())
    }

    pub fn u16_at(self, address: u64, value: u16) -> Self {
        self.bytes(address, &value.to_le_bytes())
    }

    pub fn fail_writes(mut self) -> Self {
        self.process.fail_writes = true;
        self
    }

    pub fn fail_reads_at(mut self, address: u64) -> Self {
        self.process.failing_reads.push(address);
        self
    }

    pub fn fail_suspend(mut self) -> Self {
        self.process.fail_suspend = true;
        self
    }

    pub fn build(self) -> MockProcess {
        self.process
    }
}

/// Opens a borrowed [`MockProcess`] when the requested pid matches.
pub struct MockOpener<'a> {
    process: &'a MockProcess,
}

impl<'a> MockOpener<'a> {
    pub fn new(process: &'a MockProcess) -> Self {
        Self { process }
    }
}

impl<'a> ProcessOpener for MockOpener<'a> {
    type Process = &'a MockProcess;

    fn open(&self, pid: u32) -> Result<Self::Process> {
        if pid != self.process.pid {
            return Err(Error::TargetNotAvailable(format!(
                "process {} could not be opened",
                pid
            )));
        }
        Ok(self.process)
    }
}

/// Scripted process enumeration.
#[derive(Debug, Default)]
pub struct MockProvider {
    pub processes: RefCell<Vec<ProcessInfo>>,
    /// pids whose image path lookup fails (exited or access denied)
    pub inaccessible: Vec<u32>,
}

impl MockProvider {
    pub fn with_pids(name: &str, pids: &[u32]) -> Self {
        let provider = Self::default();
        provider.set_pids(name, pids);
        provider
    }

    pub fn set_pids(&self, name: &str, pids: &[u32]) {
        *self.processes.borrow_mut() = pids
            .iter()
            .map(|&pid| ProcessInfo {
                pid,
                exe_name: name.to_string(),
            })
            .collect();
    }
}

impl ProcessProvider for MockProvider {
    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        Ok(self.processes.borrow().clone())
    }

    fn image_path(&self, pid: u32) -> Result<PathBuf> {
        if self.inaccessible.contains(&pid) {
            return Err(Error::TargetNotAvailable(format!("access denied to {}", pid)));
        }
        let processes = self.processes.borrow();
        let info = processes
            .iter()
            .find(|p| p.pid == pid)
            .ok_or_else(|| Error::TargetNotAvailable(format!("process {} exited", pid)))?;
        Ok(PathBuf::from(r"C:\games\ho").join(&info.exe_name))
    }
}
