//! Handle to a live target process.
//!
//! On Windows the handle is opened with VM read/write/operation rights plus
//! suspend/resume, and closed in `Drop`. Suspension is whole-process: every
//! thread owned by the pid is suspended through a Toolhelp thread snapshot.

use tracing::warn;

use crate::error::{Error, Result};
use crate::memory::ProcessOpener;

#[cfg(target_os = "windows")]
pub use imp::ProcessHandle;

#[cfg(not(target_os = "windows"))]
pub use unsupported::ProcessHandle;

/// Opens targets through the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessOpener;

impl ProcessOpener for SystemProcessOpener {
    type Process = ProcessHandle;

    fn open(&self, pid: u32) -> Result<ProcessHandle> {
        ProcessHandle::open(pid)
    }
}

fn not_available(pid: u32, reason: impl std::fmt::Display) -> Error {
    Error::TargetNotAvailable(format!("process {} could not be opened: {}", pid, reason))
}

/// Suspend every item in order. `suspend` returns `Ok(false)` for items that
/// are gone. On the first failure the items already suspended are resumed
/// again, so a failed attempt leaves nothing frozen.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn suspend_each<T>(
    items: &[T],
    mut suspend: impl FnMut(&T) -> std::result::Result<bool, String>,
    mut resume: impl FnMut(&T) -> std::result::Result<bool, String>,
) -> std::result::Result<(), String> {
    let mut suspended = Vec::with_capacity(items.len());
    for item in items {
        let failure = match suspend(item) {
            Ok(true) => {
                suspended.push(item);
                continue;
            }
            Ok(false) => continue,
            Err(message) => message,
        };

        for done in suspended {
            if let Err(e) = resume(done) {
                warn!("Rollback after failed suspend: {}", e);
            }
        }
        return Err(failure);
    }
    Ok(())
}

/// Resume every item, even past failures. Reports the first failure.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn resume_each<T>(
    items: &[T],
    mut resume: impl FnMut(&T) -> std::result::Result<bool, String>,
) -> std::result::Result<(), String> {
    let mut first_error = None;
    for item in items {
        if let Err(e) = resume(item) {
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

#[cfg(target_os = "windows")]
mod imp {
    use std::ffi::c_void;

    use tracing::debug;
    use windows::Win32::Foundation::{BOOL, CloseHandle, HANDLE};
    use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, TH32CS_SNAPTHREAD, THREADENTRY32, Thread32First, Thread32Next,
    };
    use windows::Win32::System::Threading::{
        OpenProcess, OpenThread, PROCESS_QUERY_INFORMATION, PROCESS_SUSPEND_RESUME,
        PROCESS_VM_OPERATION, PROCESS_VM_READ, PROCESS_VM_WRITE, ResumeThread, SuspendThread,
        THREAD_SUSPEND_RESUME,
    };

    use super::{not_available, resume_each, suspend_each};
    use crate::error::{Error, Result};
    use crate::memory::reader::check_address;
    use crate::memory::{ReadMemory, SuspendProcess, WriteMemory};

    pub struct ProcessHandle {
        pid: u32,
        handle: HANDLE,
    }

    impl ProcessHandle {
        pub fn open(pid: u32) -> Result<Self> {
            let access = PROCESS_VM_READ
                | PROCESS_VM_WRITE
                | PROCESS_VM_OPERATION
                | PROCESS_QUERY_INFORMATION
                | PROCESS_SUSPEND_RESUME;

            // SAFETY: OpenProcess has no pointer arguments.
            let handle = unsafe { OpenProcess(access, BOOL::from(false), pid) }
                .map_err(|e| not_available(pid, e))?;

            debug!("Opened process {}", pid);
            Ok(Self { pid, handle })
        }

        pub fn pid(&self) -> u32 {
            self.pid
        }

        fn thread_ids(&self) -> Result<Vec<u32>> {
            // SAFETY: CreateToolhelp32Snapshot has no pointer arguments.
            let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPTHREAD, 0) }
                .map_err(|e| not_available(self.pid, e))?;

            let mut threads = Vec::new();
            let mut entry = THREADENTRY32 {
                dwSize: std::mem::size_of::<THREADENTRY32>() as u32,
                ..Default::default()
            };

            // SAFETY: entry.dwSize is set and the snapshot handle is valid.
            let mut next = unsafe { Thread32First(snapshot, &mut entry) };
            while next.is_ok() {
                if entry.th32OwnerProcessID == self.pid {
                    threads.push(entry.th32ThreadID);
                }
                // SAFETY: as above.
                next = unsafe { Thread32Next(snapshot, &mut entry) };
            }

            // SAFETY: snapshot was returned by CreateToolhelp32Snapshot.
            let _ = unsafe { CloseHandle(snapshot) };
            Ok(threads)
        }

        /// Run `op` on one thread. `Ok(false)` when the thread exited before
        /// it could be opened.
        fn on_thread(tid: u32, op: impl Fn(HANDLE) -> u32) -> std::result::Result<bool, String> {
            // SAFETY: OpenThread has no pointer arguments.
            let opened = unsafe { OpenThread(THREAD_SUSPEND_RESUME, BOOL::from(false), tid) };
            let Ok(thread) = opened else {
                debug!("Thread {} exited before it could be opened", tid);
                return Ok(false);
            };

            let previous = op(thread);
            let error = std::io::Error::last_os_error();
            // SAFETY: thread was returned by OpenThread.
            let _ = unsafe { CloseHandle(thread) };

            if previous == u32::MAX {
                return Err(format!("thread {}: {}", tid, error));
            }
            Ok(true)
        }

        fn threads(&self) -> std::result::Result<Vec<u32>, String> {
            let threads = self.thread_ids().map_err(|e| e.to_string())?;
            if threads.is_empty() {
                return Err("process has no threads".to_string());
            }
            Ok(threads)
        }
    }

    impl Drop for ProcessHandle {
        fn drop(&mut self) {
            // SAFETY: handle was returned by OpenProcess and is closed once.
            let _ = unsafe { CloseHandle(self.handle) };
        }
    }

    impl ReadMemory for ProcessHandle {
        fn read_into(&self, address: u64, buffer: &mut [u8]) -> Result<()> {
            check_address(address)?;

            let mut bytes_read = 0usize;
            // SAFETY: buffer is valid for buffer.len() bytes of writes.
            unsafe {
                ReadProcessMemory(
                    self.handle,
                    address as *const c_void,
                    buffer.as_mut_ptr() as *mut c_void,
                    buffer.len(),
                    Some(&mut bytes_read),
                )
            }
            .map_err(|e| Error::MemoryReadFailed {
                address,
                message: e.to_string(),
            })?;

            if bytes_read != buffer.len() {
                return Err(Error::MemoryReadFailed {
                    address,
                    message: format!("expected {} bytes, read {}", buffer.len(), bytes_read),
                });
            }
            Ok(())
        }
    }

    impl WriteMemory for ProcessHandle {
        fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
            let mut bytes_written = 0usize;
            // SAFETY: data is valid for data.len() bytes of reads.
            unsafe {
                WriteProcessMemory(
                    self.handle,
                    address as *const c_void,
                    data.as_ptr() as *const c_void,
                    data.len(),
                    Some(&mut bytes_written),
                )
            }
            .map_err(|e| Error::MemoryWriteFailed {
                address,
                message: e.to_string(),
            })?;

            if bytes_written != data.len() {
                return Err(Error::MemoryWriteFailed {
                    address,
                    message: format!("expected {} bytes, wrote {}", data.len(), bytes_written),
                });
            }
            Ok(())
        }
    }

    impl SuspendProcess for ProcessHandle {
        fn pid(&self) -> u32 {
            self.pid
        }

        fn suspend(&self) -> Result<()> {
            let threads = self.threads().map_err(|message| Error::SuspendFailed {
                pid: self.pid,
                message,
            })?;
            // SAFETY: the thread handle passed in is open for suspend/resume.
            suspend_each(
                &threads,
                |&tid| Self::on_thread(tid, |thread| unsafe { SuspendThread(thread) }),
                |&tid| Self::on_thread(tid, |thread| unsafe { ResumeThread(thread) }),
            )
            .map_err(|message| Error::SuspendFailed {
                pid: self.pid,
                message,
            })
        }

        fn resume(&self) -> Result<()> {
            let threads = self.threads().map_err(|message| Error::ResumeFailed {
                pid: self.pid,
                message,
            })?;
            // SAFETY: the thread handle passed in is open for suspend/resume.
            resume_each(&threads, |&tid| {
                Self::on_thread(tid, |thread| unsafe { ResumeThread(thread) })
            })
            .map_err(|message| Error::ResumeFailed {
                pid: self.pid,
                message,
            })
        }
    }
}

#[cfg(not(target_os = "windows"))]
mod unsupported {
    use super::not_available;
    use crate::error::Result;
    use crate::memory::{ReadMemory, SuspendProcess, WriteMemory};

    /// Placeholder on platforms without cross-process memory support.
    /// It can never be constructed.
    pub struct ProcessHandle {
        pid: u32,
    }

    impl ProcessHandle {
        pub fn open(pid: u32) -> Result<Self> {
            Err(not_available(
                pid,
                "process memory access is only supported on Windows",
            ))
        }

        pub fn pid(&self) -> u32 {
            self.pid
        }
    }

    impl ReadMemory for ProcessHandle {
        fn read_into(&self, _address: u64, _buffer: &mut [u8]) -> Result<()> {
            Err(not_available(self.pid, "unsupported platform"))
        }
    }

    impl WriteMemory for ProcessHandle {
        fn write_bytes(&self, _address: u64, _data: &[u8]) -> Result<()> {
            Err(not_available(self.pid, "unsupported platform"))
        }
    }

    impl SuspendProcess for ProcessHandle {
        fn pid(&self) -> u32 {
            self.pid
        }

        fn suspend(&self) -> Result<()> {
            Err(not_available(self.pid, "unsupported platform"))
        }

        fn resume(&self) -> Result<()> {
            Err(not_available(self.pid, "unsupported platform"))
        }
    }
}
