use std::path::PathBuf;

use crate::error::Result;

/// A running OS process as seen by an enumeration snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Executable file name, e.g. `eldorado.exe`
    pub exe_name: String,
}

/// OS-level process enumeration.
pub trait ProcessProvider {
    /// Snapshot of every running process.
    fn processes(&self) -> Result<Vec<ProcessInfo>>;

    /// Full image path of a process. Fails when the process has exited or
    /// cannot be queried.
    fn image_path(&self, pid: u32) -> Result<PathBuf>;

    fn processes_named(&self, exe_name: &str) -> Result<Vec<ProcessInfo>> {
        Ok(self
            .processes()?
            .into_iter()
            .filter(|p| p.exe_name.eq_ignore_ascii_case(exe_name))
            .collect())
    }
}

/// Process enumeration backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessProvider;

#[cfg(target_os = "windows")]
impl ProcessProvider for SystemProcessProvider {
    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Diagnostics::ToolHelp::{
            CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
            TH32CS_SNAPPROCESS,
        };

        use crate::error::Error;

        // SAFETY: CreateToolhelp32Snapshot has no pointer arguments.
        let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;

        let mut processes = Vec::new();
        let mut entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        // SAFETY: entry.dwSize is set and the snapshot handle is valid.
        let mut next = unsafe { Process32FirstW(snapshot, &mut entry) };
        while next.is_ok() {
            let name_end = entry
                .szExeFile
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(entry.szExeFile.len());
            processes.push(ProcessInfo {
                pid: entry.th32ProcessID,
                exe_name: String::from_utf16_lossy(&entry.szExeFile[..name_end]),
            });

            // SAFETY: as above.
            next = unsafe { Process32NextW(snapshot, &mut entry) };
        }

        // SAFETY: snapshot was returned by CreateToolhelp32Snapshot.
        let _ = unsafe { CloseHandle(snapshot) };

        Ok(processes)
    }

    fn image_path(&self, pid: u32) -> Result<PathBuf> {
        use windows::Win32::Foundation::{BOOL, CloseHandle};
        use windows::Win32::System::Threading::{
            OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
            QueryFullProcessImageNameW,
        };
        use windows::core::PWSTR;

        use crate::error::Error;

        let access = PROCESS_QUERY_LIMITED_INFORMATION;
        // SAFETY: OpenProcess has no pointer arguments.
        let handle = unsafe { OpenProcess(access, BOOL::from(false), pid) }
            .map_err(|e| Error::TargetNotAvailable(format!("process {}: {}", pid, e)))?;

        let mut buffer = vec![0u16; 1024];
        let mut size = buffer.len() as u32;
        // SAFETY: buffer holds `size` UTF-16 units and outlives the call.
        let result = unsafe {
            QueryFullProcessImageNameW(
                handle,
                PROCESS_NAME_WIN32,
                PWSTR(buffer.as_mut_ptr()),
                &mut size,
            )
        };
        // SAFETY: handle was returned by OpenProcess.
        let _ = unsafe { CloseHandle(handle) };

        result.map_err(|e| Error::TargetNotAvailable(format!("process {}: {}", pid, e)))?;
        buffer.truncate(size as usize);

        Ok(PathBuf::from(String::from_utf16_lossy(&buffer)))
    }
}

#[cfg(not(target_os = "windows"))]
impl ProcessProvider for SystemProcessProvider {
    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        Ok(Vec::new())
    }

    fn image_path(&self, pid: u32) -> Result<PathBuf> {
        Err(crate::error::Error::TargetNotAvailable(format!(
            "process {}: process inspection is only supported on Windows",
            pid
        )))
    }
}
