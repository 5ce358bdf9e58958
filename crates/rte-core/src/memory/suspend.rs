use tracing::{debug, warn};

use crate::error::Result;
use crate::memory::SuspendProcess;

/// Holds a target process suspended for as long as the guard lives.
///
/// Acquiring suspends the whole process. Release happens exactly once:
/// through [`SuspendGuard::resume`] when the caller wants to see the error,
/// or in `Drop` on every other exit path.
pub struct SuspendGuard<'a, P: SuspendProcess + ?Sized> {
    process: &'a P,
    active: bool,
}

impl<'a, P: SuspendProcess + ?Sized> SuspendGuard<'a, P> {
    pub fn new(process: &'a P) -> Result<Self> {
        process.suspend()?;
        debug!("Suspended process {}", process.pid());
        Ok(Self {
            process,
            active: true,
        })
    }

    pub fn resume(mut self) -> Result<()> {
        self.active = false;
        self.process.resume()?;
        debug!("Resumed process {}", self.process.pid());
        Ok(())
    }
}

impl<P: SuspendProcess + ?Sized> Drop for SuspendGuard<'_, P> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        match self.process.resume() {
            Ok(()) => debug!("Resumed process {} on unwind", self.process.pid()),
            Err(e) => warn!("Failed to resume process {}: {}", self.process.pid(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::memory::MockMemoryBuilder;

    #[test]
    fn test_explicit_resume_runs_once() {
        let process = MockMemoryBuilder::new().build();
        let guard = SuspendGuard::new(&process).unwrap();
        assert!(process.is_suspended());
        guard.resume().unwrap();

        assert!(!process.is_suspended());
        assert_eq!(process.suspend_calls(), 1);
        assert_eq!(process.resume_calls(), 1);
    }

    #[test]
    fn test_drop_resumes_on_error_path() {
        let process = MockMemoryBuilder::new().build();

        let result: Result<()> = (|| {
            let _guard = SuspendGuard::new(&process)?;
            Err(Error::MemoryWriteFailed {
                address: 0x10,
                message: "injected".to_string(),
            })
        })();

        assert!(result.is_err());
        assert_eq!(process.resume_calls(), 1);
        assert!(!process.is_suspended());
    }

    #[test]
    fn test_failed_suspend_never_resumes() {
        let process = MockMemoryBuilder::new().fail_suspend().build();
        assert!(SuspendGuard::new(&process).is_err());
        assert_eq!(process.resume_calls(), 0);
    }
}
