pub mod layout;
mod process;
mod provider;
mod reader;
mod stream;
mod suspend;

#[cfg(test)]
pub mod mock;

pub use process::{ProcessHandle, SystemProcessOpener};
pub use provider::{ProcessInfo, ProcessProvider, SystemProcessProvider};
pub use reader::{ProcessMemory, ProcessOpener, ReadMemory, SuspendProcess, WriteMemory};
pub use stream::MemoryStream;
pub use suspend::SuspendGuard;

#[cfg(test)]
pub use mock::{MockMemoryBuilder, MockOpener, MockProcess, MockProvider};
