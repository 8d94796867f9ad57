//! Platform-agnostic types shared by the register reader and the scanner.

pub mod address;
pub mod thread;

pub use address::Address;
pub use thread::ThreadId;
