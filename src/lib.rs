pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod parser;
pub mod storage;

// Re-export commonly used items
pub use engine::{Interpreter, RunStats};
pub use error::{Result, SeverityQlError};
pub use parser::{parse_command, Command};
pub use storage::{Direction, EntryStore, Filter, LogEntry, Timestamp};
