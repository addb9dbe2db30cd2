//! Media file change workflow
//!
//! [`Engine`] runs the five file operations (add, replace, delete, apply,
//! reject) one at a time behind a [`Gate`]. Each operation touches the file
//! store first without destroying anything, commits the record change
//! atomically, and only then discards backups; a fault before the commit is
//! compensated by unwinding an [`UndoLog`].

pub mod engine;
pub mod gate;
pub mod notify;
pub mod outcome;
pub mod undo;
pub mod upload;

pub use engine::{Engine, EngineSettings};
pub use gate::{Gate, GatePermit};
pub use notify::{ChangeNotice, ChangeNotifier};
pub use outcome::{Outcome, PolicyViolation};
pub use undo::{UndoLog, UndoStep};
pub use upload::Upload;
