//! Output-path sandboxing module
//!
//! The write side of the trust boundary: path validation against traversal,
//! sensitive locations, and allowlists; unique name allocation that is
//! race-free under concurrent writers; and a write primitive that refuses
//! symlinks at open time.

mod allocate;
mod validate;
mod writer;

pub use allocate::allocate_unique_path;
pub use validate::validate_output_path;
pub use writer::{write_validated, SecureWriter, WriteOutcome};
