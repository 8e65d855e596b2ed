//! cribrum-common — Shared types and errors used across all Cribrum crates.

pub mod error;
pub mod ident;
pub mod table;

// Re-export commonly used types
pub use error::{CribrumError, Result};
pub use table::Table;

/// Canonical compound identifier column.
pub const ID_COLUMN: &str = "name";

/// Canonical binary label column (1 = active, 0 = decoy).
pub const LABEL_COLUMN: &str = "activity";
