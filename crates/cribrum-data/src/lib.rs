//! cribrum-data — Feature-table construction for the activity model pipeline.
//!
//! Three stages, each a pure function from table to table:
//! 1. Fusion: merge descriptor and docking exports into one labelled table.
//! 2. Filtering: numeric coercion and degenerate-column pruning.
//! 3. Reduction: min-max scaling and correlation-based feature removal.

pub mod filter;
pub mod fusion;
pub mod reduce;

pub use fusion::{fuse, FusionInputs};
pub use reduce::MinMaxScaler;
