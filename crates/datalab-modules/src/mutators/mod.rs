//! Inline mutators
//!
//! Every mutator reads the columns it acts on from its `target_columns`
//! parameter and fails on a column the table does not have.

mod average;
mod linear_fit;
mod normalize;
mod savgol;
mod sort;

pub use average::AverageLine;
pub use linear_fit::{with_uncertainty, LinearFit, LineFit};
pub use normalize::Normalize;
pub use savgol::{savgol_coefficients, SavgolFilter};
pub use sort::SortValues;

use datalab_schema::ValueTree;

/// Parameter listing the columns a mutator acts on
pub const TARGET_COLUMNS: &str = "target_columns";

/// Columns named by `target_columns`
#[must_use]
pub fn target_columns(params: &ValueTree) -> Vec<String> {
    params.strings(TARGET_COLUMNS)
}
