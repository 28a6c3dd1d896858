//! Transformers writing processed files

mod extract;

pub use extract::{ColumnExpression, ExtractColumns};
