//! Read-only views of a table: missing-value audit and overview statistics.

mod missing;
mod overview;

pub use missing::{MissingColumn, MissingnessReport, NullAuditor};
pub use overview::{ColumnOverview, NumericStats, TableOverview};
