//! Table-scoped database operations.

mod result;

pub use result::*;
