mod cache;
mod field;

pub use cache::{StatusCache, StatusSnapshot};
pub use field::{StatusField, StatusValue};
