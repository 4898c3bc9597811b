pub mod commands;
mod line;
mod query;

pub use commands::StatusQuery;
pub use line::{Line, TERMINATOR};
pub use query::{MatchedExchange, Query};
