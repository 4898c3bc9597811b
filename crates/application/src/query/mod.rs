mod engine;

pub(crate) use engine::as_millis_u64;
pub use engine::{DEFAULT_QUERY_TIMEOUT, QueryEngine};
