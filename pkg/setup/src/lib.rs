pub mod tracing;
pub use tracing::{InitTracingError, LogFormat, init_tracing};
