//! Audit sink adapters.

mod memory;
mod tracing_sink;

pub use memory::InMemoryAuditSink;
pub use tracing_sink::TracingAuditSink;
