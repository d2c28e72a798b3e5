//! Observability module
//!
//! - Metrics collection and reporting
//! - Structured logging of dispatch events
//! - Span constructors for ticks and dispatches

pub mod dispatch_tracer;
pub mod metrics_collector;
pub mod structured_logger;

pub use dispatch_tracer::DispatchTracer;
pub use metrics_collector::MetricsCollector;
pub use structured_logger::StructuredLogger;
