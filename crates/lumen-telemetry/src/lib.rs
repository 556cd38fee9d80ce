//! # Lumen Telemetry
//!
//! Enrichment and routing of structured log events into telemetry sinks.
//!
//! ## Features
//!
//! - **Shape extraction**: key/value pairs, maps, serializable objects and
//!   HTTP requests/responses are flattened into string properties
//! - **Redaction**: sensitive inbound headers are masked before emission
//! - **Severity routing**: errors become exceptions, debug output becomes
//!   traces, everything else becomes named events
//! - **Best effort**: a log call never fails because telemetry did
//! - **`tracing` bridge**: forward existing `tracing` events unchanged
//!
//! ## Quick Start
//!
//! ```rust
//! use lumen_core::{Severity, StateValue, StructuredState};
//! use lumen_telemetry::{MemorySink, TelemetryLoggerProvider};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemorySink::new());
//! let provider = TelemetryLoggerProvider::new(sink.clone());
//! let logger = provider.create_logger("Orders");
//!
//! logger.log_message(
//!     Severity::Warning,
//!     "order flagged",
//!     StructuredState::new().with("State", StateValue::pair("UserId", "abc123")),
//! );
//!
//! assert_eq!(sink.len(), 1);
//! ```

pub mod bridge;
pub mod extract;
pub mod filters;
pub mod logger;
pub mod pipeline;
pub mod redaction;
pub mod router;
pub mod sink;
pub mod system;

pub use bridge::TelemetryLayer;
pub use filters::{AllowAll, ConfigFilter, MinimumSeverity, SeverityFilter};
pub use logger::{TelemetryLogger, TelemetryLoggerProvider};
pub use pipeline::{EnrichmentPipeline, Outcome};
pub use redaction::{KeyMatcher, RedactionPolicy};
pub use router::{MessageError, Route};
pub use sink::{MemorySink, TelemetryRecord, TelemetrySink, TracingSink};
pub use system::{TelemetryGuard, TelemetrySystem};
