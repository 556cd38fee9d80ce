//! Bridge from `tracing` events to the enrichment pipeline

use crate::logger::TelemetryLoggerProvider;
use lumen_core::{EventError, LogEvent, Severity, StateValue, StructuredState};
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{layer::Context, Layer};

/// Targets whose events are never forwarded, so the engine's own
/// diagnostics and sink output cannot feed back into it
const INTERNAL_TARGETS: [&str; 3] = ["lumen_telemetry", "lumen_core", "lumen::"];

/// Error recorded on a `tracing` event through its `error` field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct RecordedError(pub String);

/// Layer that turns every `tracing` event into a [`LogEvent`].
///
/// The event target becomes the category, the `message` field the message,
/// an `error` field the error object and every other field a key/value
/// entry. A `severity` field overrides the level, which is how a bridged
/// event reaches [`Severity::Critical`].
#[derive(Debug, Clone)]
pub struct TelemetryLayer {
    provider: TelemetryLoggerProvider,
}

impl TelemetryLayer {
    pub fn new(provider: TelemetryLoggerProvider) -> Self {
        Self { provider }
    }

    fn is_internal(target: &str) -> bool {
        INTERNAL_TARGETS
            .iter()
            .any(|internal| target.starts_with(internal))
    }
}

impl<S> Layer<S> for TelemetryLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if Self::is_internal(metadata.target()) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let severity = visitor
            .severity
            .unwrap_or_else(|| Severity::from(*metadata.level()));
        let message = visitor.message.unwrap_or_default();

        self.provider.pipeline().handle(LogEvent {
            severity,
            category: metadata.target().to_string(),
            state: Some(visitor.state),
            error: visitor.error,
            formatter: Box::new(move |_, _| Ok(message)),
        });
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    severity: Option<Severity>,
    error: Option<EventError>,
    state: StructuredState,
}

impl EventVisitor {
    fn record_text(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            "severity" => match value.parse() {
                Ok(severity) => self.severity = Some(severity),
                Err(_) => self.push(field, value),
            },
            // `error = %e` and `error = ?e` arrive as text, not through record_error
            "error" => self.error = Some(Arc::new(RecordedError(value))),
            _ => self.push(field, value),
        }
    }

    fn push(&mut self, field: &Field, value: String) {
        self.state
            .push(field.name(), StateValue::pair(field.name(), value));
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_text(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_text(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_text(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_text(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_text(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_text(field, format!("{:?}", value));
    }
}
