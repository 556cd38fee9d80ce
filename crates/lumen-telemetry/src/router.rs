//! Severity based routing to sink operations

use crate::sink::TelemetrySink;
use lumen_core::{EventError, PropertyBag, Severity, SinkError};
use std::sync::Arc;

/// Error synthesized from the formatted message when an error-level event
/// carries no error object of its own
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MessageError(pub String);

/// Sink operation chosen for a severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Exception,
    Trace,
    Event,
}

impl Route {
    pub fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical | Severity::Error => Route::Exception,
            Severity::Debug | Severity::Trace => Route::Trace,
            Severity::Information | Severity::Warning => Route::Event,
        }
    }
}

/// Send a record to the sink operation matching `severity`.
///
/// On the exception route the supplied error is passed through untouched; when
/// absent, a [`MessageError`] carrying `message` takes its place.
pub fn dispatch(
    sink: &dyn TelemetrySink,
    severity: Severity,
    message: String,
    error: Option<EventError>,
    properties: PropertyBag,
) -> Result<Route, SinkError> {
    let route = Route::for_severity(severity);
    match route {
        Route::Exception => {
            let error: EventError = match error {
                Some(error) => error,
                None => Arc::new(MessageError(message)),
            };
            sink.track_exception(error, properties)?;
        }
        Route::Trace => sink.track_trace(&message, properties)?,
        Route::Event => sink.track_event(severity.as_str(), properties)?,
    }
    Ok(route)
}
