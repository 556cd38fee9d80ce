//! Telemetry sinks that receive enriched records

use lumen_core::{EventError, PropertyBag, SinkError};
use std::sync::Mutex;

/// Backend that records trace, exception and event telemetry.
///
/// Implementations must be safe to call from concurrent log calls. Any
/// batching, retry or transport is the sink's own business.
#[cfg_attr(test, mockall::automock)]
pub trait TelemetrySink: Send + Sync {
    fn track_exception(&self, error: EventError, properties: PropertyBag) -> Result<(), SinkError>;

    fn track_trace(&self, message: &str, properties: PropertyBag) -> Result<(), SinkError>;

    fn track_event(&self, name: &str, properties: PropertyBag) -> Result<(), SinkError>;
}

/// A record as received by a sink
#[derive(Debug, Clone)]
pub enum TelemetryRecord {
    Exception {
        error: EventError,
        properties: PropertyBag,
    },
    Trace {
        message: String,
        properties: PropertyBag,
    },
    Event {
        name: String,
        properties: PropertyBag,
    },
}

impl TelemetryRecord {
    pub fn properties(&self) -> &PropertyBag {
        match self {
            TelemetryRecord::Exception { properties, .. }
            | TelemetryRecord::Trace { properties, .. }
            | TelemetryRecord::Event { properties, .. } => properties,
        }
    }
}

/// Sink that keeps every record in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, record: TelemetryRecord) -> Result<(), SinkError> {
        let mut records = self.records.lock().map_err(|e| SinkError::Unavailable {
            message: format!("record buffer poisoned: {}", e),
        })?;
        records.push(record);
        Ok(())
    }

    /// Snapshot of all records received so far
    pub fn records(&self) -> Vec<TelemetryRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Remove and return all records
    pub fn drain(&self) -> Vec<TelemetryRecord> {
        match self.records.lock() {
            Ok(mut records) => std::mem::take(&mut *records),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TelemetrySink for MemorySink {
    fn track_exception(&self, error: EventError, properties: PropertyBag) -> Result<(), SinkError> {
        self.push(TelemetryRecord::Exception { error, properties })
    }

    fn track_trace(&self, message: &str, properties: PropertyBag) -> Result<(), SinkError> {
        self.push(TelemetryRecord::Trace {
            message: message.to_string(),
            properties,
        })
    }

    fn track_event(&self, name: &str, properties: PropertyBag) -> Result<(), SinkError> {
        self.push(TelemetryRecord::Event {
            name: name.to_string(),
            properties,
        })
    }
}

/// Target of events written by [`TracingSink`]
pub const SINK_TARGET: &str = "lumen::sink";

/// Sink that writes each record as a structured `tracing` event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }

    fn properties_json(properties: &PropertyBag) -> Result<String, SinkError> {
        serde_json::to_string(properties).map_err(|e| SinkError::Rejected {
            message: format!("properties not serializable: {}", e),
        })
    }
}

impl TelemetrySink for TracingSink {
    fn track_exception(&self, error: EventError, properties: PropertyBag) -> Result<(), SinkError> {
        let properties = Self::properties_json(&properties)?;
        tracing::error!(
            target: SINK_TARGET,
            kind = "exception",
            error = %error,
            properties = %properties,
            "exception"
        );
        Ok(())
    }

    fn track_trace(&self, message: &str, properties: PropertyBag) -> Result<(), SinkError> {
        let properties = Self::properties_json(&properties)?;
        tracing::info!(
            target: SINK_TARGET,
            kind = "trace",
            properties = %properties,
            "{}",
            message
        );
        Ok(())
    }

    fn track_event(&self, name: &str, properties: PropertyBag) -> Result<(), SinkError> {
        let properties = Self::properties_json(&properties)?;
        tracing::info!(
            target: SINK_TARGET,
            kind = "event",
            name = name,
            properties = %properties,
            "event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        let bag: PropertyBag = [("k", "v")].into_iter().collect();

        sink.track_event("Warning", bag.clone()).unwrap();
        sink.track_trace("hello", bag.clone()).unwrap();
        sink.track_exception(Arc::new(Boom), bag).unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 3);
        assert!(matches!(&records[0], TelemetryRecord::Event { name, .. } if name == "Warning"));
        assert!(matches!(&records[1], TelemetryRecord::Trace { message, .. } if message == "hello"));
        assert!(matches!(&records[2], TelemetryRecord::Exception { error, .. } if error.to_string() == "boom"));
        assert_eq!(records[2].properties().get("k"), Some("v"));
    }

    #[test]
    fn test_drain_empties_sink() {
        let sink = MemorySink::new();
        sink.track_trace("one", PropertyBag::new()).unwrap();

        assert_eq!(sink.drain().len(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_tracing_sink_accepts_all_kinds() {
        let sink = TracingSink::new();
        let bag: PropertyBag = [("k", "v")].into_iter().collect();

        assert!(sink.track_event("Information", bag.clone()).is_ok());
        assert!(sink.track_trace("message", bag.clone()).is_ok());
        assert!(sink.track_exception(Arc::new(Boom), bag).is_ok());
    }
}
