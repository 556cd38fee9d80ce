//! Logger and provider that expose the pipeline to application code

use crate::filters::{AllowAll, ConfigFilter, MinimumSeverity, SeverityFilter};
use crate::pipeline::EnrichmentPipeline;
use crate::redaction::RedactionPolicy;
use crate::sink::TelemetrySink;
use lumen_core::{EventError, FormatError, LogEvent, LumenConfig, Severity, StructuredState};
use std::sync::Arc;

/// Creates category loggers that share one sink, filter and redaction policy
#[derive(Debug, Clone)]
pub struct TelemetryLoggerProvider {
    pipeline: EnrichmentPipeline,
}

impl TelemetryLoggerProvider {
    /// Provider recording `Information` and above
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self::with_min_level(sink, Severity::Information)
    }

    pub fn with_min_level(sink: Arc<dyn TelemetrySink>, min_level: Severity) -> Self {
        Self::with_filter(sink, MinimumSeverity(min_level))
    }

    pub fn with_filter(sink: Arc<dyn TelemetrySink>, filter: impl SeverityFilter + 'static) -> Self {
        Self {
            pipeline: EnrichmentPipeline::new(sink, Arc::new(filter), RedactionPolicy::default()),
        }
    }

    /// Provider recording every severity of every category
    pub fn unfiltered(sink: Arc<dyn TelemetrySink>) -> Self {
        Self::with_filter(sink, AllowAll)
    }

    pub fn from_config(sink: Arc<dyn TelemetrySink>, config: &LumenConfig) -> Self {
        Self {
            pipeline: EnrichmentPipeline::new(
                sink,
                Arc::new(ConfigFilter::new(config)),
                RedactionPolicy::from_config(&config.redaction),
            ),
        }
    }

    pub fn from_pipeline(pipeline: EnrichmentPipeline) -> Self {
        Self { pipeline }
    }

    pub fn create_logger(&self, category: impl Into<String>) -> TelemetryLogger {
        TelemetryLogger {
            category: category.into(),
            pipeline: self.pipeline.clone(),
        }
    }

    pub fn pipeline(&self) -> &EnrichmentPipeline {
        &self.pipeline
    }
}

/// Logger bound to one category
#[derive(Debug, Clone)]
pub struct TelemetryLogger {
    category: String,
    pipeline: EnrichmentPipeline,
}

impl TelemetryLogger {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn is_enabled(&self, severity: Severity) -> bool {
        self.pipeline.filter().is_enabled(&self.category, severity)
    }

    /// Record an event. Never fails; see [`EnrichmentPipeline::handle`].
    pub fn log<F>(
        &self,
        severity: Severity,
        state: Option<StructuredState>,
        error: Option<EventError>,
        formatter: F,
    ) where
        F: FnOnce(&StructuredState, Option<&EventError>) -> Result<String, FormatError>
            + Send
            + 'static,
    {
        self.pipeline.handle(LogEvent {
            severity,
            category: self.category.clone(),
            state,
            error,
            formatter: Box::new(formatter),
        });
    }

    /// Record a fixed message with structured state
    pub fn log_message(&self, severity: Severity, message: impl Into<String>, state: StructuredState) {
        let message = message.into();
        self.log(severity, Some(state), None, move |_, _| Ok(message));
    }

    /// Record a `{Name}` template rendered from the state
    pub fn log_template(&self, severity: Severity, template: impl Into<String>, state: StructuredState) {
        let mut event = LogEvent::template(severity, self.category.clone(), template);
        event.state = Some(state);
        self.pipeline.handle(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MemorySink, TelemetryRecord};
    use lumen_core::config::{MatchKind, RedactionRuleConfig};
    use lumen_core::StateValue;

    #[derive(Debug, thiserror::Error)]
    #[error("timeout talking to inventory")]
    struct Timeout;

    #[test]
    fn test_default_provider_drops_debug() {
        let sink = Arc::new(MemorySink::new());
        let logger = TelemetryLoggerProvider::new(sink.clone()).create_logger("Orders");

        assert!(!logger.is_enabled(Severity::Debug));
        assert!(logger.is_enabled(Severity::Information));

        logger.log_message(Severity::Debug, "ignored", StructuredState::new());
        logger.log_message(Severity::Information, "kept", StructuredState::new());

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(matches!(&records[0], TelemetryRecord::Event { name, .. } if name == "Information"));
    }

    #[test]
    fn test_filter_receives_category() {
        let sink = Arc::new(MemorySink::new());
        let provider = TelemetryLoggerProvider::with_filter(sink.clone(), |category: &str, _: Severity| {
            category.starts_with("Billing")
        });

        provider
            .create_logger("Billing.Invoices")
            .log_message(Severity::Trace, "kept", StructuredState::new());
        provider
            .create_logger("Orders")
            .log_message(Severity::Critical, "dropped", StructuredState::new());

        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_error_is_forwarded_with_properties() {
        let sink = Arc::new(MemorySink::new());
        let logger = TelemetryLoggerProvider::unfiltered(sink.clone()).create_logger("Inventory");
        let error: EventError = Arc::new(Timeout);

        logger.log(
            Severity::Error,
            Some(StructuredState::new().with("Sku", StateValue::pair("Sku", "A1"))),
            Some(error.clone()),
            |_, _| Ok("lookup failed".to_string()),
        );

        match &sink.records()[0] {
            TelemetryRecord::Exception { error: sent, properties } => {
                assert!(Arc::ptr_eq(sent, &error));
                assert_eq!(properties.get("Sku"), Some("A1"));
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_from_config_applies_levels_and_redaction() {
        let mut config = LumenConfig::default();
        config.log_level.default = "Warning".to_string();
        config.redaction.rules.push(RedactionRuleConfig {
            header: "Cookie".to_string(),
            matcher: MatchKind::Equals,
            mask: Some("[cookie]".to_string()),
        });

        let sink = Arc::new(MemorySink::new());
        let provider = TelemetryLoggerProvider::from_config(sink.clone(), &config);
        let logger = provider.create_logger("Web");

        assert!(!logger.is_enabled(Severity::Information));

        let request = lumen_core::http::InboundRequest::new(http::Method::GET, "https", "example.com")
            .with_header("Cookie", "session=1")
            .with_header("Authorization", "Bearer t");
        logger.log_message(
            Severity::Warning,
            "slow request",
            StructuredState::new().with("Request", request),
        );

        let properties = sink.records()[0].properties().clone();
        assert_eq!(properties.get("RequestHeader_Cookie"), Some("[cookie]"));
        assert_eq!(
            properties.get("RequestHeader_Authorization"),
            Some(lumen_core::config::DEFAULT_MASK)
        );
    }

    #[test]
    fn test_log_template() {
        let sink = Arc::new(MemorySink::new());
        let logger = TelemetryLoggerProvider::unfiltered(sink.clone()).create_logger("Cache");

        logger.log_template(
            Severity::Debug,
            "Evicted {Count} entries",
            StructuredState::new().with("Count", StateValue::opaque(12)),
        );

        assert!(matches!(
            &sink.records()[0],
            TelemetryRecord::Trace { message, .. } if message == "Evicted 12 entries"
        ));
    }
}
