//! Enrichment pipeline: filter, extract, format, route
//!
//! Telemetry is best effort. [`EnrichmentPipeline::handle`] never returns an
//! error and never unwinds into the caller; every failure turns into a
//! dropped entry or a dropped record plus a debug diagnostic.

use crate::extract::extract;
use crate::filters::SeverityFilter;
use crate::redaction::RedactionPolicy;
use crate::router::{self, Route};
use crate::sink::TelemetrySink;
use lumen_core::{LogEvent, PropertyBag, Result, StateValue, StructuredState};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, trace};

/// What happened to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Severity disabled for the category; nothing was extracted
    Filtered,
    /// Payload was not structured state
    NoState,
    Dispatched(Route),
}

#[derive(Clone)]
pub struct EnrichmentPipeline {
    sink: Arc<dyn TelemetrySink>,
    filter: Arc<dyn SeverityFilter>,
    policy: Arc<RedactionPolicy>,
}

impl EnrichmentPipeline {
    pub fn new(
        sink: Arc<dyn TelemetrySink>,
        filter: Arc<dyn SeverityFilter>,
        policy: RedactionPolicy,
    ) -> Self {
        Self {
            sink,
            filter,
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &RedactionPolicy {
        &self.policy
    }

    pub fn filter(&self) -> &dyn SeverityFilter {
        self.filter.as_ref()
    }

    /// Process one event. Failures are logged at debug level and discarded.
    pub fn handle(&self, event: LogEvent) {
        let category = event.category.clone();
        match panic::catch_unwind(AssertUnwindSafe(|| self.try_handle(event))) {
            Ok(Ok(outcome)) => {
                trace!(category = %category, outcome = ?outcome, "Log event handled");
            }
            Ok(Err(e)) => {
                debug!(category = %category, error = %e, "Telemetry record dropped");
            }
            Err(_) => {
                debug!(category = %category, "Telemetry pipeline panicked, record dropped");
            }
        }
    }

    /// Process one event, reporting why a record was not sent.
    ///
    /// Extraction failures never surface here; they only drop their entry.
    /// Formatter and sink failures are returned.
    pub fn try_handle(&self, event: LogEvent) -> Result<Outcome> {
        let LogEvent {
            severity,
            category,
            state,
            error,
            formatter,
        } = event;

        if !self.filter.is_enabled(&category, severity) {
            return Ok(Outcome::Filtered);
        }

        let Some(mut state) = state else {
            return Ok(Outcome::NoState);
        };

        let properties = self.collect_properties(&category, &mut state);
        let message = formatter(&state, error.as_ref())?;
        let route = router::dispatch(self.sink.as_ref(), severity, message, error, properties)?;

        Ok(Outcome::Dispatched(route))
    }

    /// Extract every entry into one bag, skipping entries that fail
    pub fn collect_properties(&self, category: &str, state: &mut StructuredState) -> PropertyBag {
        let mut properties = PropertyBag::new();
        let mut unrecognized = 0usize;

        for entry in state.iter_mut() {
            if matches!(entry.value, StateValue::Opaque(_)) {
                unrecognized += 1;
                continue;
            }

            // A panicking Serialize impl or body reader loses only its own entry
            let policy = &self.policy;
            let value = &mut entry.value;
            match panic::catch_unwind(AssertUnwindSafe(|| extract(value, policy))) {
                Ok(Ok(bag)) => properties.merge(bag),
                Ok(Err(e)) => debug!(
                    category = %category,
                    entry = %entry.name,
                    shape = entry.value.shape(),
                    error = %e,
                    "Dropping structured-state entry"
                ),
                Err(_) => debug!(
                    category = %category,
                    entry = %entry.name,
                    shape = entry.value.shape(),
                    "Extractor panicked, dropping structured-state entry"
                ),
            }
        }

        if unrecognized > 0 {
            trace!(
                category = %category,
                unrecognized,
                "Skipped structured-state entries with no extractor"
            );
        }

        properties
    }
}

impl std::fmt::Debug for EnrichmentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentPipeline")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
