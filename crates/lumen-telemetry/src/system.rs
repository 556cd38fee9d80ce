//! Process-wide installation of diagnostics output and the telemetry bridge

use crate::bridge::TelemetryLayer;
use crate::logger::TelemetryLoggerProvider;
use crate::sink::TelemetrySink;
use lumen_core::config::{DiagnosticsFormat, LumenConfig};
use lumen_core::{LumenError, Result};
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Installs the global `tracing` subscriber that feeds the pipeline
pub struct TelemetrySystem;

/// Keeps the installed provider reachable for direct logger creation
pub struct TelemetryGuard {
    provider: TelemetryLoggerProvider,
}

impl TelemetryGuard {
    pub fn provider(&self) -> &TelemetryLoggerProvider {
        &self.provider
    }
}

impl TelemetrySystem {
    /// Install a subscriber made of the console diagnostics layer and the
    /// bridge layer that forwards application events to `sink`.
    ///
    /// Fails if a global subscriber is already installed.
    pub fn init(config: LumenConfig, sink: Arc<dyn TelemetrySink>) -> Result<TelemetryGuard> {
        config.validate()?;

        let provider = TelemetryLoggerProvider::from_config(sink, &config);

        Registry::default()
            .with(Self::build_console_layer(&config)?)
            .with(TelemetryLayer::new(provider.clone()))
            .try_init()
            .map_err(|e| LumenError::System {
                message: format!("Failed to initialize tracing subscriber: {}", e),
            })?;

        tracing::info!(
            telemetry.event = "system_initialized",
            telemetry.version = env!("CARGO_PKG_VERSION"),
            "Telemetry system initialized"
        );

        Ok(TelemetryGuard { provider })
    }

    /// Filter for diagnostics output; `RUST_LOG` takes precedence
    pub fn build_env_filter(config: &LumenConfig) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }

        EnvFilter::try_new(&config.diagnostics.level).map_err(|e| LumenError::Config {
            message: format!(
                "Invalid diagnostics level '{}': {}",
                config.diagnostics.level, e
            ),
        })
    }

    /// Console layer for diagnostics, filtered on its own so the bridge
    /// still sees every application event
    pub fn build_console_layer(
        config: &LumenConfig,
    ) -> Result<Option<Box<dyn Layer<Registry> + Send + Sync>>> {
        if !config.enabled || !config.diagnostics.console_enabled {
            return Ok(None);
        }

        let filter = Self::build_env_filter(config)?;
        let layer = match config.diagnostics.format {
            DiagnosticsFormat::Json => fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_target(true)
                .with_filter(filter)
                .boxed(),
            DiagnosticsFormat::Pretty => fmt::layer()
                .pretty()
                .with_target(true)
                .with_filter(filter)
                .boxed(),
            DiagnosticsFormat::Compact => fmt::layer()
                .compact()
                .with_target(false)
                .with_filter(filter)
                .boxed(),
        };

        Ok(Some(layer))
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(
            telemetry.event = "system_shutdown",
            "Telemetry system shutting down"
        );
    }
}
