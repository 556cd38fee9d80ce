pub mod config;
pub mod error;
pub mod http;
pub mod property_bag;
pub mod severity;
pub mod state;
pub mod template;

pub use config::LumenConfig;
pub use error::{ExtractionError, FormatError, LumenError, Result, SinkError};
pub use property_bag::PropertyBag;
pub use severity::Severity;
pub use state::{EventError, LogEvent, StateEntry, StateValue, StructuredState};
