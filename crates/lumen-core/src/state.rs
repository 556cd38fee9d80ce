//! Structured state and log events handed to the enrichment pipeline

use crate::error::FormatError;
use crate::http::{version_string, InboundRequest, OutboundRequest, OutboundResponse};
use crate::severity::Severity;
use crate::template;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Error object attached to a log event, shared so a sink can receive the
/// caller's exact instance
pub type EventError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Produces the human readable message of an event
pub type Formatter =
    Box<dyn FnOnce(&StructuredState, Option<&EventError>) -> Result<String, FormatError> + Send>;

/// Arbitrary serializable value whose JSON form is produced on demand
pub struct ObjectValue {
    serialize: Box<dyn Fn() -> serde_json::Result<String> + Send + Sync>,
}

impl ObjectValue {
    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self {
            serialize: Box::new(move || serde_json::to_string(&value)),
        }
    }

    /// Compact JSON text of the value
    pub fn to_json(&self) -> serde_json::Result<String> {
        (self.serialize)()
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ObjectValue(..)")
    }
}

/// Runtime shape of a structured-state entry
#[derive(Debug)]
pub enum StateValue {
    /// Flat key to value map
    Map(Vec<(String, Option<String>)>),
    /// Single key/value pair
    Pair(String, Option<String>),
    /// Array of key/value pairs
    Pairs(Vec<(String, Option<String>)>),
    OutboundResponse(Box<OutboundResponse>),
    OutboundRequest(Box<OutboundRequest>),
    InboundRequest(Box<InboundRequest>),
    /// Single key with an arbitrary object value
    Object(String, ObjectValue),
    /// Any other value; only its display text is kept, for message templates
    Opaque(String),
}

impl StateValue {
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        StateValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        )
    }

    pub fn pair(key: impl Into<String>, value: impl Into<String>) -> Self {
        StateValue::Pair(key.into(), Some(value.into()))
    }

    pub fn pairs<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        StateValue::Pairs(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        )
    }

    pub fn object<T>(key: impl Into<String>, value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        StateValue::Object(key.into(), ObjectValue::new(value))
    }

    pub fn opaque(value: impl fmt::Display) -> Self {
        StateValue::Opaque(value.to_string())
    }

    /// Short name of the shape, used in diagnostics
    pub fn shape(&self) -> &'static str {
        match self {
            StateValue::Map(_) => "map",
            StateValue::Pair(..) => "pair",
            StateValue::Pairs(_) => "pairs",
            StateValue::OutboundResponse(_) => "outbound_response",
            StateValue::OutboundRequest(_) => "outbound_request",
            StateValue::InboundRequest(_) => "inbound_request",
            StateValue::Object(..) => "object",
            StateValue::Opaque(_) => "opaque",
        }
    }

    /// Text substituted for this value in a message template
    pub fn display_text(&self) -> String {
        fn join(entries: &[(String, Option<String>)]) -> String {
            let items: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("[{}, {}]", k, v.as_deref().unwrap_or("")))
                .collect();
            items.join(", ")
        }

        match self {
            StateValue::Map(entries) | StateValue::Pairs(entries) => join(entries),
            StateValue::Pair(k, v) => format!("[{}, {}]", k, v.as_deref().unwrap_or("")),
            StateValue::OutboundResponse(response) => format!(
                "HTTP/{} {}",
                version_string(response.version),
                response.status.as_u16()
            ),
            StateValue::OutboundRequest(request) => format!("{} {}", request.method, request.uri),
            StateValue::InboundRequest(request) => {
                format!("{} {}", request.method, request.display_uri())
            }
            StateValue::Object(k, v) => match v.to_json() {
                Ok(json) => format!("[{}, {}]", k, json),
                Err(_) => format!("[{}, ?]", k),
            },
            StateValue::Opaque(text) => text.clone(),
        }
    }
}

impl From<OutboundResponse> for StateValue {
    fn from(response: OutboundResponse) -> Self {
        StateValue::OutboundResponse(Box::new(response))
    }
}

impl From<OutboundRequest> for StateValue {
    fn from(request: OutboundRequest) -> Self {
        StateValue::OutboundRequest(Box::new(request))
    }
}

impl From<InboundRequest> for StateValue {
    fn from(request: InboundRequest) -> Self {
        StateValue::InboundRequest(Box::new(request))
    }
}

/// Named entry of the structured state
#[derive(Debug)]
pub struct StateEntry {
    pub name: String,
    pub value: StateValue,
}

impl StateEntry {
    pub fn new(name: impl Into<String>, value: impl Into<StateValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered structured data attached to a log call beyond its message
#[derive(Debug, Default)]
pub struct StructuredState {
    entries: Vec<StateEntry>,
}

impl StructuredState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<StateValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<StateValue>) {
        self.entries.push(StateEntry::new(name, value));
    }

    pub fn get(&self, name: &str) -> Option<&StateValue> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StateEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, StateEntry> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<StateEntry>> for StructuredState {
    fn from(entries: Vec<StateEntry>) -> Self {
        Self { entries }
    }
}

impl FromIterator<StateEntry> for StructuredState {
    fn from_iter<I: IntoIterator<Item = StateEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A single log call, owned by one pipeline invocation
pub struct LogEvent {
    pub severity: Severity,
    pub category: String,
    /// `None` when the caller's payload is not structured state
    pub state: Option<StructuredState>,
    pub error: Option<EventError>,
    pub formatter: Formatter,
}

impl LogEvent {
    /// Event whose message is rendered by `formatter`
    pub fn new<F>(severity: Severity, category: impl Into<String>, formatter: F) -> Self
    where
        F: FnOnce(&StructuredState, Option<&EventError>) -> Result<String, FormatError>
            + Send
            + 'static,
    {
        Self {
            severity,
            category: category.into(),
            state: Some(StructuredState::new()),
            error: None,
            formatter: Box::new(formatter),
        }
    }

    /// Event with a fixed message
    pub fn message(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self::new(severity, category, move |_, _| Ok(message))
    }

    /// Event whose message is a `{Name}` template filled from the state
    pub fn template(
        severity: Severity,
        category: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        let text = template.into();
        Self::new(severity, category, move |state, _| template::render(&text, state))
    }

    pub fn with_state(mut self, state: StructuredState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_entry(mut self, name: impl Into<String>, value: impl Into<StateValue>) -> Self {
        self.state
            .get_or_insert_with(StructuredState::new)
            .push(name, value);
        self
    }

    /// Mark the payload as not being structured state
    pub fn without_state(mut self) -> Self {
        self.state = None;
        self
    }

    pub fn with_error<E>(mut self, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(error));
        self
    }

    pub fn with_shared_error(mut self, error: EventError) -> Self {
        self.error = Some(error);
        self
    }
}

impl fmt::Debug for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogEvent")
            .field("severity", &self.severity)
            .field("category", &self.category)
            .field("state", &self.state)
            .field("error", &self.error.as_ref().map(|e| e.to_string()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Order {
        id: u32,
        total: f64,
    }

    #[test]
    fn test_object_value_serializes_lazily() {
        let value = ObjectValue::new(Order { id: 7, total: 9.5 });
        assert_eq!(value.to_json().unwrap(), r#"{"id":7,"total":9.5}"#);
    }

    #[test]
    fn test_state_builder_preserves_order() {
        let state = StructuredState::new()
            .with("First", StateValue::pair("a", "1"))
            .with("Second", StateValue::opaque(42));

        let names: Vec<&str> = state.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert_eq!(state.get("Second").map(StateValue::shape), Some("opaque"));
    }

    #[test]
    fn test_display_text() {
        assert_eq!(StateValue::pair("UserId", "abc").display_text(), "[UserId, abc]");
        assert_eq!(StateValue::opaque("plain").display_text(), "plain");
        assert_eq!(
            StateValue::object("order", Order { id: 1, total: 2.0 }).display_text(),
            r#"[order, {"id":1,"total":2.0}]"#
        );
    }

    #[test]
    fn test_fixed_message_event() {
        let event = LogEvent::message(Severity::Warning, "Orders", "low stock");
        let message = (event.formatter)(&StructuredState::new(), None).unwrap();
        assert_eq!(message, "low stock");
        assert!(event.state.is_some());
    }
}
