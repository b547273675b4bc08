use serde_json::{Map, Value};

pub type Properties = Map<String, Value>;

/// Receiver of user-facing progress lines and structured events.
pub trait TelemetrySink: Send + Sync {
    fn info(&self, line: &str);
    fn warn(&self, line: &str);
    fn event(&self, name: &str, properties: Properties);
}

/// Forwards everything to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn info(&self, line: &str) {
        tracing::info!(target: "artifetch::progress", "{line}");
    }

    fn warn(&self, line: &str) {
        tracing::warn!(target: "artifetch::progress", "{line}");
    }

    fn event(&self, name: &str, properties: Properties) {
        let properties = Value::Object(properties);
        tracing::info!(target: "artifetch::telemetry", event = name, %properties);
    }
}

/// Turn a `json!({..})` object literal into event properties.
pub(crate) fn properties(value: Value) -> Properties {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
