//! Output formatting

use serde_json::{Map, Value};

/// Output builder: a message for humans or an object for `--json`
pub struct Output {
    json_mode: bool,
    compact: bool,
    fields: Map<String, Value>,
    message: Option<String>,
}

impl Output {
    pub fn new(json_mode: bool) -> Self {
        Self {
            json_mode,
            compact: false,
            fields: Map::new(),
            message: None,
        }
    }

    /// Print JSON on a single line, for streamed records
    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }

    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    pub fn field_u64(mut self, key: &str, value: u64) -> Self {
        self.fields.insert(key.to_string(), Value::Number(value.into()));
        self
    }

    /// Stored as a string; JSON numbers cannot carry the full range
    pub fn field_u128(mut self, key: &str, value: u128) -> Self {
        self.fields.insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    pub fn field_bool(mut self, key: &str, value: bool) -> Self {
        self.fields.insert(key.to_string(), Value::Bool(value));
        self
    }

    pub fn message(mut self, msg: &str) -> Self {
        self.message = Some(msg.to_string());
        self
    }

    fn render(self) -> Option<String> {
        if self.json_mode {
            let value = Value::Object(self.fields);
            let text = if self.compact {
                serde_json::to_string(&value)
            } else {
                serde_json::to_string_pretty(&value)
            };
            text.ok()
        } else {
            self.message
        }
    }

    pub fn print(self) {
        if let Some(text) = self.render() {
            println!("{text}");
        }
    }
}
