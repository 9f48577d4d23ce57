use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Provider-neutral description of a tool the model may call
///
/// Every parameter is a string at the schema level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalToolDescriptor {
    /// Tool name
    pub name: String,
    /// What the tool does
    pub description: String,
    /// Parameter name to one-line description, in declaration order
    pub params: IndexMap<String, String>,
}

impl InternalToolDescriptor {
    /// JSON Schema object for the parameters, all typed as strings and all required
    pub fn parameters_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .params
            .iter()
            .map(|(name, description)| {
                (
                    name.clone(),
                    serde_json::json!({ "type": "string", "description": description }),
                )
            })
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.params.keys().collect::<Vec<_>>(),
        })
    }
}

/// A tool call, in progress or complete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id (synthesized when the provider omits one)
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments parsed so far
    pub raw_params: serde_json::Map<String, serde_json::Value>,
    /// Keys of `raw_params` whose values are complete
    pub done_params: Vec<String>,
    /// Whether the call is final
    pub is_done: bool,
}

impl ToolCall {
    /// Placeholder emitted while the arguments are still streaming
    pub(crate) fn pending(id: &str, name: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            raw_params: serde_json::Map::new(),
            done_params: Vec::new(),
            is_done: false,
        }
    }

    /// Build the completed call from the accumulated argument text
    ///
    /// Returns `None` unless the text parses as a JSON object; an empty
    /// argument string counts as `{}`.
    pub fn from_raw_params(id: &str, name: &str, params: &str) -> Option<Self> {
        let params = if params.trim().is_empty() { "{}" } else { params };
        let serde_json::Value::Object(raw_params) = serde_json::from_str(params).ok()? else {
            return None;
        };

        Some(Self {
            id: id.to_owned(),
            name: name.to_owned(),
            done_params: raw_params.keys().cloned().collect(),
            raw_params,
            is_done: true,
        })
    }
}
