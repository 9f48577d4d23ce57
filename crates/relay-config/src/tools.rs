use indexmap::IndexMap;
use serde::Deserialize;
use strum::{Display, EnumString};

/// Interaction mode of the chat surface, which gates the enabled tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatMode {
    /// Plain chat, no tools
    #[default]
    Normal,
    /// Read-only tools
    Gather,
    /// All tools
    Agent,
}

/// A tool exposed to the model, as declared in configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    /// Tool name as the model must spell it
    pub name: String,
    /// Human description
    pub description: String,
    /// Modes in which the tool is enabled
    #[serde(default = "default_modes")]
    pub modes: Vec<ChatMode>,
    /// Parameter name to one-line description, in declaration order
    #[serde(default)]
    pub params: IndexMap<String, String>,
}

fn default_modes() -> Vec<ChatMode> {
    vec![ChatMode::Agent]
}
