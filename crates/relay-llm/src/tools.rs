//! Tools offered to the model for the current interaction mode

use indexmap::IndexMap;
use relay_config::{ChatMode, ToolConfig};

use crate::types::InternalToolDescriptor;

/// Source of the tools enabled for a turn
pub trait ToolCatalog: Send + Sync {
    /// Tools enabled in `mode`, keyed by name
    ///
    /// `external` tools (from outside the catalog) are only offered in agent mode.
    fn available_tools(
        &self,
        mode: ChatMode,
        external: &[InternalToolDescriptor],
    ) -> IndexMap<String, InternalToolDescriptor>;
}

/// Catalog backed by the `[[tools]]` configuration table
#[derive(Debug, Clone, Default)]
pub struct ConfigToolCatalog {
    tools: Vec<ToolConfig>,
}

impl ConfigToolCatalog {
    pub fn new(tools: &[ToolConfig]) -> Self {
        Self { tools: tools.to_vec() }
    }
}

impl ToolCatalog for ConfigToolCatalog {
    fn available_tools(
        &self,
        mode: ChatMode,
        external: &[InternalToolDescriptor],
    ) -> IndexMap<String, InternalToolDescriptor> {
        if mode == ChatMode::Normal {
            return IndexMap::new();
        }

        let mut tools: IndexMap<String, InternalToolDescriptor> = self
            .tools
            .iter()
            .filter(|tool| tool.modes.contains(&mode))
            .map(|tool| {
                (
                    tool.name.clone(),
                    InternalToolDescriptor {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        params: tool.params.clone(),
                    },
                )
            })
            .collect();

        if mode == ChatMode::Agent {
            for tool in external {
                // Configured tools keep their slot when names collide
                tools.entry(tool.name.clone()).or_insert_with(|| tool.clone());
            }
        }

        tools
    }
}
