//! Task-decomposition service wire format types

use serde::{Deserialize, Serialize};

/// `POST /decompose` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposeRequest {
    /// Flattened conversation
    pub prompt: String,
    /// Model to plan with
    pub model: String,
}

/// `POST /decompose` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposeResponse {
    /// Ordered subtasks
    #[serde(default)]
    pub tasks: Vec<DivisionTask>,
}

/// A subtask produced by decomposition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DivisionTask {
    /// Task identifier
    pub id: String,
    /// What the task must produce
    pub description: String,
}

/// `POST /generate` request for one subtask
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Flattened conversation
    pub prompt: String,
    /// Model to generate with
    pub model: String,
    /// Subtask to run
    pub task: DivisionTask,
}

/// `POST /generate` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Generated output for the subtask
    #[serde(default)]
    pub output: String,
}
