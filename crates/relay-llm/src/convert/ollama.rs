//! Conversion for Ollama's native fill-in-middle endpoint

use super::openai::FIM_MAX_TOKENS;
use super::{Step, StreamDecoder};
use crate::accumulator::Accumulator;
use crate::error::LlmError;
use crate::protocol::ollama::{OllamaGenerateChunk, OllamaGenerateRequest, OllamaOptions};
use crate::types::{FimRequest, FinalMessage};

/// Build the streaming `/api/generate` request
pub fn build_fim_request(model: &str, request: &FimRequest) -> OllamaGenerateRequest {
    OllamaGenerateRequest {
        model: model.to_owned(),
        prompt: request.prefix.clone(),
        suffix: request.suffix.clone(),
        stream: true,
        options: OllamaOptions {
            stop: request.stop.clone(),
            num_predict: FIM_MAX_TOKENS,
        },
    }
}

/// Decoder for `/api/generate` NDJSON lines
#[derive(Debug, Default)]
pub struct OllamaFimDecoder;

impl StreamDecoder for OllamaFimDecoder {
    type Chunk = OllamaGenerateChunk;

    fn decode(&mut self, chunk: OllamaGenerateChunk, acc: &mut Accumulator) -> Result<Step, LlmError> {
        if let Some(error) = chunk.error {
            return Err(LlmError::Transport {
                message: error,
                source: None,
            });
        }

        acc.text.push_str(&chunk.response);
        if chunk.done {
            return Ok(Step::Finished);
        }
        Ok(if chunk.response.is_empty() { Step::Unchanged } else { Step::Changed })
    }

    /// An empty completion is a valid answer at the cursor
    fn finish(self, acc: Accumulator) -> Result<FinalMessage, LlmError> {
        Ok(FinalMessage::text(acc.text))
    }
}
