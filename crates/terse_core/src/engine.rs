//! Inference engine boundary.
//!
//! The pipeline never talks to a model directly; it drives a
//! [`TokenEngine`] handle that is passed explicitly through every call.
//! One handle corresponds to one mutable engine context, so a handle must
//! not be shared across concurrent runs.

use thiserror::Error;

/// Model-internal token identifier.
pub type Token = i32;

/// Message role for chat template rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

/// One message handed to the engine's chat template renderer.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Engine-side failure during tokenize or decode.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct EngineError(pub String);

/// Chat template rendering failure.
///
/// `BufferTooSmall` carries the capacity the renderer actually needs so
/// the caller can grow its buffer and retry.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("render buffer too small, {required} bytes required")]
    BufferTooSmall { required: usize },

    #[error("template rendering failed: {0}")]
    Failed(String),
}

/// A batch of tokens submitted to one decode call.
///
/// The builder keeps tokens, positions, and per-position logits flags in
/// lockstep; callers never index into parallel arrays themselves.
#[derive(Debug, Clone)]
pub struct DecodeBatch {
    tokens: Vec<Token>,
    positions: Vec<u32>,
    logits: Vec<bool>,
    seq_id: u32,
}

impl DecodeBatch {
    pub fn new(seq_id: u32) -> Self {
        Self {
            tokens: Vec::new(),
            positions: Vec::new(),
            logits: Vec::new(),
            seq_id,
        }
    }

    pub fn with_capacity(seq_id: u32, capacity: usize) -> Self {
        Self {
            tokens: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
            logits: Vec::with_capacity(capacity),
            seq_id,
        }
    }

    /// Append one token at the given position. Logits are not requested
    /// for the new position; see [`DecodeBatch::request_logits_for_last`].
    pub fn append(&mut self, token: Token, pos: u32) {
        self.tokens.push(token);
        self.positions.push(pos);
        self.logits.push(false);
    }

    /// Mark the most recently appended position as the one that yields an
    /// output distribution.
    pub fn request_logits_for_last(&mut self) {
        if let Some(flag) = self.logits.last_mut() {
            *flag = true;
        }
    }

    /// Reset for reuse without dropping the allocation.
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.positions.clear();
        self.logits.clear();
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn seq_id(&self) -> u32 {
        self.seq_id
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    pub fn logits(&self) -> &[bool] {
        &self.logits
    }
}

/// Minimum contract the pipeline requires from an inference engine.
///
/// `decode` and `sample` mutate the underlying context, hence `&mut self`:
/// at most one in-flight generation per engine handle.
pub trait TokenEngine {
    /// Convert text to a token sequence.
    fn tokenize(&self, text: &str) -> Result<Vec<Token>, EngineError>;

    /// Submit a batch for decoding. The positions flagged in the batch
    /// yield an output distribution for the next `sample` call.
    fn decode(&mut self, batch: &DecodeBatch) -> Result<(), EngineError>;

    /// Sample one token from the current output distribution.
    fn sample(&mut self) -> Token;

    /// Convert a single token back to its text fragment. May be empty.
    fn detokenize(&self, token: Token) -> String;

    /// Whether the token is the end-of-sequence marker.
    fn is_end_of_sequence(&self, token: Token) -> bool;

    /// Render a system/user message pair through the model's chat
    /// template into `out`, returning the number of bytes written.
    fn render_chat_template(
        &self,
        messages: &[ChatMessage],
        out: &mut [u8],
    ) -> Result<usize, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_append_keeps_arrays_in_lockstep() {
        let mut batch = DecodeBatch::new(0);
        batch.append(10, 0);
        batch.append(11, 1);
        batch.append(12, 2);
        batch.request_logits_for_last();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.tokens(), &[10, 11, 12]);
        assert_eq!(batch.positions(), &[0, 1, 2]);
        assert_eq!(batch.logits(), &[false, false, true]);
    }

    #[test]
    fn batch_clear_keeps_seq_id() {
        let mut batch = DecodeBatch::with_capacity(7, 4);
        batch.append(1, 0);
        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.seq_id(), 7);
    }

    #[test]
    fn logits_request_on_empty_batch_is_a_noop() {
        let mut batch = DecodeBatch::new(0);
        batch.request_logits_for_last();
        assert!(batch.logits().is_empty());
    }
}
