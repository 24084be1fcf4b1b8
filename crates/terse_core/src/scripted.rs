//! Deterministic scripted engine.
//!
//! Replays a fixed sequence of text pieces, one per sampled token, then
//! signals end-of-sequence. Used by the test suite and by the CLI's
//! replay mode, so the whole pipeline can run without a real model.

use crate::engine::{
    ChatMessage, DecodeBatch, EngineError, RenderError, Token, TokenEngine,
};

const EOS_TOKEN: Token = -1;
/// Script tokens start here so they never collide with prompt tokens.
const PIECE_BASE: Token = 1_000;

/// Engine that replays a piece script.
#[derive(Debug)]
pub struct ScriptedEngine {
    pieces: Vec<String>,
    cursor: usize,
    decode_calls: usize,
    decoded: Vec<DecodeBatch>,
    fail_decode_at: Option<usize>,
    fail_tokenize: bool,
    fail_render: bool,
}

impl ScriptedEngine {
    pub fn new<I, S>(pieces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pieces: pieces.into_iter().map(Into::into).collect(),
            cursor: 0,
            decode_calls: 0,
            decoded: Vec::new(),
            fail_decode_at: None,
            fail_tokenize: false,
            fail_render: false,
        }
    }

    /// Fail the nth decode call (0 = the initial prompt decode).
    pub fn fail_decode_at(mut self, call: usize) -> Self {
        self.fail_decode_at = Some(call);
        self
    }

    pub fn fail_tokenize(mut self) -> Self {
        self.fail_tokenize = true;
        self
    }

    pub fn fail_render(mut self) -> Self {
        self.fail_render = true;
        self
    }

    /// Every batch successfully submitted to `decode`, in call order.
    pub fn decoded_batches(&self) -> &[DecodeBatch] {
        &self.decoded
    }

    fn rendered(messages: &[ChatMessage]) -> String {
        let mut out = String::new();
        for msg in messages {
            out.push_str("<|");
            out.push_str(msg.role.as_str());
            out.push_str("|>\n");
            out.push_str(&msg.content);
            out.push('\n');
        }
        out.push_str("<|assistant|>\n");
        out
    }
}

impl TokenEngine for ScriptedEngine {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>, EngineError> {
        if self.fail_tokenize {
            return Err(EngineError("scripted tokenize failure".to_string()));
        }
        // One token per character is enough structure for the loop: the
        // pipeline only cares about count and positions.
        Ok((0..text.chars().count() as Token).collect())
    }

    fn decode(&mut self, batch: &DecodeBatch) -> Result<(), EngineError> {
        let call = self.decode_calls;
        self.decode_calls += 1;
        if self.fail_decode_at == Some(call) {
            return Err(EngineError(format!("scripted decode failure at call {}", call)));
        }
        self.decoded.push(batch.clone());
        Ok(())
    }

    fn sample(&mut self) -> Token {
        if self.cursor < self.pieces.len() {
            let token = PIECE_BASE + self.cursor as Token;
            self.cursor += 1;
            token
        } else {
            EOS_TOKEN
        }
    }

    fn detokenize(&self, token: Token) -> String {
        let idx = (token - PIECE_BASE) as usize;
        self.pieces.get(idx).cloned().unwrap_or_default()
    }

    fn is_end_of_sequence(&self, token: Token) -> bool {
        token == EOS_TOKEN
    }

    fn render_chat_template(
        &self,
        messages: &[ChatMessage],
        out: &mut [u8],
    ) -> Result<usize, RenderError> {
        if self.fail_render {
            return Err(RenderError::Failed("scripted render failure".to_string()));
        }
        let rendered = Self::rendered(messages);
        let required = rendered.len();
        if out.len() < required {
            return Err(RenderError::BufferTooSmall { required });
        }
        out[..required].copy_from_slice(rendered.as_bytes());
        Ok(required)
    }
}
