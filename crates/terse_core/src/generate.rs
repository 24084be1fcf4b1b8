//! Incremental generation loop.
//!
//! Drives the engine's decode/sample cycle one token at a time, appending
//! detokenized text to the output buffer and checking the buffer's tail
//! against the stop set after every append. Only the initial prompt
//! decode can fail the run; everything after that is a normal termination
//! path, and the buffer is returned as-is for the normalizer to trim.

use tracing::debug;

use crate::config::GenerationConfig;
use crate::engine::{DecodeBatch, Token, TokenEngine};
use crate::stop::StopSet;
use crate::TerseError;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The engine sampled its end-of-sequence marker.
    EndOfSequence,
    /// The buffer's tail matched a stop fragment.
    StopFragment,
    /// `max_tokens` sampled without another terminal condition.
    MaxTokens,
    /// Detokenization yielded zero bytes; the accumulated text is kept.
    EmptyPiece,
    /// A mid-run decode call failed; the accumulated text is kept.
    DecodeFailed,
}

/// Raw loop output, prior to normalization.
#[derive(Debug)]
pub struct RawGeneration {
    pub text: String,
    pub finish: FinishReason,
    pub tokens_generated: usize,
}

/// Run the decode/sample loop over an already-tokenized prompt.
///
/// The whole prompt is submitted in one decode call with logits requested
/// only for the final position; a failure there aborts the run with no
/// output. Each sampled token is fed back as the next single-token decode
/// step at the running position.
pub fn generate(
    engine: &mut dyn TokenEngine,
    prompt_tokens: &[Token],
    config: &GenerationConfig,
    stops: &StopSet,
) -> Result<RawGeneration, TerseError> {
    let mut batch = DecodeBatch::with_capacity(0, prompt_tokens.len().max(1));
    for (pos, &token) in prompt_tokens.iter().enumerate() {
        batch.append(token, pos as u32);
    }
    batch.request_logits_for_last();

    engine
        .decode(&batch)
        .map_err(|e| TerseError::PromptDecode(e.to_string()))?;

    let mut out = String::with_capacity(config.max_tokens as usize * 6);
    let mut n_cur = prompt_tokens.len() as u32;
    let mut tokens_generated = 0usize;
    let mut finish = FinishReason::MaxTokens;

    for _ in 0..config.max_tokens {
        let token = engine.sample();
        tokens_generated += 1;

        if engine.is_end_of_sequence(token) {
            finish = FinishReason::EndOfSequence;
            break;
        }

        let piece = engine.detokenize(token);
        if piece.is_empty() {
            // Unrecoverable generation fault, but not fatal: keep what we
            // have and let the normalizer deal with it.
            finish = FinishReason::EmptyPiece;
            break;
        }
        out.push_str(&piece);

        if stops.matches_suffix(&out) {
            finish = FinishReason::StopFragment;
            break;
        }

        batch.clear();
        batch.append(token, n_cur);
        batch.request_logits_for_last();
        n_cur += 1;

        if engine.decode(&batch).is_err() {
            finish = FinishReason::DecodeFailed;
            break;
        }
    }

    debug!(
        "generation finished: {:?} after {} tokens, {} bytes",
        finish,
        tokens_generated,
        out.len()
    );

    Ok(RawGeneration {
        text: out,
        finish,
        tokens_generated,
    })
}
