//! End-to-end run orchestration.
//!
//! One synchronous call chain per run: resolve evidence, assemble the
//! prompt, render it through the engine's chat template (grow-retry
//! buffer contract), tokenize, drive the generation loop, normalize.

use tracing::{debug, info};

use crate::config::GenerationConfig;
use crate::engine::{ChatMessage, RenderError, TokenEngine};
use crate::evidence::{self, EvidenceSource};
use crate::generate::generate;
use crate::normalize::normalize_answer;
use crate::prompt::build_messages;
use crate::stop::StopSet;
use crate::TerseError;

/// Per-run options beyond the sampling configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: GenerationConfig,
    /// Subject term: names the response template in the format directive
    /// and anchors post-generation salvage.
    pub subject: Option<String>,
    /// Dump the fully rendered prompt to stderr before generation.
    pub debug_prompt: bool,
}

/// Run one generation: question in, single normalized sentence out.
///
/// Fatal errors (template render, tokenization, initial prompt decode)
/// abort with no output; evidence problems degrade to an ungrounded run.
pub fn run(
    engine: &mut dyn TokenEngine,
    question: &str,
    source: Option<&EvidenceSource>,
    opts: &RunOptions,
) -> Result<String, TerseError> {
    let blob = evidence::resolve(source);
    if !blob.is_empty() {
        debug!("resolved {} bytes of evidence", blob.len());
    }

    let messages = build_messages(question, opts.subject.as_deref(), &blob);
    let prompt = render_prompt(engine, &messages)?;

    if opts.debug_prompt {
        eprintln!("\n[DEBUG PROMPT]\n{}\n[/DEBUG PROMPT]", prompt);
    }

    let prompt_tokens = engine
        .tokenize(&prompt)
        .map_err(|e| TerseError::Tokenize(e.to_string()))?;
    info!(
        "prompt: {} bytes, {} tokens",
        prompt.len(),
        prompt_tokens.len()
    );

    let raw = generate(engine, &prompt_tokens, &opts.config, &StopSet::default())?;

    Ok(normalize_answer(
        raw.text,
        &StopSet::markers(),
        opts.subject.as_deref(),
    ))
}

/// Render the message pair into an owned buffer, growing it once to the
/// capacity the renderer reports when the first attempt comes up short.
fn render_prompt(
    engine: &dyn TokenEngine,
    messages: &[ChatMessage],
) -> Result<String, TerseError> {
    let mut buf = vec![0u8; 4 * 1024];

    let written = match engine.render_chat_template(messages, &mut buf) {
        Ok(n) => n,
        Err(RenderError::BufferTooSmall { required }) => {
            buf.resize(required, 0);
            match engine.render_chat_template(messages, &mut buf) {
                Ok(n) => n,
                Err(e) => return Err(TerseError::Template(e.to_string())),
            }
        }
        Err(e) => return Err(TerseError::Template(e.to_string())),
    };

    buf.truncate(written);
    String::from_utf8(buf).map_err(|e| TerseError::Template(format!("non-UTF-8 render: {}", e)))
}
