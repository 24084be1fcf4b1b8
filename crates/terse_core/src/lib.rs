//! Single-turn constrained generation pipeline.
//!
//! Assembles a prompt (optionally with retrieved evidence), drives a
//! token-by-token generation loop against a [`TokenEngine`], and forces
//! the raw output into a single well-formed sentence.
//!
//! The inference engine itself is external: everything behind the
//! [`TokenEngine`] trait (model loading, batched decode execution,
//! sampling) is somebody else's problem. This crate owns the logic in
//! between: evidence resolution, prompt assembly, the decode/stop loop,
//! and the output normalizer.

pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod generate;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod scripted;
pub mod stop;

pub use config::GenerationConfig;
pub use engine::{ChatMessage, DecodeBatch, EngineError, RenderError, Role, Token, TokenEngine};
pub use error::TerseError;
pub use evidence::{EvidenceSource, RowIdList};
pub use generate::{FinishReason, RawGeneration};
pub use pipeline::{run, RunOptions};
pub use scripted::ScriptedEngine;
pub use stop::StopSet;
