//! Error types for the generation pipeline.
//!
//! Only fatal conditions live here. Degraded evidence resolution is a
//! warning, and loop-local termination (eos, stop match, decode fault
//! mid-run) is a normal exit path of the generation state machine, never
//! an error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerseError {
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Chat template rendering failed: {0}")]
    Template(String),

    #[error("Tokenization failed: {0}")]
    Tokenize(String),

    #[error("Prompt decode failed: {0}")]
    PromptDecode(String),

    #[error("Invalid identifier list: {0}")]
    IdList(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TerseError {
    /// Process exit code for each fatal condition.
    pub fn code(&self) -> i32 {
        match self {
            TerseError::IdList(_) | TerseError::Config(_) => 2,
            TerseError::EngineUnavailable(_) => 3,
            TerseError::Tokenize(_) => 4,
            TerseError::PromptDecode(_) => 5,
            TerseError::Template(_) => 6,
            TerseError::Io(_) => 7,
        }
    }
}
