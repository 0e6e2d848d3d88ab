use thiserror::Error;

use crate::utils::PRIME_STR;

/// Failures while loading a compiled program.
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
    #[error("Entrypoint {0} not found")]
    EntrypointNotFound(String),
    #[error("Constant {0} has no value")]
    ConstWithoutValue(String),
    #[error("Expected prime {PRIME_STR}, got {0}")]
    PrimeDiffers(String),
    #[error("Hint PC ({0}) is greater or equal to program length ({1})")]
    InvalidHintPc(usize, usize),
}
