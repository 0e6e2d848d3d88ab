// The `(*.0).0` syntax of thiserror falsely triggers this clippy warning
#![allow(clippy::explicit_auto_deref)]

use thiserror::Error;

use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::Felt252;

/// A dict access log that does not squash into a consistent dict.
#[derive(Debug, PartialEq, Error)]
pub enum SquashDictError {
    #[error("Dict squash failed: key {} was accessed with prev value {} but the previous access left {}", (*.0).0, (*.0).1, (*.0).2)]
    InconsistentPrevValue(Box<(Felt252, MaybeRelocatable, MaybeRelocatable)>),
    #[error("Dict squash failed: accesses array size {0} must be divisible by DictAccess.SIZE")]
    PtrDiffNotDivisibleByDictAccessSize(usize),
    #[error("Dict squash failed: expected integer key at address {0}")]
    KeyNotInteger(Box<Relocatable>),
    #[error("Dict squash failed: missing dict access cell at address {0}")]
    MissingAccessCell(Box<Relocatable>),
    #[error("Dict squash failed: dict end {} is before its start {}", (*.0).0, (*.0).1)]
    InvalidDictRange(Box<(Relocatable, Relocatable)>),
}
