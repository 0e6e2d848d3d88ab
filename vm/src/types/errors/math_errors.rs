// The `(*.0).0` syntax of thiserror falsely triggers this clippy warning
#![allow(clippy::explicit_auto_deref)]

use num_bigint::{BigInt, BigUint};
use thiserror::Error;

use crate::types::relocatable::Relocatable;
use crate::Felt252;

#[derive(Debug, Error, PartialEq)]
pub enum MathError {
    // Math functions
    #[error("{} is not divisible by {}", (*.0).0, (*.0).1)]
    SafeDivFail(Box<(Felt252, Felt252)>),
    #[error("{} is not divisible by {}", (*.0).0, (*.0).1)]
    SafeDivFailBigInt(Box<(BigInt, BigInt)>),
    #[error("{} is not divisible by {}", (*.0).0, (*.0).1)]
    SafeDivFailUsize(Box<(usize, usize)>),
    #[error("Attempted to divide by zero")]
    DividedByZero,
    #[error("Failed to calculate the square root of: {0})")]
    FailedToGetSqrt(Box<BigUint>),
    // Relocatable Operations
    #[error("Cant convert felt: {0} to Relocatable")]
    Felt252ToRelocatable(Box<Felt252>),
    #[error("Operation failed: {} - {}, offsets cant be negative", (*.0).0, (*.0).1)]
    RelocatableSubFelt252NegOffset(Box<(Relocatable, Felt252)>),
    #[error("Operation failed: {} - {}, offsets cant be negative", (*.0).0, (*.0).1)]
    RelocatableSubUsizeNegOffset(Box<(Relocatable, usize)>),
    #[error("Operation failed: {} + {}, maximum offset value exceeded", (*.0).0, (*.0).1)]
    RelocatableAddFelt252OffsetExceeded(Box<(Relocatable, Felt252)>),
    #[error("Operation failed: {} + {}, maximum offset value exceeded", (*.0).0, (*.0).1)]
    RelocatableAddUsizeOffsetExceeded(Box<(Relocatable, usize)>),
    #[error("Operation failed: {} + {}, can't add two relocatable values", (*.0).0, (*.0).1)]
    RelocatableAdd(Box<(Relocatable, Relocatable)>),
    #[error("Operation failed: {} - {}, can't subtract two relocatable values with different segment indexes", (*.0).0, (*.0).1)]
    RelocatableSubDiffIndex(Box<(Relocatable, Relocatable)>),
    #[error("Operation failed {} - {}, can't subtract a relocatable value from an integer", (*.0).0, (*.0).1)]
    SubRelocatableFromInt(Box<(Felt252, Relocatable)>),
    // Type conversions
    #[error("Conversion to u32 failed for Felt252 {0}")]
    Felt252ToU32Conversion(Box<Felt252>),
    #[error("Conversion to usize failed for Felt252 {0}")]
    Felt252ToUsizeConversion(Box<Felt252>),
}
