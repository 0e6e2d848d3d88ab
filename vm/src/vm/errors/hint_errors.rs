// The `(*.0).0` syntax of thiserror falsely triggers this clippy warning
#![allow(clippy::explicit_auto_deref)]

use thiserror::Error;

use crate::types::{
    errors::math_errors::MathError,
    relocatable::{MaybeRelocatable, Relocatable},
};
use crate::Felt252;

use super::{
    exec_scope_errors::ExecScopeError, memory_errors::MemoryError,
    squash_dict_errors::SquashDictError, vm_errors::VirtualMachineError,
};

/// Failures raised while compiling or executing a hint.
#[derive(Debug, Error)]
pub enum HintError {
    #[error(transparent)]
    FromScopeError(#[from] ExecScopeError),
    #[error(transparent)]
    Internal(#[from] VirtualMachineError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Math(#[from] MathError),
    #[error(transparent)]
    SquashDict(#[from] SquashDictError),
    #[error("Unknown identifier {0}")]
    UnknownIdentifier(Box<str>),
    #[error("Expected ids.{} at address {} to be an Integer value", (*.0).0, (*.0).1)]
    IdentifierNotInteger(Box<(String, Relocatable)>),
    #[error("Expected ids.{} at address {} to be a Relocatable value", (*.0).0, (*.0).1)]
    IdentifierNotRelocatable(Box<(String, Relocatable)>),
    #[error("ids.{} has no member {} or it is of incorrect type", (*.0).0, (*.0).1)]
    IdentifierHasNoMember(Box<(String, String)>),
    #[error("Unknown identifier")]
    UnknownIdentifierInternal,
    #[error("Wrong identifier type at address {0}")]
    WrongIdentifierTypeInternal(Box<Relocatable>),
    #[error("Custom Hint Error: {0}")]
    CustomHint(Box<str>),
    #[error("Missing constant: {0}")]
    MissingConstant(Box<&'static str>),
    #[error("Value: {0} is outside of the range [0, 2**250)")]
    ValueOutside250BitRange(Box<Felt252>),
    #[error("Variable {0} not present in current execution scope")]
    VariableNotInScopeError(Box<str>),
    #[error("Variable {} in the current execution scope is not a {}", (*.0).0, (*.0).1)]
    WrongScopeValueType(Box<(String, &'static str)>),
    #[error("DictManagerError: Tried to create tracker for a dictionary on segment: {0} when there is already a tracker for a dictionary on this segment")]
    CantCreateDictionaryOnTakenSegment(isize),
    #[error("Dict Error: No dict tracker found for segment {0}")]
    NoDictTracker(isize),
    #[error("Dict Error: No value found for key: {0}")]
    NoValueForKey(Box<MaybeRelocatable>),
    #[error("Assertion failed, a = {} % PRIME is not less than b = {} % PRIME", (*.0).0, (*.0).1)]
    AssertLtFelt252(Box<(Felt252, Felt252)>),
    #[error("Dict Error: Tried to create a dict without an initial dict")]
    NoInitialDict,
    #[error("squash_dict_inner fail: couldnt find key {0} in accesses_indices")]
    NoKeyInAccessIndices(Box<Felt252>),
    #[error("squash_dict_inner fail: local current_accessed_indices is empty")]
    EmptyCurrentAccessIndices,
    #[error("squash_dict_inner fail: local current_accessed_indices not empty, loop ended with remaining unaccounted elements")]
    CurrentAccessIndicesNotEmpty,
    #[error("Dict Error: Got the wrong value for dict_update, expected value: {}, got: {} for key: {}", (*.0).0, (*.0).1, (*.0).2)]
    WrongPrevValue(Box<(MaybeRelocatable, MaybeRelocatable, MaybeRelocatable)>),
    #[error("squash_dict_inner fail: Number of used accesses:{} doesnt match the lengh: {} of the access_indices at key: {}", (*.0).0, (*.0).1, (*.0).2)]
    NumUsedAccessesAssertFail(Box<(Felt252, usize, Felt252)>),
    #[error("squash_dict_inner fail: local keys is not empty")]
    KeysNotEmpty,
    #[error("squash_dict_inner fail: No keys left but remaining_accesses > 0")]
    EmptyKeys,
    #[error("squash_dict fail: Accesses array size must be divisible by DictAccess.SIZE")]
    PtrDiffNotDivisibleByDictAccessSize,
    #[error("squash_dict() can only be used with n_accesses<={}. ' \nGot: n_accesses={}", (*.0).0, (*.0).1)]
    SquashDictMaxSizeExceeded(Box<(Felt252, Felt252)>),
    #[error("squash_dict fail: n_accesses: {0} is too big to be converted into an iterator")]
    NAccessesTooBig(Box<Felt252>),
    #[error("Failed to construct a fixed size array of size: {0}")]
    FixedSizeArrayFail(usize),
    #[error("{0}")]
    AssertionFailed(Box<str>),
    #[error("Wrong dict pointer supplied. Got {}, expected {}.", (*.0).0, (*.0).1)]
    MismatchedDictPtr(Box<(Relocatable, Relocatable)>),
    #[error("assert_not_equal failed: {} =  {}", (*.0).0, (*.0).1)]
    AssertNotEqualFail(Box<(MaybeRelocatable, MaybeRelocatable)>),
    #[error("split_int(): value is out of range")]
    SplitIntNotZero,
    #[error("split_int(): Limb {0} is out of range.")]
    SplitIntLimbOutOfRange(Box<Felt252>),
    #[error("Assertion failed, 0 <= ids.a % PRIME < range_check_builtin.bound \n a = {0} is out of range")]
    AssertNNValueOutOfRange(Box<Felt252>),
    #[error("Assertion failed, {} % {} is equal to 0", (*.0).0, (*.0).1)]
    AssertNotZero(Box<(Felt252, String)>),
    #[error("Div out of range: 0 < {} <= {}", (*.0).0, (*.0).1)]
    OutOfValidRange(Box<(Felt252, Felt252)>),
    #[error("Value: {0} is outside valid range")]
    ValueOutsideValidRange(Box<Felt252>),
    #[error("Unknown Hint: {0}")]
    UnknownHint(Box<str>),
    #[error("Signature hint must point to the signature builtin segment, not {0}.")]
    AddSignatureWrongEcdsaPtr(Box<Relocatable>),
    #[error("Signature hint must point to the public key cell, not {0}.")]
    AddSignatureNotAPublicKey(Box<Relocatable>),
}
