use std::{collections::HashMap, rc::Rc};

use crate::{
    hint_processor::{
        builtin_hint_processor::{
            blake2s_utils::compute_blake2s,
            dict_hint_utils::{
                default_dict_new, dict_new, dict_read, dict_squash_copy_dict,
                dict_squash_update_ptr, dict_update, dict_write,
            },
            hint_code,
            math_utils::*,
            memcpy_hint_utils::{add_segment, enter_scope, exit_scope, memcpy_enter_scope},
            memset_utils::{memset_enter_scope, memset_step_loop},
            pow_utils::pow,
            print::print_felt,
            segments::{relocate_segment, temporary_array},
            signature::verify_ecdsa_signature,
            squash_dict_utils::{
                squash_dict, squash_dict_inner_assert_len_keys,
                squash_dict_inner_check_access_index, squash_dict_inner_continue_loop,
                squash_dict_inner_first_iteration, squash_dict_inner_len_assert,
                squash_dict_inner_next_key, squash_dict_inner_skip_loop,
                squash_dict_inner_used_accesses_assert,
            },
            uint256_utils::{split_64, uint256_add, uint256_sqrt, uint256_unsigned_div_rem},
        },
        hint_processor_definition::{get_ids_data, HintData, HintProcessorLogic, HintReference},
    },
    serde::deserialize_program::ApTracking,
    types::exec_scope::ExecutionScopes,
    vm::{
        errors::hint_errors::HintError,
        runners::cairo_runner::{ResourceTracker, RunResources},
        vm_core::VirtualMachine,
    },
    Felt252,
};

/// Every hint the builtin processor knows, resolved from its code once
/// when the program is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hint {
    AddSegment,
    TemporaryArray,
    RelocateSegment,
    VmEnterScope,
    VmExitScope,
    MemcpyEnterScope,
    MemcpyContinueCopying,
    MemsetEnterScope,
    MemsetContinueLoop,
    AssertNN,
    AssertNotZero,
    AssertNotEqual,
    IsNN,
    IsNNOutOfRange,
    IsLeFelt,
    IsPositive,
    AssertLtFelt,
    Assert250Bits,
    Is250Bits,
    SplitFelt,
    SplitInt,
    SplitIntAssertRange,
    Sqrt,
    UnsignedDivRem,
    SignedDivRem,
    Pow,
    GetFeltBitLength,
    DictNew,
    DefaultDictNew,
    DictRead,
    DictWrite,
    DictUpdate,
    DictSquashCopyDict,
    DictSquashUpdatePtr,
    SquashDict,
    SquashDictInnerSkipLoop,
    SquashDictInnerFirstIteration,
    SquashDictInnerCheckAccessIndex,
    SquashDictInnerContinueLoop,
    SquashDictInnerAssertLenKeys,
    SquashDictInnerLenAssert,
    SquashDictInnerUsedAccessesAssert,
    SquashDictInnerNextKey,
    Uint256Add,
    Split64,
    Uint256Sqrt,
    Uint256UnsignedDivRem,
    VerifyEcdsaSignature,
    Blake2sCompute,
    PrintFelt,
    /// Code outside the builtin set. It can still run if a hint with this
    /// exact code was registered through `add_hint`.
    Unrecognized(String),
}

impl Hint {
    pub fn from_code(code: &str) -> Hint {
        match code {
            hint_code::ADD_SEGMENT => Hint::AddSegment,
            hint_code::TEMPORARY_ARRAY => Hint::TemporaryArray,
            hint_code::RELOCATE_SEGMENT => Hint::RelocateSegment,
            hint_code::VM_ENTER_SCOPE => Hint::VmEnterScope,
            hint_code::VM_EXIT_SCOPE => Hint::VmExitScope,
            hint_code::MEMCPY_ENTER_SCOPE => Hint::MemcpyEnterScope,
            hint_code::MEMCPY_CONTINUE_COPYING => Hint::MemcpyContinueCopying,
            hint_code::MEMSET_ENTER_SCOPE => Hint::MemsetEnterScope,
            hint_code::MEMSET_CONTINUE_LOOP => Hint::MemsetContinueLoop,
            hint_code::ASSERT_NN => Hint::AssertNN,
            hint_code::ASSERT_NOT_ZERO => Hint::AssertNotZero,
            hint_code::ASSERT_NOT_EQUAL => Hint::AssertNotEqual,
            hint_code::IS_NN => Hint::IsNN,
            hint_code::IS_NN_OUT_OF_RANGE => Hint::IsNNOutOfRange,
            hint_code::IS_LE_FELT => Hint::IsLeFelt,
            hint_code::IS_POSITIVE => Hint::IsPositive,
            hint_code::ASSERT_LT_FELT => Hint::AssertLtFelt,
            hint_code::ASSERT_250_BITS => Hint::Assert250Bits,
            hint_code::IS_250_BITS => Hint::Is250Bits,
            hint_code::SPLIT_FELT => Hint::SplitFelt,
            hint_code::SPLIT_INT => Hint::SplitInt,
            hint_code::SPLIT_INT_ASSERT_RANGE => Hint::SplitIntAssertRange,
            hint_code::SQRT => Hint::Sqrt,
            hint_code::UNSIGNED_DIV_REM => Hint::UnsignedDivRem,
            hint_code::SIGNED_DIV_REM => Hint::SignedDivRem,
            hint_code::POW => Hint::Pow,
            hint_code::GET_FELT_BIT_LENGTH => Hint::GetFeltBitLength,
            hint_code::DICT_NEW => Hint::DictNew,
            hint_code::DEFAULT_DICT_NEW => Hint::DefaultDictNew,
            hint_code::DICT_READ => Hint::DictRead,
            hint_code::DICT_WRITE => Hint::DictWrite,
            hint_code::DICT_UPDATE => Hint::DictUpdate,
            hint_code::DICT_SQUASH_COPY_DICT => Hint::DictSquashCopyDict,
            hint_code::DICT_SQUASH_UPDATE_PTR => Hint::DictSquashUpdatePtr,
            hint_code::SQUASH_DICT => Hint::SquashDict,
            hint_code::SQUASH_DICT_INNER_SKIP_LOOP => Hint::SquashDictInnerSkipLoop,
            hint_code::SQUASH_DICT_INNER_FIRST_ITERATION => Hint::SquashDictInnerFirstIteration,
            hint_code::SQUASH_DICT_INNER_CHECK_ACCESS_INDEX => {
                Hint::SquashDictInnerCheckAccessIndex
            }
            hint_code::SQUASH_DICT_INNER_CONTINUE_LOOP => Hint::SquashDictInnerContinueLoop,
            hint_code::SQUASH_DICT_INNER_ASSERT_LEN_KEYS => Hint::SquashDictInnerAssertLenKeys,
            hint_code::SQUASH_DICT_INNER_LEN_ASSERT => Hint::SquashDictInnerLenAssert,
            hint_code::SQUASH_DICT_INNER_USED_ACCESSES_ASSERT => {
                Hint::SquashDictInnerUsedAccessesAssert
            }
            hint_code::SQUASH_DICT_INNER_NEXT_KEY => Hint::SquashDictInnerNextKey,
            hint_code::UINT256_ADD => Hint::Uint256Add,
            hint_code::SPLIT_64 => Hint::Split64,
            hint_code::UINT256_SQRT => Hint::Uint256Sqrt,
            hint_code::UINT256_UNSIGNED_DIV_REM => Hint::Uint256UnsignedDivRem,
            hint_code::VERIFY_ECDSA_SIGNATURE => Hint::VerifyEcdsaSignature,
            hint_code::BLAKE2S_COMPUTE => Hint::Blake2sCompute,
            hint_code::PRINT_FELT => Hint::PrintFelt,
            code => Hint::Unrecognized(code.to_string()),
        }
    }
}

#[allow(clippy::type_complexity)]
pub struct HintFunc(
    pub  Box<
        dyn Fn(
            &mut VirtualMachine,
            &mut ExecutionScopes,
            &HashMap<String, HintReference>,
            &ApTracking,
            &HashMap<String, Felt252>,
        ) -> Result<(), HintError>,
    >,
);

pub struct BuiltinHintProcessor {
    pub extra_hints: HashMap<String, Rc<HintFunc>>,
    run_resources: RunResources,
}

impl BuiltinHintProcessor {
    pub fn new_empty() -> Self {
        BuiltinHintProcessor {
            extra_hints: HashMap::new(),
            run_resources: RunResources::default(),
        }
    }

    pub fn new(extra_hints: HashMap<String, Rc<HintFunc>>, run_resources: RunResources) -> Self {
        BuiltinHintProcessor {
            extra_hints,
            run_resources,
        }
    }

    /// Registers `hint_func` to run whenever a hint's code is exactly
    /// `hint_code`. Builtin codes keep their builtin behavior.
    pub fn add_hint(&mut self, hint_code: String, hint_func: Rc<HintFunc>) {
        self.extra_hints.insert(hint_code, hint_func);
    }
}

impl HintProcessorLogic for BuiltinHintProcessor {
    fn compile_hint(
        &self,
        hint_code: &str,
        ap_tracking_data: &ApTracking,
        reference_ids: &HashMap<String, usize>,
        references: &[HintReference],
    ) -> Result<HintData, HintError> {
        let ids_data = get_ids_data(reference_ids, references)?;
        let hint_data = HintData::new(hint_code, ids_data, *ap_tracking_data);
        if let Hint::Unrecognized(code) = &hint_data.kind {
            if !self.extra_hints.contains_key(code) {
                return Err(HintError::UnknownHint(code.clone().into_boxed_str()));
            }
        }
        Ok(hint_data)
    }

    fn execute_hint(
        &mut self,
        vm: &mut VirtualMachine,
        exec_scopes: &mut ExecutionScopes,
        hint_data: &HintData,
        constants: &HashMap<String, Felt252>,
    ) -> Result<(), HintError> {
        let ids_data = &hint_data.ids_data;
        let ap_tracking = &hint_data.ap_tracking;
        match &hint_data.kind {
            Hint::AddSegment => add_segment(vm),
            Hint::TemporaryArray => temporary_array(vm, ids_data, ap_tracking),
            Hint::RelocateSegment => relocate_segment(vm, ids_data, ap_tracking),
            Hint::VmEnterScope => enter_scope(exec_scopes),
            Hint::VmExitScope => exit_scope(exec_scopes),
            Hint::MemcpyEnterScope => memcpy_enter_scope(vm, exec_scopes, ids_data, ap_tracking),
            Hint::MemcpyContinueCopying => {
                memset_step_loop(vm, exec_scopes, ids_data, ap_tracking, "continue_copying")
            }
            Hint::MemsetEnterScope => memset_enter_scope(vm, exec_scopes, ids_data, ap_tracking),
            Hint::MemsetContinueLoop => {
                memset_step_loop(vm, exec_scopes, ids_data, ap_tracking, "continue_loop")
            }
            Hint::AssertNN => assert_nn(vm, ids_data, ap_tracking),
            Hint::AssertNotZero => assert_not_zero(vm, ids_data, ap_tracking),
            Hint::AssertNotEqual => assert_not_equal(vm, ids_data, ap_tracking),
            Hint::IsNN => is_nn(vm, ids_data, ap_tracking),
            Hint::IsNNOutOfRange => is_nn_out_of_range(vm, ids_data, ap_tracking),
            Hint::IsLeFelt => is_le_felt(vm, ids_data, ap_tracking),
            Hint::IsPositive => is_positive(vm, ids_data, ap_tracking),
            Hint::AssertLtFelt => assert_lt_felt(vm, ids_data, ap_tracking),
            Hint::Assert250Bits => assert_250_bit(vm, ids_data, ap_tracking, constants),
            Hint::Is250Bits => is_250_bits(vm, ids_data, ap_tracking),
            Hint::SplitFelt => split_felt(vm, ids_data, ap_tracking),
            Hint::SplitInt => split_int(vm, ids_data, ap_tracking),
            Hint::SplitIntAssertRange => split_int_assert_range(vm, ids_data, ap_tracking),
            Hint::Sqrt => sqrt(vm, ids_data, ap_tracking),
            Hint::UnsignedDivRem => unsigned_div_rem(vm, ids_data, ap_tracking),
            Hint::SignedDivRem => signed_div_rem(vm, ids_data, ap_tracking),
            Hint::Pow => pow(vm, ids_data, ap_tracking),
            Hint::GetFeltBitLength => get_felt_bit_length(vm, ids_data, ap_tracking),
            Hint::DictNew => dict_new(vm, exec_scopes),
            Hint::DefaultDictNew => default_dict_new(vm, exec_scopes, ids_data, ap_tracking),
            Hint::DictRead => dict_read(vm, exec_scopes, ids_data, ap_tracking),
            Hint::DictWrite => dict_write(vm, exec_scopes, ids_data, ap_tracking),
            Hint::DictUpdate => dict_update(vm, exec_scopes, ids_data, ap_tracking),
            Hint::DictSquashCopyDict => {
                dict_squash_copy_dict(vm, exec_scopes, ids_data, ap_tracking)
            }
            Hint::DictSquashUpdatePtr => {
                dict_squash_update_ptr(vm, exec_scopes, ids_data, ap_tracking)
            }
            Hint::SquashDict => squash_dict(vm, exec_scopes, ids_data, ap_tracking),
            Hint::SquashDictInnerSkipLoop => {
                squash_dict_inner_skip_loop(vm, exec_scopes, ids_data, ap_tracking)
            }
            Hint::SquashDictInnerFirstIteration => {
                squash_dict_inner_first_iteration(vm, exec_scopes, ids_data, ap_tracking)
            }
            Hint::SquashDictInnerCheckAccessIndex => {
                squash_dict_inner_check_access_index(vm, exec_scopes, ids_data, ap_tracking)
            }
            Hint::SquashDictInnerContinueLoop => {
                squash_dict_inner_continue_loop(vm, exec_scopes, ids_data, ap_tracking)
            }
            Hint::SquashDictInnerAssertLenKeys => squash_dict_inner_assert_len_keys(exec_scopes),
            Hint::SquashDictInnerLenAssert => squash_dict_inner_len_assert(exec_scopes),
            Hint::SquashDictInnerUsedAccessesAssert => {
                squash_dict_inner_used_accesses_assert(vm, exec_scopes, ids_data, ap_tracking)
            }
            Hint::SquashDictInnerNextKey => {
                squash_dict_inner_next_key(vm, exec_scopes, ids_data, ap_tracking)
            }
            Hint::Uint256Add => uint256_add(vm, ids_data, ap_tracking, constants),
            Hint::Split64 => split_64(vm, ids_data, ap_tracking),
            Hint::Uint256Sqrt => uint256_sqrt(vm, ids_data, ap_tracking),
            Hint::Uint256UnsignedDivRem => uint256_unsigned_div_rem(vm, ids_data, ap_tracking),
            Hint::VerifyEcdsaSignature => verify_ecdsa_signature(vm, ids_data, ap_tracking),
            Hint::Blake2sCompute => compute_blake2s(vm, ids_data, ap_tracking),
            Hint::PrintFelt => print_felt(vm, ids_data, ap_tracking),
            Hint::Unrecognized(code) => match self.extra_hints.get(code) {
                Some(hint_func) => hint_func.0(vm, exec_scopes, ids_data, ap_tracking, constants),
                None => Err(HintError::UnknownHint(code.clone().into_boxed_str())),
            },
        }
    }
}

impl ResourceTracker for BuiltinHintProcessor {
    fn consume_step(&mut self) {
        self.run_resources.consume_step();
    }

    fn consumed(&self) -> bool {
        self.run_resources.consumed()
    }

    fn get_n_steps(&self) -> Option<usize> {
        self.run_resources.get_n_steps()
    }

    fn run_resources(&self) -> &RunResources {
        &self.run_resources
    }
}
