use std::collections::HashMap;

use num_traits::Signed;

use crate::{
    hint_processor::{
        builtin_hint_processor::{
            hint_utils::insert_value_from_var_name, memcpy_hint_utils::enter_counter_scope,
        },
        hint_processor_definition::HintReference,
    },
    math_utils::signed_felt,
    serde::deserialize_program::ApTracking,
    types::exec_scope::ExecutionScopes,
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
    Felt252,
};

// vm_enter_scope({'n': ids.n})
pub fn memset_enter_scope(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    enter_counter_scope("n", vm, exec_scopes, ids_data, ap_tracking)
}

/// Decrements the scope counter `n` and writes whether the loop goes on
/// into `ids.<flag_name>`:
///
/// ```text
/// n -= 1
/// ids.<flag_name> = 1 if n > 0 else 0
/// ```
pub fn memset_step_loop(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
    flag_name: &str,
) -> Result<(), HintError> {
    let new_n = exec_scopes.get_felt("n")? - Felt252::ONE;
    let should_continue = if signed_felt(new_n).is_positive() {
        Felt252::ONE
    } else {
        Felt252::ZERO
    };
    insert_value_from_var_name(flag_name, should_continue, vm, ids_data, ap_tracking)?;
    exec_scopes.insert_value("n", new_n);
    Ok(())
}
