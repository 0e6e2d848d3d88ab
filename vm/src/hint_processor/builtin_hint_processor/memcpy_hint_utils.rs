use std::collections::HashMap;

use crate::{
    hint_processor::{
        builtin_hint_processor::hint_utils::{get_integer_from_var_name, insert_value_into_ap},
        hint_processor_definition::HintReference,
    },
    serde::deserialize_program::ApTracking,
    types::exec_scope::{ExecutionScopes, ScopeValue},
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
};

// memory[ap] = segments.add()
pub fn add_segment(vm: &mut VirtualMachine) -> Result<(), HintError> {
    let new_segment_base = vm.add_memory_segment();
    insert_value_into_ap(vm, new_segment_base)
}

// vm_enter_scope()
pub fn enter_scope(exec_scopes: &mut ExecutionScopes) -> Result<(), HintError> {
    exec_scopes.enter_scope(HashMap::new());
    Ok(())
}

// vm_exit_scope()
pub fn exit_scope(exec_scopes: &mut ExecutionScopes) -> Result<(), HintError> {
    exec_scopes.exit_scope().map_err(HintError::FromScopeError)
}

/// Opens a scope holding the loop counter `n`, read from `ids.<var_name>`.
/// Shared by memcpy (`ids.len`) and memset (`ids.n`).
pub fn enter_counter_scope(
    var_name: &str,
    vm: &VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let n = get_integer_from_var_name(var_name, vm, ids_data, ap_tracking)?.into_owned();
    exec_scopes.enter_scope(HashMap::from([(String::from("n"), ScopeValue::Felt(n))]));
    Ok(())
}

// vm_enter_scope({'n': ids.len})
pub fn memcpy_enter_scope(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    enter_counter_scope("len", vm, exec_scopes, ids_data, ap_tracking)
}
