use std::collections::HashMap;

use crate::hint_processor::builtin_hint_processor::hint_utils::get_integer_from_var_name;
use crate::hint_processor::hint_processor_definition::HintReference;
use crate::serde::deserialize_program::ApTracking;
use crate::vm::errors::hint_errors::HintError;
use crate::vm::vm_core::VirtualMachine;

// Implements hint: print(ids.x)
pub fn print_felt(
    vm: &VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let val = get_integer_from_var_name("x", vm, ids_data, ap_tracking)?;
    println!("{val}");
    Ok(())
}
