use std::{borrow::Cow, collections::HashMap};

use crate::{
    hint_processor::{
        builtin_hint_processor::{blake2s_hash::blake2s_compress, hint_utils::get_ptr_from_var_name},
        hint_processor_definition::HintReference,
        hint_processor_utils::felt_to_u32,
    },
    serde::deserialize_program::ApTracking,
    types::relocatable::{MaybeRelocatable, Relocatable},
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
    Felt252,
};

// Layout of one blake2s instance: h[8], message[16], t, f, output[8].
const STATE_WORDS: usize = 8;
const MESSAGE_WORDS: usize = 16;
const OUTPUT_OFFSET: usize = STATE_WORDS + MESSAGE_WORDS + 2;

fn get_fixed_size_u32_array<const T: usize>(
    range: &[Cow<Felt252>],
) -> Result<[u32; T], HintError> {
    let words = range
        .iter()
        .map(|num| felt_to_u32(num))
        .collect::<Result<Vec<u32>, _>>()?;
    words
        .try_into()
        .map_err(|_| HintError::FixedSizeArrayFail(T))
}

/*Runs the blake2s compression over the instance that ends at `output_ptr`.
`output_ptr` must point right after h, message, t and f, all of which are already
written; the new state is written at `output_ptr`.*/
fn compute_blake2s_func(vm: &mut VirtualMachine, output_ptr: Relocatable) -> Result<(), HintError> {
    let instance_start = (output_ptr - OUTPUT_OFFSET)?;
    let h = get_fixed_size_u32_array::<STATE_WORDS>(
        &vm.get_integer_range(instance_start, STATE_WORDS)?,
    )?;
    let message = get_fixed_size_u32_array::<MESSAGE_WORDS>(
        &vm.get_integer_range((instance_start + STATE_WORDS)?, MESSAGE_WORDS)?,
    )?;
    let t = felt_to_u32(vm.get_integer((output_ptr - 2)?)?.as_ref())?;
    let f = felt_to_u32(vm.get_integer((output_ptr - 1)?)?.as_ref())?;

    let new_state: Vec<MaybeRelocatable> = blake2s_compress(&h, &message, t, 0, f, 0)
        .iter()
        .map(|word| MaybeRelocatable::from(Felt252::from(*word)))
        .collect();
    vm.load_data(output_ptr, &new_state)
        .map_err(HintError::Memory)?;
    Ok(())
}

/* Implements hint:
   from starkware.cairo.common.cairo_blake2s.blake2s_utils import compute_blake2s_func
   compute_blake2s_func(segments=segments, output_ptr=ids.output)
*/
pub fn compute_blake2s(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let output = get_ptr_from_var_name("output", vm, ids_data, ap_tracking)?;
    compute_blake2s_func(vm, output)
}
