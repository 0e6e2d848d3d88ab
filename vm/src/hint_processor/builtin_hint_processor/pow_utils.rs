use std::collections::HashMap;

use crate::{
    hint_processor::{
        builtin_hint_processor::hint_utils::{
            get_integer_member_from_var_name, insert_value_from_var_name,
        },
        hint_processor_definition::HintReference,
    },
    serde::deserialize_program::ApTracking,
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
    Felt252,
};

// Offset of `exp` inside the `LoopLocals` struct of `pow`.
const EXP_MEMBER: usize = 4;

/*
Implements hint:
%{ ids.locs.bit = (ids.prev_locs.exp % PRIME) & 1 %}
*/
pub fn pow(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let prev_locs_exp =
        get_integer_member_from_var_name("prev_locs", EXP_MEMBER, vm, ids_data, ap_tracking)
            .map_err(|err| match err {
                HintError::UnknownIdentifier(name) => HintError::UnknownIdentifier(name),
                _ => HintError::IdentifierHasNoMember(Box::new((
                    "prev_locs".to_string(),
                    "exp".to_string(),
                ))),
            })?;
    let bit = if prev_locs_exp.to_biguint().bit(0) {
        Felt252::ONE
    } else {
        Felt252::ZERO
    };
    insert_value_from_var_name("locs", bit, vm, ids_data, ap_tracking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hint_processor::builtin_hint_processor::hint_code;
    use crate::types::relocatable::{MaybeRelocatable, Relocatable};
    use crate::vm::errors::memory_errors::MemoryError;
    use crate::{relocatable, utils::test_utils::*};
    use assert_matches::assert_matches;

    #[test]
    fn pow_odd_exponent() {
        let mut vm = vm_with_range_check!();
        vm.run_context.fp = relocatable!(1, 12);
        vm.segments = segments![((1, 11), 3)];
        let ids_data = non_continuous_ids_data![("prev_locs", -5), ("locs", 0)];
        assert_matches!(run_hint!(vm, ids_data, hint_code::POW), Ok(()));
        check_memory![vm.segments.memory, ((1, 12), 1)];
    }

    #[test]
    fn pow_even_exponent() {
        let mut vm = vm_with_range_check!();
        vm.run_context.fp = relocatable!(1, 12);
        vm.segments = segments![((1, 11), 10)];
        let ids_data = non_continuous_ids_data![("prev_locs", -5), ("locs", 0)];
        run_hint!(vm, ids_data, hint_code::POW).unwrap();
        check_memory![vm.segments.memory, ((1, 12), 0)];
    }

    #[test]
    fn pow_missing_prev_locs() {
        let mut vm = vm_with_range_check!();
        add_segments!(vm, 2);
        vm.run_context.fp = relocatable!(1, 11);
        let ids_data = ids_data!["locs"];
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::POW),
            Err(HintError::UnknownIdentifier(bx)) if bx.as_ref() == "prev_locs"
        );
    }

    #[test]
    fn pow_exp_not_written() {
        let mut vm = vm_with_range_check!();
        add_segments!(vm, 2);
        vm.run_context.fp = relocatable!(1, 11);
        let ids_data = non_continuous_ids_data![("prev_locs", -5), ("locs", -2)];
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::POW),
            Err(HintError::IdentifierHasNoMember(bx))
                if *bx == ("prev_locs".to_string(), "exp".to_string())
        );
    }

    #[test]
    fn pow_exp_is_pointer() {
        let mut vm = vm_with_range_check!();
        vm.run_context.fp = relocatable!(1, 11);
        vm.segments = segments![((1, 10), (1, 11))];
        let ids_data = non_continuous_ids_data![("prev_locs", -5), ("locs", -2)];
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::POW),
            Err(HintError::IdentifierHasNoMember(_))
        );
    }

    #[test]
    fn pow_locs_already_written() {
        let mut vm = vm_with_range_check!();
        vm.run_context.fp = relocatable!(1, 11);
        vm.segments = segments![((1, 10), 3), ((1, 11), 3)];
        let ids_data = non_continuous_ids_data![("prev_locs", -5), ("locs", 0)];
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::POW),
            Err(HintError::Memory(MemoryError::InconsistentMemory(bx)))
                if *bx == (Relocatable::from((1, 11)),
                    MaybeRelocatable::from(Felt252::from(3)),
                    MaybeRelocatable::from(Felt252::ONE))
        );
    }
}
