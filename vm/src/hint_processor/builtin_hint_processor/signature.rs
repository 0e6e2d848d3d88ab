use std::collections::HashMap;

use crate::{
    hint_processor::{
        builtin_hint_processor::hint_utils::{get_integer_from_var_name, get_ptr_from_var_name},
        hint_processor_definition::HintReference,
    },
    serde::deserialize_program::ApTracking,
    types::instance_definitions::CELLS_PER_SIGNATURE,
    vm::{
        errors::hint_errors::HintError, runners::builtin_runner::BuiltinRunnerCapabilities,
        vm_core::VirtualMachine,
    },
};

/*
Implements hint:
%{ ecdsa_builtin.add_signature(ids.ecdsa_ptr.address_, (ids.signature_r, ids.signature_s)) %}
*/
pub fn verify_ecdsa_signature(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let signature_r =
        get_integer_from_var_name("signature_r", vm, ids_data, ap_tracking)?.into_owned();
    let signature_s =
        get_integer_from_var_name("signature_s", vm, ids_data, ap_tracking)?.into_owned();
    let ecdsa_ptr = get_ptr_from_var_name("ecdsa_ptr", vm, ids_data, ap_tracking)?;
    let ecdsa_builtin = vm.get_signature_builtin()?;
    if ecdsa_ptr.segment_index != ecdsa_builtin.base() as isize {
        return Err(HintError::AddSignatureWrongEcdsaPtr(Box::new(ecdsa_ptr)));
    }
    if ecdsa_ptr.offset % CELLS_PER_SIGNATURE as usize != 0 {
        return Err(HintError::AddSignatureNotAPublicKey(Box::new(ecdsa_ptr)));
    }
    ecdsa_builtin.add_signature(ecdsa_ptr, (signature_r, signature_s));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hint_processor::builtin_hint_processor::hint_code::VERIFY_ECDSA_SIGNATURE;
    use crate::vm::errors::vm_errors::VirtualMachineError;
    use crate::vm::runners::builtin_runner::SignatureBuiltinRunner;
    use crate::{relocatable, utils::test_utils::*, Felt252};
    use assert_matches::assert_matches;

    // ids: ecdsa_ptr, signature_r, signature_s
    fn vm_with_signature_ids(segment: isize, offset: usize) -> VirtualMachine {
        let mut vm = vm!();
        vm.builtin_runners = vec![SignatureBuiltinRunner::new(Some(512), true).into()];
        vm.run_context.fp = relocatable!(1, 3);
        vm.segments = segments![((1, 0), (segment, offset)), ((1, 1), 11), ((1, 2), 12)];
        vm
    }

    #[test]
    fn registers_signature() {
        let mut vm = vm_with_signature_ids(0, 2);
        let ids_data = ids_data!["ecdsa_ptr", "signature_r", "signature_s"];
        assert_matches!(run_hint!(vm, ids_data, VERIFY_ECDSA_SIGNATURE), Ok(()));
        assert_eq!(
            vm.get_signature_builtin().unwrap().signatures(),
            HashMap::from([(relocatable!(0, 2), (Felt252::from(11), Felt252::from(12)))])
        );
    }

    #[test]
    fn pointer_outside_builtin_segment() {
        let mut vm = vm_with_signature_ids(1, 0);
        let ids_data = ids_data!["ecdsa_ptr", "signature_r", "signature_s"];
        assert_matches!(
            run_hint!(vm, ids_data, VERIFY_ECDSA_SIGNATURE),
            Err(HintError::AddSignatureWrongEcdsaPtr(bx)) if *bx == relocatable!(1, 0)
        );
    }

    #[test]
    fn pointer_at_message_cell() {
        let mut vm = vm_with_signature_ids(0, 3);
        let ids_data = ids_data!["ecdsa_ptr", "signature_r", "signature_s"];
        assert_matches!(
            run_hint!(vm, ids_data, VERIFY_ECDSA_SIGNATURE),
            Err(HintError::AddSignatureNotAPublicKey(bx)) if *bx == relocatable!(0, 3)
        );
    }

    #[test]
    fn no_signature_builtin() {
        let mut vm = vm_with_signature_ids(0, 0);
        vm.builtin_runners.clear();
        let ids_data = ids_data!["ecdsa_ptr", "signature_r", "signature_s"];
        assert_matches!(
            run_hint!(vm, ids_data, VERIFY_ECDSA_SIGNATURE),
            Err(HintError::Internal(VirtualMachineError::NoSignatureBuiltin))
        );
    }
}
