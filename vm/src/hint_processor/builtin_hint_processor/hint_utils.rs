use std::{borrow::Cow, collections::HashMap};

use crate::{
    hint_processor::{
        hint_processor_definition::HintReference,
        hint_processor_utils::{
            compute_addr_from_reference, get_integer_from_reference,
            get_maybe_relocatable_from_reference, get_ptr_from_reference,
        },
    },
    serde::deserialize_program::ApTracking,
    types::relocatable::{MaybeRelocatable, Relocatable},
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
    Felt252,
};

fn unknown_identifier(var_name: &str) -> HintError {
    HintError::UnknownIdentifier(var_name.to_string().into_boxed_str())
}

pub fn insert_value_from_var_name(
    var_name: &str,
    value: impl Into<MaybeRelocatable>,
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let var_address = get_relocatable_from_var_name(var_name, vm, ids_data, ap_tracking)?;
    vm.insert_value(var_address, value)
        .map_err(HintError::Memory)
}

pub fn insert_value_into_ap(
    vm: &mut VirtualMachine,
    value: impl Into<MaybeRelocatable>,
) -> Result<(), HintError> {
    vm.insert_value(vm.get_ap(), value)
        .map_err(HintError::Memory)
}

/// The pointer stored in `ids.<var_name>`.
pub fn get_ptr_from_var_name(
    var_name: &str,
    vm: &VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<Relocatable, HintError> {
    let reference = get_reference_from_var_name(var_name, ids_data)?;
    get_ptr_from_reference(vm, reference, ap_tracking).map_err(|err| match err {
        HintError::WrongIdentifierTypeInternal(var_addr) => {
            HintError::IdentifierNotRelocatable(Box::new((var_name.to_string(), *var_addr)))
        }
        _ => unknown_identifier(var_name),
    })
}

/// The address of `ids.<var_name>` itself, as used by `ids.x.address_`.
pub fn get_relocatable_from_var_name(
    var_name: &str,
    vm: &VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<Relocatable, HintError> {
    ids_data
        .get(var_name)
        .and_then(|reference| compute_addr_from_reference(reference, vm, ap_tracking))
        .ok_or_else(|| unknown_identifier(var_name))
}

pub fn get_integer_from_var_name<'a>(
    var_name: &str,
    vm: &'a VirtualMachine,
    ids_data: &'a HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<Cow<'a, Felt252>, HintError> {
    let reference = get_reference_from_var_name(var_name, ids_data)?;
    get_integer_from_reference(vm, reference, ap_tracking).map_err(|err| match err {
        HintError::WrongIdentifierTypeInternal(var_addr) => {
            HintError::IdentifierNotInteger(Box::new((var_name.to_string(), *var_addr)))
        }
        _ => unknown_identifier(var_name),
    })
}

pub fn get_maybe_relocatable_from_var_name(
    var_name: &str,
    vm: &VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<MaybeRelocatable, HintError> {
    let reference = get_reference_from_var_name(var_name, ids_data)?;
    get_maybe_relocatable_from_reference(vm, reference, ap_tracking)
        .ok_or_else(|| unknown_identifier(var_name))
}

/// Reads member `offset` of the struct stored at `ids.<var_name>`.
pub fn get_integer_member_from_var_name(
    var_name: &str,
    offset: usize,
    vm: &VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<Felt252, HintError> {
    let addr = (get_relocatable_from_var_name(var_name, vm, ids_data, ap_tracking)? + offset)?;
    vm.get_integer(addr)
        .map(Cow::into_owned)
        .map_err(|_| HintError::IdentifierNotInteger(Box::new((var_name.to_string(), addr))))
}

pub fn get_reference_from_var_name<'a>(
    var_name: &str,
    ids_data: &'a HashMap<String, HintReference>,
) -> Result<&'a HintReference, HintError> {
    ids_data
        .get(var_name)
        .ok_or_else(|| unknown_identifier(var_name))
}

/// Looks a constant up by the last component of its full path.
pub fn get_constant_from_var_name<'a>(
    var_name: &'static str,
    constants: &'a HashMap<String, Felt252>,
) -> Result<&'a Felt252, HintError> {
    constants
        .iter()
        .find(|(path, _)| path.rsplit('.').next() == Some(var_name))
        .map(|(_, value)| value)
        .ok_or_else(|| HintError::MissingConstant(Box::new(var_name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        relocatable, serde::deserialize_program::OffsetValue, utils::test_utils::*,
        vm::vm_memory::memory::Memory,
    };
    use assert_matches::assert_matches;

    fn vm_at(fp: usize) -> VirtualMachine {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, fp);
        vm
    }

    #[test]
    fn ptr_from_inner_dereference() {
        let mut vm = vm_at(0);
        vm.segments = segments![((1, 0), (0, 0))];
        let mut hint_ref = HintReference::new(0, 0, true, false);
        hint_ref.offset2 = OffsetValue::Value(2);
        let ids_data = HashMap::from([("imm".to_string(), hint_ref)]);

        assert_matches!(
            get_ptr_from_var_name("imm", &vm, &ids_data, &ApTracking::new()),
            Ok(x) if x == relocatable!(0, 2)
        );
    }

    #[test]
    fn maybe_relocatable_from_var_name() {
        let mut vm = vm_at(1);
        vm.segments = segments![((1, 0), (0, 0))];
        let ids_data = ids_data!["value"];

        assert_matches!(
            get_maybe_relocatable_from_var_name("value", &vm, &ids_data, &ApTracking::new()),
            Ok(x) if x == mayberelocatable!(0, 0)
        );
    }

    #[test]
    fn maybe_relocatable_from_missing_cell() {
        let mut vm = vm_at(1);
        vm.segments.memory = Memory::new();
        let ids_data = ids_data!["value"];

        assert_matches!(
            get_maybe_relocatable_from_var_name("value", &vm, &ids_data, &ApTracking::new()),
            Err(HintError::UnknownIdentifier(bx)) if bx.as_ref() == "value"
        );
    }

    #[test]
    fn ptr_from_integer_cell() {
        let mut vm = vm_at(1);
        vm.segments = segments![((1, 0), 0)];
        let ids_data = ids_data!["value"];

        assert_matches!(
            get_ptr_from_var_name("value", &vm, &ids_data, &ApTracking::new()),
            Err(HintError::IdentifierNotRelocatable(bx)) if *bx == ("value".to_string(), (1, 0).into())
        );
    }

    #[test]
    fn relocatable_from_var_name() {
        let vm = vm_at(1);
        let ids_data = ids_data!["value"];

        assert_eq!(
            get_relocatable_from_var_name("value", &vm, &ids_data, &ApTracking::new()).unwrap(),
            relocatable!(1, 0)
        );
    }

    #[test]
    fn relocatable_from_reference_before_segment_start() {
        let vm = vm_at(2);
        let ids_data = HashMap::from([("value".to_string(), HintReference::new_simple(-8))]);

        assert_matches!(
            get_relocatable_from_var_name("value", &vm, &ids_data, &ApTracking::new()),
            Err(HintError::UnknownIdentifier(bx)) if bx.as_ref() == "value"
        );
    }

    #[test]
    fn integer_from_var_name() {
        let mut vm = vm_at(1);
        vm.segments = segments![((1, 0), 1)];
        let ids_data = ids_data!["value"];

        assert_matches!(
            get_integer_from_var_name("value", &vm, &ids_data, &ApTracking::new()),
            Ok(Cow::Borrowed(x)) if x == &Felt252::from(1)
        );
    }

    #[test]
    fn integer_from_pointer_cell() {
        let mut vm = vm_at(1);
        vm.segments = segments![((1, 0), (0, 0))];
        let ids_data = ids_data!["value"];

        assert_matches!(
            get_integer_from_var_name("value", &vm, &ids_data, &ApTracking::new()),
            Err(HintError::IdentifierNotInteger(bx)) if *bx == ("value".to_string(), (1, 0).into())
        );
    }

    #[test]
    fn integer_member() {
        let mut vm = vm_at(1);
        vm.segments = segments![((1, 0), 3), ((1, 1), 4)];
        let ids_data = ids_data!["a"];
        assert_eq!(
            get_integer_member_from_var_name("a", 1, &vm, &ids_data, &ApTracking::new()).unwrap(),
            Felt252::from(4)
        );
    }

    #[test]
    fn insert_into_unknown_variable() {
        let mut vm = vm_at(1);
        assert_matches!(
            insert_value_from_var_name("x", Felt252::ONE, &mut vm, &HashMap::new(), &ApTracking::new()),
            Err(HintError::UnknownIdentifier(bx)) if bx.as_ref() == "x"
        );
    }

    #[test]
    fn constant_by_last_path_component() {
        let constants = HashMap::from([(
            "starkware.cairo.common.uint256.SHIFT".to_string(),
            Felt252::from(7),
        )]);
        assert_eq!(
            get_constant_from_var_name("SHIFT", &constants).unwrap(),
            &Felt252::from(7)
        );
        assert_matches!(
            get_constant_from_var_name("UPPER_BOUND", &constants),
            Err(HintError::MissingConstant(bx)) if *bx == "UPPER_BOUND"
        );
    }
}
