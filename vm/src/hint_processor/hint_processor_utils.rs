use std::borrow::Cow;

use num_traits::ToPrimitive;

use crate::{
    serde::deserialize_program::{ApTracking, OffsetValue},
    types::{
        errors::math_errors::MathError,
        instruction::Register,
        relocatable::{MaybeRelocatable, Relocatable},
    },
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
    Felt252,
};

use super::hint_processor_definition::HintReference;

/// Writes `value` into the cell an `ids` reference points at.
pub fn insert_value_from_reference(
    value: impl Into<MaybeRelocatable>,
    vm: &mut VirtualMachine,
    hint_reference: &HintReference,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let var_addr = compute_addr_from_reference(hint_reference, vm, ap_tracking)
        .ok_or(HintError::UnknownIdentifierInternal)?;
    vm.insert_value(var_addr, value).map_err(HintError::Memory)
}

/// Reads the integer behind a reference. Immediate references yield their
/// constant without touching memory.
///
/// The errors returned here are internal; callers map them to variants that
/// name the variable.
pub fn get_integer_from_reference<'a>(
    vm: &'a VirtualMachine,
    hint_reference: &'a HintReference,
    ap_tracking: &ApTracking,
) -> Result<Cow<'a, Felt252>, HintError> {
    if let OffsetValue::Immediate(value) = &hint_reference.offset1 {
        return Ok(Cow::Borrowed(value));
    }
    let var_addr = compute_addr_from_reference(hint_reference, vm, ap_tracking)
        .ok_or(HintError::UnknownIdentifierInternal)?;
    vm.get_integer(var_addr)
        .map_err(|_| HintError::WrongIdentifierTypeInternal(Box::new(var_addr)))
}

/// Reads the pointer behind a reference, or the reference's own address
/// when it is not dereferenced.
pub fn get_ptr_from_reference(
    vm: &VirtualMachine,
    hint_reference: &HintReference,
    ap_tracking: &ApTracking,
) -> Result<Relocatable, HintError> {
    let var_addr = compute_addr_from_reference(hint_reference, vm, ap_tracking)
        .ok_or(HintError::UnknownIdentifierInternal)?;
    if !hint_reference.dereference {
        return Ok(var_addr);
    }
    vm.get_relocatable(var_addr)
        .map_err(|_| HintError::WrongIdentifierTypeInternal(Box::new(var_addr)))
}

pub fn get_maybe_relocatable_from_reference(
    vm: &VirtualMachine,
    hint_reference: &HintReference,
    ap_tracking: &ApTracking,
) -> Option<MaybeRelocatable> {
    if let OffsetValue::Immediate(value) = &hint_reference.offset1 {
        return Some(value.into());
    }
    let var_addr = compute_addr_from_reference(hint_reference, vm, ap_tracking)?;
    if hint_reference.dereference {
        vm.get_maybe(&var_addr)
    } else {
        Some(var_addr.into())
    }
}

/// Resolves `offset1 + offset2` of a reference to an address.
/// `offset1` must be register based; `offset2` is either a constant or
/// an integer read through a register.
pub fn compute_addr_from_reference(
    hint_reference: &HintReference,
    vm: &VirtualMachine,
    hint_ap_tracking: &ApTracking,
) -> Option<Relocatable> {
    if !matches!(hint_reference.offset1, OffsetValue::Reference(..)) {
        return None;
    }
    let base = get_offset_value_reference(
        vm,
        hint_reference,
        hint_ap_tracking,
        &hint_reference.offset1,
    )?
    .get_relocatable()?;

    match &hint_reference.offset2 {
        OffsetValue::Value(value) => (base + *value).ok(),
        OffsetValue::Reference(..) => {
            let value = get_offset_value_reference(
                vm,
                hint_reference,
                hint_ap_tracking,
                &hint_reference.offset2,
            )?;
            (base + value.get_int_ref()?.to_usize()?).ok()
        }
        OffsetValue::Immediate(_) => None,
    }
}

/// Moves `ap` back to where it was when the reference was created. Both
/// trackings must belong to the same group.
fn apply_ap_tracking_correction(
    ap: Relocatable,
    ref_ap_tracking: &ApTracking,
    hint_ap_tracking: &ApTracking,
) -> Option<Relocatable> {
    if ref_ap_tracking.group != hint_ap_tracking.group {
        return None;
    }
    let ap_diff = hint_ap_tracking
        .offset
        .checked_sub(ref_ap_tracking.offset)?;
    (ap - ap_diff).ok()
}

pub fn felt_to_usize(felt: &Felt252) -> Result<usize, MathError> {
    felt.to_usize()
        .ok_or_else(|| MathError::Felt252ToUsizeConversion(Box::new(*felt)))
}

pub fn felt_to_u32(felt: &Felt252) -> Result<u32, MathError> {
    felt.to_u32()
        .ok_or_else(|| MathError::Felt252ToU32Conversion(Box::new(*felt)))
}

fn get_offset_value_reference(
    vm: &VirtualMachine,
    hint_reference: &HintReference,
    hint_ap_tracking: &ApTracking,
    offset_value: &OffsetValue,
) -> Option<MaybeRelocatable> {
    let OffsetValue::Reference(register, offset, deref) = offset_value else {
        return None;
    };

    let base_addr = match register {
        Register::FP => vm.get_fp(),
        Register::AP => apply_ap_tracking_correction(
            vm.get_ap(),
            hint_reference.ap_tracking_data.as_ref()?,
            hint_ap_tracking,
        )?,
    };

    let addr = (base_addr + *offset).ok()?;
    if *deref {
        vm.get_maybe(&addr)
    } else {
        Some(addr.into())
    }
}
