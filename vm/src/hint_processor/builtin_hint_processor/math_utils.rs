use std::collections::HashMap;

use lazy_static::lazy_static;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed};
use starknet_types_core::felt::NonZeroFelt;

use crate::{
    hint_processor::{
        builtin_hint_processor::hint_utils::{
            get_constant_from_var_name, get_integer_from_var_name,
            get_maybe_relocatable_from_var_name, get_ptr_from_var_name,
            insert_value_from_var_name, insert_value_into_ap,
        },
        hint_processor_definition::HintReference,
    },
    math_utils::{felt_from_bigint, isqrt, pow2_const, signed_felt},
    serde::deserialize_program::ApTracking,
    types::{errors::math_errors::MathError, relocatable::MaybeRelocatable},
    utils::{CAIRO_PRIME, PRIME_STR},
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
    Felt252,
};

lazy_static! {
    /// `range_check_builtin.bound` as hints see it: the first value a
    /// range-check cell rejects.
    static ref RC_BOUND: Felt252 = pow2_const(128);
    /// `PRIME // range_check_builtin.bound`, the largest divisor the div/rem
    /// hints accept.
    static ref MAX_DIV: Felt252 = Felt252::from(&*CAIRO_PRIME >> 128_u32);
    static ref LOW_128_MASK: BigUint = (BigUint::one() << 128_u32) - 1_u32;
}

fn flag(condition: bool) -> Felt252 {
    if condition {
        Felt252::ONE
    } else {
        Felt252::ZERO
    }
}

/// The range check builtin must be part of the run for the bound-based
/// hints to apply.
fn range_check_bound(vm: &VirtualMachine) -> Result<Felt252, HintError> {
    vm.get_range_check_builtin()?;
    Ok(*RC_BOUND)
}

// memory[ap] = 0 if 0 <= (ids.a % PRIME) < range_check_builtin.bound else 1
pub fn is_nn(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let a = get_integer_from_var_name("a", vm, ids_data, ap_tracking)?.into_owned();
    let bound = range_check_bound(vm)?;
    insert_value_into_ap(vm, flag(a >= bound))
}

// memory[ap] = 0 if 0 <= ((-ids.a - 1) % PRIME) < range_check_builtin.bound else 1
pub fn is_nn_out_of_range(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let a = get_integer_from_var_name("a", vm, ids_data, ap_tracking)?.into_owned();
    let bound = range_check_bound(vm)?;
    let negated = Felt252::ZERO - (a + Felt252::ONE);
    insert_value_into_ap(vm, flag(negated >= bound))
}

// memory[ap] = 0 if (ids.a % PRIME) <= (ids.b % PRIME) else 1
pub fn is_le_felt(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let a = get_integer_from_var_name("a", vm, ids_data, ap_tracking)?.into_owned();
    let b = get_integer_from_var_name("b", vm, ids_data, ap_tracking)?.into_owned();
    insert_value_into_ap(vm, flag(a > b))
}

/// Fails when `ids.a` and `ids.b` are equal. Both must be integers, or
/// pointers into the same segment.
pub fn assert_not_equal(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let a = get_maybe_relocatable_from_var_name("a", vm, ids_data, ap_tracking)?;
    let b = get_maybe_relocatable_from_var_name("b", vm, ids_data, ap_tracking)?;
    let comparable = match (&a, &b) {
        (MaybeRelocatable::Int(_), MaybeRelocatable::Int(_)) => true,
        (MaybeRelocatable::RelocatableValue(x), MaybeRelocatable::RelocatableValue(y)) => {
            x.segment_index == y.segment_index
        }
        _ => false,
    };
    if !comparable {
        return Err(HintError::AssertionFailed(
            format!("assert_not_equal failed: non-comparable values: {a}, {b}.").into_boxed_str(),
        ));
    }
    if a == b {
        return Err(HintError::AssertNotEqualFail(Box::new((a, b))));
    }
    Ok(())
}

// assert 0 <= ids.a % PRIME < range_check_builtin.bound, f'a = {ids.a} is out of range.'
pub fn assert_nn(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let a = get_integer_from_var_name("a", vm, ids_data, ap_tracking)?.into_owned();
    if a >= range_check_bound(vm)? {
        return Err(HintError::AssertNNValueOutOfRange(Box::new(a)));
    }
    Ok(())
}

// assert ids.value % PRIME != 0, f'assert_not_zero failed: {ids.value} = 0.'
pub fn assert_not_zero(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let value = get_integer_from_var_name("value", vm, ids_data, ap_tracking)?;
    if value.as_ref() == &Felt252::ZERO {
        return Err(HintError::AssertNotZero(Box::new((
            value.into_owned(),
            PRIME_STR.to_string(),
        ))));
    }
    Ok(())
}

// assert ids.value == 0, 'split_int(): value is out of range.'
pub fn split_int_assert_range(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let value = get_integer_from_var_name("value", vm, ids_data, ap_tracking)?;
    if value.as_ref() != &Felt252::ZERO {
        return Err(HintError::SplitIntNotZero);
    }
    Ok(())
}

/// Writes the next limb of `ids.value` in base `ids.base` to
/// `memory[ids.output]`. The limb must be below `ids.bound`.
pub fn split_int(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let value = get_integer_from_var_name("value", vm, ids_data, ap_tracking)?.into_owned();
    let base = get_integer_from_var_name("base", vm, ids_data, ap_tracking)?.into_owned();
    let bound = get_integer_from_var_name("bound", vm, ids_data, ap_tracking)?.into_owned();
    let output = get_ptr_from_var_name("output", vm, ids_data, ap_tracking)?;

    let base = NonZeroFelt::try_from(base).map_err(|_| MathError::DividedByZero)?;
    let (_, res) = value.div_rem(&base);
    if res >= bound {
        return Err(HintError::SplitIntLimbOutOfRange(Box::new(res)));
    }
    vm.insert_value(output, res).map_err(HintError::Memory)
}

/// `ids.is_positive = 1` when `ids.value`, read as a signed integer, is
/// strictly positive. Its absolute value must fit the range check bound.
pub fn is_positive(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let value = get_integer_from_var_name("value", vm, ids_data, ap_tracking)?.into_owned();
    let bound = range_check_bound(vm)?;
    let signed = signed_felt(value);
    if signed.magnitude() >= &bound.to_biguint() {
        return Err(HintError::ValueOutsideValidRange(Box::new(value)));
    }
    insert_value_from_var_name(
        "is_positive",
        flag(signed.is_positive()),
        vm,
        ids_data,
        ap_tracking,
    )
}

// ids.low = ids.value & ((1 << 128) - 1)
// ids.high = ids.value >> 128
pub fn split_felt(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let value = get_integer_from_var_name("value", vm, ids_data, ap_tracking)?.to_biguint();
    let low = Felt252::from(&value & &*LOW_128_MASK);
    let high = Felt252::from(value >> 128_u32);
    insert_value_from_var_name("high", high, vm, ids_data, ap_tracking)?;
    insert_value_from_var_name("low", low, vm, ids_data, ap_tracking)
}

// ids.root = isqrt(ids.value % PRIME), for values below 2**250
pub fn sqrt(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let value = get_integer_from_var_name("value", vm, ids_data, ap_tracking)?.into_owned();
    if value.bits() > 250 {
        return Err(HintError::ValueOutside250BitRange(Box::new(value)));
    }
    let root = isqrt(&value.to_biguint())?;
    insert_value_from_var_name("root", Felt252::from(root), vm, ids_data, ap_tracking)
}

/// Checks `0 < div <= PRIME // range_check_builtin.bound`.
fn valid_divisor(vm: &VirtualMachine, div: Felt252) -> Result<NonZeroFelt, HintError> {
    vm.get_range_check_builtin()?;
    if div > *MAX_DIV {
        return Err(HintError::OutOfValidRange(Box::new((div, *MAX_DIV))));
    }
    NonZeroFelt::try_from(div).map_err(|_| HintError::OutOfValidRange(Box::new((div, *MAX_DIV))))
}

// ids.q, ids.r = divmod(ids.value, ids.div)
pub fn unsigned_div_rem(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let div = get_integer_from_var_name("div", vm, ids_data, ap_tracking)?.into_owned();
    let value = get_integer_from_var_name("value", vm, ids_data, ap_tracking)?.into_owned();
    let div = valid_divisor(vm, div)?;

    let (q, r) = value.div_rem(&div);
    insert_value_from_var_name("r", r, vm, ids_data, ap_tracking)?;
    insert_value_from_var_name("q", q, vm, ids_data, ap_tracking)
}

/// Floor division of `ids.value`, read as a signed integer, by `ids.div`.
/// The quotient must lie in `[-ids.bound, ids.bound)` and is written
/// biased by `ids.bound`.
pub fn signed_div_rem(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let div = get_integer_from_var_name("div", vm, ids_data, ap_tracking)?.into_owned();
    let value = get_integer_from_var_name("value", vm, ids_data, ap_tracking)?.into_owned();
    let bound = get_integer_from_var_name("bound", vm, ids_data, ap_tracking)?.into_owned();
    valid_divisor(vm, div)?;

    let max_bound = pow2_const(127);
    if bound > max_bound {
        return Err(HintError::OutOfValidRange(Box::new((bound, max_bound))));
    }

    let int_bound = BigInt::from(bound.to_biguint());
    let (q, r) = signed_felt(value).div_mod_floor(&BigInt::from(div.to_biguint()));
    if q < -&int_bound || q >= int_bound {
        return Err(HintError::OutOfValidRange(Box::new((
            felt_from_bigint(&q),
            bound,
        ))));
    }

    let biased_q = q + int_bound;
    insert_value_from_var_name("r", felt_from_bigint(&r), vm, ids_data, ap_tracking)?;
    insert_value_from_var_name(
        "biased_q",
        felt_from_bigint(&biased_q),
        vm,
        ids_data,
        ap_tracking,
    )
}

/// Checks `ids.value < UPPER_BOUND` and splits it as
/// `ids.high, ids.low = divmod(ids.value, SHIFT)`.
pub fn assert_250_bit(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
    constants: &HashMap<String, Felt252>,
) -> Result<(), HintError> {
    let upper_bound = *get_constant_from_var_name("UPPER_BOUND", constants)?;
    let shift = *get_constant_from_var_name("SHIFT", constants)?;
    let value = get_integer_from_var_name("value", vm, ids_data, ap_tracking)?.into_owned();
    if value >= upper_bound {
        return Err(HintError::ValueOutside250BitRange(Box::new(value)));
    }
    let shift = NonZeroFelt::try_from(shift).map_err(|_| MathError::DividedByZero)?;
    let (high, low) = value.div_rem(&shift);
    insert_value_from_var_name("high", high, vm, ids_data, ap_tracking)?;
    insert_value_from_var_name("low", low, vm, ids_data, ap_tracking)
}

// ids.is_250 = 1 if ids.addr < 2**250 else 0
pub fn is_250_bits(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let addr = get_integer_from_var_name("addr", vm, ids_data, ap_tracking)?;
    let is_250 = flag(addr.bits() <= 250);
    insert_value_from_var_name("is_250", is_250, vm, ids_data, ap_tracking)
}

// assert (ids.a % PRIME) < (ids.b % PRIME)
pub fn assert_lt_felt(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let a = get_integer_from_var_name("a", vm, ids_data, ap_tracking)?.into_owned();
    let b = get_integer_from_var_name("b", vm, ids_data, ap_tracking)?.into_owned();
    if a >= b {
        return Err(HintError::AssertLtFelt252(Box::new((a, b))));
    }
    Ok(())
}

// ids.bit_length = ids.x.bit_length()
pub fn get_felt_bit_length(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let bit_length = get_integer_from_var_name("x", vm, ids_data, ap_tracking)?.bits();
    insert_value_from_var_name(
        "bit_length",
        Felt252::from(bit_length),
        vm,
        ids_data,
        ap_tracking,
    )
}
