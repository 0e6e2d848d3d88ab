use std::{borrow::Cow, collections::HashMap};

use crate::{
    hint_processor::builtin_hint_processor::hint_utils::{
        get_constant_from_var_name, get_integer_from_var_name, get_relocatable_from_var_name,
        insert_value_from_var_name,
    },
    hint_processor::hint_processor_definition::HintReference,
    math_utils::isqrt,
    serde::deserialize_program::ApTracking,
    types::{errors::math_errors::MathError, relocatable::Relocatable},
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
    Felt252,
};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

/// A `Uint256` struct as laid out in memory: `low` then `high`, 128 bits each.
pub(crate) struct Uint256<'a> {
    pub low: Cow<'a, Felt252>,
    pub high: Cow<'a, Felt252>,
}

impl<'a> Uint256<'a> {
    pub(crate) fn from_base_addr(
        addr: Relocatable,
        name: &str,
        vm: &'a VirtualMachine,
    ) -> Result<Self, HintError> {
        Ok(Self {
            low: vm.get_integer(addr).map_err(|_| {
                HintError::IdentifierHasNoMember(Box::new((name.to_string(), "low".to_string())))
            })?,
            high: vm.get_integer((addr + 1)?).map_err(|_| {
                HintError::IdentifierHasNoMember(Box::new((name.to_string(), "high".to_string())))
            })?,
        })
    }

    pub(crate) fn from_var_name(
        name: &str,
        vm: &'a VirtualMachine,
        ids_data: &HashMap<String, HintReference>,
        ap_tracking: &ApTracking,
    ) -> Result<Self, HintError> {
        let base_addr = get_relocatable_from_var_name(name, vm, ids_data, ap_tracking)?;
        Self::from_base_addr(base_addr, name, vm)
    }

    pub(crate) fn from_values(low: Felt252, high: Felt252) -> Self {
        Self {
            low: Cow::Owned(low),
            high: Cow::Owned(high),
        }
    }

    pub(crate) fn insert_from_var_name(
        self,
        var_name: &str,
        vm: &mut VirtualMachine,
        ids_data: &HashMap<String, HintReference>,
        ap_tracking: &ApTracking,
    ) -> Result<(), HintError> {
        let addr = get_relocatable_from_var_name(var_name, vm, ids_data, ap_tracking)?;
        vm.insert_value(addr, self.low.into_owned())?;
        vm.insert_value((addr + 1)?, self.high.into_owned())?;
        Ok(())
    }

    pub(crate) fn pack(self) -> BigUint {
        (self.high.to_biguint() << 128) + self.low.to_biguint()
    }

    pub(crate) fn split(num: &BigUint) -> Self {
        let mask_low: BigUint = u128::MAX.into();
        let low = Felt252::from(num & mask_low);
        let high = Felt252::from(num >> 128);
        Self::from_values(low, high)
    }
}

impl<'a> From<&BigUint> for Uint256<'a> {
    fn from(value: &BigUint) -> Self {
        Self::split(value)
    }
}

fn carry(sum: &BigUint, shift: &BigUint) -> Felt252 {
    if sum >= shift {
        Felt252::ONE
    } else {
        Felt252::ZERO
    }
}

/*
Implements hint:
%{
    sum_low = ids.a.low + ids.b.low
    ids.carry_low = 1 if sum_low >= ids.SHIFT else 0
    sum_high = ids.a.high + ids.b.high + ids.carry_low
    ids.carry_high = 1 if sum_high >= ids.SHIFT else 0
%}
*/
pub fn uint256_add(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
    constants: &HashMap<String, Felt252>,
) -> Result<(), HintError> {
    // Programs compiled without the uint256 module in scope still add in base 2**128.
    let shift = get_constant_from_var_name("SHIFT", constants)
        .map(|shift| shift.to_biguint())
        .unwrap_or_else(|_| BigUint::one() << 128);

    let a = Uint256::from_var_name("a", vm, ids_data, ap_tracking)?;
    let b = Uint256::from_var_name("b", vm, ids_data, ap_tracking)?;

    let sum_low = a.low.to_biguint() + b.low.to_biguint();
    let carry_low = carry(&sum_low, &shift);
    let sum_high = a.high.to_biguint() + b.high.to_biguint() + carry_low.to_biguint();
    let carry_high = carry(&sum_high, &shift);

    insert_value_from_var_name("carry_high", carry_high, vm, ids_data, ap_tracking)?;
    insert_value_from_var_name("carry_low", carry_low, vm, ids_data, ap_tracking)
}

/*
Implements hint:
%{
    ids.low = ids.a & ((1<<64) - 1)
    ids.high = ids.a >> 64
%}
*/
pub fn split_64(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let a = get_integer_from_var_name("a", vm, ids_data, ap_tracking)?.to_biguint();
    let mask: BigUint = u64::MAX.into();
    let low = Felt252::from(&a & mask);
    let high = Felt252::from(a >> 64);
    insert_value_from_var_name("high", high, vm, ids_data, ap_tracking)?;
    insert_value_from_var_name("low", low, vm, ids_data, ap_tracking)
}

/*
Implements hint:
%{
    from starkware.python.math_utils import isqrt
    n = (ids.n.high << 128) + ids.n.low
    root = isqrt(n)
    assert 0 <= root < 2 ** 128
    ids.root.low = root
    ids.root.high = 0
%}
*/
pub fn uint256_sqrt(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let n = Uint256::from_var_name("n", vm, ids_data, ap_tracking)?.pack();
    let root = isqrt(&n)?;
    if root.bits() > 128 {
        return Err(HintError::AssertionFailed(
            format!("assert 0 <= {} < 2 ** 128", &root).into_boxed_str(),
        ));
    }
    Uint256::from_values(Felt252::from(root), Felt252::ZERO).insert_from_var_name(
        "root",
        vm,
        ids_data,
        ap_tracking,
    )
}

/*
Implements hint:
%{
    a = (ids.a.high << 128) + ids.a.low
    div = (ids.div.high << 128) + ids.div.low
    quotient, remainder = divmod(a, div)

    ids.quotient.low = quotient & ((1 << 128) - 1)
    ids.quotient.high = quotient >> 128
    ids.remainder.low = remainder & ((1 << 128) - 1)
    ids.remainder.high = remainder >> 128
%}
*/
pub fn uint256_unsigned_div_rem(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let a = Uint256::from_var_name("a", vm, ids_data, ap_tracking)?.pack();
    let div = Uint256::from_var_name("div", vm, ids_data, ap_tracking)?.pack();
    if div.is_zero() {
        return Err(MathError::DividedByZero.into());
    }
    // Both operands are non-negative, so truncating and floor division agree.
    let (quotient, remainder) = a.div_rem(&div);

    Uint256::from(&quotient).insert_from_var_name("quotient", vm, ids_data, ap_tracking)?;
    Uint256::from(&remainder).insert_from_var_name("remainder", vm, ids_data, ap_tracking)
}
