use std::cell::RefCell;
use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::math_utils::{ec_add, ec_double};
use crate::types::builtin_name::BuiltinName;
use crate::types::instance_definitions::{
    CELLS_PER_EC_OP, EC_OP_SCALAR_HEIGHT, INPUT_CELLS_PER_EC_OP,
};
use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::vm::errors::memory_errors::MemoryError;
use crate::vm::errors::runner_errors::RunnerError;
use crate::vm::vm_memory::memory::Memory;
use crate::vm::vm_memory::memory_segments::MemorySegmentManager;
use crate::Felt252;

use super::BuiltinRunnerCapabilities;

// STARK curve: y^2 = x^3 + alpha * x + beta
const ALPHA: Felt252 = Felt252::ONE;

lazy_static! {
    static ref BETA: Felt252 = Felt252::from(0x6f21413efbe40de150e596d72f7a8c5_u128)
        * Felt252::TWO.pow(128_u128)
        + Felt252::from(0x609ad26c15c915c1f4cdfcb99cee9e89_u128);
}

// (x, y) offsets of P and Q within an instance.
const INPUT_POINTS: [(usize, usize); 2] = [(0, 1), (2, 3)];
const M_INDEX: usize = 4;

#[derive(Debug, Clone)]
pub struct EcOpBuiltinRunner {
    ratio: Option<u32>,
    pub base: usize,
    pub(crate) stop_ptr: Option<usize>,
    pub(crate) included: bool,
    // Both coordinates of R are stored once the first one is requested.
    cache: RefCell<HashMap<Relocatable, Felt252>>,
}

impl EcOpBuiltinRunner {
    pub fn new(ratio: Option<u32>, included: bool) -> Self {
        EcOpBuiltinRunner {
            base: 0,
            ratio,
            stop_ptr: None,
            included,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Whether `(x, y)` lies on `y^2 = x^3 + alpha * x + beta`.
    pub(crate) fn point_on_curve(
        x: &Felt252,
        y: &Felt252,
        alpha: &Felt252,
        beta: &Felt252,
    ) -> bool {
        y * y == x * x * x + alpha * x + beta
    }

    /// Computes `P + m * Q` with double-and-add over `height` bits of `m`.
    ///
    /// Like the AIR, this fails whenever an addition would combine two
    /// points with the same x coordinate.
    pub(crate) fn ec_op_impl(
        partial_sum: (Felt252, Felt252),
        doubled_point: (Felt252, Felt252),
        m: &Felt252,
        alpha: &Felt252,
        height: u32,
    ) -> Result<(Felt252, Felt252), RunnerError> {
        let scalar = m.to_biguint();
        let (mut sum, mut doubled) = (partial_sum, doubled_point);
        for bit in 0..height as u64 {
            if doubled.0 == sum.0 {
                return Err(RunnerError::EcOpSameXCoordinate(
                    Self::format_ec_op_error(partial_sum, m, doubled_point).into_boxed_str(),
                ));
            }
            if scalar.bit(bit) {
                sum = ec_add(sum, doubled)?;
            }
            doubled = ec_double(doubled, alpha)?;
        }
        Ok(sum)
    }

    pub fn format_ec_op_error(
        p: (Felt252, Felt252),
        m: &Felt252,
        q: (Felt252, Felt252),
    ) -> String {
        format!(
            "Cannot apply EC operation: computation reached two points with the same x coordinate. \n\
             Attempting to compute P + m * Q where:\n\
             P = ({}, {}) \n\
             m = {}\n\
             Q = ({}, {}).",
            p.0, p.1, m, q.0, q.1
        )
    }
}

impl BuiltinRunnerCapabilities for EcOpBuiltinRunner {
    fn name(&self) -> BuiltinName {
        BuiltinName::ec_op
    }

    fn base(&self) -> usize {
        self.base
    }

    fn included(&self) -> bool {
        self.included
    }

    fn ratio(&self) -> Option<u32> {
        self.ratio
    }

    fn cells_per_instance(&self) -> u32 {
        CELLS_PER_EC_OP
    }

    fn n_input_cells(&self) -> u32 {
        INPUT_CELLS_PER_EC_OP
    }

    fn stop_ptr(&self) -> Option<usize> {
        self.stop_ptr
    }

    fn set_stop_ptr(&mut self, stop_ptr: usize) {
        self.stop_ptr = Some(stop_ptr)
    }

    fn initialize_segments(&mut self, segments: &mut MemorySegmentManager) {
        self.base = segments.add().segment_index as usize
    }

    fn deduce_memory_cell(
        &self,
        address: Relocatable,
        memory: &Memory,
    ) -> Result<Option<MaybeRelocatable>, RunnerError> {
        let index = address.offset % CELLS_PER_EC_OP as usize;
        if index < INPUT_CELLS_PER_EC_OP as usize {
            return Ok(None);
        }
        if let Some(number) = self.cache.borrow().get(&address) {
            return Ok(Some(MaybeRelocatable::Int(*number)));
        }

        let instance = (address - index)?;
        let mut inputs = Vec::with_capacity(INPUT_CELLS_PER_EC_OP as usize);
        for i in 0..INPUT_CELLS_PER_EC_OP as usize {
            let cell_addr = (instance + i)?;
            match memory.get(&cell_addr).as_deref() {
                None => return Ok(None),
                Some(MaybeRelocatable::Int(num)) => inputs.push(*num),
                Some(_) => {
                    return Err(MemoryError::ExpectedInteger(Box::new(cell_addr)).into());
                }
            }
        }

        for (x, y) in INPUT_POINTS {
            if !Self::point_on_curve(&inputs[x], &inputs[y], &ALPHA, &BETA) {
                return Err(RunnerError::PointNotOnCurve(Box::new((
                    inputs[x], inputs[y],
                ))));
            }
        }

        let result = Self::ec_op_impl(
            (inputs[0], inputs[1]),
            (inputs[2], inputs[3]),
            &inputs[M_INDEX],
            &ALPHA,
            EC_OP_SCALAR_HEIGHT,
        )?;
        let x_addr = (instance + INPUT_CELLS_PER_EC_OP as usize)?;
        let mut cache = self.cache.borrow_mut();
        cache.insert(x_addr, result.0);
        cache.insert((x_addr + 1_usize)?, result.1);
        Ok(Some(MaybeRelocatable::Int(if address == x_addr {
            result.0
        } else {
            result.1
        })))
    }
}
