use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use starknet_crypto::verify;

use crate::types::builtin_name::BuiltinName;
use crate::types::instance_definitions::{CELLS_PER_SIGNATURE, INPUTCELLS_PER_SIGNATURE};
use crate::types::relocatable::Relocatable;
use crate::vm::errors::memory_errors::MemoryError;
use crate::vm::vm_memory::memory::{Memory, ValidationRule};
use crate::vm::vm_memory::memory_segments::MemorySegmentManager;
use crate::Felt252;

use super::BuiltinRunnerCapabilities;

/// ECDSA verification over `(pubkey, msg)` pairs. The `(r, s)` signature for
/// each pair is registered by a hint before the program writes the pair.
#[derive(Debug, Clone)]
pub struct SignatureBuiltinRunner {
    pub(crate) included: bool,
    ratio: Option<u32>,
    base: usize,
    pub(crate) stop_ptr: Option<usize>,
    // Shared with the validation rule installed in memory.
    signatures: Rc<RefCell<HashMap<Relocatable, (Felt252, Felt252)>>>,
}

impl SignatureBuiltinRunner {
    pub fn new(ratio: Option<u32>, included: bool) -> Self {
        SignatureBuiltinRunner {
            base: 0,
            included,
            ratio,
            stop_ptr: None,
            signatures: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Registers `(r, s)` for the pair whose public key lives at `address`.
    /// The first signature registered for an address wins.
    pub fn add_signature(&mut self, address: Relocatable, signature: (Felt252, Felt252)) {
        self.signatures
            .borrow_mut()
            .entry(address)
            .or_insert(signature);
    }

    pub fn signatures(&self) -> HashMap<Relocatable, (Felt252, Felt252)> {
        self.signatures.borrow().clone()
    }
}

impl BuiltinRunnerCapabilities for SignatureBuiltinRunner {
    fn name(&self) -> BuiltinName {
        BuiltinName::ecdsa
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
        CELLS_PER_SIGNATURE
    }

    fn n_input_cells(&self) -> u32 {
        INPUTCELLS_PER_SIGNATURE
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

    /// Verifies a pair as soon as both of its cells are written.
    fn add_validation_rule(&self, memory: &mut Memory) {
        let signatures = Rc::clone(&self.signatures);
        let rule = ValidationRule(Box::new(
            move |memory: &Memory, addr: Relocatable| -> Result<Vec<Relocatable>, MemoryError> {
                let cell_index = addr.offset % CELLS_PER_SIGNATURE as usize;
                let (pubkey_addr, msg_addr) = if cell_index == 0 {
                    (addr, (addr + 1_usize)?)
                } else {
                    ((addr - 1)?, addr)
                };

                // The cell just written must be an integer; its partner may
                // still be missing.
                let pubkey = match memory.get_integer(pubkey_addr) {
                    Ok(num) => num.into_owned(),
                    Err(_) if cell_index == 1 && memory.get(&pubkey_addr).is_none() => {
                        return Ok(vec![])
                    }
                    Err(_) => return Err(MemoryError::PubKeyNonInt(Box::new(pubkey_addr))),
                };
                let msg = match memory.get_integer(msg_addr) {
                    Ok(num) => num.into_owned(),
                    Err(_) if cell_index == 0 && memory.get(&msg_addr).is_none() => {
                        return Ok(vec![])
                    }
                    Err(_) => return Err(MemoryError::MsgNonInt(Box::new(msg_addr))),
                };

                let (r, s) = *signatures
                    .borrow()
                    .get(&pubkey_addr)
                    .ok_or_else(|| MemoryError::SignatureNotFound(Box::new(pubkey_addr)))?;
                match verify(&pubkey, &msg, &r, &s) {
                    Ok(true) => Ok(vec![]),
                    Ok(false) => Err(MemoryError::InvalidSignature(Box::new((
                        format!("({r}, {s})"),
                        pubkey,
                        msg,
                    )))),
                    Err(_) => Err(MemoryError::ErrorVerifyingSignature),
                }
            },
        ));
        memory.add_validation_rule(self.base, rule);
    }
}
