use std::collections::HashMap;

use crate::{
    hint_processor::builtin_hint_processor::builtin_hint_processor_definition::Hint,
    serde::deserialize_program::{ApTracking, OffsetValue},
    types::{exec_scope::ExecutionScopes, instruction::Register},
    vm::{
        errors::hint_errors::HintError, runners::cairo_runner::ResourceTracker,
        vm_core::VirtualMachine,
    },
    Felt252,
};

/// A hint compiled once per run: its kind, the `ids` it can see and the
/// ap-tracking data at its pc.
#[derive(Debug, Clone, PartialEq)]
pub struct HintData {
    pub kind: Hint,
    pub ids_data: HashMap<String, HintReference>,
    pub ap_tracking: ApTracking,
}

impl HintData {
    pub fn new(code: &str, ids_data: HashMap<String, HintReference>, ap_tracking: ApTracking) -> Self {
        HintData {
            kind: Hint::from_code(code),
            ids_data,
            ap_tracking,
        }
    }

    pub fn new_default(code: &str, ids_data: HashMap<String, HintReference>) -> Self {
        HintData::new(code, ids_data, ApTracking::default())
    }
}

pub trait HintProcessorLogic {
    /// Turns the code of a hint into the data `execute_hint` runs. Code that
    /// the processor cannot execute is rejected here, before the run starts.
    fn compile_hint(
        &self,
        hint_code: &str,
        ap_tracking_data: &ApTracking,
        // Maps each variable name to its index in `references`. May name
        // variables the hint does not use.
        reference_ids: &HashMap<String, usize>,
        references: &[HintReference],
    ) -> Result<HintData, HintError> {
        Ok(HintData::new(
            hint_code,
            get_ids_data(reference_ids, references)?,
            *ap_tracking_data,
        ))
    }

    fn execute_hint(
        &mut self,
        vm: &mut VirtualMachine,
        exec_scopes: &mut ExecutionScopes,
        hint_data: &HintData,
        constants: &HashMap<String, Felt252>,
    ) -> Result<(), HintError>;
}

pub trait HintProcessor: HintProcessorLogic + ResourceTracker {}
impl<T> HintProcessor for T where T: HintProcessorLogic + ResourceTracker {}

/// Builds the `ids` map of a hint: the last component of each variable name
/// bound to its reference.
pub fn get_ids_data(
    reference_ids: &HashMap<String, usize>,
    references: &[HintReference],
) -> Result<HashMap<String, HintReference>, HintError> {
    let mut ids_data = HashMap::<String, HintReference>::new();
    for (path, ref_id) in reference_ids {
        let name = path.rsplit('.').next().unwrap_or(path);
        ids_data.insert(
            name.to_string(),
            references
                .get(*ref_id)
                .ok_or(HintError::UnknownIdentifier(name.to_string().into_boxed_str()))?
                .clone(),
        );
    }
    Ok(ids_data)
}

/// Where an `ids` variable lives, as parsed from the program's reference
/// manager: `[offset1 + offset2]` when `dereference`, else the address.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct HintReference {
    pub offset1: OffsetValue,
    pub offset2: OffsetValue,
    pub dereference: bool,
    pub ap_tracking_data: Option<ApTracking>,
    pub cairo_type: Option<String>,
}

impl HintReference {
    /// `[fp + offset1]`.
    pub fn new_simple(offset1: i32) -> Self {
        HintReference {
            offset1: OffsetValue::Reference(Register::FP, offset1, false),
            offset2: OffsetValue::Value(0),
            ap_tracking_data: None,
            dereference: true,
            cairo_type: None,
        }
    }

    /// `[fp + offset1] + offset2`, optionally dereferencing the base.
    pub fn new(offset1: i32, offset2: i32, inner_dereference: bool, dereference: bool) -> Self {
        HintReference {
            offset1: OffsetValue::Reference(Register::FP, offset1, inner_dereference),
            offset2: OffsetValue::Value(offset2),
            ap_tracking_data: None,
            dereference,
            cairo_type: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hint_processor::builtin_hint_processor::hint_code;
    use assert_matches::assert_matches;

    #[test]
    fn ids_data_uses_last_path_component() {
        let reference_ids = HashMap::from([
            ("starkware.cairo.common.math.assert_nn.a".to_string(), 0),
            ("__main__.main.b".to_string(), 1),
        ]);
        let references = vec![HintReference::new_simple(-3), HintReference::new(-2, 1, true, false)];
        let ids_data = get_ids_data(&reference_ids, &references).unwrap();
        assert_eq!(ids_data.len(), 2);
        assert_eq!(ids_data["a"], HintReference::new_simple(-3));
        assert_eq!(ids_data["b"], HintReference::new(-2, 1, true, false));
    }

    #[test]
    fn ids_data_missing_reference() {
        let reference_ids = HashMap::from([("__main__.main.x".to_string(), 4)]);
        assert_matches!(
            get_ids_data(&reference_ids, &[]),
            Err(HintError::UnknownIdentifier(name)) if name.as_ref() == "x"
        );
    }

    #[test]
    fn hint_data_compiles_known_code() {
        let data = HintData::new_default(hint_code::ADD_SEGMENT, HashMap::new());
        assert_eq!(data.kind, Hint::AddSegment);
        let data = HintData::new_default("print('hello')", HashMap::new());
        assert_eq!(data.kind, Hint::Unrecognized("print('hello')".to_string()));
    }
}
