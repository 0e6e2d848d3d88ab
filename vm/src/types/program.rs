use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
    sync::Arc,
};

use crate::{
    hint_processor::hint_processor_definition::HintReference,
    serde::deserialize_program::{
        deserialize_and_parse_program, Attribute, HintParams, Identifier, InstructionLocation,
        OffsetValue, ReferenceManager,
    },
    types::{
        builtin_name::BuiltinName, errors::program_errors::ProgramError, instruction::Register,
        relocatable::MaybeRelocatable,
    },
    utils::PRIME_STR,
    Felt252,
};

// Runners clone `Program` freely; everything that is only read on error paths
// or once per run lives behind the `Arc`.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub(crate) struct SharedProgramData {
    pub(crate) data: Vec<MaybeRelocatable>,
    /// Hints attached to each pc, in execution order.
    pub(crate) hints: BTreeMap<usize, Vec<HintParams>>,
    pub(crate) main: Option<usize>,
    // `__start__` and `__end__` labels, only used in proof mode.
    pub(crate) start: Option<usize>,
    pub(crate) end: Option<usize>,
    pub(crate) error_message_attributes: Vec<Attribute>,
    pub(crate) instruction_locations: Option<HashMap<usize, InstructionLocation>>,
    pub(crate) identifiers: HashMap<String, Identifier>,
    pub(crate) reference_manager: Vec<HintReference>,
}

/// A compiled Cairo 0 program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    pub(crate) shared_program_data: Arc<SharedProgramData>,
    pub(crate) constants: HashMap<String, Felt252>,
    pub(crate) builtins: Vec<BuiltinName>,
}

impl Program {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        builtins: Vec<BuiltinName>,
        data: Vec<MaybeRelocatable>,
        main: Option<usize>,
        hints: BTreeMap<usize, Vec<HintParams>>,
        reference_manager: ReferenceManager,
        identifiers: HashMap<String, Identifier>,
        error_message_attributes: Vec<Attribute>,
        instruction_locations: Option<HashMap<usize, InstructionLocation>>,
    ) -> Result<Program, ProgramError> {
        let constants = Self::extract_constants(&identifiers)?;
        if let Some(&max_pc) = hints.keys().next_back() {
            if max_pc >= data.len() {
                return Err(ProgramError::InvalidHintPc(max_pc, data.len()));
            }
        }

        let shared_program_data = SharedProgramData {
            data,
            hints,
            main,
            start: None,
            end: None,
            error_message_attributes,
            instruction_locations,
            identifiers,
            reference_manager: Self::get_reference_list(&reference_manager),
        };
        Ok(Self {
            shared_program_data: Arc::new(shared_program_data),
            constants,
            builtins,
        })
    }

    pub fn from_file(path: &Path, entrypoint: Option<&str>) -> Result<Program, ProgramError> {
        let file_content = std::fs::read(path)?;
        deserialize_and_parse_program(&file_content, entrypoint)
    }

    pub fn from_bytes(bytes: &[u8], entrypoint: Option<&str>) -> Result<Program, ProgramError> {
        deserialize_and_parse_program(bytes, entrypoint)
    }

    pub fn prime(&self) -> &str {
        _ = self;
        PRIME_STR
    }

    pub fn iter_builtins(&self) -> impl Iterator<Item = &BuiltinName> {
        self.builtins.iter()
    }

    pub fn iter_data(&self) -> impl Iterator<Item = &MaybeRelocatable> {
        self.shared_program_data.data.iter()
    }

    pub fn data_len(&self) -> usize {
        self.shared_program_data.data.len()
    }

    pub fn builtins_len(&self) -> usize {
        self.builtins.len()
    }

    pub fn get_identifier(&self, id: &str) -> Option<&Identifier> {
        self.shared_program_data.identifiers.get(id)
    }

    pub fn iter_identifiers(&self) -> impl Iterator<Item = (&str, &Identifier)> {
        self.shared_program_data
            .identifiers
            .iter()
            .map(|(name, identifier)| (name.as_str(), identifier))
    }

    pub fn get_constants(&self) -> &HashMap<String, Felt252> {
        &self.constants
    }

    pub(crate) fn get_reference_list(reference_manager: &ReferenceManager) -> Vec<HintReference> {
        reference_manager
            .references
            .iter()
            .map(|r| {
                let value = &r.value_address;
                let refers_to_ap = matches!(
                    (&value.offset1, &value.offset2),
                    (OffsetValue::Reference(Register::AP, _, _), _)
                        | (_, OffsetValue::Reference(Register::AP, _, _))
                );
                HintReference {
                    offset1: value.offset1.clone(),
                    offset2: value.offset2.clone(),
                    dereference: value.dereference,
                    // ap-based references need the tracking data to be corrected later
                    ap_tracking_data: refers_to_ap.then_some(r.ap_tracking_data),
                    cairo_type: Some(value.value_type.clone()),
                }
            })
            .collect()
    }

    pub(crate) fn extract_constants(
        identifiers: &HashMap<String, Identifier>,
    ) -> Result<HashMap<String, Felt252>, ProgramError> {
        identifiers
            .iter()
            .filter(|(_, identifier)| identifier.type_.as_deref() == Some("const"))
            .map(|(name, identifier)| {
                identifier
                    .value
                    .map(|value| (name.clone(), value))
                    .ok_or_else(|| ProgramError::ConstWithoutValue(name.clone()))
            })
            .collect()
    }
}

impl Default for Program {
    fn default() -> Self {
        Self {
            shared_program_data: Arc::new(SharedProgramData::default()),
            constants: HashMap::new(),
            builtins: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serde::deserialize_program::{
        ApTracking, FlowTrackingData, Reference, ValueAddress,
    };
    use crate::utils::test_utils::*;
    use assert_matches::assert_matches;

    fn data() -> Vec<MaybeRelocatable> {
        vec![
            mayberelocatable!(5189976364521848832),
            mayberelocatable!(1000),
            mayberelocatable!(5189976364521848832),
            mayberelocatable!(2000),
            mayberelocatable!(5201798304953696256),
            mayberelocatable!(2345108766317314046),
        ]
    }

    fn hint(code: &str) -> HintParams {
        HintParams {
            code: code.to_string(),
            accessible_scopes: Vec::new(),
            flow_tracking_data: FlowTrackingData {
                ap_tracking: ApTracking::new(),
                reference_ids: HashMap::new(),
            },
        }
    }

    fn identifier(type_: &str, value: Option<Felt252>) -> Identifier {
        Identifier {
            pc: None,
            type_: Some(type_.to_string()),
            value,
            full_name: None,
            members: None,
            cairo_type: None,
        }
    }

    #[test]
    fn new() {
        let program = Program::new(
            vec![BuiltinName::output],
            data(),
            Some(0),
            BTreeMap::new(),
            ReferenceManager::default(),
            HashMap::new(),
            Vec::new(),
            None,
        )
        .unwrap();

        assert_eq!(program.builtins, vec![BuiltinName::output]);
        assert_eq!(program.shared_program_data.data, data());
        assert_eq!(program.shared_program_data.main, Some(0));
        assert_eq!(program.data_len(), 6);
        assert_eq!(program.builtins_len(), 1);
        assert_eq!(program.prime(), PRIME_STR);
    }

    #[test]
    fn new_program_with_hints() {
        let hints = BTreeMap::from([
            (0, vec![hint("memory[ap] = segments.add()")]),
            (4, vec![hint("vm_enter_scope()"), hint("vm_exit_scope()")]),
        ]);
        let program = Program::new(
            Vec::new(),
            data(),
            None,
            hints.clone(),
            ReferenceManager::default(),
            HashMap::new(),
            Vec::new(),
            None,
        )
        .unwrap();
        assert_eq!(program.shared_program_data.hints, hints);
    }

    #[test]
    fn new_program_with_invalid_hint_pc() {
        let hints = BTreeMap::from([(6, vec![hint("vm_enter_scope()")])]);
        let result = Program::new(
            Vec::new(),
            data(),
            None,
            hints,
            ReferenceManager::default(),
            HashMap::new(),
            Vec::new(),
            None,
        );
        assert_matches!(result, Err(ProgramError::InvalidHintPc(6, 6)));
    }

    #[test]
    fn extract_constants() {
        let identifiers = HashMap::from([
            (
                "__main__.SIZE".to_string(),
                identifier("const", Some(Felt252::from(3))),
            ),
            ("__main__.main".to_string(), identifier("function", None)),
        ]);
        assert_eq!(
            Program::extract_constants(&identifiers).unwrap(),
            HashMap::from([("__main__.SIZE".to_string(), Felt252::from(3))])
        );
    }

    #[test]
    fn constant_without_value() {
        let identifiers = HashMap::from([("__main__.SIZE".to_string(), identifier("const", None))]);
        assert_matches!(
            Program::extract_constants(&identifiers),
            Err(ProgramError::ConstWithoutValue(name)) if name == "__main__.SIZE"
        );
    }

    #[test]
    fn identifiers_lookup() {
        let identifiers = HashMap::from([("__main__.main".to_string(), identifier("function", None))]);
        let program = Program::new(
            Vec::new(),
            data(),
            None,
            BTreeMap::new(),
            ReferenceManager::default(),
            identifiers,
            Vec::new(),
            None,
        )
        .unwrap();
        assert!(program.get_identifier("__main__.main").is_some());
        assert!(program.get_identifier("__main__.missing").is_none());
        assert_eq!(program.iter_identifiers().count(), 1);
    }

    #[test]
    fn reference_list_keeps_ap_tracking_only_for_ap_references() {
        let tracking = ApTracking { group: 2, offset: 5 };
        let reference = |offset1| Reference {
            ap_tracking_data: tracking,
            pc: Some(0),
            value_address: ValueAddress {
                offset1,
                offset2: OffsetValue::Value(0),
                dereference: true,
                value_type: "felt".to_string(),
            },
        };
        let manager = ReferenceManager {
            references: vec![
                reference(OffsetValue::Reference(Register::FP, -3, false)),
                reference(OffsetValue::Reference(Register::AP, -1, false)),
            ],
        };
        let list = Program::get_reference_list(&manager);
        assert_eq!(list[0].ap_tracking_data, None);
        assert_eq!(list[1].ap_tracking_data, Some(tracking));
        assert_eq!(list[1].cairo_type.as_deref(), Some("felt"));
    }

    #[test]
    fn default_program() {
        let program = Program::default();
        assert_eq!(program.data_len(), 0);
        assert!(program.iter_builtins().next().is_none());
        assert!(program.get_constants().is_empty());
    }

    #[test]
    fn program_macro_builds_programs() {
        let program = program!(BuiltinName::range_check);
        assert_eq!(program.builtins, vec![BuiltinName::range_check]);
    }
}
