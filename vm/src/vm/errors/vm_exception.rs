use std::{
    fmt::{self, Display},
    path::Path,
    str,
};

use thiserror::Error;

use crate::{
    hint_processor::hint_processor_utils::get_maybe_relocatable_from_reference,
    serde::deserialize_program::{ApTracking, Attribute, Location, OffsetValue},
    types::{instruction::Register, relocatable::MaybeRelocatable},
    vm::runners::cairo_runner::CairoRunner,
};

use super::vm_errors::VirtualMachineError;

/// A run failure annotated with what the program's debug info knows about
/// the failing pc.
#[derive(Debug, Error)]
pub struct VmException {
    pub pc: usize,
    pub inst_location: Option<Location>,
    pub inner_exc: VirtualMachineError,
    pub error_attr_value: Option<String>,
    pub traceback: Option<String>,
}

impl VmException {
    pub fn from_vm_error(runner: &CairoRunner, error: VirtualMachineError) -> Self {
        let pc = runner.vm.run_context.pc.offset;
        let error_attr_value = get_error_attr_value(pc, runner);
        let hint_index = match error {
            VirtualMachineError::Hint(ref bx) => Some(bx.0),
            _ => None,
        };
        VmException {
            pc,
            inst_location: get_location(pc, runner, hint_index),
            inner_exc: error,
            error_attr_value,
            traceback: get_traceback(runner),
        }
    }
}

/// Every `error_message` attribute whose pc range holds `pc`, one
/// `Error message: ...` line each.
pub fn get_error_attr_value(pc: usize, runner: &CairoRunner) -> Option<String> {
    let mut errors = String::new();
    for attribute in &runner.program.shared_program_data.error_message_attributes {
        if attribute.start_pc <= pc && attribute.end_pc > pc {
            errors.push_str(&format!(
                "Error message: {}\n",
                substitute_error_message_references(attribute, runner)
            ));
        }
    }
    (!errors.is_empty()).then_some(errors)
}

/// Source location of the instruction at `pc`, or of its `hint_index`-th hint.
pub fn get_location(
    pc: usize,
    runner: &CairoRunner,
    hint_index: Option<usize>,
) -> Option<Location> {
    let instruction_location = runner
        .program
        .shared_program_data
        .instruction_locations
        .as_ref()?
        .get(&pc)?;
    match hint_index {
        Some(index) => instruction_location
            .hints
            .get(index)
            .map(|hint_location| hint_location.location.clone()),
        None => Some(instruction_location.inst.clone()),
    }
}

// Returns the traceback at the current pc.
pub fn get_traceback(runner: &CairoRunner) -> Option<String> {
    let mut traceback = String::new();
    for (_fp, traceback_pc) in runner.vm.get_traceback_entries() {
        if let Some(ref attr) = get_error_attr_value(traceback_pc.offset, runner) {
            traceback.push_str(attr)
        }
        match get_location(traceback_pc.offset, runner, None) {
            Some(location) => traceback.push_str(&format!(
                "{}\n",
                location.to_string_with_content(&format!("(pc=0:{})", traceback_pc.offset))
            )),
            None => traceback.push_str(&format!(
                "Unknown location (pc=0:{})\n",
                traceback_pc.offset
            )),
        }
    }
    (!traceback.is_empty())
        .then(|| format!("Cairo traceback (most recent call last):\n{traceback}"))
}

// Replaces each `{name}` in the attribute with the value of the reference
// `name`. Only fp-based felt references can be evaluated.
fn substitute_error_message_references(
    error_message_attr: &Attribute,
    runner: &CairoRunner,
) -> String {
    let mut error_msg = error_message_attr.value.clone();
    let Some(tracking_data) = &error_message_attr.flow_tracking_data else {
        return error_msg;
    };
    let mut invalid_references = Vec::<String>::new();
    for (cairo_variable_path, ref_id) in &tracking_data.reference_ids {
        // __main__.main.x -> x
        let cairo_variable_name = match cairo_variable_path.rsplit('.').next() {
            Some(string) => string,
            None => continue,
        };
        let placeholder = format!("{{{cairo_variable_name}}}");
        if !error_msg.contains(&placeholder) {
            continue;
        }
        match get_value_from_simple_reference(*ref_id, &tracking_data.ap_tracking, runner) {
            Some(value) => error_msg = error_msg.replace(&placeholder, &format!("{value}")),
            None => invalid_references.push(cairo_variable_name.to_string()),
        }
    }
    if !invalid_references.is_empty() {
        error_msg.push_str(&format!(
            " (Cannot evaluate ap-based or complex references: [{}])",
            invalid_references
                .iter()
                .fold(String::new(), |acc, arg| acc + &format!("'{arg}'"))
        ));
    }
    error_msg
}

fn get_value_from_simple_reference(
    ref_id: usize,
    ap_tracking: &ApTracking,
    runner: &CairoRunner,
) -> Option<MaybeRelocatable> {
    let reference = runner
        .program
        .shared_program_data
        .reference_manager
        .get(ref_id)?;
    if let OffsetValue::Reference(Register::AP, _, _) = reference.offset1 {
        return None;
    }
    match reference.cairo_type {
        Some(ref cairo_type) if cairo_type.contains("felt") => {
            get_maybe_relocatable_from_reference(&runner.vm, reference, ap_tracking)
        }
        _ => None,
    }
}

impl Display for VmException {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let message = format!("Error at pc=0:{}:\n{}", self.pc, self.inner_exc);
        let mut error_msg = String::new();
        if let Some(ref string) = self.error_attr_value {
            error_msg.push_str(string)
        }
        if let Some(ref location) = self.inst_location {
            // Outermost expansion first.
            let mut location_msg = String::new();
            let (mut location, mut message) = (location, &message);
            loop {
                location_msg = format!(
                    "{}\n{}",
                    location.to_string_with_content(message),
                    location_msg
                );
                match &location.parent_location {
                    Some(parent) => (location, message) = (&parent.0, &parent.1),
                    None => break,
                }
            }
            error_msg.push_str(&location_msg);
        } else {
            error_msg.push_str(&format!("{message}\n"));
        }
        if let Some(ref string) = self.traceback {
            error_msg.push_str(string);
        }
        write!(f, "{error_msg}")
    }
}

impl Location {
    ///  Prints the location with the passed message.
    pub fn to_string(&self, message: &str) -> String {
        let msg_prefix = if message.is_empty() { "" } else { ": " };
        format!(
            "{}:{}:{}{}{}",
            self.input_file.filename, self.start_line, self.start_col, msg_prefix, message
        )
    }

    /// Like [`Location::to_string`], followed by the marked source line when
    /// the input file can be read.
    pub fn to_string_with_content(&self, message: &str) -> String {
        let mut string = self.to_string(message);
        if let Ok(file_content) = std::fs::read(Path::new(&self.input_file.filename)) {
            string.push_str(&format!("\n{}", self.get_location_marks(&file_content)));
        }
        string
    }

    pub fn get_location_marks(&self, file_contents: &[u8]) -> String {
        let contents = str::from_utf8(file_contents).unwrap_or_default();
        let split_lines: Vec<&str> = contents.split('\n').collect();
        if !(0 < self.start_line && ((self.start_line - 1) as usize) < split_lines.len()) {
            return String::new();
        }
        let start_line = split_lines[(self.start_line - 1) as usize];
        let start_col = self.start_col as usize;
        let mut result = format!("{start_line}\n");
        let end_col = if self.start_line == self.end_line {
            self.end_col as usize
        } else {
            start_line.len() + 1
        };
        let left_margin = " ".repeat(start_col.saturating_sub(1));
        if end_col > start_col + 1 {
            let highlight = "*".repeat(end_col - start_col - 2);
            result.push_str(&format!("{left_margin}^{highlight}^"));
        } else {
            result.push_str(&format!("{left_margin}^"))
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;
    use crate::hint_processor::builtin_hint_processor::builtin_hint_processor_definition::BuiltinHintProcessor;
    use crate::serde::deserialize_program::{
        FlowTrackingData, HintLocation, InputFile, InstructionLocation, Reference,
        ReferenceManager, ValueAddress,
    };
    use crate::types::program::Program;
    use crate::types::relocatable::Relocatable;
    use crate::utils::test_utils::*;

    fn location(filename: &str, start: (u32, u32), end: (u32, u32)) -> Location {
        Location {
            end_line: end.0,
            end_col: end.1,
            input_file: InputFile {
                filename: filename.to_string(),
            },
            parent_location: None,
            start_line: start.0,
            start_col: start.1,
        }
    }

    fn operands_error() -> VirtualMachineError {
        VirtualMachineError::FailedToComputeOperands(Box::new((
            "op0".to_string(),
            Relocatable::from((0, 4)),
        )))
    }

    /*Program used (myfunc's first word replaced by an undecodable one):
    func myfunc(a: felt) -> (r: felt):
        with_attr error_message("a = {a}"):
            let b = a * 2
        end
        return(b)
    end

    func main():
        let a = 1
        let b = myfunc(a)
        return()
    end
    */
    fn failing_call_program(
        error_message_attributes: Vec<Attribute>,
        instruction_locations: Option<HashMap<usize, InstructionLocation>>,
    ) -> Program {
        program!(
            data = vec_data!(
                (("9223372036854775808", 10)),
                (2),
                (2345108766317314046_i64),
                (5189976364521848832_i64),
                (1),
                (1226245742482522112_i64),
                ((
                    "3618502788666131213697322783095070105623107215331596699973092056135872020476",
                    10
                )),
                (2345108766317314046_i64)
            ),
            main = Some(3),
            error_message_attributes = error_message_attributes,
            instruction_locations = instruction_locations,
            reference_manager = ReferenceManager {
                references: vec![Reference {
                    ap_tracking_data: ApTracking::default(),
                    pc: Some(0),
                    value_address: ValueAddress {
                        offset1: OffsetValue::Reference(Register::FP, -3, false),
                        offset2: OffsetValue::Value(0),
                        dereference: true,
                        value_type: "felt".to_string(),
                    },
                }],
            },
        )
    }

    fn run_failing(program: &Program) -> (CairoRunner, VirtualMachineError) {
        let mut hint_processor = BuiltinHintProcessor::new_empty();
        let mut runner = cairo_runner!(program);
        let end = runner.initialize().unwrap();
        let error = runner.run_until_pc(end, &mut hint_processor).unwrap_err();
        (runner, error)
    }

    fn attribute(value: &str, reference_ids: HashMap<String, usize>) -> Attribute {
        Attribute {
            name: String::from("error_message"),
            start_pc: 0,
            end_pc: 2,
            value: value.to_string(),
            flow_tracking_data: Some(FlowTrackingData {
                ap_tracking: ApTracking::default(),
                reference_ids,
            }),
        }
    }

    #[test]
    fn get_vm_exception_from_vm_error() {
        let pc = 0;
        let location = location("Folder/file.cairo", (1, 1), (2, 2));
        let instruction_location = InstructionLocation {
            inst: location.clone(),
            hints: vec![],
        };
        let program =
            program!(instruction_locations = Some(HashMap::from([(pc, instruction_location)])),);
        let runner = cairo_runner!(program);
        assert_matches!(
            VmException::from_vm_error(&runner, VirtualMachineError::NoImm),
            VmException {
                pc: x,
                inst_location: Some(y),
                inner_exc: VirtualMachineError::NoImm,
                error_attr_value: None,
                traceback: None,
            } if x == pc && y == location
        )
    }

    #[test]
    fn location_to_string_no_message() {
        let location = location("Folder/file.cairo", (1, 1), (2, 2));
        assert_eq!(location.to_string(""), String::from("Folder/file.cairo:1:1"))
    }

    #[test]
    fn location_to_string_with_message() {
        let location = location("Folder/file.cairo", (1, 1), (2, 2));
        assert_eq!(
            location.to_string("While expanding the reference"),
            String::from("Folder/file.cairo:1:1: While expanding the reference")
        )
    }

    #[test]
    fn display_without_location_or_attributes() {
        let vm_excep = VmException {
            pc: 2,
            inst_location: None,
            inner_exc: operands_error(),
            error_attr_value: None,
            traceback: None,
        };
        assert_eq!(
            vm_excep.to_string(),
            format!("Error at pc=0:2:\n{}\n", operands_error())
        )
    }

    #[test]
    fn display_with_attributes() {
        let vm_excep = VmException {
            pc: 2,
            inst_location: None,
            inner_exc: operands_error(),
            error_attr_value: Some(String::from("Error message: Block may fail\n")),
            traceback: None,
        };
        assert_eq!(
            vm_excep.to_string(),
            format!(
                "Error message: Block may fail\nError at pc=0:2:\n{}\n",
                operands_error()
            )
        )
    }

    #[test]
    fn display_with_location() {
        let vm_excep = VmException {
            pc: 2,
            inst_location: Some(location("Folder/file.cairo", (1, 1), (2, 2))),
            inner_exc: operands_error(),
            error_attr_value: None,
            traceback: None,
        };
        assert_eq!(
            vm_excep.to_string(),
            format!(
                "Folder/file.cairo:1:1: Error at pc=0:2:\n{}\n",
                operands_error()
            )
        )
    }

    #[test]
    fn display_with_parent_location() {
        let mut inst_location = location("Folder/file.cairo", (1, 1), (2, 2));
        inst_location.parent_location = Some((
            Box::new(location("Folder/file_b.cairo", (2, 2), (3, 3))),
            String::from("While expanding the reference:"),
        ));
        let vm_excep = VmException {
            pc: 2,
            inst_location: Some(inst_location),
            inner_exc: operands_error(),
            error_attr_value: None,
            traceback: None,
        };
        assert_eq!(
            vm_excep.to_string(),
            format!(
                "Folder/file_b.cairo:2:2: While expanding the reference:\nFolder/file.cairo:1:1: Error at pc=0:2:\n{}\n",
                operands_error()
            )
        )
    }

    #[test]
    fn get_error_attr_value_in_range() {
        let attributes = vec![Attribute {
            name: String::from("Error message"),
            start_pc: 1,
            end_pc: 5,
            value: String::from("Invalid hash"),
            flow_tracking_data: None,
        }];
        let program = program!(error_message_attributes = attributes,);
        let runner = cairo_runner!(program);
        assert_eq!(
            get_error_attr_value(2, &runner),
            Some(String::from("Error message: Invalid hash\n"))
        );
        assert_eq!(get_error_attr_value(5, &runner), None);
    }

    #[test]
    fn get_error_attr_value_nested_attributes() {
        let attributes = vec![
            Attribute {
                name: String::from("error_message"),
                start_pc: 0,
                end_pc: 10,
                value: String::from("Outer"),
                flow_tracking_data: None,
            },
            Attribute {
                name: String::from("error_message"),
                start_pc: 2,
                end_pc: 4,
                value: String::from("Inner"),
                flow_tracking_data: None,
            },
        ];
        let program = program!(error_message_attributes = attributes,);
        let runner = cairo_runner!(program);
        assert_eq!(
            get_error_attr_value(3, &runner),
            Some(String::from("Error message: Outer\nError message: Inner\n"))
        );
    }

    #[test]
    fn get_location_of_instruction() {
        let location = location("Folder/file.cairo", (1, 1), (2, 2));
        let instruction_location = InstructionLocation {
            inst: location.clone(),
            hints: vec![],
        };
        let program =
            program!(instruction_locations = Some(HashMap::from([(2, instruction_location)])),);
        let runner = cairo_runner!(program);
        assert_eq!(get_location(2, &runner, None), Some(location));
        assert_eq!(get_location(3, &runner, None), None);
    }

    #[test]
    fn get_location_of_hint() {
        let location_b = location("Folder/file_b.cairo", (1, 5), (3, 2));
        let instruction_location = InstructionLocation {
            inst: location("Folder/file_a.cairo", (1, 1), (2, 2)),
            hints: vec![HintLocation {
                location: location_b.clone(),
                n_prefix_newlines: 2,
            }],
        };
        let program =
            program!(instruction_locations = Some(HashMap::from([(2, instruction_location)])),);
        let runner = cairo_runner!(program);
        assert_eq!(get_location(2, &runner, Some(0)), Some(location_b));
        assert_eq!(get_location(2, &runner, Some(1)), None);
    }

    #[test]
    fn traceback_of_failing_call() {
        let program = failing_call_program(Vec::new(), None);
        let (runner, error) = run_failing(&program);
        assert_matches!(error, VirtualMachineError::InstructionNonZeroHighBit);
        assert_eq!(
            get_traceback(&runner),
            Some(String::from(
                "Cairo traceback (most recent call last):\nUnknown location (pc=0:5)\n"
            ))
        );
    }

    #[test]
    fn failing_call_displayed_with_attribute_location_and_traceback() {
        let locations = HashMap::from([
            (
                0,
                InstructionLocation {
                    inst: location("missing/myfunc.cairo", (3, 17), (3, 22)),
                    hints: vec![],
                },
            ),
            (
                5,
                InstructionLocation {
                    inst: location("missing/myfunc.cairo", (9, 13), (9, 22)),
                    hints: vec![],
                },
            ),
        ]);
        let program = failing_call_program(
            vec![attribute(
                "a = {a}",
                HashMap::from([("__main__.myfunc.a".to_string(), 0)]),
            )],
            Some(locations),
        );
        let (runner, error) = run_failing(&program);
        let exception = VmException::from_vm_error(&runner, error);
        assert_eq!(exception.pc, 0);
        assert_eq!(
            exception.to_string(),
            format!(
                "Error message: a = 1\nmissing/myfunc.cairo:3:17: Error at pc=0:0:\n{}\nCairo traceback (most recent call last):\nmissing/myfunc.cairo:9:13: (pc=0:5)\n",
                VirtualMachineError::InstructionNonZeroHighBit
            )
        );
    }

    #[test]
    fn substitute_references_ap_based() {
        let mut program = failing_call_program(Vec::new(), None);
        let mut reference = program.shared_program_data.reference_manager[0].clone();
        reference.offset1 = OffsetValue::Reference(Register::AP, -1, false);
        std::sync::Arc::make_mut(&mut program.shared_program_data).reference_manager =
            vec![reference];
        let (runner, _) = run_failing(&program);
        let attribute = attribute(
            "a = {a}",
            HashMap::from([("__main__.myfunc.a".to_string(), 0)]),
        );
        assert_eq!(
            get_value_from_simple_reference(0, &ApTracking::default(), &runner),
            None
        );
        assert_eq!(
            substitute_error_message_references(&attribute, &runner),
            "a = {a} (Cannot evaluate ap-based or complex references: ['a'])"
        );
    }

    #[test]
    fn substitute_references_complex_type() {
        let mut program = failing_call_program(Vec::new(), None);
        let mut reference = program.shared_program_data.reference_manager[0].clone();
        reference.cairo_type = Some("__main__.Cat".to_string());
        std::sync::Arc::make_mut(&mut program.shared_program_data).reference_manager =
            vec![reference];
        let (runner, _) = run_failing(&program);
        let attribute = attribute(
            "cat = {cat}",
            HashMap::from([("__main__.main.cat".to_string(), 0)]),
        );
        assert_eq!(
            substitute_error_message_references(&attribute, &runner),
            "cat = {cat} (Cannot evaluate ap-based or complex references: ['cat'])"
        );
    }

    #[test]
    fn substitute_references_ignores_unmentioned_variables() {
        let program = failing_call_program(Vec::new(), None);
        let (runner, _) = run_failing(&program);
        let attribute = attribute(
            "Value out of range",
            HashMap::from([("__main__.myfunc.a".to_string(), 0)]),
        );
        assert_eq!(
            substitute_error_message_references(&attribute, &runner),
            "Value out of range"
        );
    }

    #[test]
    fn location_to_string_with_content_without_file() {
        let location = location("missing/bad_usort.cairo", (5, 1), (5, 2));
        assert_eq!(
            location.to_string_with_content("Error at pc=0:75:"),
            String::from("missing/bad_usort.cairo:5:1: Error at pc=0:75:")
        )
    }

    #[test]
    fn location_to_string_with_content_from_file() {
        let path = std::env::temp_dir().join("vm_exception_location_marks.cairo");
        std::fs::write(&path, "func main() {\n    assert x = 5;\n}\n").unwrap();
        let filename = path.to_string_lossy().to_string();
        let location = location(&filename, (2, 5), (2, 18));
        assert_eq!(
            location.to_string_with_content("Error at pc=0:3:"),
            format!("{filename}:2:5: Error at pc=0:3:\n    assert x = 5;\n    ^***********^")
        );
    }

    #[test]
    fn location_marks_multiline() {
        let location = location("file.cairo", (1, 1), (2, 2));
        assert_eq!(
            location.get_location_marks(b"func usort{range_check_ptr}() {\n}"),
            String::from("func usort{range_check_ptr}() {\n^*****************************^")
        )
    }

    #[test]
    fn location_marks_single_column() {
        let location = location("file.cairo", (1, 3), (1, 4));
        assert_eq!(location.get_location_marks(b"let x;"), String::from("let x;\n  ^"))
    }

    #[test]
    fn location_marks_empty_file() {
        let location = location("file.cairo", (5, 1), (5, 2));
        assert_eq!(location.get_location_marks(&[]), String::new())
    }
}
