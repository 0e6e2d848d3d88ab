use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
    hint_processor::builtin_hint_processor::dict_manager::DictManager,
    types::relocatable::{MaybeRelocatable, Relocatable},
    vm::errors::{exec_scope_errors::ExecScopeError, hint_errors::HintError},
    Felt252,
};

/// Every shape of value a hint may keep in an execution scope.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeValue {
    Felt(Felt252),
    Relocatable(Relocatable),
    Sequence(Vec<Felt252>),
    Mapping(HashMap<Felt252, Vec<Felt252>>),
    Dict(HashMap<MaybeRelocatable, MaybeRelocatable>),
    DictManager(Rc<RefCell<DictManager>>),
}

impl ScopeValue {
    fn kind(&self) -> &'static str {
        match self {
            ScopeValue::Felt(_) => "felt",
            ScopeValue::Relocatable(_) => "relocatable",
            ScopeValue::Sequence(_) => "sequence",
            ScopeValue::Mapping(_) => "mapping",
            ScopeValue::Dict(_) => "dict",
            ScopeValue::DictManager(_) => "dict manager",
        }
    }
}

impl From<Felt252> for ScopeValue {
    fn from(value: Felt252) -> Self {
        ScopeValue::Felt(value)
    }
}

impl From<Relocatable> for ScopeValue {
    fn from(value: Relocatable) -> Self {
        ScopeValue::Relocatable(value)
    }
}

impl From<Vec<Felt252>> for ScopeValue {
    fn from(value: Vec<Felt252>) -> Self {
        ScopeValue::Sequence(value)
    }
}

impl From<HashMap<Felt252, Vec<Felt252>>> for ScopeValue {
    fn from(value: HashMap<Felt252, Vec<Felt252>>) -> Self {
        ScopeValue::Mapping(value)
    }
}

impl From<HashMap<MaybeRelocatable, MaybeRelocatable>> for ScopeValue {
    fn from(value: HashMap<MaybeRelocatable, MaybeRelocatable>) -> Self {
        ScopeValue::Dict(value)
    }
}

impl From<Rc<RefCell<DictManager>>> for ScopeValue {
    fn from(value: Rc<RefCell<DictManager>>) -> Self {
        ScopeValue::DictManager(value)
    }
}

const DICT_MANAGER: &str = "dict_manager";

/// The stack of variable scopes hints share during a run. The bottom scope
/// (the main scope) can never be exited.
#[derive(Debug)]
pub struct ExecutionScopes {
    pub data: Vec<HashMap<String, ScopeValue>>,
}

impl ExecutionScopes {
    pub fn new() -> ExecutionScopes {
        ExecutionScopes {
            data: vec![HashMap::new()],
        }
    }

    pub fn enter_scope(&mut self, new_scope_locals: HashMap<String, ScopeValue>) {
        self.data.push(new_scope_locals);
    }

    pub fn exit_scope(&mut self) -> Result<(), ExecScopeError> {
        if self.data.len() == 1 {
            return Err(ExecScopeError::ExitMainScopeError);
        }
        self.data.pop();

        Ok(())
    }

    ///Returns a mutable reference to the dictionary containing the variables present in the current scope
    pub fn get_local_variables_mut(
        &mut self,
    ) -> Result<&mut HashMap<String, ScopeValue>, HintError> {
        self.data
            .last_mut()
            .ok_or(HintError::FromScopeError(ExecScopeError::NoScopeError))
    }

    ///Returns a dictionary containing the variables present in the current scope
    pub fn get_local_variables(&self) -> Result<&HashMap<String, ScopeValue>, HintError> {
        self.data
            .last()
            .ok_or(HintError::FromScopeError(ExecScopeError::NoScopeError))
    }

    ///Removes a variable from the current scope given its name
    pub fn delete_variable(&mut self, var_name: &str) {
        if let Ok(local_variables) = self.get_local_variables_mut() {
            local_variables.remove(var_name);
        }
    }

    ///Creates or updates an existing variable given its name and value
    pub fn assign_or_update_variable(&mut self, var_name: &str, var_value: ScopeValue) {
        if let Ok(local_variables) = self.get_local_variables_mut() {
            local_variables.insert(var_name.to_string(), var_value);
        }
    }

    pub fn insert_value<T: Into<ScopeValue>>(&mut self, name: &str, value: T) {
        self.assign_or_update_variable(name, value.into());
    }

    pub fn get_value(&self, name: &str) -> Result<&ScopeValue, HintError> {
        self.get_local_variables()?
            .get(name)
            .ok_or_else(|| HintError::VariableNotInScopeError(name.into()))
    }

    fn get_value_mut(&mut self, name: &str) -> Result<&mut ScopeValue, HintError> {
        self.get_local_variables_mut()?
            .get_mut(name)
            .ok_or_else(|| HintError::VariableNotInScopeError(name.into()))
    }

    pub fn get_felt(&self, name: &str) -> Result<Felt252, HintError> {
        match self.get_value(name)? {
            ScopeValue::Felt(felt) => Ok(*felt),
            other => Err(wrong_type(name, other)),
        }
    }

    pub fn get_relocatable(&self, name: &str) -> Result<Relocatable, HintError> {
        match self.get_value(name)? {
            ScopeValue::Relocatable(addr) => Ok(*addr),
            other => Err(wrong_type(name, other)),
        }
    }

    pub fn get_sequence(&self, name: &str) -> Result<&Vec<Felt252>, HintError> {
        match self.get_value(name)? {
            ScopeValue::Sequence(seq) => Ok(seq),
            other => Err(wrong_type(name, other)),
        }
    }

    pub fn get_sequence_mut(&mut self, name: &str) -> Result<&mut Vec<Felt252>, HintError> {
        match self.get_value_mut(name)? {
            ScopeValue::Sequence(seq) => Ok(seq),
            other => Err(wrong_type(name, other)),
        }
    }

    pub fn get_mapping(&self, name: &str) -> Result<&HashMap<Felt252, Vec<Felt252>>, HintError> {
        match self.get_value(name)? {
            ScopeValue::Mapping(map) => Ok(map),
            other => Err(wrong_type(name, other)),
        }
    }

    pub fn get_mapping_mut(
        &mut self,
        name: &str,
    ) -> Result<&mut HashMap<Felt252, Vec<Felt252>>, HintError> {
        match self.get_value_mut(name)? {
            ScopeValue::Mapping(map) => Ok(map),
            other => Err(wrong_type(name, other)),
        }
    }

    pub fn get_dict(
        &self,
        name: &str,
    ) -> Result<&HashMap<MaybeRelocatable, MaybeRelocatable>, HintError> {
        match self.get_value(name)? {
            ScopeValue::Dict(dict) => Ok(dict),
            other => Err(wrong_type(name, other)),
        }
    }

    ///Returns the dict manager shared by every dict hint of the run
    pub fn get_dict_manager(&self) -> Result<Rc<RefCell<DictManager>>, HintError> {
        match self.get_value(DICT_MANAGER)? {
            ScopeValue::DictManager(manager) => Ok(Rc::clone(manager)),
            other => Err(wrong_type(DICT_MANAGER, other)),
        }
    }
}

fn wrong_type(name: &str, found: &ScopeValue) -> HintError {
    HintError::WrongScopeValueType(Box::new((name.to_string(), found.kind())))
}

impl Default for ExecutionScopes {
    fn default() -> Self {
        Self::new()
    }
}
