use std::collections::HashMap;

use crate::{
    types::relocatable::{MaybeRelocatable, Relocatable},
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
};

/// Keeps the host-side contents of every dict a program creates, keyed by
/// the index of the segment holding the dict's `DictAccess` records.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct DictManager {
    pub trackers: HashMap<isize, DictTracker>,
}

/// One dict access as logged by the tracker, in write order.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TrackedAccess {
    pub key: MaybeRelocatable,
    pub prev_value: MaybeRelocatable,
    pub new_value: MaybeRelocatable,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct DictTracker {
    pub data: Dictionary,
    // First unused address of the dict segment.
    pub current_ptr: Relocatable,
    pub accesses: Vec<TrackedAccess>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Dictionary {
    SimpleDictionary(HashMap<MaybeRelocatable, MaybeRelocatable>),
    DefaultDictionary {
        dict: HashMap<MaybeRelocatable, MaybeRelocatable>,
        default_value: MaybeRelocatable,
    },
}

impl Dictionary {
    fn get(&mut self, key: &MaybeRelocatable) -> Option<&MaybeRelocatable> {
        match self {
            Self::SimpleDictionary(dict) => dict.get(key),
            Self::DefaultDictionary {
                dict,
                default_value,
            } => Some(
                dict.entry(key.clone())
                    .or_insert_with(|| default_value.clone()),
            ),
        }
    }

    fn insert(&mut self, key: &MaybeRelocatable, value: &MaybeRelocatable) {
        let dict = match self {
            Self::SimpleDictionary(dict) => dict,
            Self::DefaultDictionary { dict, .. } => dict,
        };
        dict.insert(key.clone(), value.clone());
    }
}

impl DictManager {
    pub fn new() -> Self {
        DictManager {
            trackers: HashMap::new(),
        }
    }

    /// Allocates a segment for a new dict and starts tracking it with
    /// `initial_dict` as its contents.
    pub fn new_dict(
        &mut self,
        vm: &mut VirtualMachine,
        initial_dict: HashMap<MaybeRelocatable, MaybeRelocatable>,
    ) -> Result<MaybeRelocatable, HintError> {
        let base = self.reserve_segment(vm)?;
        self.trackers
            .insert(base.segment_index, DictTracker::new_with_initial(base, initial_dict));
        Ok(MaybeRelocatable::RelocatableValue(base))
    }

    /// Like `new_dict`, but reads of missing keys yield `default_value`.
    pub fn new_default_dict(
        &mut self,
        vm: &mut VirtualMachine,
        default_value: &MaybeRelocatable,
        initial_dict: Option<HashMap<MaybeRelocatable, MaybeRelocatable>>,
    ) -> Result<MaybeRelocatable, HintError> {
        let base = self.reserve_segment(vm)?;
        self.trackers.insert(
            base.segment_index,
            DictTracker::new_default_dict(base, default_value, initial_dict),
        );
        Ok(MaybeRelocatable::RelocatableValue(base))
    }

    fn reserve_segment(&self, vm: &mut VirtualMachine) -> Result<Relocatable, HintError> {
        let base = vm.add_memory_segment();
        if self.trackers.contains_key(&base.segment_index) {
            return Err(HintError::CantCreateDictionaryOnTakenSegment(
                base.segment_index,
            ));
        }
        Ok(base)
    }

    /// The tracker of the dict `dict_ptr` points into. `dict_ptr` must be
    /// the tracker's current end.
    pub fn get_tracker_mut(&mut self, dict_ptr: Relocatable) -> Result<&mut DictTracker, HintError> {
        let tracker = self
            .trackers
            .get_mut(&dict_ptr.segment_index)
            .ok_or(HintError::NoDictTracker(dict_ptr.segment_index))?;
        if tracker.current_ptr != dict_ptr {
            return Err(HintError::MismatchedDictPtr(Box::new((
                tracker.current_ptr,
                dict_ptr,
            ))));
        }
        Ok(tracker)
    }

    pub fn get_tracker(&self, dict_ptr: Relocatable) -> Result<&DictTracker, HintError> {
        let tracker = self
            .trackers
            .get(&dict_ptr.segment_index)
            .ok_or(HintError::NoDictTracker(dict_ptr.segment_index))?;
        if tracker.current_ptr != dict_ptr {
            return Err(HintError::MismatchedDictPtr(Box::new((
                tracker.current_ptr,
                dict_ptr,
            ))));
        }
        Ok(tracker)
    }
}

impl DictTracker {
    pub fn new_empty(base: Relocatable) -> Self {
        DictTracker::new_with_initial(base, HashMap::new())
    }

    pub fn new_default_dict(
        base: Relocatable,
        default_value: &MaybeRelocatable,
        initial_dict: Option<HashMap<MaybeRelocatable, MaybeRelocatable>>,
    ) -> Self {
        DictTracker {
            data: Dictionary::DefaultDictionary {
                dict: initial_dict.unwrap_or_default(),
                default_value: default_value.clone(),
            },
            current_ptr: base,
            accesses: Vec::new(),
        }
    }

    pub fn new_with_initial(
        base: Relocatable,
        initial_dict: HashMap<MaybeRelocatable, MaybeRelocatable>,
    ) -> Self {
        DictTracker {
            data: Dictionary::SimpleDictionary(initial_dict),
            current_ptr: base,
            accesses: Vec::new(),
        }
    }

    /// The current contents, without the default value of a default dict.
    pub fn get_dictionary_copy(&self) -> HashMap<MaybeRelocatable, MaybeRelocatable> {
        match &self.data {
            Dictionary::SimpleDictionary(dict) => dict.clone(),
            Dictionary::DefaultDictionary { dict, .. } => dict.clone(),
        }
    }

    pub fn get_value(&mut self, key: &MaybeRelocatable) -> Result<&MaybeRelocatable, HintError> {
        self.data
            .get(key)
            .ok_or_else(|| HintError::NoValueForKey(Box::new(key.clone())))
    }

    pub fn insert_value(&mut self, key: &MaybeRelocatable, val: &MaybeRelocatable) {
        self.data.insert(key, val)
    }

    /// Stores `new_value` under `key` and appends the access to the log.
    pub fn record_access(
        &mut self,
        key: &MaybeRelocatable,
        prev_value: &MaybeRelocatable,
        new_value: &MaybeRelocatable,
    ) {
        self.data.insert(key, new_value);
        self.accesses.push(TrackedAccess {
            key: key.clone(),
            prev_value: prev_value.clone(),
            new_value: new_value.clone(),
        });
    }
}
