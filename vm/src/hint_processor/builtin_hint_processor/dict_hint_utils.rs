use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
    hint_processor::{
        builtin_hint_processor::{
            dict_manager::DictManager,
            hint_utils::{
                get_maybe_relocatable_from_var_name, get_ptr_from_var_name,
                insert_value_from_var_name, insert_value_into_ap,
            },
        },
        hint_processor_definition::HintReference,
    },
    serde::deserialize_program::ApTracking,
    types::{
        exec_scope::{ExecutionScopes, ScopeValue},
        relocatable::MaybeRelocatable,
    },
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
};

// DictAccess is (key, prev_value, new_value).
pub const DICT_ACCESS_SIZE: usize = 3;

const INITIAL_DICT: &str = "initial_dict";
const DICT_MANAGER: &str = "dict_manager";

fn take_initial_dict(
    exec_scopes: &mut ExecutionScopes,
) -> Option<HashMap<MaybeRelocatable, MaybeRelocatable>> {
    let initial_dict = exec_scopes.get_dict(INITIAL_DICT).ok()?.clone();
    exec_scopes.delete_variable(INITIAL_DICT);
    Some(initial_dict)
}

/// The dict manager of the current scope, created on first use.
fn dict_manager_or_default(exec_scopes: &mut ExecutionScopes) -> Rc<RefCell<DictManager>> {
    match exec_scopes.get_dict_manager() {
        Ok(dict_manager) => dict_manager,
        Err(_) => {
            let dict_manager = Rc::new(RefCell::new(DictManager::new()));
            exec_scopes.insert_value(DICT_MANAGER, Rc::clone(&dict_manager));
            dict_manager
        }
    }
}

/*Implements hint:
   if '__dict_manager' not in globals():
       from starkware.cairo.common.dict import DictManager
       __dict_manager = DictManager()

   memory[ap] = __dict_manager.new_dict(segments, initial_dict)
   del initial_dict
*/
pub fn dict_new(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
) -> Result<(), HintError> {
    let initial_dict = take_initial_dict(exec_scopes).ok_or(HintError::NoInitialDict)?;
    let base = dict_manager_or_default(exec_scopes)
        .borrow_mut()
        .new_dict(vm, initial_dict)?;
    insert_value_into_ap(vm, base)
}

/*Implements hint:
   if '__dict_manager' not in globals():
       from starkware.cairo.common.dict import DictManager
       __dict_manager = DictManager()

   memory[ap] = __dict_manager.new_default_dict(segments, ids.default_value)
*/
pub fn default_dict_new(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let default_value =
        get_maybe_relocatable_from_var_name("default_value", vm, ids_data, ap_tracking)?;
    let initial_dict = take_initial_dict(exec_scopes);
    let base = dict_manager_or_default(exec_scopes)
        .borrow_mut()
        .new_default_dict(vm, &default_value, initial_dict)?;
    insert_value_into_ap(vm, base)
}

/* Implements hint:
   dict_tracker = __dict_manager.get_tracker(ids.dict_ptr)
   dict_tracker.current_ptr += ids.DictAccess.SIZE
   ids.value = dict_tracker.data[ids.key]
*/
pub fn dict_read(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let key = get_maybe_relocatable_from_var_name("key", vm, ids_data, ap_tracking)?;
    let dict_ptr = get_ptr_from_var_name("dict_ptr", vm, ids_data, ap_tracking)?;
    let dict_manager_ref = exec_scopes.get_dict_manager()?;
    let mut dict_manager = dict_manager_ref.borrow_mut();
    let tracker = dict_manager.get_tracker_mut(dict_ptr)?;
    tracker.current_ptr = (tracker.current_ptr + DICT_ACCESS_SIZE)?;
    let value = tracker.get_value(&key)?.clone();
    tracker.record_access(&key, &value, &value);
    insert_value_from_var_name("value", value, vm, ids_data, ap_tracking)
}

/* Implements hint:
   dict_tracker = __dict_manager.get_tracker(ids.dict_ptr)
   dict_tracker.current_ptr += ids.DictAccess.SIZE
   ids.dict_ptr.prev_value = dict_tracker.data[ids.key]
   dict_tracker.data[ids.key] = ids.new_value
*/
pub fn dict_write(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let key = get_maybe_relocatable_from_var_name("key", vm, ids_data, ap_tracking)?;
    let new_value = get_maybe_relocatable_from_var_name("new_value", vm, ids_data, ap_tracking)?;
    let dict_ptr = get_ptr_from_var_name("dict_ptr", vm, ids_data, ap_tracking)?;
    let dict_manager_ref = exec_scopes.get_dict_manager()?;
    let mut dict_manager = dict_manager_ref.borrow_mut();
    let tracker = dict_manager.get_tracker_mut(dict_ptr)?;
    tracker.current_ptr = (tracker.current_ptr + DICT_ACCESS_SIZE)?;
    let prev_value = tracker.get_value(&key)?.clone();
    tracker.record_access(&key, &prev_value, &new_value);
    // dict_ptr.prev_value is the second member of DictAccess.
    vm.insert_value((dict_ptr + 1_usize)?, prev_value)?;
    Ok(())
}

/* Implements hint:
   # Verify dict pointer and prev value.
   dict_tracker = __dict_manager.get_tracker(ids.dict_ptr)
   current_value = dict_tracker.data[ids.key]
   assert current_value == ids.prev_value, \
       f'Wrong previous value in dict. Got {ids.prev_value}, expected {current_value}.'

   # Update value.
   dict_tracker.data[ids.key] = ids.new_value
   dict_tracker.current_ptr += ids.DictAccess.SIZE
*/
pub fn dict_update(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let key = get_maybe_relocatable_from_var_name("key", vm, ids_data, ap_tracking)?;
    let prev_value = get_maybe_relocatable_from_var_name("prev_value", vm, ids_data, ap_tracking)?;
    let new_value = get_maybe_relocatable_from_var_name("new_value", vm, ids_data, ap_tracking)?;
    let dict_ptr = get_ptr_from_var_name("dict_ptr", vm, ids_data, ap_tracking)?;

    let dict_manager_ref = exec_scopes.get_dict_manager()?;
    let mut dict_manager = dict_manager_ref.borrow_mut();
    let tracker = dict_manager.get_tracker_mut(dict_ptr)?;
    let current_value = tracker.get_value(&key)?;
    if current_value != &prev_value {
        return Err(HintError::WrongPrevValue(Box::new((
            prev_value,
            current_value.clone(),
            key,
        ))));
    }
    tracker.record_access(&key, &prev_value, &new_value);
    tracker.current_ptr = (tracker.current_ptr + DICT_ACCESS_SIZE)?;
    Ok(())
}

/* Implements hint:
   # Prepare arguments for dict_new. In particular, the same dictionary values should be copied
   # to the new (squashed) dictionary.
   vm_enter_scope({
       # Make __dict_manager accessible.
       '__dict_manager': __dict_manager,
       # Create a copy of the dict, in case it changes in the future.
       'initial_dict': dict(__dict_manager.get_dict(ids.dict_accesses_end)),
   })
*/
pub fn dict_squash_copy_dict(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let dict_accesses_end = get_ptr_from_var_name("dict_accesses_end", vm, ids_data, ap_tracking)?;
    let dict_manager_ref = exec_scopes.get_dict_manager()?;
    let dict_copy = dict_manager_ref
        .borrow()
        .get_tracker(dict_accesses_end)?
        .get_dictionary_copy();
    exec_scopes.enter_scope(HashMap::from([
        (
            String::from(DICT_MANAGER),
            ScopeValue::DictManager(dict_manager_ref),
        ),
        (String::from(INITIAL_DICT), ScopeValue::Dict(dict_copy)),
    ]));
    Ok(())
}

/* Implements hint:
   # Update the DictTracker's current_ptr to point to the end of the squashed dict.
   __dict_manager.get_tracker(ids.squashed_dict_start).current_ptr = \
       ids.squashed_dict_end.address_
*/
pub fn dict_squash_update_ptr(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let squashed_dict_start =
        get_ptr_from_var_name("squashed_dict_start", vm, ids_data, ap_tracking)?;
    let squashed_dict_end = get_ptr_from_var_name("squashed_dict_end", vm, ids_data, ap_tracking)?;
    exec_scopes
        .get_dict_manager()?
        .borrow_mut()
        .get_tracker_mut(squashed_dict_start)?
        .current_ptr = squashed_dict_end;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hint_processor::builtin_hint_processor::{
        dict_manager::{DictTracker, Dictionary},
        hint_code,
    };
    use crate::types::relocatable::Relocatable;
    use crate::vm::errors::memory_errors::MemoryError;
    use crate::{relocatable, utils::test_utils::*};
    use assert_matches::assert_matches;

    #[test]
    fn dict_new_with_empty_initial_dict() {
        let mut vm = vm!();
        add_segments!(vm, 2);
        vm.run_context.ap = relocatable!(1, 0);
        let mut exec_scopes = scope![(
            "initial_dict",
            HashMap::<MaybeRelocatable, MaybeRelocatable>::new()
        )];
        run_hint!(vm, HashMap::new(), hint_code::DICT_NEW, &mut exec_scopes).unwrap();
        assert_eq!(vm.segments.num_segments(), 3);
        check_memory![vm.segments.memory, ((1, 0), (2, 0))];
        assert_eq!(
            exec_scopes
                .get_dict_manager()
                .unwrap()
                .borrow()
                .trackers
                .get(&2),
            Some(&DictTracker::new_empty(relocatable!(2, 0)))
        );
        // The initial dict is consumed.
        assert!(exec_scopes.get_dict("initial_dict").is_err());
    }

    #[test]
    fn dict_new_without_initial_dict() {
        let mut vm = vm!();
        assert_matches!(
            run_hint!(vm, HashMap::new(), hint_code::DICT_NEW),
            Err(HintError::NoInitialDict)
        );
    }

    #[test]
    fn dict_new_ap_is_taken() {
        let mut vm = vm!();
        vm.run_context.ap = relocatable!(1, 0);
        vm.segments = segments![((1, 0), 1)];
        let mut exec_scopes = scope![(
            "initial_dict",
            HashMap::<MaybeRelocatable, MaybeRelocatable>::new()
        )];
        assert_matches!(
            run_hint!(vm, HashMap::new(), hint_code::DICT_NEW, &mut exec_scopes),
            Err(HintError::Memory(MemoryError::InconsistentMemory(bx)))
                if *bx == (Relocatable::from((1, 0)),
                    MaybeRelocatable::from(crate::Felt252::ONE),
                    MaybeRelocatable::from((2, 0)))
        );
    }

    #[test]
    fn dict_new_reuses_dict_manager() {
        let mut vm = vm!();
        add_segments!(vm, 2);
        vm.run_context.ap = relocatable!(1, 0);
        let mut exec_scopes = ExecutionScopes::new();
        dict_manager!(&mut exec_scopes, 7);
        exec_scopes.insert_value(
            "initial_dict",
            HashMap::from([(mayberelocatable!(1), mayberelocatable!(2))]),
        );
        run_hint!(vm, HashMap::new(), hint_code::DICT_NEW, &mut exec_scopes).unwrap();
        let dict_manager = exec_scopes.get_dict_manager().unwrap();
        assert_eq!(dict_manager.borrow().trackers.len(), 2);
        check_dictionary!(&exec_scopes, 2, (1, 2));
    }

    #[test]
    fn default_dict_new() {
        let mut vm = vm!();
        run_context!(vm, 0, 1, 1);
        vm.segments = segments![((1, 0), 17)];
        let ids_data = ids_data!["default_value"];
        let mut exec_scopes = ExecutionScopes::new();
        run_hint!(vm, ids_data, hint_code::DEFAULT_DICT_NEW, &mut exec_scopes).unwrap();
        check_memory![vm.segments.memory, ((1, 1), (2, 0))];
        assert_eq!(
            exec_scopes.get_dict_manager().unwrap().borrow().trackers[&2].data,
            Dictionary::DefaultDictionary {
                dict: HashMap::new(),
                default_value: mayberelocatable!(17),
            }
        );
    }

    #[test]
    fn default_dict_new_missing_default_value() {
        let mut vm = vm!();
        run_context!(vm, 0, 1, 1);
        add_segments!(vm, 2);
        let ids_data = ids_data!["default_value"];
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::DEFAULT_DICT_NEW),
            Err(HintError::UnknownIdentifier(bx)) if bx.as_ref() == "default_value"
        );
    }

    #[test]
    fn dict_read_valid() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 3);
        vm.segments = segments![((1, 0), 5), ((1, 2), (2, 0))];
        add_segments!(vm, 1);
        let ids_data = ids_data!["key", "value", "dict_ptr"];
        let mut exec_scopes = ExecutionScopes::new();
        dict_manager!(&mut exec_scopes, 2, (5, 12));
        run_hint!(vm, ids_data, hint_code::DICT_READ, &mut exec_scopes).unwrap();
        check_memory![vm.segments.memory, ((1, 1), 12)];
        check_dict_ptr!(&exec_scopes, 2, (2, 3));
    }

    #[test]
    fn dict_read_missing_key() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 3);
        vm.segments = segments![((1, 0), 6), ((1, 2), (2, 0))];
        let ids_data = ids_data!["key", "value", "dict_ptr"];
        let mut exec_scopes = ExecutionScopes::new();
        dict_manager!(&mut exec_scopes, 2, (5, 12));
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::DICT_READ, &mut exec_scopes),
            Err(HintError::NoValueForKey(bx)) if *bx == mayberelocatable!(6)
        );
    }

    #[test]
    fn dict_read_default_dict() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 3);
        vm.segments = segments![((1, 0), 6), ((1, 2), (2, 0))];
        add_segments!(vm, 1);
        let ids_data = ids_data!["key", "value", "dict_ptr"];
        let mut exec_scopes = ExecutionScopes::new();
        dict_manager_default!(&mut exec_scopes, 2, 17);
        run_hint!(vm, ids_data, hint_code::DICT_READ, &mut exec_scopes).unwrap();
        check_memory![vm.segments.memory, ((1, 1), 17)];
    }

    #[test]
    fn dict_read_no_tracker() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 3);
        let mut exec_scopes = scope![("dict_manager", Rc::new(RefCell::new(DictManager::new())))];
        vm.segments = segments![((1, 0), 6), ((1, 2), (2, 0))];
        let ids_data = ids_data!["key", "value", "dict_ptr"];
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::DICT_READ, &mut exec_scopes),
            Err(HintError::NoDictTracker(2))
        );
    }

    #[test]
    fn dict_read_without_dict_manager() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 3);
        vm.segments = segments![((1, 0), 6), ((1, 2), (2, 0))];
        let ids_data = ids_data!["key", "value", "dict_ptr"];
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::DICT_READ),
            Err(HintError::VariableNotInScopeError(bx)) if bx.as_ref() == "dict_manager"
        );
    }

    #[test]
    fn dict_write_default_dict() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 3);
        // key = 5, new_value = 17, dict_ptr = (2, 0)
        vm.segments = segments![((1, 0), 5), ((1, 1), 17), ((1, 2), (2, 0))];
        add_segments!(vm, 1);
        let ids_data = ids_data!["key", "new_value", "dict_ptr"];
        let mut exec_scopes = ExecutionScopes::new();
        dict_manager_default!(&mut exec_scopes, 2, 2);
        run_hint!(vm, ids_data, hint_code::DICT_WRITE, &mut exec_scopes).unwrap();
        check_dictionary!(&exec_scopes, 2, (5, 17));
        check_dict_ptr!(&exec_scopes, 2, (2, 3));
        // prev_value holds the default.
        check_memory![vm.segments.memory, ((2, 1), 2)];
    }

    #[test]
    fn dict_write_logs_access() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 3);
        vm.segments = segments![((1, 0), 5), ((1, 1), 20), ((1, 2), (2, 0))];
        add_segments!(vm, 1);
        let ids_data = ids_data!["key", "new_value", "dict_ptr"];
        let mut exec_scopes = ExecutionScopes::new();
        dict_manager!(&mut exec_scopes, 2, (5, 10));
        run_hint!(vm, ids_data, hint_code::DICT_WRITE, &mut exec_scopes).unwrap();
        check_memory![vm.segments.memory, ((2, 1), 10)];
        let dict_manager = exec_scopes.get_dict_manager().unwrap();
        let dict_manager = dict_manager.borrow();
        let access = &dict_manager.trackers[&2].accesses[0];
        assert_eq!(access.key, mayberelocatable!(5));
        assert_eq!(access.prev_value, mayberelocatable!(10));
        assert_eq!(access.new_value, mayberelocatable!(20));
    }

    #[test]
    fn dict_write_mismatched_ptr() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 3);
        vm.segments = segments![((1, 0), 5), ((1, 1), 17), ((1, 2), (2, 3))];
        add_segments!(vm, 1);
        let ids_data = ids_data!["key", "new_value", "dict_ptr"];
        let mut exec_scopes = ExecutionScopes::new();
        dict_manager!(&mut exec_scopes, 2, (5, 10));
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::DICT_WRITE, &mut exec_scopes),
            Err(HintError::MismatchedDictPtr(bx)) if *bx == (relocatable!(2, 0), relocatable!(2, 3))
        );
    }

    #[test]
    fn dict_update_valid() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 4);
        // key = 1, prev_value = 2, new_value = 20, dict_ptr = (2, 0)
        vm.segments = segments![((1, 0), 1), ((1, 1), 2), ((1, 2), 20), ((1, 3), (2, 0))];
        add_segments!(vm, 1);
        let ids_data = ids_data!["key", "prev_value", "new_value", "dict_ptr"];
        let mut exec_scopes = ExecutionScopes::new();
        dict_manager!(&mut exec_scopes, 2, (1, 2));
        run_hint!(vm, ids_data, hint_code::DICT_UPDATE, &mut exec_scopes).unwrap();
        check_dictionary!(&exec_scopes, 2, (1, 20));
        check_dict_ptr!(&exec_scopes, 2, (2, 3));
    }

    #[test]
    fn dict_update_wrong_prev_value() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 4);
        vm.segments = segments![((1, 0), 1), ((1, 1), 3), ((1, 2), 20), ((1, 3), (2, 0))];
        add_segments!(vm, 1);
        let ids_data = ids_data!["key", "prev_value", "new_value", "dict_ptr"];
        let mut exec_scopes = ExecutionScopes::new();
        dict_manager!(&mut exec_scopes, 2, (1, 2));
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::DICT_UPDATE, &mut exec_scopes),
            Err(HintError::WrongPrevValue(bx))
                if *bx == (mayberelocatable!(3), mayberelocatable!(2), mayberelocatable!(1))
        );
    }

    #[test]
    fn dict_update_default_dict_missing_key() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 4);
        vm.segments = segments![((1, 0), 9), ((1, 1), 0), ((1, 2), 4), ((1, 3), (2, 0))];
        add_segments!(vm, 1);
        let ids_data = ids_data!["key", "prev_value", "new_value", "dict_ptr"];
        let mut exec_scopes = ExecutionScopes::new();
        dict_manager_default!(&mut exec_scopes, 2, 0);
        run_hint!(vm, ids_data, hint_code::DICT_UPDATE, &mut exec_scopes).unwrap();
        check_dictionary!(&exec_scopes, 2, (9, 4));
    }

    #[test]
    fn squash_copy_dict_enters_scope() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 1);
        vm.segments = segments![((1, 0), (2, 0))];
        let ids_data = ids_data!["dict_accesses_end"];
        let mut exec_scopes = ExecutionScopes::new();
        dict_manager!(&mut exec_scopes, 2, (1, 2), (3, 4));
        run_hint!(vm, ids_data, hint_code::DICT_SQUASH_COPY_DICT, &mut exec_scopes).unwrap();
        assert_eq!(exec_scopes.data.len(), 2);
        assert_eq!(
            exec_scopes.get_dict("initial_dict").unwrap(),
            &HashMap::from([
                (mayberelocatable!(1), mayberelocatable!(2)),
                (mayberelocatable!(3), mayberelocatable!(4)),
            ])
        );
        assert!(exec_scopes.get_dict_manager().is_ok());
    }

    #[test]
    fn squash_copy_dict_wrong_ptr() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 1);
        vm.segments = segments![((1, 0), (2, 5))];
        let ids_data = ids_data!["dict_accesses_end"];
        let mut exec_scopes = ExecutionScopes::new();
        dict_manager!(&mut exec_scopes, 2, (1, 2));
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::DICT_SQUASH_COPY_DICT, &mut exec_scopes),
            Err(HintError::MismatchedDictPtr(_))
        );
    }

    #[test]
    fn squash_update_ptr_moves_tracker() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 2);
        vm.segments = segments![((1, 0), (2, 0)), ((1, 1), (2, 6))];
        let ids_data = ids_data!["squashed_dict_start", "squashed_dict_end"];
        let mut exec_scopes = ExecutionScopes::new();
        dict_manager!(&mut exec_scopes, 2, (1, 2));
        run_hint!(vm, ids_data, hint_code::DICT_SQUASH_UPDATE_PTR, &mut exec_scopes).unwrap();
        check_dict_ptr!(&exec_scopes, 2, (2, 6));
    }
}
