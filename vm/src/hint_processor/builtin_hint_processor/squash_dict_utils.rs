use std::collections::HashMap;

use crate::{
    hint_processor::{
        builtin_hint_processor::{
            dict_hint_utils::DICT_ACCESS_SIZE,
            hint_utils::{
                get_integer_from_var_name, get_ptr_from_var_name, get_relocatable_from_var_name,
                insert_value_from_var_name,
            },
        },
        hint_processor_definition::HintReference,
        hint_processor_utils::felt_to_usize,
    },
    math_utils::pow2_const,
    serde::deserialize_program::ApTracking,
    types::exec_scope::ExecutionScopes,
    vm::{
        errors::{hint_errors::HintError, memory_errors::MemoryError},
        vm_core::VirtualMachine,
    },
    Felt252,
};

const ACCESS_INDICES: &str = "access_indices";
const CURRENT_ACCESS_INDICES: &str = "current_access_indices";
const CURRENT_ACCESS_INDEX: &str = "current_access_index";

// Offset of `should_continue` inside `LoopTemps`.
const SHOULD_CONTINUE_MEMBER: usize = 3;

fn flag(condition: bool) -> Felt252 {
    if condition {
        Felt252::ONE
    } else {
        Felt252::ZERO
    }
}

fn access_indices_at_key<'a>(
    exec_scopes: &'a ExecutionScopes,
    key: &Felt252,
) -> Result<&'a Vec<Felt252>, HintError> {
    exec_scopes
        .get_mapping(ACCESS_INDICES)?
        .get(key)
        .ok_or_else(|| HintError::NoKeyInAccessIndices(Box::new(*key)))
}

/*Implements hint:
   current_access_indices = sorted(access_indices[key])[::-1]
   current_access_index = current_access_indices.pop()
   memory[ids.range_check_ptr] = current_access_index
*/
pub fn squash_dict_inner_first_iteration(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let key = exec_scopes.get_felt("key")?;
    let range_check_ptr = get_ptr_from_var_name("range_check_ptr", vm, ids_data, ap_tracking)?;
    let mut current_access_indices = access_indices_at_key(exec_scopes, &key)?.clone();
    current_access_indices.sort();
    current_access_indices.reverse();
    let first_val = current_access_indices
        .pop()
        .ok_or(HintError::EmptyCurrentAccessIndices)?;
    exec_scopes.insert_value(CURRENT_ACCESS_INDICES, current_access_indices);
    exec_scopes.insert_value(CURRENT_ACCESS_INDEX, first_val);
    vm.insert_value(range_check_ptr, first_val)
        .map_err(HintError::Memory)
}

// Implements hint: ids.should_skip_loop = 0 if current_access_indices else 1
pub fn squash_dict_inner_skip_loop(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let current_access_indices = exec_scopes.get_sequence(CURRENT_ACCESS_INDICES)?;
    let should_skip_loop = flag(current_access_indices.is_empty());
    insert_value_from_var_name(
        "should_skip_loop",
        should_skip_loop,
        vm,
        ids_data,
        ap_tracking,
    )
}

/*Implements hint:
   new_access_index = current_access_indices.pop()
   ids.loop_temps.index_delta_minus1 = new_access_index - current_access_index - 1
   current_access_index = new_access_index
*/
pub fn squash_dict_inner_check_access_index(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let current_access_index = exec_scopes.get_felt(CURRENT_ACCESS_INDEX)?;
    let new_access_index = exec_scopes
        .get_sequence_mut(CURRENT_ACCESS_INDICES)?
        .pop()
        .ok_or(HintError::EmptyCurrentAccessIndices)?;
    let index_delta_minus1 = new_access_index - current_access_index - Felt252::ONE;
    // index_delta_minus1 is the first member of LoopTemps.
    insert_value_from_var_name("loop_temps", index_delta_minus1, vm, ids_data, ap_tracking)?;
    exec_scopes.insert_value(CURRENT_ACCESS_INDEX, new_access_index);
    Ok(())
}

// Implements hint: ids.loop_temps.should_continue = 1 if current_access_indices else 0
pub fn squash_dict_inner_continue_loop(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let loop_temps_addr = get_relocatable_from_var_name("loop_temps", vm, ids_data, ap_tracking)?;
    let current_access_indices = exec_scopes.get_sequence(CURRENT_ACCESS_INDICES)?;
    let should_continue = flag(!current_access_indices.is_empty());
    vm.insert_value((loop_temps_addr + SHOULD_CONTINUE_MEMBER)?, should_continue)
        .map_err(HintError::Memory)
}

// Implements hint: assert len(current_access_indices) == 0
pub fn squash_dict_inner_len_assert(exec_scopes: &mut ExecutionScopes) -> Result<(), HintError> {
    if !exec_scopes.get_sequence(CURRENT_ACCESS_INDICES)?.is_empty() {
        return Err(HintError::CurrentAccessIndicesNotEmpty);
    }
    Ok(())
}

// Implements hint: assert ids.n_used_accesses == len(access_indices[key])
pub fn squash_dict_inner_used_accesses_assert(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let key = exec_scopes.get_felt("key")?;
    let n_used_accesses = get_integer_from_var_name("n_used_accesses", vm, ids_data, ap_tracking)?;
    let n_accesses = access_indices_at_key(exec_scopes, &key)?.len();
    if n_used_accesses.as_ref() != &Felt252::from(n_accesses) {
        return Err(HintError::NumUsedAccessesAssertFail(Box::new((
            n_used_accesses.into_owned(),
            n_accesses,
            key,
        ))));
    }
    Ok(())
}

// Implements hint: assert len(keys) == 0
pub fn squash_dict_inner_assert_len_keys(
    exec_scopes: &mut ExecutionScopes,
) -> Result<(), HintError> {
    if !exec_scopes.get_sequence("keys")?.is_empty() {
        return Err(HintError::KeysNotEmpty);
    }
    Ok(())
}

/*Implements hint:
   assert len(keys) > 0, 'No keys left but remaining_accesses > 0.'
   ids.next_key = key = keys.pop()
*/
pub fn squash_dict_inner_next_key(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let next_key = exec_scopes
        .get_sequence_mut("keys")?
        .pop()
        .ok_or(HintError::EmptyKeys)?;
    insert_value_from_var_name("next_key", next_key, vm, ids_data, ap_tracking)?;
    exec_scopes.insert_value("key", next_key);
    Ok(())
}

/*Implements hint:
   dict_access_size = ids.DictAccess.SIZE
   address = ids.dict_accesses.address_
   assert ids.ptr_diff % dict_access_size == 0, \
       'Accesses array size must be divisible by DictAccess.SIZE'
   n_accesses = ids.n_accesses
   if '__squash_dict_max_size' in globals():
       assert n_accesses <= __squash_dict_max_size, \
           f'squash_dict() can only be used with n_accesses<={__squash_dict_max_size}. ' \
           f'Got: n_accesses={n_accesses}.'
   # A map from key to the list of indices accessing it.
   access_indices = {}
   for i in range(n_accesses):
       key = memory[address + dict_access_size * i]
       access_indices.setdefault(key, []).append(i)
   # Descending list of keys.
   keys = sorted(access_indices.keys(), reverse=True)
   # Are the keys used bigger than range_check bound.
   ids.big_keys = 1 if keys[0] >= range_check_builtin.bound else 0
   ids.first_key = key = keys.pop()
*/
pub fn squash_dict(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let address = get_ptr_from_var_name("dict_accesses", vm, ids_data, ap_tracking)?;
    let ptr_diff = get_integer_from_var_name("ptr_diff", vm, ids_data, ap_tracking)?.into_owned();
    let n_accesses =
        get_integer_from_var_name("n_accesses", vm, ids_data, ap_tracking)?.into_owned();
    vm.get_range_check_builtin()?;
    let range_check_bound = pow2_const(128);

    if ptr_diff.to_biguint() % DICT_ACCESS_SIZE != 0_u32.into() {
        return Err(HintError::PtrDiffNotDivisibleByDictAccessSize);
    }
    if let Ok(max_size) = exec_scopes.get_felt("__squash_dict_max_size") {
        if n_accesses > max_size {
            return Err(HintError::SquashDictMaxSizeExceeded(Box::new((
                max_size, n_accesses,
            ))));
        }
    }
    let n_accesses = felt_to_usize(&n_accesses)
        .map_err(|_| HintError::NAccessesTooBig(Box::new(n_accesses)))?;

    let mut access_indices = HashMap::<Felt252, Vec<Felt252>>::new();
    for i in 0..n_accesses {
        let key_addr = (address + DICT_ACCESS_SIZE * i)?;
        let key = vm
            .get_integer(key_addr)
            .map_err(|_| MemoryError::ExpectedInteger(Box::new(key_addr)))?;
        access_indices
            .entry(key.into_owned())
            .or_default()
            .push(Felt252::from(i));
    }
    let mut keys: Vec<Felt252> = access_indices.keys().copied().collect();
    keys.sort();
    keys.reverse();

    let biggest_key = keys.first().ok_or(HintError::EmptyKeys)?;
    let big_keys = flag(biggest_key >= &range_check_bound);
    insert_value_from_var_name("big_keys", big_keys, vm, ids_data, ap_tracking)?;
    let key = keys.pop().ok_or(HintError::EmptyKeys)?;
    insert_value_from_var_name("first_key", key, vm, ids_data, ap_tracking)?;

    exec_scopes.insert_value(ACCESS_INDICES, access_indices);
    exec_scopes.insert_value("keys", keys);
    exec_scopes.insert_value("key", key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hint_processor::builtin_hint_processor::hint_code;
    use crate::types::relocatable::{MaybeRelocatable, Relocatable};
    use crate::{relocatable, utils::test_utils::*};
    use assert_matches::assert_matches;

    fn felts(values: &[u64]) -> Vec<Felt252> {
        values.iter().map(|v| Felt252::from(*v)).collect()
    }

    #[test]
    fn first_iteration_pops_smallest_index() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 1);
        vm.segments = segments![((1, 0), (2, 0))];
        add_segments!(vm, 1);
        let ids_data = ids_data!["range_check_ptr"];
        let mut exec_scopes = scope![
            ("key", Felt252::from(5)),
            ("access_indices", HashMap::from([(Felt252::from(5), felts(&[9, 3, 10]))]))
        ];
        run_hint!(
            vm,
            ids_data,
            hint_code::SQUASH_DICT_INNER_FIRST_ITERATION,
            &mut exec_scopes
        )
        .unwrap();
        check_scope!(
            &exec_scopes,
            [
                ("current_access_indices", felts(&[10, 9])),
                ("current_access_index", Felt252::from(3))
            ]
        );
        check_memory![vm.segments.memory, ((2, 0), 3)];
    }

    #[test]
    fn first_iteration_missing_key() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 1);
        vm.segments = segments![((1, 0), (2, 0))];
        let ids_data = ids_data!["range_check_ptr"];
        let mut exec_scopes = scope![
            ("key", Felt252::from(4)),
            ("access_indices", HashMap::from([(Felt252::from(5), felts(&[1]))]))
        ];
        assert_matches!(
            run_hint!(
                vm,
                ids_data,
                hint_code::SQUASH_DICT_INNER_FIRST_ITERATION,
                &mut exec_scopes
            ),
            Err(HintError::NoKeyInAccessIndices(bx)) if *bx == Felt252::from(4)
        );
    }

    #[test]
    fn first_iteration_empty_indices() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 1);
        vm.segments = segments![((1, 0), (2, 0))];
        let ids_data = ids_data!["range_check_ptr"];
        let mut exec_scopes = scope![
            ("key", Felt252::from(5)),
            ("access_indices", HashMap::from([(Felt252::from(5), Vec::<Felt252>::new())]))
        ];
        assert_matches!(
            run_hint!(
                vm,
                ids_data,
                hint_code::SQUASH_DICT_INNER_FIRST_ITERATION,
                &mut exec_scopes
            ),
            Err(HintError::EmptyCurrentAccessIndices)
        );
    }

    #[test]
    fn skip_loop_flags() {
        for (indices, expected) in [(felts(&[]), 1), (felts(&[4]), 0)] {
            let mut vm = vm!();
            vm.run_context.fp = relocatable!(1, 1);
            add_segments!(vm, 2);
            let ids_data = ids_data!["should_skip_loop"];
            let mut exec_scopes = scope![("current_access_indices", indices)];
            run_hint!(
                vm,
                ids_data,
                hint_code::SQUASH_DICT_INNER_SKIP_LOOP,
                &mut exec_scopes
            )
            .unwrap();
            check_memory![vm.segments.memory, ((1, 0), expected)];
        }
    }

    #[test]
    fn check_access_index_writes_delta() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 1);
        add_segments!(vm, 2);
        let ids_data = ids_data!["loop_temps"];
        let mut exec_scopes = scope![
            ("current_access_indices", felts(&[10, 9])),
            ("current_access_index", Felt252::from(3))
        ];
        run_hint!(
            vm,
            ids_data,
            hint_code::SQUASH_DICT_INNER_CHECK_ACCESS_INDEX,
            &mut exec_scopes
        )
        .unwrap();
        check_memory![vm.segments.memory, ((1, 0), 5)];
        check_scope!(
            &exec_scopes,
            [
                ("current_access_indices", felts(&[10])),
                ("current_access_index", Felt252::from(9))
            ]
        );
    }

    #[test]
    fn check_access_index_no_indices_left() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 1);
        add_segments!(vm, 2);
        let ids_data = ids_data!["loop_temps"];
        let mut exec_scopes = scope![
            ("current_access_indices", felts(&[])),
            ("current_access_index", Felt252::from(3))
        ];
        assert_matches!(
            run_hint!(
                vm,
                ids_data,
                hint_code::SQUASH_DICT_INNER_CHECK_ACCESS_INDEX,
                &mut exec_scopes
            ),
            Err(HintError::EmptyCurrentAccessIndices)
        );
    }

    #[test]
    fn continue_loop_writes_member() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 1);
        add_segments!(vm, 2);
        let ids_data = ids_data!["loop_temps"];
        let mut exec_scopes = scope![("current_access_indices", felts(&[7]))];
        run_hint!(
            vm,
            ids_data,
            hint_code::SQUASH_DICT_INNER_CONTINUE_LOOP,
            &mut exec_scopes
        )
        .unwrap();
        check_memory![vm.segments.memory, ((1, 3), 1)];
    }

    #[test]
    fn len_assert() {
        let mut vm = vm!();
        let mut exec_scopes = scope![("current_access_indices", felts(&[]))];
        assert_matches!(
            run_hint!(
                vm,
                HashMap::new(),
                hint_code::SQUASH_DICT_INNER_LEN_ASSERT,
                &mut exec_scopes
            ),
            Ok(())
        );
        let mut exec_scopes = scope![("current_access_indices", felts(&[1]))];
        assert_matches!(
            run_hint!(
                vm,
                HashMap::new(),
                hint_code::SQUASH_DICT_INNER_LEN_ASSERT,
                &mut exec_scopes
            ),
            Err(HintError::CurrentAccessIndicesNotEmpty)
        );
    }

    #[test]
    fn used_accesses_assert() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 1);
        vm.segments = segments![((1, 0), 2)];
        let mut exec_scopes = scope![
            ("key", Felt252::from(5)),
            ("access_indices", HashMap::from([(Felt252::from(5), felts(&[0, 1]))]))
        ];
        assert_matches!(
            run_hint!(
                vm,
                ids_data!["n_used_accesses"],
                hint_code::SQUASH_DICT_INNER_USED_ACCESSES_ASSERT,
                &mut exec_scopes
            ),
            Ok(())
        );
    }

    #[test]
    fn used_accesses_assert_mismatch() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 1);
        vm.segments = segments![((1, 0), 5)];
        let mut exec_scopes = scope![
            ("key", Felt252::from(5)),
            ("access_indices", HashMap::from([(Felt252::from(5), felts(&[0, 1]))]))
        ];
        assert_matches!(
            run_hint!(
                vm,
                ids_data!["n_used_accesses"],
                hint_code::SQUASH_DICT_INNER_USED_ACCESSES_ASSERT,
                &mut exec_scopes
            ),
            Err(HintError::NumUsedAccessesAssertFail(bx))
                if *bx == (Felt252::from(5), 2, Felt252::from(5))
        );
    }

    #[test]
    fn assert_len_keys() {
        let mut vm = vm!();
        let mut exec_scopes = scope![("keys", felts(&[3]))];
        assert_matches!(
            run_hint!(
                vm,
                HashMap::new(),
                hint_code::SQUASH_DICT_INNER_ASSERT_LEN_KEYS,
                &mut exec_scopes
            ),
            Err(HintError::KeysNotEmpty)
        );
    }

    #[test]
    fn next_key_pops_smallest() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 1);
        add_segments!(vm, 2);
        let mut exec_scopes = scope![("keys", felts(&[9, 4]))];
        run_hint!(
            vm,
            ids_data!["next_key"],
            hint_code::SQUASH_DICT_INNER_NEXT_KEY,
            &mut exec_scopes
        )
        .unwrap();
        check_memory![vm.segments.memory, ((1, 0), 4)];
        check_scope!(
            &exec_scopes,
            [("keys", felts(&[9])), ("key", Felt252::from(4))]
        );
    }

    #[test]
    fn next_key_no_keys() {
        let mut vm = vm!();
        vm.run_context.fp = relocatable!(1, 1);
        add_segments!(vm, 2);
        let mut exec_scopes = scope![("keys", felts(&[]))];
        assert_matches!(
            run_hint!(
                vm,
                ids_data!["next_key"],
                hint_code::SQUASH_DICT_INNER_NEXT_KEY,
                &mut exec_scopes
            ),
            Err(HintError::EmptyKeys)
        );
    }

    // ids: dict_accesses, ptr_diff, n_accesses, big_keys, first_key at fp-5..fp-1
    fn squash_dict_vm(ptr_diff: i32, n_accesses: i32) -> VirtualMachine {
        let mut vm = vm_with_range_check!();
        vm.run_context.fp = relocatable!(1, 5);
        vm.segments = segments![
            ((1, 0), (2, 0)),
            ((1, 1), ptr_diff),
            ((1, 2), n_accesses),
            // Accesses: key 7, key 1, key 7
            ((2, 0), 7),
            ((2, 1), 0),
            ((2, 2), 1),
            ((2, 3), 1),
            ((2, 4), 0),
            ((2, 5), 2),
            ((2, 6), 7),
            ((2, 7), 1),
            ((2, 8), 3)
        ];
        vm
    }

    #[test]
    fn squash_dict_groups_accesses() {
        let mut vm = squash_dict_vm(9, 3);
        let ids_data = ids_data!["dict_accesses", "ptr_diff", "n_accesses", "big_keys", "first_key"];
        let mut exec_scopes = ExecutionScopes::new();
        run_hint!(vm, ids_data, hint_code::SQUASH_DICT, &mut exec_scopes).unwrap();
        check_memory![vm.segments.memory, ((1, 3), 0), ((1, 4), 1)];
        check_scope!(
            &exec_scopes,
            [
                ("keys", felts(&[7])),
                ("key", Felt252::ONE),
                (
                    "access_indices",
                    HashMap::from([
                        (Felt252::from(7), felts(&[0, 2])),
                        (Felt252::ONE, felts(&[1]))
                    ])
                )
            ]
        );
    }

    #[test]
    fn squash_dict_big_keys() {
        let mut vm = vm_with_range_check!();
        vm.run_context.fp = relocatable!(1, 5);
        vm.segments = segments![((1, 0), (2, 0)), ((1, 1), 3), ((1, 2), 1), ((2, 1), 0), ((2, 2), 1)];
        vm.insert_value(relocatable!(2, 0), pow2_const(129)).unwrap();
        let ids_data = ids_data!["dict_accesses", "ptr_diff", "n_accesses", "big_keys", "first_key"];
        run_hint!(vm, ids_data, hint_code::SQUASH_DICT).unwrap();
        check_memory![vm.segments.memory, ((1, 3), 1)];
        assert_eq!(
            vm.get_integer(relocatable!(1, 4)).unwrap().into_owned(),
            pow2_const(129)
        );
    }

    #[test]
    fn squash_dict_ptr_diff_not_divisible() {
        let mut vm = squash_dict_vm(7, 3);
        let ids_data = ids_data!["dict_accesses", "ptr_diff", "n_accesses", "big_keys", "first_key"];
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::SQUASH_DICT),
            Err(HintError::PtrDiffNotDivisibleByDictAccessSize)
        );
    }

    #[test]
    fn squash_dict_max_size_exceeded() {
        let mut vm = squash_dict_vm(9, 3);
        let ids_data = ids_data!["dict_accesses", "ptr_diff", "n_accesses", "big_keys", "first_key"];
        let mut exec_scopes = scope![("__squash_dict_max_size", Felt252::ONE)];
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::SQUASH_DICT, &mut exec_scopes),
            Err(HintError::SquashDictMaxSizeExceeded(bx))
                if *bx == (Felt252::ONE, Felt252::from(3))
        );
    }

    #[test]
    fn squash_dict_n_accesses_too_big() {
        let mut vm = squash_dict_vm(9, -1);
        let ids_data = ids_data!["dict_accesses", "ptr_diff", "n_accesses", "big_keys", "first_key"];
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::SQUASH_DICT),
            Err(HintError::NAccessesTooBig(bx)) if *bx == Felt252::from(-1)
        );
    }

    #[test]
    fn squash_dict_key_is_pointer() {
        let mut vm = vm_with_range_check!();
        vm.run_context.fp = relocatable!(1, 5);
        vm.segments = segments![((1, 0), (2, 0)), ((1, 1), 3), ((1, 2), 1), ((2, 0), (1, 0))];
        let ids_data = ids_data!["dict_accesses", "ptr_diff", "n_accesses", "big_keys", "first_key"];
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::SQUASH_DICT),
            Err(HintError::Memory(MemoryError::ExpectedInteger(bx))) if *bx == relocatable!(2, 0)
        );
    }

    #[test]
    fn squash_dict_first_key_taken() {
        let mut vm = squash_dict_vm(9, 3);
        vm.insert_value(relocatable!(1, 4), Felt252::from(8)).unwrap();
        let ids_data = ids_data!["dict_accesses", "ptr_diff", "n_accesses", "big_keys", "first_key"];
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::SQUASH_DICT),
            Err(HintError::Memory(MemoryError::InconsistentMemory(bx)))
                if *bx == (Relocatable::from((1, 4)),
                    MaybeRelocatable::from(Felt252::from(8)),
                    MaybeRelocatable::from(Felt252::ONE))
        );
    }
}
