use crate::types::relocatable::Relocatable;
use lazy_static::lazy_static;
use num_bigint::BigUint;
use num_traits::Num;

pub const PRIME_STR: &str = "0x800000000000011000000000000000000000000000000000000000000000001";

#[macro_export]
macro_rules! relocatable {
    ($val1 : expr, $val2 : expr) => {
        $crate::types::relocatable::Relocatable {
            segment_index: $val1,
            offset: $val2,
        }
    };
}

lazy_static! {
    pub static ref CAIRO_PRIME: BigUint =
        BigUint::from_str_radix(&PRIME_STR[2..], 16).unwrap_or_default();
}

pub fn is_subsequence<T: PartialEq>(subsequence: &[T], mut sequence: &[T]) -> bool {
    for search in subsequence {
        if let Some(index) = sequence.iter().position(|element| search == element) {
            sequence = &sequence[index + 1..];
        } else {
            return false;
        }
    }
    true
}

/// Maps an address to `(segment, offset)` indexes into the memory vectors.
/// Temporary segment `-k` lands at index `k - 1` of `temp_data`.
pub fn from_relocatable_to_indexes(relocatable: Relocatable) -> (usize, usize) {
    if relocatable.segment_index.is_negative() {
        (
            -(relocatable.segment_index + 1) as usize,
            relocatable.offset,
        )
    } else {
        (relocatable.segment_index as usize, relocatable.offset)
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::relocatable;
    use crate::types::builtin_name::BuiltinName;
    use crate::types::exec_scope::ScopeValue;
    use crate::types::relocatable::MaybeRelocatable;
    use crate::utils::test_utils::*;
    use crate::vm::trace::trace_entry::TraceEntry;
    use crate::Felt252;

    #[test]
    fn memory_macro_test() {
        let memory = memory![((1, 2), (1, 1)), ((1, 1), 10)];
        assert_eq!(
            memory.get(&relocatable!(1, 2)).unwrap().as_ref(),
            &MaybeRelocatable::from((1, 1))
        );
        assert_eq!(
            memory.get(&relocatable!(1, 1)).unwrap().as_ref(),
            &MaybeRelocatable::from(Felt252::from(10))
        );
        assert_eq!(memory.data.len(), 2);
    }

    #[test]
    fn check_memory_macro_test() {
        let mut memory = memory![((0, 0), 7)];
        memory_from_memory!(memory, (((1, 3), (0, 0)), ((-1, 0), 5)));
        check_memory!(memory, ((0, 0), 7), ((1, 3), (0, 0)), ((-1, 0), 5));
        assert_eq!(memory.temp_data.len(), 1);
    }

    #[test]
    #[should_panic]
    fn check_memory_address_macro_fails_on_mismatch() {
        let memory = memory![((0, 0), 7)];
        check_memory_address!(memory, (0, 0), 8);
    }

    #[test]
    fn create_run_context() {
        let mut vm = vm!();
        run_context!(vm, 2, 6, 10);
        assert_eq!(vm.run_context.pc, relocatable!(0, 2));
        assert_eq!(vm.run_context.ap, relocatable!(1, 6));
        assert_eq!(vm.run_context.fp, relocatable!(1, 10));
    }

    #[test]
    fn assert_trace() {
        let trace = vec![
            TraceEntry {
                pc: relocatable!(0, 2),
                ap: relocatable!(1, 7),
                fp: relocatable!(1, 1),
            },
            TraceEntry {
                pc: relocatable!(0, 5),
                ap: relocatable!(1, 1),
                fp: relocatable!(1, 0),
            },
        ];
        trace_check(&trace, &[(2, 7, 1), (5, 1, 0)]);
    }

    #[test]
    fn ids_data_binds_consecutive_fp_offsets() {
        let ids_data = ids_data!["a", "b"];
        assert_eq!(ids_data.len(), 2);
        assert_eq!(
            ids_data["a"],
            crate::hint_processor::hint_processor_definition::HintReference::new_simple(-2)
        );
        assert_eq!(
            ids_data["b"],
            crate::hint_processor::hint_processor_definition::HintReference::new_simple(-1)
        );
    }

    #[test]
    fn test_non_continuous_ids_data() {
        let ids_data = non_continuous_ids_data![("a", -2), ("b", -6)];
        assert_eq!(
            ids_data["b"],
            crate::hint_processor::hint_processor_definition::HintReference::new_simple(-6)
        );
    }

    #[test]
    fn scope_macro_and_check_scope() {
        let scopes = scope![("a", Felt252::from(2)), ("b", vec![Felt252::ONE])];
        check_scope!(
            &scopes,
            [("a", Felt252::from(2)), ("b", vec![Felt252::ONE])]
        );
        assert_eq!(
            scopes.get_value("b").unwrap(),
            &ScopeValue::Sequence(vec![Felt252::ONE])
        );
    }

    #[test]
    fn dict_manager_macros() {
        let mut exec_scopes = scope![];
        dict_manager!(exec_scopes, 2, (5, 10));
        check_dictionary!(exec_scopes, 2, (5, 10));
        check_dict_ptr!(exec_scopes, 2, (2, 0));

        let mut exec_scopes = scope![];
        dict_manager_default!(exec_scopes, 3, 17);
        let dict_manager = exec_scopes.get_dict_manager().unwrap();
        assert_eq!(
            dict_manager
                .borrow_mut()
                .trackers
                .get_mut(&3)
                .unwrap()
                .get_value(&MaybeRelocatable::from(Felt252::from(1000)))
                .unwrap(),
            &MaybeRelocatable::from(Felt252::from(17))
        );
    }

    #[test]
    fn data_vec_test() {
        let data = vec_data!((1), ((2, 2)), (("49128305", 10)));
        assert_eq!(data[0], mayberelocatable!(1));
        assert_eq!(data[1], mayberelocatable!(2, 2));
        assert_eq!(
            data[2],
            MaybeRelocatable::from(Felt252::from_dec_str("49128305").unwrap())
        );
    }

    #[test]
    fn from_relocatable_to_indexes_test() {
        assert_eq!(from_relocatable_to_indexes(relocatable!(1, 2)), (1, 2));
        assert_eq!(from_relocatable_to_indexes(relocatable!(-1, 2)), (0, 2));
        assert_eq!(from_relocatable_to_indexes(relocatable!(-3, 0)), (2, 0));
    }

    #[test]
    fn is_subsequence_keeps_order() {
        assert!(is_subsequence(&[1, 3], &[1, 2, 3]));
        assert!(is_subsequence::<u8>(&[], &[1]));
        assert!(!is_subsequence(&[3, 1], &[1, 2, 3]));
        assert!(!is_subsequence(&[4], &[1, 2, 3]));
    }

    #[test]
    fn cairo_prime_matches_felt_modulus() {
        assert_eq!(
            &*CAIRO_PRIME,
            &(Felt252::MAX.to_biguint() + num_bigint::BigUint::from(1_u8))
        );
    }

    #[test]
    fn program_macro_with_builtins() {
        let program = program![BuiltinName::range_check, BuiltinName::output];
        assert_eq!(
            program.builtins,
            vec![BuiltinName::range_check, BuiltinName::output]
        );
        assert_eq!(program.data_len(), 0);
    }

    #[test]
    fn program_macro_custom_definition() {
        let program = program!(main = Some(2), data = vec_data!((1), (2), (3)));
        assert_eq!(program.shared_program_data.main, Some(2));
        assert_eq!(program.data_len(), 3);
    }
}
