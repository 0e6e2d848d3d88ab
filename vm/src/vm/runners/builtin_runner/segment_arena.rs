use std::collections::BTreeMap;

use num_traits::ToPrimitive;

use crate::types::builtin_name::BuiltinName;
use crate::types::errors::math_errors::MathError;
use crate::types::instance_definitions::CELLS_PER_SEGMENT_ARENA;
use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::vm::errors::memory_errors::MemoryError;
use crate::vm::errors::runner_errors::RunnerError;
use crate::vm::errors::squash_dict_errors::SquashDictError;
use crate::vm::vm_memory::memory::Memory;
use crate::vm::vm_memory::memory_segments::MemorySegmentManager;
use crate::Felt252;

use super::BuiltinRunnerCapabilities;

// The segment starts with one (infos_ptr, n_dicts, n_destructed) triple.
const INITIAL_SEGMENT_SIZE: usize = CELLS_PER_SEGMENT_ARENA as usize;
// Each dict info is (start, end, squashed_start).
const DICT_INFO_SIZE: usize = 3;
// Each access is (key, prev_value, new_value).
pub const DICT_ACCESS_SIZE: usize = 3;

/// One `(key, prev_value, new_value)` record of a dict access log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictAccess {
    pub key: Felt252,
    pub prev_value: MaybeRelocatable,
    pub new_value: MaybeRelocatable,
}

impl DictAccess {
    pub fn new(
        key: Felt252,
        prev_value: impl Into<MaybeRelocatable>,
        new_value: impl Into<MaybeRelocatable>,
    ) -> DictAccess {
        DictAccess {
            key,
            prev_value: prev_value.into(),
            new_value: new_value.into(),
        }
    }

    /// Reads the access record stored at `addr`.
    pub fn read(memory: &Memory, addr: Relocatable) -> Result<DictAccess, RunnerError> {
        let key = match memory.get(&addr).as_deref() {
            Some(MaybeRelocatable::Int(key)) => *key,
            Some(_) => return Err(SquashDictError::KeyNotInteger(Box::new(addr)).into()),
            None => return Err(SquashDictError::MissingAccessCell(Box::new(addr)).into()),
        };
        let cell = |offset: usize| -> Result<MaybeRelocatable, RunnerError> {
            let cell_addr = (addr + offset)?;
            memory
                .get(&cell_addr)
                .map(|value| value.into_owned())
                .ok_or_else(|| SquashDictError::MissingAccessCell(Box::new(cell_addr)).into())
        };
        Ok(DictAccess {
            key,
            prev_value: cell(1)?,
            new_value: cell(2)?,
        })
    }
}

/// Squashes an access log into one access per key, sorted by key.
///
/// Accesses to the same key are taken in log order; each one must start
/// from the value the previous one left. The squashed access goes from the
/// first `prev_value` to the last `new_value`.
pub fn squash_dict_accesses(accesses: &[DictAccess]) -> Result<Vec<DictAccess>, SquashDictError> {
    let mut squashed: BTreeMap<Felt252, DictAccess> = BTreeMap::new();
    for access in accesses {
        match squashed.get_mut(&access.key) {
            Some(entry) => {
                if entry.new_value != access.prev_value {
                    return Err(SquashDictError::InconsistentPrevValue(Box::new((
                        access.key,
                        entry.new_value.clone(),
                        access.prev_value.clone(),
                    ))));
                }
                entry.new_value = access.new_value.clone();
            }
            None => {
                squashed.insert(access.key, access.clone());
            }
        }
    }
    Ok(squashed.into_values().collect())
}

/// Arena of dict segments. The program appends a new
/// `(infos_ptr, n_dicts, n_destructed)` triple every time it creates or
/// destroys a dict; the last triple describes every dict of the run.
#[derive(Debug, Clone)]
pub struct SegmentArenaBuiltinRunner {
    base: Relocatable,
    included: bool,
    pub(crate) stop_ptr: Option<usize>,
}

impl SegmentArenaBuiltinRunner {
    pub fn new(included: bool) -> Self {
        SegmentArenaBuiltinRunner {
            base: Relocatable::from((0, 0)),
            included,
            stop_ptr: None,
        }
    }

    /// Squashes the access log of every dict with a recorded end.
    pub fn squash_dicts(
        &self,
        segments: &MemorySegmentManager,
    ) -> Result<Vec<Vec<DictAccess>>, RunnerError> {
        let memory = &segments.memory;
        let used = self.get_used_cells(segments)?;
        let last_info = (self.base + used)?;
        let last_info = (last_info - INITIAL_SEGMENT_SIZE)?;

        let infos_ptr = memory.get_relocatable(last_info)?;
        let n_dicts = memory.get_integer((last_info + 1_usize)?)?;
        let n_dicts = n_dicts
            .to_usize()
            .ok_or_else(|| MathError::Felt252ToUsizeConversion(Box::new(*n_dicts)))?;

        let mut squashed = Vec::with_capacity(n_dicts);
        for i in 0..n_dicts {
            let info = (infos_ptr + i * DICT_INFO_SIZE)?;
            let start = memory.get_relocatable(info)?;
            let end_addr = (info + 1_usize)?;
            // Dicts that were never finalized have no end yet.
            let end = match memory.get(&end_addr) {
                None => continue,
                Some(end) => end
                    .get_relocatable()
                    .ok_or_else(|| MemoryError::ExpectedRelocatable(Box::new(end_addr)))?,
            };
            if end.segment_index != start.segment_index || end.offset < start.offset {
                return Err(SquashDictError::InvalidDictRange(Box::new((start, end))).into());
            }
            let len = end.offset - start.offset;
            if len % DICT_ACCESS_SIZE != 0 {
                return Err(SquashDictError::PtrDiffNotDivisibleByDictAccessSize(len).into());
            }
            let accesses = (0..len / DICT_ACCESS_SIZE)
                .map(|j| DictAccess::read(memory, (start + j * DICT_ACCESS_SIZE)?))
                .collect::<Result<Vec<_>, _>>()?;
            squashed.push(squash_dict_accesses(&accesses)?);
        }
        Ok(squashed)
    }
}

impl BuiltinRunnerCapabilities for SegmentArenaBuiltinRunner {
    fn name(&self) -> BuiltinName {
        BuiltinName::segment_arena
    }

    fn base(&self) -> usize {
        self.base.segment_index as usize
    }

    fn included(&self) -> bool {
        self.included
    }

    fn cells_per_instance(&self) -> u32 {
        CELLS_PER_SEGMENT_ARENA
    }

    fn n_input_cells(&self) -> u32 {
        CELLS_PER_SEGMENT_ARENA
    }

    fn stop_ptr(&self) -> Option<usize> {
        self.stop_ptr
    }

    fn set_stop_ptr(&mut self, stop_ptr: usize) {
        self.stop_ptr = Some(stop_ptr)
    }

    fn initialize_segments(&mut self, segments: &mut MemorySegmentManager) {
        let infos = segments.add();
        let start = segments.add();
        let info = [
            MaybeRelocatable::from(infos),
            MaybeRelocatable::from(Felt252::ZERO),
            MaybeRelocatable::from(Felt252::ZERO),
        ];
        // Writing into a fresh segment can't fail.
        self.base = segments.load_data(start, &info).unwrap_or(start);
    }

    fn initial_stack(&self) -> Vec<MaybeRelocatable> {
        if self.included {
            vec![MaybeRelocatable::from(self.base)]
        } else {
            vec![]
        }
    }

    fn get_used_cells(&self, segments: &MemorySegmentManager) -> Result<usize, MemoryError> {
        let used = segments
            .get_segment_used_size(self.base())
            .ok_or(MemoryError::MissingSegmentUsedSizes)?;
        if used < INITIAL_SEGMENT_SIZE {
            return Err(MemoryError::InvalidUsedSizeSegmentArena);
        }
        Ok(used - INITIAL_SEGMENT_SIZE)
    }

    fn get_used_instances(&self, segments: &MemorySegmentManager) -> Result<usize, MemoryError> {
        self.get_used_cells(segments)
    }

    fn expected_stop_offset(&self, segments: &MemorySegmentManager) -> Result<usize, MemoryError> {
        Ok(self.base.offset + self.get_used_cells(segments)?)
    }

    fn final_check(&self, segments: &MemorySegmentManager) -> Result<(), RunnerError> {
        if !self.included {
            return Ok(());
        }
        self.squash_dicts(segments).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocatable;
    use crate::utils::test_utils::*;
    use crate::vm::runners::builtin_runner::BuiltinRunner;
    use assert_matches::assert_matches;

    fn access(key: i32, prev: i32, new: i32) -> DictAccess {
        DictAccess::new(Felt252::from(key), Felt252::from(prev), Felt252::from(new))
    }

    #[test]
    fn squash_groups_by_key() {
        let accesses = [
            access(5, 0, 1),
            access(2, 0, 7),
            access(5, 1, 3),
            access(5, 3, 3),
        ];
        assert_eq!(
            squash_dict_accesses(&accesses),
            Ok(vec![access(2, 0, 7), access(5, 0, 3)])
        );
    }

    #[test]
    fn squash_empty_log() {
        assert_eq!(squash_dict_accesses(&[]), Ok(vec![]));
    }

    #[test]
    fn squash_inconsistent_prev_value() {
        let accesses = [access(5, 0, 1), access(5, 2, 3)];
        assert_eq!(
            squash_dict_accesses(&accesses),
            Err(SquashDictError::InconsistentPrevValue(Box::new((
                Felt252::from(5),
                mayberelocatable!(1),
                mayberelocatable!(2)
            ))))
        );
    }

    #[test]
    fn initialize_segments_writes_initial_triple() {
        let mut builtin = SegmentArenaBuiltinRunner::new(true);
        let mut segments = MemorySegmentManager::new();
        builtin.initialize_segments(&mut segments);
        assert_eq!(builtin.base(), 1);
        assert_eq!(builtin.initial_stack(), vec![mayberelocatable!(1, 3)]);
        check_memory!(segments.memory, ((1, 0), (0, 0)), ((1, 1), 0), ((1, 2), 0));
    }

    #[test]
    fn used_cells_exclude_initial_triple() {
        let builtin = SegmentArenaBuiltinRunner::new(true);
        let mut segments = MemorySegmentManager::new();
        segments.segment_used_sizes = Some(vec![9]);
        assert_eq!(builtin.get_used_cells(&segments), Ok(6));
        assert_eq!(builtin.get_used_instances(&segments), Ok(6));
        segments.segment_used_sizes = Some(vec![2]);
        assert_eq!(
            builtin.get_used_cells(&segments),
            Err(MemoryError::InvalidUsedSizeSegmentArena)
        );
    }

    #[test]
    fn final_stack_accounts_for_initial_triple() {
        let mut builtin: BuiltinRunner = SegmentArenaBuiltinRunner::new(true).into();
        let mut segments = MemorySegmentManager::new();
        builtin.initialize_segments(&mut segments);
        let stack = segments.add();
        segments.load_data(stack, &[mayberelocatable!(1, 3)]).unwrap();
        segments.compute_effective_sizes();
        assert_eq!(
            builtin.final_stack(&segments, relocatable!(2, 1)),
            Ok(relocatable!(2, 0))
        );
        assert_eq!(builtin.get_memory_segment_addresses(), (1, Some(3)));
    }

    // Arena at segment 1, dict infos at 0, the dict's accesses at 2.
    fn arena_with_dict(accesses_end: Option<(isize, usize)>) -> MemorySegmentManager {
        let mut builtin = SegmentArenaBuiltinRunner::new(true);
        let mut segments = MemorySegmentManager::new();
        builtin.initialize_segments(&mut segments);
        let dict = segments.add();
        let mut info = vec![mayberelocatable!(2, 0)];
        if let Some((segment, offset)) = accesses_end {
            info.push(mayberelocatable!(segment, offset));
        }
        segments.load_data(relocatable!(0, 0), &info).unwrap();
        segments
            .load_data(
                dict,
                &[
                    mayberelocatable!(1),
                    mayberelocatable!(0),
                    mayberelocatable!(4),
                    mayberelocatable!(1),
                    mayberelocatable!(4),
                    mayberelocatable!(6),
                ],
            )
            .unwrap();
        segments
            .load_data(
                relocatable!(1, 3),
                &[mayberelocatable!(0, 0), mayberelocatable!(1), mayberelocatable!(0)],
            )
            .unwrap();
        segments.compute_effective_sizes();
        segments
    }

    #[test]
    fn final_check_squashes_finalized_dicts() {
        let segments = arena_with_dict(Some((2, 6)));
        let builtin = SegmentArenaBuiltinRunner {
            base: relocatable!(1, 3),
            included: true,
            stop_ptr: None,
        };
        assert_eq!(
            builtin.squash_dicts(&segments),
            Ok(vec![vec![access(1, 0, 6)]])
        );
        assert_eq!(builtin.final_check(&segments), Ok(()));
    }

    #[test]
    fn final_check_skips_unfinished_dicts() {
        let segments = arena_with_dict(None);
        let builtin = SegmentArenaBuiltinRunner {
            base: relocatable!(1, 3),
            included: true,
            stop_ptr: None,
        };
        assert_eq!(builtin.squash_dicts(&segments), Ok(vec![]));
    }

    #[test]
    fn final_check_rejects_partial_access() {
        let segments = arena_with_dict(Some((2, 5)));
        let builtin = SegmentArenaBuiltinRunner {
            base: relocatable!(1, 3),
            included: true,
            stop_ptr: None,
        };
        assert_matches!(
            builtin.final_check(&segments),
            Err(RunnerError::SquashDict(
                SquashDictError::PtrDiffNotDivisibleByDictAccessSize(5)
            ))
        );
    }

    #[test]
    fn final_check_rejects_backwards_range() {
        let segments = arena_with_dict(Some((3, 0)));
        let builtin = SegmentArenaBuiltinRunner {
            base: relocatable!(1, 3),
            included: true,
            stop_ptr: None,
        };
        assert_matches!(
            builtin.final_check(&segments),
            Err(RunnerError::SquashDict(SquashDictError::InvalidDictRange(_)))
        );
    }

    #[test]
    fn read_access_with_pointer_key() {
        let memory = memory![((0, 0), (1, 0)), ((0, 1), 0), ((0, 2), 1)];
        assert_eq!(
            DictAccess::read(&memory, relocatable!(0, 0)),
            Err(RunnerError::SquashDict(SquashDictError::KeyNotInteger(
                Box::new(relocatable!(0, 0))
            )))
        );
    }
}
