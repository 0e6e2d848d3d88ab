use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use crate::{
    types::relocatable::{MaybeRelocatable, Relocatable},
    vm::{
        errors::memory_errors::MemoryError, runners::cairo_runner::CairoArg,
        vm_memory::memory::Memory,
    },
    Felt252,
};

/// Owns the memory of a run and the bookkeeping around its segments.
pub struct MemorySegmentManager {
    pub(crate) memory: Memory,
    /// Sizes fixed by `finalize`, taking precedence over the used sizes.
    pub(crate) segment_sizes: HashMap<usize, usize>,
    pub(crate) segment_used_sizes: Option<Vec<usize>>,
    // (offset, page_id) pairs per segment
    pub(crate) public_memory_offsets: HashMap<usize, Vec<(usize, usize)>>,
}

impl MemorySegmentManager {
    pub fn new() -> MemorySegmentManager {
        MemorySegmentManager {
            memory: Memory::new(),
            segment_sizes: HashMap::new(),
            segment_used_sizes: None,
            public_memory_offsets: HashMap::new(),
        }
    }

    pub fn num_segments(&self) -> usize {
        self.memory.data.len()
    }

    pub fn num_temp_segments(&self) -> usize {
        self.memory.temp_data.len()
    }

    /// Allocates a new real segment and returns its base `(n, 0)`.
    pub fn add(&mut self) -> Relocatable {
        self.memory.data.push(Vec::new());
        Relocatable::from((self.memory.data.len() as isize - 1, 0))
    }

    /// Allocates a new temporary segment and returns its base `(-k, 0)`.
    pub fn add_temporary_segment(&mut self) -> Relocatable {
        self.memory.temp_data.push(Vec::new());
        Relocatable::from((-(self.memory.temp_data.len() as isize), 0))
    }

    /// Writes `data` starting at `ptr` and returns the address right after it.
    pub fn load_data(
        &mut self,
        ptr: Relocatable,
        data: &[MaybeRelocatable],
    ) -> Result<Relocatable, MemoryError> {
        // Last cell first so the segment grows only once.
        for (i, value) in data.iter().enumerate().rev() {
            self.memory.insert((ptr + i)?, value)?;
        }
        Ok((ptr + data.len())?)
    }

    /// Records how many cells each real segment holds (its highest written
    /// offset plus one). Computed once; later calls return the cached sizes.
    pub fn compute_effective_sizes(&mut self) -> &Vec<usize> {
        self.segment_used_sizes
            .get_or_insert_with(|| self.memory.data.iter().map(Vec::len).collect())
    }

    pub fn get_segment_used_size(&self, index: usize) -> Option<usize> {
        self.segment_used_sizes.as_ref()?.get(index).copied()
    }

    pub fn get_segment_size(&self, index: usize) -> Option<usize> {
        self.segment_sizes
            .get(&index)
            .copied()
            .or_else(|| self.get_segment_used_size(index))
    }

    /// Base address of every real segment once memory is flattened.
    /// Segment 0 starts at 1 and each segment follows the previous one.
    pub fn relocate_segments(&self) -> Result<Vec<usize>, MemoryError> {
        let used_sizes = self
            .segment_used_sizes
            .as_ref()
            .ok_or(MemoryError::MissingSegmentUsedSizes)?;
        let mut table = Vec::with_capacity(used_sizes.len());
        let mut next = 1;
        for index in 0..used_sizes.len() {
            table.push(next);
            next += self
                .get_segment_size(index)
                .ok_or(MemoryError::MissingSegmentUsedSizes)?;
        }
        Ok(table)
    }

    /// Turns a host argument into a memory value, allocating segments for
    /// arrays (nested arrays become pointers to their own segments).
    pub fn gen_arg(&mut self, arg: &CairoArg) -> Result<MaybeRelocatable, MemoryError> {
        match arg {
            CairoArg::Single(value) => Ok(value.clone()),
            CairoArg::Array(values) => {
                let base = self.add();
                self.load_data(base, values)?;
                Ok(base.into())
            }
            CairoArg::Composed(args) => {
                let values = args
                    .iter()
                    .map(|arg| self.gen_arg(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let base = self.add();
                self.load_data(base, &values)?;
                Ok(base.into())
            }
        }
    }

    /// Writes `values` at `ptr`, returning the first address past them.
    pub fn write_arg(
        &mut self,
        ptr: Relocatable,
        values: &[MaybeRelocatable],
    ) -> Result<MaybeRelocatable, MemoryError> {
        self.load_data(ptr, values)
            .map(MaybeRelocatable::from)
            .map_err(|_| MemoryError::WriteArg)
    }

    /// Whether `value` may live in final memory: integers always, addresses
    /// only when they point into an existing real segment.
    pub fn is_valid_memory_value(&self, value: &MaybeRelocatable) -> Result<bool, MemoryError> {
        let used_sizes = self
            .segment_used_sizes
            .as_ref()
            .ok_or(MemoryError::MissingSegmentUsedSizes)?;
        match value {
            MaybeRelocatable::Int(_) => Ok(true),
            MaybeRelocatable::RelocatableValue(addr) => {
                let index = usize::try_from(addr.segment_index)
                    .map_err(|_| MemoryError::AddressInTemporarySegment(addr.segment_index))?;
                Ok(index < used_sizes.len())
            }
        }
    }

    /// Counts the cells that were allocated but never accessed.
    ///
    /// Segments nobody accessed are not counted, and neither are the
    /// segments in `builtin_segments` (builtins never mark their cells).
    pub fn get_memory_holes(&self, builtin_segments: &HashSet<usize>) -> Result<usize, MemoryError> {
        let mut holes = 0;
        for index in 0..self.memory.data.len() {
            if builtin_segments.contains(&index) {
                continue;
            }
            let accessed = match self.memory.get_amount_of_accessed_addresses_for_segment(index) {
                Some(n) if n > 0 => n,
                _ => continue,
            };
            let size = self
                .get_segment_size(index)
                .ok_or(MemoryError::MissingSegmentUsedSizes)?;
            if accessed > size {
                return Err(MemoryError::SegmentHasMoreAccessedAddressesThanSize(
                    Box::new((index, accessed, size)),
                ));
            }
            holes += size - accessed;
        }
        Ok(holes)
    }

    /// Fixes the final size and public memory of a segment.
    pub(crate) fn finalize(
        &mut self,
        size: Option<usize>,
        segment_index: usize,
        public_memory: Option<&Vec<(usize, usize)>>,
    ) {
        if let Some(size) = size {
            self.segment_sizes.insert(segment_index, size);
        }
        self.public_memory_offsets
            .insert(segment_index, public_memory.cloned().unwrap_or_default());
    }

    /// Flat addresses of the public memory, given the relocation table.
    pub fn get_public_memory_addresses(
        &self,
        relocation_table: &[usize],
    ) -> Result<Vec<(usize, usize)>, MemoryError> {
        let mut addresses = Vec::new();
        for index in 0..self.num_segments() {
            let Some(offsets) = self.public_memory_offsets.get(&index) else {
                continue;
            };
            let base = relocation_table
                .get(index)
                .ok_or(MemoryError::Relocation)?;
            addresses.extend(offsets.iter().map(|(offset, page)| (base + offset, *page)));
        }
        Ok(addresses)
    }

    /// Flattens every real segment into one vector indexed by address.
    /// Index 0 is always empty and so are holes.
    pub fn relocate_memory(
        &self,
        relocation_table: &[usize],
    ) -> Result<Vec<Option<Felt252>>, MemoryError> {
        let mut relocated = vec![None];
        for (index, segment) in self.memory.data.iter().enumerate() {
            let base = *relocation_table.get(index).ok_or(MemoryError::Relocation)?;
            for (offset, cell) in segment.iter().enumerate() {
                let Some(cell) = cell else {
                    continue;
                };
                let address = base + offset;
                let value = crate::types::relocatable::relocate_value(
                    cell.get_value().clone(),
                    relocation_table,
                )?;
                if relocated.len() <= address {
                    relocated.resize(address + 1, None);
                }
                relocated[address] = Some(value);
            }
        }
        Ok(relocated)
    }
}

impl Default for MemorySegmentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemorySegmentManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Memory:\n{}", self.memory)?;
        if let Some(used_sizes) = &self.segment_used_sizes {
            writeln!(f, "Segment Info:")?;
            for (index, used_size) in used_sizes.iter().enumerate() {
                let size = self
                    .segment_sizes
                    .get(&index)
                    .map_or_else(|| "None".to_string(), usize::to_string);
                writeln!(
                    f,
                    "Segment Number: {index}, Used Size: {used_size}, Size {size}"
                )?;
            }
        }
        Ok(())
    }
}
