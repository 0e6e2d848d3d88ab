use std::{borrow::Cow, cmp::Ordering, collections::HashMap, fmt};

use bitvec::prelude as bv;

use crate::{
    types::relocatable::{MaybeRelocatable, Relocatable},
    utils::from_relocatable_to_indexes,
    vm::errors::memory_errors::MemoryError,
    Felt252,
};

/// Checks a freshly written cell of a builtin segment and returns every
/// address the check covered (a whole instance may be validated at once).
pub struct ValidationRule(
    #[allow(clippy::type_complexity)]
    pub Box<dyn Fn(&Memory, Relocatable) -> Result<Vec<Relocatable>, MemoryError>>,
);

/// A written memory word plus its "accessed" mark, used to count holes.
#[derive(Clone, Eq, Ord, PartialEq, PartialOrd, Debug)]
pub(crate) struct MemoryCell {
    value: MaybeRelocatable,
    accessed: bool,
}

impl MemoryCell {
    pub(crate) fn new(value: MaybeRelocatable) -> Self {
        MemoryCell {
            value,
            accessed: false,
        }
    }

    pub(crate) fn mark_accessed(&mut self) {
        self.accessed = true
    }

    pub(crate) fn is_accessed(&self) -> bool {
        self.accessed
    }

    pub(crate) fn get_value(&self) -> &MaybeRelocatable {
        &self.value
    }
}

type Segment = Vec<Option<MemoryCell>>;

/// Bitmap of addresses already checked by a validation rule.
#[derive(Debug, Default)]
pub struct AddressSet(Vec<bv::BitVec>);

impl AddressSet {
    pub(crate) fn new() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn contains(&self, addr: &Relocatable) -> bool {
        let Ok(segment) = usize::try_from(addr.segment_index) else {
            return false;
        };
        self.0
            .get(segment)
            .and_then(|bits| bits.get(addr.offset))
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    pub(crate) fn extend(&mut self, addresses: &[Relocatable]) {
        for addr in addresses {
            let Ok(segment) = usize::try_from(addr.segment_index) else {
                continue;
            };
            if segment >= self.0.len() {
                self.0.resize(segment + 1, bv::BitVec::new());
            }
            let bits = &mut self.0[segment];
            if addr.offset >= bits.len() {
                bits.resize(addr.offset + 1, false);
            }
            bits.set(addr.offset, true);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.0.iter().map(|bits| bits.count_ones()).sum()
    }
}

/// Segmented, write-once memory.
///
/// Real segments (index >= 0) live in `data`; temporary segments (index < 0)
/// live in `temp_data`, segment `-1` at position 0. A temporary segment is
/// moved into real memory by [`Memory::relocate_memory`] once a relocation
/// rule has been registered for it.
pub struct Memory {
    pub(crate) data: Vec<Segment>,
    pub(crate) temp_data: Vec<Segment>,
    // Keyed by temp_data position: segment -1 is key 0, -2 is key 1...
    pub(crate) relocation_rules: HashMap<usize, Relocatable>,
    pub(crate) validated_addresses: AddressSet,
    validation_rules: Vec<Option<ValidationRule>>,
}

impl Memory {
    pub fn new() -> Memory {
        Memory {
            data: Vec::new(),
            temp_data: Vec::new(),
            relocation_rules: HashMap::new(),
            validated_addresses: AddressSet::new(),
            validation_rules: Vec::new(),
        }
    }

    fn segment(&self, segment_index: isize) -> Option<&Segment> {
        let (index, _) = from_relocatable_to_indexes(Relocatable::from((segment_index, 0)));
        if segment_index < 0 {
            self.temp_data.get(index)
        } else {
            self.data.get(index)
        }
    }

    fn segments_for_mut(&mut self, segment_index: isize) -> &mut Vec<Segment> {
        if segment_index < 0 {
            &mut self.temp_data
        } else {
            &mut self.data
        }
    }

    /// Writes `val` at `key`.
    ///
    /// Writing the value a cell already holds is a no-op; writing a different
    /// one fails with [`MemoryError::InconsistentMemory`]. Writing past the end
    /// of a segment grows it, leaving holes as `None`.
    pub fn insert<V: Into<MaybeRelocatable>>(
        &mut self,
        key: Relocatable,
        val: V,
    ) -> Result<(), MemoryError> {
        let val = val.into();
        let (index, offset) = from_relocatable_to_indexes(key);
        let segments = self.segments_for_mut(key.segment_index);
        let num_segments = segments.len();
        let segment = segments
            .get_mut(index)
            .ok_or_else(|| MemoryError::UnallocatedSegment(Box::new((index, num_segments))))?;

        if segment.len() <= offset {
            segment.resize(offset + 1, None);
        }
        if let Some(cell) = &segment[offset] {
            if cell.get_value() != &val {
                return Err(MemoryError::InconsistentMemory(Box::new((
                    key,
                    cell.get_value().clone(),
                    val,
                ))));
            }
        } else {
            segment[offset] = Some(MemoryCell::new(val));
        }
        self.validate_memory_cell(key)
    }

    /// Reads a cell, applying pending relocation rules to relocatable values.
    pub fn get(&self, key: &Relocatable) -> Option<Cow<MaybeRelocatable>> {
        let cell = self.segment(key.segment_index)?.get(key.offset)?.as_ref()?;
        Some(match cell.get_value() {
            MaybeRelocatable::RelocatableValue(addr) if addr.segment_index < 0 => {
                Cow::Owned(self.relocate_temporary(*addr).into())
            }
            value => Cow::Borrowed(value),
        })
    }

    fn relocate_temporary(&self, addr: Relocatable) -> Relocatable {
        relocate_with_rules(addr, &self.relocation_rules)
    }

    /// Moves every temporary segment with a relocation rule into real memory,
    /// rewriting the pointers into it, then drops the rules.
    pub fn relocate_memory(&mut self) -> Result<(), MemoryError> {
        if self.relocation_rules.is_empty() || self.temp_data.is_empty() {
            return Ok(());
        }
        let rules = std::mem::take(&mut self.relocation_rules);
        for cell in self
            .data
            .iter_mut()
            .chain(self.temp_data.iter_mut())
            .flat_map(|segment| segment.iter_mut().flatten())
        {
            if let MaybeRelocatable::RelocatableValue(addr) = cell.value {
                if addr.segment_index < 0 {
                    cell.value = relocate_with_rules(addr, &rules).into();
                }
            }
        }
        // Highest index first so the remaining positions stay valid.
        for index in (0..self.temp_data.len()).rev() {
            let Some(base) = rules.get(&index) else {
                continue;
            };
            let segment = self.temp_data.remove(index);
            for (offset, cell) in segment.into_iter().enumerate() {
                let Some(cell) = cell else {
                    continue;
                };
                let addr = (*base + offset)?;
                self.insert(addr, cell.value)?;
                if cell.accessed {
                    self.mark_as_accessed(addr);
                }
            }
        }
        Ok(())
    }

    /// Registers that temporary segment `src_ptr.segment_index` will be
    /// placed at `dst_ptr`. `src_ptr` must be the start of a temporary
    /// segment without a rule.
    pub(crate) fn add_relocation_rule(
        &mut self,
        src_ptr: Relocatable,
        dst_ptr: Relocatable,
    ) -> Result<(), MemoryError> {
        if src_ptr.segment_index >= 0 {
            return Err(MemoryError::AddressNotInTemporarySegment(
                src_ptr.segment_index,
            ));
        }
        if src_ptr.offset != 0 {
            return Err(MemoryError::NonZeroOffset(src_ptr.offset));
        }
        let (key, _) = from_relocatable_to_indexes(src_ptr);
        if self.relocation_rules.contains_key(&key) {
            return Err(MemoryError::DuplicatedRelocation(src_ptr.segment_index));
        }
        self.relocation_rules.insert(key, dst_ptr);
        Ok(())
    }

    pub fn get_integer(&self, key: Relocatable) -> Result<Cow<Felt252>, MemoryError> {
        match self
            .get(&key)
            .ok_or_else(|| MemoryError::UnknownMemoryCell(Box::new(key)))?
        {
            Cow::Borrowed(MaybeRelocatable::Int(int)) => Ok(Cow::Borrowed(int)),
            Cow::Owned(MaybeRelocatable::Int(int)) => Ok(Cow::Owned(int)),
            _ => Err(MemoryError::ExpectedInteger(Box::new(key))),
        }
    }

    pub fn get_relocatable(&self, key: Relocatable) -> Result<Relocatable, MemoryError> {
        match self
            .get(&key)
            .ok_or_else(|| MemoryError::UnknownMemoryCell(Box::new(key)))?
            .as_ref()
        {
            MaybeRelocatable::RelocatableValue(rel) => Ok(*rel),
            MaybeRelocatable::Int(_) => Err(MemoryError::ExpectedRelocatable(Box::new(key))),
        }
    }

    pub fn add_validation_rule(&mut self, segment_index: usize, rule: ValidationRule) {
        if segment_index >= self.validation_rules.len() {
            self.validation_rules.resize_with(segment_index + 1, || None);
        }
        self.validation_rules[segment_index] = Some(rule);
    }

    fn validate_memory_cell(&mut self, addr: Relocatable) -> Result<(), MemoryError> {
        let Some(Some(rule)) = usize::try_from(addr.segment_index)
            .ok()
            .and_then(|index| self.validation_rules.get(index))
        else {
            return Ok(());
        };
        if !self.validated_addresses.contains(&addr) {
            let validated = (rule.0)(self, addr)?;
            self.validated_addresses.extend(&validated);
        }
        Ok(())
    }

    /// Runs every validation rule over the cells already written in its
    /// segment (builtin segments may be filled before their rule exists).
    pub fn validate_existing_memory(&mut self) -> Result<(), MemoryError> {
        let mut validated = Vec::new();
        for (index, rule) in self.validation_rules.iter().enumerate() {
            let (Some(rule), Some(segment)) = (rule, self.data.get(index)) else {
                continue;
            };
            for (offset, cell) in segment.iter().enumerate() {
                let addr = Relocatable::from((index as isize, offset));
                if cell.is_some() && !self.validated_addresses.contains(&addr) {
                    validated.extend((rule.0)(self, addr)?);
                }
            }
        }
        self.validated_addresses.extend(&validated);
        Ok(())
    }

    /// Lexicographic comparison of `len` cells starting at `lhs` and `rhs`.
    /// Returns the ordering and the index of the first differing cell. A
    /// missing segment compares lower than an existing one.
    pub(crate) fn memcmp(
        &self,
        lhs: Relocatable,
        rhs: Relocatable,
        len: usize,
    ) -> (Ordering, usize) {
        let (lhs_segment, rhs_segment) = match (
            self.segment(lhs.segment_index),
            self.segment(rhs.segment_index),
        ) {
            (None, None) => return (Ordering::Equal, 0),
            (Some(_), None) => return (Ordering::Greater, 0),
            (None, Some(_)) => return (Ordering::Less, 0),
            (Some(l), Some(r)) => (l, r),
        };
        (0..len)
            .map(|i| {
                let l = lhs_segment.get(lhs.offset + i).and_then(Option::as_ref);
                let r = rhs_segment.get(rhs.offset + i).and_then(Option::as_ref);
                (l.map(MemoryCell::get_value).cmp(&r.map(MemoryCell::get_value)), i)
            })
            .find(|(ordering, _)| *ordering != Ordering::Equal)
            .unwrap_or((Ordering::Equal, len))
    }

    /// Whether the `len` cells starting at `lhs` and `rhs` hold the same values.
    pub(crate) fn mem_eq(&self, lhs: Relocatable, rhs: Relocatable, len: usize) -> bool {
        lhs == rhs || self.memcmp(lhs, rhs, len).0 == Ordering::Equal
    }

    /// `size` cells starting at `addr`; holes come back as `None`.
    pub fn get_range(&self, addr: Relocatable, size: usize) -> Vec<Option<Cow<MaybeRelocatable>>> {
        (0..size)
            .map(|i| (addr + i).ok().and_then(|x| self.get(&x)))
            .collect()
    }

    /// Like [`Memory::get_range`], but a hole is an error.
    pub fn get_continuous_range(
        &self,
        addr: Relocatable,
        size: usize,
    ) -> Result<Vec<MaybeRelocatable>, MemoryError> {
        (0..size)
            .map(|i| {
                self.get(&(addr + i)?)
                    .map(Cow::into_owned)
                    .ok_or_else(|| MemoryError::GetRangeMemoryGap(Box::new((addr, size))))
            })
            .collect()
    }

    pub fn get_integer_range(
        &self,
        addr: Relocatable,
        size: usize,
    ) -> Result<Vec<Cow<Felt252>>, MemoryError> {
        (0..size)
            .map(|i| self.get_integer((addr + i)?))
            .collect()
    }

    pub fn mark_as_accessed(&mut self, addr: Relocatable) {
        let (index, offset) = from_relocatable_to_indexes(addr);
        if let Some(Some(cell)) = self
            .segments_for_mut(addr.segment_index)
            .get_mut(index)
            .and_then(|segment| segment.get_mut(offset))
        {
            cell.mark_accessed()
        }
    }

    pub fn get_amount_of_accessed_addresses_for_segment(
        &self,
        segment_index: usize,
    ) -> Option<usize> {
        Some(
            self.data
                .get(segment_index)?
                .iter()
                .flatten()
                .filter(|cell| cell.is_accessed())
                .count(),
        )
    }
}

/// Applies a temporary-segment relocation rule to `addr`, if one exists.
fn relocate_with_rules(addr: Relocatable, rules: &HashMap<usize, Relocatable>) -> Relocatable {
    if addr.segment_index >= 0 {
        return addr;
    }
    let (key, _) = from_relocatable_to_indexes(addr);
    match rules.get(&key) {
        Some(base) => Relocatable::from((base.segment_index, base.offset + addr.offset)),
        None => addr,
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, segment) in self.temp_data.iter().enumerate() {
            for (j, cell) in segment.iter().enumerate() {
                if let Some(cell) = cell {
                    writeln!(f, "(-{},{j}) : {}", i + 1, cell.get_value())?;
                }
            }
        }
        for (i, segment) in self.data.iter().enumerate() {
            for (j, cell) in segment.iter().enumerate() {
                if let Some(cell) = cell {
                    writeln!(f, "({i},{j}) : {}", cell.get_value())?;
                }
            }
        }
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
