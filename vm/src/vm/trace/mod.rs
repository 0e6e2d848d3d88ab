pub mod trace_entry {
    use serde::{Deserialize, Serialize};

    use crate::{
        types::relocatable::{relocate_address, Relocatable},
        vm::errors::trace_errors::TraceError,
    };

    /// Registers before an instruction executed.
    #[derive(Debug, PartialEq, Eq, Deserialize, Serialize, Clone, Copy)]
    pub struct TraceEntry {
        pub pc: Relocatable,
        pub ap: Relocatable,
        pub fp: Relocatable,
    }

    /// A [`TraceEntry`] flattened with the segment relocation table.
    #[derive(Debug, PartialEq, Eq, Deserialize, Serialize, Clone)]
    pub struct RelocatedTraceEntry {
        pub pc: usize,
        pub ap: usize,
        pub fp: usize,
    }

    pub fn relocate_trace_register(
        value: Relocatable,
        relocation_table: &[usize],
    ) -> Result<usize, TraceError> {
        relocate_address(value, relocation_table).map_err(|_| TraceError::NoRelocationFound)
    }

    impl TraceEntry {
        pub fn relocate(
            &self,
            relocation_table: &[usize],
        ) -> Result<RelocatedTraceEntry, TraceError> {
            Ok(RelocatedTraceEntry {
                pc: relocate_trace_register(self.pc, relocation_table)?,
                ap: relocate_trace_register(self.ap, relocation_table)?,
                fp: relocate_trace_register(self.fp, relocation_table)?,
            })
        }
    }

}
