use isa_semantics::{Inputs, Instruction};

#[cfg(target_arch = "x86_64")]
mod host;

#[cfg(target_arch = "x86_64")]
pub use host::ReferenceBackend;

#[cfg(not(target_arch = "x86_64"))]
pub struct ReferenceBackend;

#[cfg(not(target_arch = "x86_64"))]
impl ReferenceBackend {
    pub fn new() -> Result<Self, &'static str> {
        Err("host executor requires x86_64")
    }

    pub fn execute(
        &mut self,
        _instr: Instruction,
        _inputs: &Inputs,
    ) -> Result<isa_semantics::Outcome, &'static str> {
        Err("host executor requires x86_64")
    }
}

/// Whether the host result must equal the model's result bit for bit.
///
/// RDTSC is compared by ordering only, and zero-source bit scans are recorded instead.
pub(crate) fn is_comparable(instr: Instruction, inputs: &Inputs) -> bool {
    match (instr.is_nondeterministic(), inputs) {
        (true, _) => false,
        (false, Inputs::BitScan { src, .. }) => src & instr.width().mask() != 0,
        (false, _) => true,
    }
}
