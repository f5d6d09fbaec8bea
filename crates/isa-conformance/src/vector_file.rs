//! JSON form of the vector suites.
//!
//! ```json
//! { "schema": 1, "suites": [ { "name": "bsrl", "vectors": [
//!     { "insn": "bsrl",
//!       "inputs": { "op": "bit_scan", "dest": 0, "src": 1234 },
//!       "expect": { "kind": "bit_index", "index": 10 } } ] } ] }
//! ```

use std::path::Path;

use isa_semantics::{Inputs, Instruction};
use serde::{Deserialize, Serialize};

use crate::error::{ConformanceError, Result};
use crate::vector::{Expected, Suite, TestVector};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorFile {
    pub schema: u32,
    pub suites: Vec<SuiteEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteEntry {
    pub name: String,
    pub vectors: Vec<VectorEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorEntry {
    pub insn: String,
    pub inputs: InputsEntry,
    pub expect: ExpectEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum InputsEntry {
    BitScan { dest: u64, src: u64 },
    Crc32 { crc: u32, value: u64 },
    CmpXchg { memory: u32, accumulator: u32, src: u32 },
    Rdtsc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpectEntry {
    BitIndex { index: u64 },
    Undefined,
    Crc32 { crc: u32 },
    CmpXchg { zf: bool, memory: u32, accumulator: u32 },
    StrictlyIncreasing,
}

impl From<Inputs> for InputsEntry {
    fn from(inputs: Inputs) -> Self {
        match inputs {
            Inputs::BitScan { dest, src } => InputsEntry::BitScan { dest, src },
            Inputs::Crc32 { crc, value } => InputsEntry::Crc32 { crc, value },
            Inputs::CmpXchg {
                memory,
                accumulator,
                src,
            } => InputsEntry::CmpXchg {
                memory,
                accumulator,
                src,
            },
            Inputs::Rdtsc => InputsEntry::Rdtsc,
        }
    }
}

impl From<InputsEntry> for Inputs {
    fn from(entry: InputsEntry) -> Self {
        match entry {
            InputsEntry::BitScan { dest, src } => Inputs::BitScan { dest, src },
            InputsEntry::Crc32 { crc, value } => Inputs::Crc32 { crc, value },
            InputsEntry::CmpXchg {
                memory,
                accumulator,
                src,
            } => Inputs::CmpXchg {
                memory,
                accumulator,
                src,
            },
            InputsEntry::Rdtsc => Inputs::Rdtsc,
        }
    }
}

impl From<Expected> for ExpectEntry {
    fn from(expected: Expected) -> Self {
        match expected {
            Expected::BitIndex(index) => ExpectEntry::BitIndex { index },
            Expected::Undefined => ExpectEntry::Undefined,
            Expected::Crc32(crc) => ExpectEntry::Crc32 { crc },
            Expected::CmpXchg {
                zf,
                memory,
                accumulator,
            } => ExpectEntry::CmpXchg {
                zf,
                memory,
                accumulator,
            },
            Expected::StrictlyIncreasing => ExpectEntry::StrictlyIncreasing,
        }
    }
}

impl From<ExpectEntry> for Expected {
    fn from(entry: ExpectEntry) -> Self {
        match entry {
            ExpectEntry::BitIndex { index } => Expected::BitIndex(index),
            ExpectEntry::Undefined => Expected::Undefined,
            ExpectEntry::Crc32 { crc } => Expected::Crc32(crc),
            ExpectEntry::CmpXchg {
                zf,
                memory,
                accumulator,
            } => Expected::CmpXchg {
                zf,
                memory,
                accumulator,
            },
            ExpectEntry::StrictlyIncreasing => Expected::StrictlyIncreasing,
        }
    }
}

impl VectorFile {
    pub fn from_suites(suites: &[Suite]) -> Self {
        let suites = suites
            .iter()
            .map(|suite| SuiteEntry {
                name: suite.name.clone(),
                vectors: suite
                    .vectors
                    .iter()
                    .map(|v| VectorEntry {
                        insn: v.instruction.mnemonic().to_string(),
                        inputs: v.inputs.into(),
                        expect: v.expected.into(),
                    })
                    .collect(),
            })
            .collect();
        Self {
            schema: SCHEMA_VERSION,
            suites,
        }
    }

    /// Converts back to runnable suites, rejecting unknown mnemonics and mis-shaped vectors.
    pub fn into_suites(self) -> Result<Vec<Suite>> {
        if self.schema != SCHEMA_VERSION {
            return Err(ConformanceError::VectorFile(format!(
                "unsupported schema {} (expected {SCHEMA_VERSION})",
                self.schema
            )));
        }

        self.suites
            .into_iter()
            .map(|entry| {
                let vectors = entry
                    .vectors
                    .into_iter()
                    .enumerate()
                    .map(|(idx, v)| to_vector(&entry.name, idx, v))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Suite::new(entry.name, vectors))
            })
            .collect()
    }

    pub fn load(path: &Path) -> Result<Vec<Suite>> {
        from_json(&std::fs::read_to_string(path)?)
    }

    pub fn save(suites: &[Suite], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, to_json(suites)?)?;
        Ok(())
    }
}

fn to_vector(suite: &str, idx: usize, entry: VectorEntry) -> Result<TestVector> {
    let instruction: Instruction = entry
        .insn
        .parse()
        .map_err(|e| ConformanceError::VectorFile(format!("{suite}[{idx}]: {e}")))?;
    let inputs = Inputs::from(entry.inputs);
    if !inputs.fits(instruction) {
        return Err(ConformanceError::VectorFile(format!(
            "{suite}[{idx}]: {instruction} cannot take {} operands",
            inputs.kind()
        )));
    }
    let expected = Expected::from(entry.expect);
    let expect_fits = matches!(
        (inputs, expected),
        (Inputs::BitScan { .. }, Expected::BitIndex(_) | Expected::Undefined)
            | (Inputs::Crc32 { .. }, Expected::Crc32(_))
            | (Inputs::CmpXchg { .. }, Expected::CmpXchg { .. })
            | (Inputs::Rdtsc, Expected::StrictlyIncreasing)
    );
    if !expect_fits {
        return Err(ConformanceError::VectorFile(format!(
            "{suite}[{idx}]: {instruction} cannot expect {expected}"
        )));
    }
    Ok(TestVector::new(instruction, inputs, expected))
}

pub fn to_json(suites: &[Suite]) -> Result<String> {
    let mut json = serde_json::to_string_pretty(&VectorFile::from_suites(suites))?;
    json.push('\n');
    Ok(json)
}

pub fn from_json(json: &str) -> Result<Vec<Suite>> {
    let file: VectorFile = serde_json::from_str(json)?;
    file.into_suites()
}
