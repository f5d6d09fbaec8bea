use crate::error::Result;
use crate::vector::{Suite, TestVector};
use iced_x86::Formatter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;

/// Receives instruction usage as the runner evaluates vectors.
///
/// This is the boundary to whatever aggregates instruction popularity; the runner reports one
/// occurrence per evaluated vector, keyed by AT&T mnemonic.
pub trait UsageSink {
    fn record(&mut self, instruction: &str, occurrences: u64);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    pub total_vectors: usize,
    pub failures: usize,
    pub suites: Vec<SuiteSummary>,
    pub undefined: Vec<UndefinedObservation>,
    pub coverage: CoverageSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub name: String,
    pub vectors: usize,
    pub mnemonics: Vec<String>,
}

impl SuiteSummary {
    pub fn for_suite(suite: &Suite) -> Self {
        Self {
            name: suite.name.clone(),
            vectors: suite.len(),
            mnemonics: suite.mnemonics().into_iter().map(str::to_string).collect(),
        }
    }
}

/// A zero-source bit scan: the result is recorded, never asserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndefinedObservation {
    pub suite: String,
    pub index: usize,
    pub instruction: String,
    pub inputs: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl ConformanceReport {
    pub fn new_for_suites(suites: &[Suite]) -> Self {
        Self {
            total_vectors: suites.iter().map(Suite::len).sum(),
            failures: 0,
            suites: Vec::new(),
            undefined: Vec::new(),
            coverage: CoverageSummary::for_suites(suites),
        }
    }

    pub fn print_summary(&self) {
        eprintln!(
            "isa-conformance: {} suites, {} vectors, {} failures",
            self.suites.len(),
            self.total_vectors,
            self.failures
        );
        for suite in &self.suites {
            eprintln!(
                "  {:<14} {:>3} vectors  [{}]",
                suite.name,
                suite.vectors,
                suite.mnemonics.join(", ")
            );
        }

        eprintln!(
            "coverage: {:.1}% ({} / {})",
            self.coverage.percent(),
            self.coverage.covered(),
            self.coverage.expected()
        );

        let uncovered = self.coverage.uncovered();
        if !uncovered.is_empty() {
            eprintln!("uncovered:");
            for key in uncovered {
                eprintln!("  - {key}");
            }
        }

        if !self.undefined.is_empty() {
            eprintln!("undefined inputs (recorded, not asserted):");
            for obs in &self.undefined {
                let host = obs.host.as_deref().unwrap_or("-");
                eprintln!(
                    "  {}[{}] {} {}: model {} host {}",
                    obs.suite, obs.index, obs.instruction, obs.inputs, obs.model, host
                );
            }
        }
    }

    /// Writes the report as pretty JSON, creating parent directories as needed.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut out, self)?;
        out.flush()?;
        Ok(())
    }
}

/// Vectors evaluated per mnemonic.
///
/// Every mnemonic the run is expected to exercise is seeded at zero, so a key with a zero count is
/// uncovered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub counts: BTreeMap<String, u64>,
}

impl CoverageSummary {
    pub fn expecting<I, S>(mnemonics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            counts: mnemonics.into_iter().map(|m| (m.into(), 0)).collect(),
        }
    }

    pub fn for_suites(suites: &[Suite]) -> Self {
        Self::expecting(
            suites
                .iter()
                .flat_map(|s| s.vectors.iter().map(|v| v.instruction.mnemonic())),
        )
    }

    pub fn expected(&self) -> usize {
        self.counts.len()
    }

    pub fn covered(&self) -> usize {
        self.counts.values().filter(|&&n| n > 0).count()
    }

    pub fn uncovered(&self) -> Vec<String> {
        self.counts
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn percent(&self) -> f64 {
        match self.expected() {
            0 => 100.0,
            total => self.covered() as f64 * 100.0 / total as f64,
        }
    }
}

impl UsageSink for CoverageSummary {
    fn record(&mut self, instruction: &str, occurrences: u64) {
        *self.counts.entry(instruction.to_string()).or_default() += occurrences;
    }
}

pub fn format_failure(suite: &str, index: usize, vector: &TestVector, actual: &str) -> String {
    let mut out = String::new();
    let instr = vector.instruction;
    let bytes = instr.encoding();
    let byte_hex = bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ");

    let _ = writeln!(&mut out, "mismatch in suite {suite:?} (vector {index}): {instr}");
    let _ = writeln!(&mut out, "bytes: {byte_hex}");
    if let Some(decoded) = disassemble(bytes) {
        let _ = writeln!(&mut out, "iced-x86: {decoded}");
    }
    let _ = writeln!(&mut out, "inputs: {}", vector.inputs);
    let _ = writeln!(&mut out, "expected: {}", vector.expected);
    let _ = writeln!(&mut out, "actual: {actual}");
    let _ = writeln!(
        &mut out,
        "FAIL suite=\"{suite}\" index={index} insn=\"{}\"",
        instr.mnemonic()
    );
    out
}

/// Renders the canonical encoding in AT&T syntax.
pub fn disassemble(bytes: &[u8]) -> Option<String> {
    let mut decoder = iced_x86::Decoder::with_ip(64, bytes, 0, iced_x86::DecoderOptions::NONE);
    let instruction = decoder.decode();
    if instruction.is_invalid() {
        return None;
    }

    let mut formatter = iced_x86::GasFormatter::new();
    let mut decoded = String::new();
    formatter.format(&instruction, &mut decoded);
    Some(format!(
        "{decoded} (len={} code={:?})",
        instruction.len(),
        instruction.code()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suites;
    use isa_semantics::Instruction;

    #[test]
    fn coverage_tracks_recorded_usage() {
        let mut report = ConformanceReport::new_for_suites(&[suites::crc32()]);
        assert_eq!(report.total_vectors, 16);
        assert_eq!(report.coverage.expected(), 4);
        assert_eq!(
            report.coverage.uncovered(),
            vec!["crc32b", "crc32l", "crc32q", "crc32w"]
        );
        assert_eq!(report.coverage.covered(), 0);

        report.coverage.record("crc32b", 2);
        report.coverage.record("crc32b", 1);
        report.coverage.record("crc32q", 1);
        assert_eq!(report.coverage.counts.get("crc32b"), Some(&3));
        assert_eq!(report.coverage.covered(), 2);
        assert_eq!(report.coverage.uncovered(), vec!["crc32l", "crc32w"]);
        assert!((report.coverage.percent() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn every_encoding_decodes() {
        for instr in Instruction::ALL {
            let decoded = disassemble(instr.encoding())
                .unwrap_or_else(|| panic!("{instr} encoding did not decode"));
            // The formatter omits size suffixes.
            let stem = instr
                .mnemonic()
                .trim_start_matches("lock ")
                .trim_end_matches(['b', 'w', 'l', 'q']);
            assert!(decoded.contains(stem), "{instr}: {decoded}");
        }
    }

    #[test]
    fn crc32_encodings_use_the_documented_registers() {
        let cases = [
            (Instruction::Crc32B, "%cl", "%eax"),
            (Instruction::Crc32W, "%cx", "%eax"),
            (Instruction::Crc32L, "%ecx", "%eax"),
            (Instruction::Crc32Q, "%rcx", "%rax"),
        ];
        for (instr, src, dst) in cases {
            let decoded = disassemble(instr.encoding()).unwrap();
            assert!(decoded.contains(&format!("{src},{dst}")), "{instr}: {decoded}");
        }
    }

    #[test]
    fn failure_message_names_vector() {
        let v = suites::BSRQ[3];
        let msg = format_failure("bsrq", 3, &v, "dest=0x7 zf=0");
        assert!(msg.contains("bsrq"));
        assert!(msg.contains("expected: dest=0x6 zf=0"));
        assert!(msg.contains("actual: dest=0x7 zf=0"));
        assert!(msg.contains("bytes: 48 0f bd c1"));
        assert!(msg.contains("FAIL suite=\"bsrq\" index=3"));
    }

    #[test]
    fn json_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/report.json");
        let mut report = ConformanceReport::new_for_suites(&[suites::rdtsc()]);
        report.suites.push(SuiteSummary::for_suite(&suites::rdtsc()));
        report.write_json(&path).unwrap();

        let parsed: ConformanceReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.total_vectors, 1);
        assert_eq!(parsed.suites[0].mnemonics, vec!["rdtsc"]);
    }
}
