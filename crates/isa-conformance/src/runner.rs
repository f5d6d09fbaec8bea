//! Fail-fast execution of vector suites.

use isa_semantics::{Evaluator, HostTsc, Inputs, Instruction, Outcome, TscSource};
use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::error::{ConformanceError, Result};
use crate::reference::{self, ReferenceBackend};
use crate::report::{self, ConformanceReport, SuiteSummary, UndefinedObservation, UsageSink};
use crate::vector::{Expected, Suite, TestVector};

pub struct Runner<T: TscSource = HostTsc> {
    eval: Evaluator<T>,
    config: RunConfig,
    reference: Option<ReferenceBackend>,
}

impl Runner<HostTsc> {
    pub fn new(config: RunConfig) -> Self {
        Self::with_tsc(HostTsc::new(), config)
    }
}

impl<T: TscSource> Runner<T> {
    pub fn with_tsc(tsc: T, config: RunConfig) -> Self {
        Self {
            eval: Evaluator::with_tsc(tsc),
            config,
            reference: None,
        }
    }

    pub fn attach_reference(&mut self, backend: ReferenceBackend) {
        self.reference = Some(backend);
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &Evaluator<T> {
        &self.eval
    }

    /// Runs one suite on its own, discarding coverage and undefined-input observations.
    pub fn run(&mut self, suite: &Suite) -> Result<SuiteSummary> {
        let mut scratch = ConformanceReport::new_for_suites(std::slice::from_ref(suite));
        self.run_into(suite, &mut scratch)
    }

    /// Runs suites in order and stops at the first failing vector.
    ///
    /// When a report path is configured the report is written on failure and again at the end.
    pub fn run_all(&mut self, suites: &[Suite]) -> Result<ConformanceReport> {
        let mut report = ConformanceReport::new_for_suites(suites);

        for suite in suites {
            match self.run_into(suite, &mut report) {
                Ok(summary) => report.suites.push(summary),
                Err(err) => {
                    if err.is_vector_failure() {
                        report.failures += 1;
                    }
                    if let Some(path) = self.config.report_path.as_deref() {
                        let _ = report.write_json(path);
                    }
                    error!(suite = %suite.name, error = %err, "conformance run failed");
                    return Err(err);
                }
            }
        }

        if let Some(path) = self.config.report_path.as_deref() {
            report.write_json(path)?;
        }
        Ok(report)
    }

    /// Runs one suite, recording usage and undefined-input observations into `report`.
    pub fn run_into(&mut self, suite: &Suite, report: &mut ConformanceReport) -> Result<SuiteSummary> {
        for (index, vector) in suite.vectors.iter().enumerate() {
            report.coverage.record(vector.instruction.mnemonic(), 1);
            if let Some(obs) = self.run_vector(&suite.name, index, vector)? {
                report.undefined.push(obs);
            }
        }

        info!(
            suite = %suite.name,
            vectors = suite.len(),
            "suite passed"
        );
        Ok(SuiteSummary::for_suite(suite))
    }

    fn run_vector(
        &mut self,
        suite: &str,
        index: usize,
        vector: &TestVector,
    ) -> Result<Option<UndefinedObservation>> {
        let instr = vector.instruction;
        let mismatch = |actual: &Outcome| {
            error!(
                "{}",
                report::format_failure(suite, index, vector, &actual.to_string())
            );
            ConformanceError::SemanticMismatch {
                suite: suite.to_string(),
                index,
                instruction: instr,
                message: format!(
                    "inputs {}: expected {}, got {actual}",
                    vector.inputs, vector.expected
                ),
            }
        };

        if let Expected::StrictlyIncreasing = vector.expected {
            self.check_rdtsc(suite, index, vector)?;
            return Ok(None);
        }

        let outcome = self.eval.evaluate(instr, &vector.inputs)?;
        debug!(suite, index, insn = instr.mnemonic(), inputs = %vector.inputs, outcome = %outcome);

        let passed = match (vector.expected, outcome) {
            (Expected::BitIndex(idx), Outcome::BitScan(scan)) => !scan.zf && scan.dest == idx,
            (Expected::Undefined, Outcome::BitScan(scan)) => scan.zf,
            (Expected::Crc32(crc), Outcome::Crc32(actual)) => crc == actual,
            (
                Expected::CmpXchg {
                    zf,
                    memory,
                    accumulator,
                },
                Outcome::CmpXchg(out),
            ) => out.zf == zf && out.memory == memory && out.accumulator == accumulator,
            _ => false,
        };
        if !passed {
            return Err(mismatch(&outcome));
        }

        self.cross_check(suite, index, instr, &vector.inputs, &outcome)?;

        if vector.expected == Expected::Undefined {
            let host = self.observe_host(instr, &vector.inputs);
            warn!(
                suite,
                index,
                insn = instr.mnemonic(),
                inputs = %vector.inputs,
                model = %outcome,
                host = host.as_deref().unwrap_or("-"),
                "undefined input observed"
            );
            return Ok(Some(UndefinedObservation {
                suite: suite.to_string(),
                index,
                instruction: instr.mnemonic().to_string(),
                inputs: vector.inputs.to_string(),
                model: outcome.to_string(),
                host,
            }));
        }

        Ok(None)
    }

    /// Two reads, then re-read while the counter has not moved.
    fn check_rdtsc(&mut self, suite: &str, index: usize, vector: &TestVector) -> Result<()> {
        let first = self.read_tsc(suite, index, vector)?;
        let mut second = self.read_tsc(suite, index, vector)?;
        let mut spins = 0u64;

        while second == first {
            if spins >= self.config.rdtsc_max_spins {
                return Err(ConformanceError::CounterStalled {
                    suite: suite.to_string(),
                    index,
                    first,
                    spins,
                });
            }
            spins += 1;
            second = self.read_tsc(suite, index, vector)?;
        }

        debug!(suite, index, insn = "rdtsc", first, second, spins);
        if second < first {
            return Err(ConformanceError::SemanticMismatch {
                suite: suite.to_string(),
                index,
                instruction: vector.instruction,
                message: format!("counter went backwards: first={first:#x} second={second:#x}"),
            });
        }
        Ok(())
    }

    fn read_tsc(&mut self, suite: &str, index: usize, vector: &TestVector) -> Result<u64> {
        match self.eval.evaluate(vector.instruction, &vector.inputs)? {
            Outcome::Rdtsc(v) => Ok(v.value()),
            other => Err(ConformanceError::SemanticMismatch {
                suite: suite.to_string(),
                index,
                instruction: vector.instruction,
                message: format!("expected an rdtsc outcome, got {other}"),
            }),
        }
    }

    fn cross_check(
        &mut self,
        suite: &str,
        index: usize,
        instr: Instruction,
        inputs: &Inputs,
        model: &Outcome,
    ) -> Result<()> {
        let Some(backend) = self.reference.as_mut() else {
            return Ok(());
        };
        if !reference::is_comparable(instr, inputs) {
            return Ok(());
        }

        let host = backend
            .execute(instr, inputs)
            .map_err(|e| ConformanceError::ReferenceUnavailable(e.to_string()))?;
        if host != *model {
            return Err(ConformanceError::ReferenceMismatch {
                suite: suite.to_string(),
                index,
                instruction: instr,
                message: format!("model {model}, host {host}"),
            });
        }
        Ok(())
    }

    fn observe_host(&mut self, instr: Instruction, inputs: &Inputs) -> Option<String> {
        let backend = self.reference.as_mut()?;
        match backend.execute(instr, inputs) {
            Ok(out) => Some(out.to_string()),
            Err(e) => {
                warn!(insn = instr.mnemonic(), error = e, "host observation failed");
                None
            }
        }
    }
}
