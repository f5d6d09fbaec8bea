use isa_conformance::{suites, RunConfig, Runner, Suite};
use isa_semantics::{Instruction, SteppingTsc};

fn all_instructions() -> Suite {
    Suite::combined(
        "all instructions",
        [
            &suites::bsfq(),
            &suites::bsfl(),
            &suites::bsr(),
            &suites::crc32(),
            &suites::lock_cmpxchg(),
            &suites::rdtsc(),
        ],
    )
}

#[test]
fn combined_run_covers_the_catalog() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    let suite = all_instructions();
    let mut runner = Runner::with_tsc(SteppingTsc::new(1_000, 33), RunConfig::default());
    let report = runner.run_all(std::slice::from_ref(&suite)).unwrap();

    assert_eq!(report.failures, 0);
    assert_eq!(report.total_vectors, 6 + 6 + 11 + 16 + 2 + 1);
    assert!(report.coverage.uncovered().is_empty());
    for instr in Instruction::ALL {
        assert!(
            report.coverage.counts.get(instr.mnemonic()).copied().unwrap_or(0) > 0,
            "{instr} not exercised"
        );
    }
    assert_eq!(report.undefined.len(), 4);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["suites"][0]["name"], "all instructions");
}

#[test]
fn combined_run_on_host_counter() {
    let report = Runner::new(RunConfig::default())
        .run_all(&[all_instructions()])
        .unwrap();
    assert_eq!(report.failures, 0);
}
