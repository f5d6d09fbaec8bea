#![cfg(not(target_arch = "wasm32"))]

use isa_conformance::vector_file::{self, VectorFile, SCHEMA_VERSION};
use isa_conformance::{suites, Expected, RunConfig, Runner};
use isa_semantics::SteppingTsc;
use serde::Deserialize;

const FIXTURE: &str = include_str!("../test-vectors/isa-vectors-v1.json");

#[derive(Debug, Deserialize)]
struct FixtureHeader {
    schema: u32,
    suites: Vec<FixtureSuite>,
}

#[derive(Debug, Deserialize)]
struct FixtureSuite {
    name: String,
    vectors: Vec<serde_json::Value>,
}

#[test]
fn fixture_file_matches_static_tables() {
    let from_file = vector_file::from_json(FIXTURE).expect("fixture should parse");
    let builtin = suites::all_suites();

    assert_eq!(from_file.len(), builtin.len(), "suite count drifted");
    for (file, table) in from_file.iter().zip(&builtin) {
        assert_eq!(file.name, table.name);
        assert_eq!(
            file.vectors.len(),
            table.vectors.len(),
            "suite {:?} vector count drifted",
            table.name
        );
        for (idx, (a, b)) in file.vectors.iter().zip(&table.vectors).enumerate() {
            assert_eq!(a, b, "suite {:?} vector {idx} drifted", table.name);
        }
    }
}

#[test]
fn fixture_header_is_current() {
    let header: FixtureHeader = serde_json::from_str(FIXTURE).unwrap();
    assert_eq!(header.schema, SCHEMA_VERSION);
    let total: usize = header.suites.iter().map(|s| s.vectors.len()).sum();
    assert_eq!(total, 69);
    assert!(header.suites.iter().any(|s| s.name == "lock cmpxchg"));
}

#[test]
fn exported_file_parses_to_the_same_structure() {
    let exported = vector_file::to_json(&suites::all_suites()).unwrap();
    let a: VectorFile = serde_json::from_str(&exported).unwrap();
    let b: VectorFile = serde_json::from_str(FIXTURE).unwrap();
    assert_eq!(a, b);
}

#[test]
fn fixture_suites_pass_on_the_model() {
    let suites = vector_file::from_json(FIXTURE).unwrap();
    let mut runner = Runner::with_tsc(SteppingTsc::new(0, 3), RunConfig::default());
    let report = runner.run_all(&suites).unwrap();
    assert_eq!(report.failures, 0);
    assert_eq!(report.total_vectors, 69);

    let undefined = suites
        .iter()
        .flat_map(|s| &s.vectors)
        .filter(|v| v.expected == Expected::Undefined)
        .count();
    assert_eq!(report.undefined.len(), undefined);
}

#[test]
fn vector_file_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/vectors.json");
    let suites = vec![suites::crc32(), suites::rdtsc()];
    VectorFile::save(&suites, &path).unwrap();
    assert_eq!(VectorFile::load(&path).unwrap(), suites);
}
