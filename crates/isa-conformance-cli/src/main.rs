#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use isa_conformance::config::parse_count;
use isa_conformance::vector_file::VectorFile;
use isa_conformance::{suites, RunConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "isa-conformance",
    args_conflicts_with_subcommands = true,
    about = "Run x86 instruction test vectors against the semantics model",
    after_help = "Environment: ISA_CONFORMANCE_FILTER, ISA_CONFORMANCE_REPORT_PATH, \
ISA_CONFORMANCE_RDTSC_MAX_SPINS, ISA_CONFORMANCE_REFERENCE. Flags take precedence."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the vector suites, stopping at the first failure (default).
    Run(RunArgs),
    /// List suites with their vector counts and instructions.
    List,
    /// Write the built-in suites as a JSON vector file.
    Export {
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Default, Args)]
struct RunArgs {
    /// Only run suites matching these terms (`suite:<name>`, `insn:<mnemonic>`).
    #[arg(long)]
    filter: Option<String>,

    /// Write a JSON report here.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Bound on RDTSC re-reads while the counter has not advanced.
    #[arg(long, value_parser = parse_spins)]
    max_spins: Option<u64>,

    /// Cross-check against native execution on the host CPU.
    #[arg(long)]
    reference: bool,

    /// Load suites from a JSON vector file instead of the built-in tables.
    #[arg(long)]
    vectors: Option<PathBuf>,
}

fn parse_spins(input: &str) -> Result<u64, String> {
    parse_count(input).ok_or_else(|| format!("invalid spin count {input:?}"))
}

impl RunArgs {
    fn config(&self) -> RunConfig {
        let mut config = RunConfig::from_env();
        if let Some(filter) = &self.filter {
            config.filter = Some(filter.clone());
        }
        if let Some(report) = &self.report {
            config.report_path = Some(report.clone());
        }
        if let Some(spins) = self.max_spins {
            config.rdtsc_max_spins = spins;
        }
        if self.reference {
            config.reference = true;
        }
        config
    }
}

fn run(args: &RunArgs) -> Result<()> {
    let config = args.config();
    let suites = match &args.vectors {
        Some(path) => VectorFile::load(path)
            .with_context(|| format!("failed to load vectors from {}", path.display()))?,
        None => suites::all_suites(),
    };

    tracing::info!(
        filter = config.filter.as_deref().unwrap_or("-"),
        reference = config.reference,
        max_spins = config.rdtsc_max_spins,
        "starting conformance run"
    );
    let report = isa_conformance::run_suites(suites, &config)?;
    if report.failures != 0 {
        bail!("{} vector(s) failed", report.failures);
    }
    println!("ok: {} vectors passed", report.total_vectors);
    Ok(())
}

fn list() {
    for suite in suites::all_suites() {
        println!(
            "{:<14} {:>3}  {}",
            suite.name,
            suite.len(),
            suite.mnemonics().join(", ")
        );
    }
}

fn export(out: &Path) -> Result<()> {
    let suites = suites::all_suites();
    VectorFile::save(&suites, out).with_context(|| format!("failed to write {}", out.display()))?;
    println!("wrote {} suites to {}", suites.len(), out.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Run(args)) => run(&args),
        Some(Command::List) => {
            list();
            Ok(())
        }
        Some(Command::Export { out }) => export(&out),
        None => run(&cli.run),
    }
}
