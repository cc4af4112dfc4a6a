use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use idchain::{
    ChainConfig, ChainError, FileSpec, IdentifierSet, MalformedPolicy, MeterConfig, Operator,
    run_chain,
};
use itertools::Itertools;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "idchain")]
#[command(about = "Set algebra over line-delimited files of u64 ids", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine the files given on the command line
    Compute {
        /// Operator applied across the files, in order
        #[arg(long, value_enum, default_value = "intersection")]
        op: Operator,
        /// Leading lines to skip in every file
        #[arg(long, default_value_t = 0)]
        skip: u64,
        /// Lines to read after the skipped ones (0 or negative = all)
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        limit: i64,
        #[arg(long, value_enum, default_value = "abort")]
        on_malformed: MalformedPolicy,
        /// Skip files that do not exist instead of failing
        #[arg(long)]
        skip_missing: bool,
        /// Skip files larger than this many bytes
        #[arg(long)]
        max_source_bytes: Option<u64>,
        /// Emit a random sample of this size instead of the whole result
        #[arg(long)]
        sample: Option<u64>,
        #[command(flatten)]
        out: OutputArgs,
        /// Input files, one id per line
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Run a JSON job description
    Job {
        config: PathBuf,
        #[command(flatten)]
        out: OutputArgs,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Write ids here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    /// Print per-source counters as JSON to stderr
    #[arg(long)]
    report: bool,
}

fn main() -> ExitCode {
    dotenv().ok();
    idchain::init_tracing("idchain");
    let cli = Cli::parse();

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[idchain] {} stage failed: {}", e.stage(), e);
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<(), ChainError> {
    let (config, out) = match cli.command {
        Commands::Compute {
            op,
            skip,
            limit,
            on_malformed,
            skip_missing,
            max_source_bytes,
            sample,
            out,
            paths,
        } => {
            let sources = paths
                .into_iter()
                .map(|p| FileSpec::new(p).with_skip(skip).with_limit(limit))
                .collect();
            let mut config = ChainConfig::new(op, sources);
            config.on_malformed = on_malformed;
            config.sample = sample;
            config.meter = MeterConfig {
                skip_missing,
                max_source_bytes,
            };
            (config, out)
        }
        Commands::Job { config, out } => (ChainConfig::load(&config)?, out),
    };

    eprintln!(
        "[idchain] {} over {} source(s)",
        config.operator,
        config.sources.len()
    );
    let output = run_chain(&config)?;

    let emitted = output.sample.as_ref().unwrap_or(&output.result);
    write_ids(emitted, out.output.as_deref())?;

    eprintln!(
        "[idchain] passes={} skipped={} malformed={} result={} emitted={}",
        output.summary.passes,
        output.summary.skipped,
        output.summary.malformed,
        output.summary.cardinality,
        emitted.size()
    );
    if !output.meter.denied().is_empty() {
        eprintln!(
            "[idchain] denied: {}",
            output.meter.denied().iter().map(|d| d.path.display()).join(", ")
        );
    }
    if out.report {
        eprintln!("{}", output.meter.to_json()?);
    }
    Ok(())
}

fn write_ids(ids: &IdentifierSet, path: Option<&Path>) -> Result<(), ChainError> {
    let mut writer: Box<dyn Write> = match path {
        Some(p) => {
            let file = File::create(p).map_err(|source| ChainError::Source {
                path: p.to_path_buf(),
                source,
            })?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    for id in ids.iter() {
        writeln!(writer, "{}", id)?;
    }
    writer.flush()?;
    Ok(())
}
