use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use somatic_pileup::genomics::io::{create_output, open_input};
use somatic_pileup::{compare_files, PipelineConfig, QualifyPass, TargetIndex};

#[derive(Parser, Debug)]
#[command(
    name = "somatic-pileup",
    about = "Qualify pileup variants and compare tumor against normal"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG is set.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Turn a pileup into a qualifying-variant file.
    Qualify(QualifyArgs),
    /// Merge-join tumor and normal qualifying-variant files.
    Compare {
        /// Tumor qualifying-variant file.
        tumor: PathBuf,
        /// Normal qualifying-variant file.
        normal: PathBuf,
        /// Combined output (`-` for stdout).
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct QualifyArgs {
    /// Pileup input (`-` for stdin, `.gz` is decompressed).
    pileup: PathBuf,
    /// Qualifying-variant output (`-` for stdout).
    #[arg(short, long, default_value = "-")]
    output: PathBuf,
    /// Minimum reads supporting a non-reference allele.
    #[arg(long, default_value_t = 0)]
    min_reads: u32,
    /// Minimum supporting fraction of coverage, in [0, 1).
    #[arg(long, default_value_t = 0.0)]
    min_fraction: f64,
    /// Require support on both strands.
    #[arg(long)]
    both_strands: bool,
    /// Write the loci and keys that qualified to this index (tumor pass).
    #[arg(long, value_name = "INDEX_OUT", conflicts_with = "targets")]
    discover: Option<PathBuf>,
    /// Emit every allele at loci from this index (normal pass).
    #[arg(long, value_name = "INDEX_IN")]
    targets: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Qualify(args) => run_qualify(args)?,
        Commands::Compare {
            tumor,
            normal,
            output,
        } => run_compare(tumor, normal, output)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_qualify(args: QualifyArgs) -> Result<()> {
    let mut config = PipelineConfig::default()
        .with_threshold_values(args.min_reads, args.min_fraction, args.both_strands)
        .context("invalid thresholds")?;

    if let Some(index_path) = &args.targets {
        let reader = open_input(index_path)
            .with_context(|| format!("failed to open target index {}", index_path.display()))?;
        let targets = TargetIndex::read_from(reader)
            .with_context(|| format!("failed to read target index {}", index_path.display()))?;
        info!(loci = targets.len(), path = %index_path.display(), "loaded target index");
        config = config.with_targets(targets);
    }

    let reader = open_input(&args.pileup)
        .with_context(|| format!("failed to open pileup {}", args.pileup.display()))?;
    let mut writer = create_output(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let source_name = args.pileup.display().to_string();
    let report = QualifyPass::new(config)
        .run(reader, &source_name, &mut writer)
        .with_context(|| format!("qualify pass over {} failed", source_name))?;
    writer
        .finish()
        .with_context(|| format!("failed to finish {}", args.output.display()))?;

    if let Some(index_path) = &args.discover {
        let mut index_writer = create_output(index_path)
            .with_context(|| format!("failed to create target index {}", index_path.display()))?;
        report
            .discovered
            .write_to(&mut index_writer)
            .with_context(|| format!("failed to write target index {}", index_path.display()))?;
        index_writer
            .finish()
            .with_context(|| format!("failed to finish target index {}", index_path.display()))?;
    }

    Ok(())
}

fn run_compare(tumor: PathBuf, normal: PathBuf, output: PathBuf) -> Result<()> {
    let mut writer = create_output(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    compare_files(&tumor, &normal, &mut writer).with_context(|| {
        format!(
            "comparison of {} against {} failed",
            tumor.display(),
            normal.display()
        )
    })?;
    writer
        .finish()
        .with_context(|| format!("failed to finish {}", output.display()))?;
    Ok(())
}
