//! # Somatic Pileup Comparison
//!
//! Streaming tools for finding variants in a tumor pileup and checking each
//! of them against a matched normal sample.
//!
//! ## Passes
//!
//! 1. **Qualify (tumor)**: decode every pileup line, keep non-reference alleles
//!    that pass the [`Thresholds`], and record them in a [`TargetIndex`].
//! 2. **Qualify (normal)**: decode the normal pileup with that index, emitting
//!    every non-reference allele at indexed loci regardless of thresholds.
//! 3. **Compare**: merge-join the two qualifying-variant files in one forward
//!    pass and write a combined row per tumor variant.
//!
//! ## Usage Example
//!
//! ```ignore
//! use somatic_pileup::{PipelineConfig, QualifyPass, Thresholds};
//!
//! let config = PipelineConfig::default().with_thresholds(Thresholds::new(3, 0.1, true)?);
//! let report = QualifyPass::new(config).run(pileup, "tumor.pileup", &mut out)?;
//! report.discovered.write_to(&mut index_out)?;
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod genomics; // Pileup decoding, qualification and comparison

pub use genomics::{
    compare_streams, ComparisonSummary, QualifiedVariant, QualifyMode, TargetIndex, Thresholds,
    VariantKey, VariantQualifier,
};

use std::io::{BufRead, Write};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use genomics::{
    decode_line, format_qualified, quote_line, ComparisonError, ConfigError, ContigOrder,
    DecodeError, Locus, LocusStream, PileupLine, StreamError, TargetIndexError, QUALIFIED_HEADER,
};

/// Default number of lines between progress messages.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Configuration of a qualify pass.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Thresholds applied outside targeted loci.
    pub thresholds: Thresholds,

    /// Discovery or targeted mode.
    pub mode: QualifyMode,

    /// Lines between `debug` progress messages; 0 disables them.
    pub progress_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            mode: QualifyMode::Discovery,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl PipelineConfig {
    /// Use the given thresholds.
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Validate and use raw threshold values.
    pub fn with_threshold_values(
        self,
        min_supporting_reads: u32,
        min_support_fraction: f64,
        require_both_strands: bool,
    ) -> Result<Self, ConfigError> {
        let thresholds =
            Thresholds::new(min_supporting_reads, min_support_fraction, require_both_strands)?;
        Ok(self.with_thresholds(thresholds))
    }

    /// Switch to targeted mode driven by a tumor-pass index.
    pub fn with_targets(mut self, targets: TargetIndex) -> Self {
        self.mode = QualifyMode::Targeted(targets);
        self
    }

    /// Set the progress interval.
    pub fn with_progress_interval(mut self, lines: u64) -> Self {
        self.progress_interval = lines;
        self
    }
}

/// Errors that can occur while running a pass.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid thresholds
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A pileup line could not be decoded
    #[error("{source_name}:{line_no}: {error} in '{content}'")]
    Decode {
        /// File name or label of the input
        source_name: String,
        /// 1-based line number
        line_no: usize,
        /// Truncated line content
        content: String,
        /// Decoder failure
        #[source]
        error: DecodeError,
    },

    /// Unsorted input, or failure reading a qualifying-variant stream
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Failure reading or writing a target index
    #[error(transparent)]
    TargetIndex(#[from] TargetIndexError),

    /// Failure during the tumor/normal merge-join
    #[error(transparent)]
    Comparison(#[from] ComparisonError),

    /// Failure reading the pileup or writing output
    #[error("{source_name}: I/O error: {error}")]
    Io {
        /// File name or label of the stream
        source_name: String,
        /// I/O error
        #[source]
        error: std::io::Error,
    },
}

/// Counts gathered by a qualify pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualifySummary {
    /// Lines read, excluding blank lines.
    pub lines: u64,
    /// Lines with usable coverage.
    pub covered: u64,
    /// Lines with zero coverage or no read bases.
    pub uncovered: u64,
    /// Lines skipped for having too few fields.
    pub malformed: u64,
    /// Substitution rows written.
    pub substitutions: u64,
    /// Indel rows written.
    pub indels: u64,
    /// `N` and `U` anchor rows written.
    pub anchors: u64,
    /// Read-base characters skipped as unrecognized.
    pub unrecognized: u64,
}

impl QualifySummary {
    /// Rows written to the qualifying-variant file.
    pub fn rows(&self) -> u64 {
        self.substitutions + self.indels + self.anchors
    }

    fn record_row(&mut self, row: &QualifiedVariant) {
        match row.class {
            genomics::VariantClass::Substitution => self.substitutions += 1,
            genomics::VariantClass::Indel => self.indels += 1,
            genomics::VariantClass::NonVariant | genomics::VariantClass::Uncovered => {
                self.anchors += 1
            }
        }
    }
}

/// Outcome of a qualify pass.
#[derive(Debug, Clone)]
pub struct QualifyReport {
    /// Counts for the pass.
    pub summary: QualifySummary,
    /// Keys that qualified on thresholds; empty in targeted mode.
    pub discovered: TargetIndex,
}

/// Tracks contig contiguity and strictly increasing positions of a pileup.
#[derive(Debug, Default)]
struct SortCheck {
    contigs: ContigOrder,
    previous: Option<Locus>,
}

impl SortCheck {
    fn observe(&mut self, source_name: &str, line_no: usize, locus: &Locus) -> Result<(), StreamError> {
        match &self.previous {
            Some(previous) if previous.contig == locus.contig => {
                if locus.position <= previous.position {
                    return Err(StreamError::OutOfOrder {
                        source_name: source_name.to_string(),
                        line_no,
                        locus: locus.clone(),
                        previous: previous.clone(),
                    });
                }
            }
            previous => {
                if !self.contigs.push(std::sync::Arc::clone(&locus.contig)) {
                    return Err(StreamError::ContigNotContiguous {
                        source_name: source_name.to_string(),
                        line_no,
                        contig: locus.contig.to_string(),
                        previous: previous
                            .as_ref()
                            .map(|p| p.contig.to_string())
                            .unwrap_or_default(),
                    });
                }
            }
        }
        self.previous = Some(locus.clone());
        Ok(())
    }
}

/// Single forward pass from a pileup to a qualifying-variant file.
#[derive(Debug)]
pub struct QualifyPass {
    qualifier: VariantQualifier,
    progress_interval: u64,
}

impl QualifyPass {
    /// Create a pass from a configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            qualifier: VariantQualifier::new(config.thresholds, config.mode),
            progress_interval: config.progress_interval,
        }
    }

    /// Decode `reader` line by line and write qualifying rows to `writer`.
    ///
    /// Lines with fewer than four fields are skipped with a warning. Any other
    /// undecodable line, or input that is not sorted by contig and position,
    /// aborts the pass.
    pub fn run<R, W>(
        mut self,
        mut reader: R,
        source_name: &str,
        writer: &mut W,
    ) -> Result<QualifyReport, PipelineError>
    where
        R: BufRead,
        W: Write,
    {
        let io_error = |error: std::io::Error| PipelineError::Io {
            source_name: source_name.to_string(),
            error,
        };

        writer
            .write_all(QUALIFIED_HEADER.as_bytes())
            .map_err(io_error)?;

        let mut summary = QualifySummary::default();
        let mut sort_check = SortCheck::default();
        let mut line = String::new();
        let mut line_no = 0usize;

        loop {
            line.clear();
            if reader.read_line(&mut line).map_err(io_error)? == 0 {
                break;
            }
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            summary.lines += 1;

            let decoded = decode_line(&line).map_err(|error| PipelineError::Decode {
                source_name: source_name.to_string(),
                line_no,
                content: quote_line(line.trim_end()),
                error,
            })?;

            match decoded {
                PileupLine::Malformed { field_count } => {
                    warn!(
                        source = source_name,
                        line_no,
                        field_count,
                        "skipping pileup line with too few fields"
                    );
                    summary.malformed += 1;
                }
                PileupLine::Uncovered(site) => {
                    sort_check.observe(source_name, line_no, &site.locus)?;
                    summary.uncovered += 1;
                    let row = self.qualifier.qualify_uncovered(&site);
                    summary.record_row(&row);
                    writeln!(writer, "{}", format_qualified(&row)).map_err(io_error)?;
                }
                PileupLine::Covered(decoded) => {
                    sort_check.observe(source_name, line_no, &decoded.site.locus)?;
                    summary.covered += 1;
                    summary.unrecognized += u64::from(decoded.tally.unrecognized);
                    for row in self.qualifier.qualify(&decoded) {
                        summary.record_row(&row);
                        writeln!(writer, "{}", format_qualified(&row)).map_err(io_error)?;
                    }
                }
            }

            if self.progress_interval > 0 && summary.lines % self.progress_interval == 0 {
                debug!(source = source_name, lines = summary.lines, rows = summary.rows(), "qualify progress");
            }
        }

        writer.flush().map_err(io_error)?;
        info!(
            source = source_name,
            lines = summary.lines,
            covered = summary.covered,
            uncovered = summary.uncovered,
            malformed = summary.malformed,
            substitutions = summary.substitutions,
            indels = summary.indels,
            anchors = summary.anchors,
            unrecognized = summary.unrecognized,
            "qualify pass complete"
        );

        Ok(QualifyReport {
            summary,
            discovered: self.qualifier.into_discovered(),
        })
    }
}

/// Merge-join two qualifying-variant files on disk.
///
/// Both files are pre-scanned for their contig order before any row is
/// written.
pub fn compare_files<W: Write>(
    tumor_path: &Path,
    normal_path: &Path,
    writer: &mut W,
) -> Result<ComparisonSummary, PipelineError> {
    let mut tumor = LocusStream::open(tumor_path)?;
    let mut normal = LocusStream::open(normal_path)?;
    Ok(compare_streams(&mut tumor, &mut normal, writer)?)
}
