//! Tumor/normal merge-join.
//!
//! [`compare_streams`] walks the tumor stream once, seeking the normal stream
//! forward to each tumor locus with a [`LocusMatcher`], and writes one row per
//! tumor variant. All normal records sharing a matched locus are gathered once
//! and reused for every tumor variant at that locus.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use thiserror::Error;
use tracing::{debug, info};

use crate::genomics::{
    validate_contig_orders, ContigOrderMismatch, Locus, LocusMatcher, LocusStream, MatchError,
    MatchOutcome, QualifiedVariant, StrandTally, StreamError, VariantClass, NO_VARIANT,
};

/// Header line of the combined comparison table.
pub const COMPARISON_HEADER: &str = "#locus\tref\tvariant\ttype\ttumor_support\ttumor_coverage\tnormal_support\tnormal_coverage\ttumor_strand\tnormal_strand\tindel_seq\ttumor_raw\tnormal_raw\tnormal_status\n";

const NO_SEQUENCE: &str = "NA";

/// Progress is logged every this many tumor rows.
const PROGRESS_INTERVAL: u64 = 1_000_000;

/// Errors raised by the merge-join.
#[derive(Debug, Error)]
pub enum ComparisonError {
    /// The two files disagree on contig order.
    #[error(transparent)]
    ContigOrder(#[from] ContigOrderMismatch),

    /// Failure reading either stream.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Failure searching the normal stream.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// Failure writing the combined table.
    #[error("failed to write comparison row: {0}")]
    Io(#[from] std::io::Error),
}

/// What the normal sample showed for one tumor variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalStatus {
    /// The normal has a record with the same key.
    Supported,
    /// The normal covers the locus without the key.
    Unsupported,
    /// The normal has no record at the locus.
    Uncovered,
}

impl NormalStatus {
    /// Column label.
    pub fn label(self) -> &'static str {
        match self {
            NormalStatus::Supported => "SUPPORTED",
            NormalStatus::Unsupported => "UNSUPPORTED",
            NormalStatus::Uncovered => "UNCOVERED",
        }
    }
}

/// Normal-side input to [`build_row`].
#[derive(Debug, Clone, Copy)]
pub enum NormalEvidence<'a> {
    /// Normal record with the tumor's key.
    Matched(&'a QualifiedVariant),
    /// Some normal record at the locus; the tumor's key is absent.
    KeyAbsent(&'a QualifiedVariant),
    /// No normal record at the locus.
    Uncovered,
}

/// One row of the combined table.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    /// Tumor locus.
    pub locus: Locus,
    /// Reference base.
    pub reference: char,
    /// Tumor `variant` column.
    pub variant: String,
    /// `SUBSTITUTION` or `INDEL`.
    pub type_label: &'static str,
    /// Tumor supporting reads.
    pub tumor_support: u32,
    /// Tumor coverage.
    pub tumor_coverage: u32,
    /// Normal supporting reads.
    pub normal_support: u32,
    /// Normal coverage.
    pub normal_coverage: u32,
    /// Tumor strand breakdown.
    pub tumor_strands: StrandTally,
    /// Normal strand breakdown.
    pub normal_strands: StrandTally,
    /// Indel sequence, if any.
    pub indel_sequence: Option<String>,
    /// Tumor source fields.
    pub tumor_raw: String,
    /// Normal source fields, or `None` when uncovered.
    pub normal_raw: String,
    /// Classification of the normal evidence.
    pub status: NormalStatus,
}

impl ComparisonRow {
    /// Tab-separated rendering (without trailing newline).
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.locus,
            self.reference,
            self.variant,
            self.type_label,
            self.tumor_support,
            self.tumor_coverage,
            self.normal_support,
            self.normal_coverage,
            self.tumor_strands,
            self.normal_strands,
            self.indel_sequence.as_deref().unwrap_or(NO_SEQUENCE),
            self.tumor_raw,
            self.normal_raw,
            self.status.label(),
        )
    }
}

/// Combine a tumor record with its normal counterpart. No thresholds apply.
pub fn build_row(tumor: &QualifiedVariant, normal: NormalEvidence<'_>) -> ComparisonRow {
    let (normal_support, normal_coverage, normal_strands, normal_raw, status) = match normal {
        NormalEvidence::Matched(record) => (
            record.support,
            record.coverage,
            record.strands,
            record.raw.clone(),
            NormalStatus::Supported,
        ),
        NormalEvidence::KeyAbsent(record) => (
            0,
            record.coverage,
            StrandTally::default(),
            record.raw.clone(),
            NormalStatus::Unsupported,
        ),
        NormalEvidence::Uncovered => (
            0,
            0,
            StrandTally::default(),
            NO_VARIANT.to_string(),
            NormalStatus::Uncovered,
        ),
    };

    let type_label = match tumor.class {
        VariantClass::Indel => "INDEL",
        _ => "SUBSTITUTION",
    };

    ComparisonRow {
        locus: tumor.locus.clone(),
        reference: tumor.reference,
        variant: tumor.variant.clone(),
        type_label,
        tumor_support: tumor.support,
        tumor_coverage: tumor.coverage,
        normal_support,
        normal_coverage,
        tumor_strands: tumor.strands,
        normal_strands,
        indel_sequence: tumor.indel_sequence().map(str::to_string),
        tumor_raw: tumor.raw.clone(),
        normal_raw,
        status,
    }
}

/// Counts gathered while merging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComparisonSummary {
    /// Rows written.
    pub rows: u64,
    /// Rows with normal support.
    pub supported: u64,
    /// Rows whose locus the normal covers without the key.
    pub unsupported: u64,
    /// Rows without a normal record.
    pub uncovered: u64,
    /// Tumor `N`/`U` anchor rows skipped.
    pub skipped_anchors: u64,
}

impl ComparisonSummary {
    fn record(&mut self, status: NormalStatus) {
        self.rows += 1;
        match status {
            NormalStatus::Supported => self.supported += 1,
            NormalStatus::Unsupported => self.unsupported += 1,
            NormalStatus::Uncovered => self.uncovered += 1,
        }
    }
}

/// Normal records sharing one locus, keyed by identity.
#[derive(Debug)]
struct NormalGroup {
    locus: Locus,
    by_identity: HashMap<String, QualifiedVariant>,
    representative: QualifiedVariant,
}

impl NormalGroup {
    fn evidence_for(&self, tumor: &QualifiedVariant) -> NormalEvidence<'_> {
        // A zero-coverage line is a record without reads.
        if self.representative.class == VariantClass::Uncovered
            || self.representative.coverage == 0
        {
            return NormalEvidence::Uncovered;
        }
        match self.by_identity.get(&tumor.identity()) {
            Some(record) => NormalEvidence::Matched(record),
            None => NormalEvidence::KeyAbsent(&self.representative),
        }
    }
}

fn gather_group<R: BufRead>(normal: &mut LocusStream<R>) -> Result<Option<NormalGroup>, StreamError> {
    let Some(first) = normal.current().cloned() else {
        return Ok(None);
    };
    let mut by_identity = HashMap::new();
    by_identity.insert(first.identity(), first.clone());
    while normal.peek_shares_locus()? {
        normal.advance()?;
        if let Some(record) = normal.current() {
            by_identity.insert(record.identity(), record.clone());
        }
    }
    Ok(Some(NormalGroup {
        locus: first.locus.clone(),
        by_identity,
        representative: first,
    }))
}

/// Merge-join a tumor and a normal qualifying-variant stream.
///
/// Writes the header and one row per tumor `S`/`I` record. Tumor `N`/`U`
/// anchors are skipped and counted.
pub fn compare_streams<T, N, W>(
    tumor: &mut LocusStream<T>,
    normal: &mut LocusStream<N>,
    writer: &mut W,
) -> Result<ComparisonSummary, ComparisonError>
where
    T: BufRead,
    N: BufRead,
    W: Write,
{
    let order = validate_contig_orders(
        tumor.source_name(),
        tumor.contig_order(),
        normal.source_name(),
        normal.contig_order(),
    )?;
    let matcher = LocusMatcher::new(&order);

    writer.write_all(COMPARISON_HEADER.as_bytes())?;

    let mut summary = ComparisonSummary::default();
    let mut group: Option<NormalGroup> = None;

    while tumor.advance()? {
        let Some(record) = tumor.current() else {
            break;
        };
        if !record.class.is_variant() {
            summary.skipped_anchors += 1;
            continue;
        }

        let cached = group.as_ref().is_some_and(|g| g.locus == record.locus);
        if !cached {
            group = match matcher.seek(normal, &record.locus)? {
                MatchOutcome::ExactMatch => gather_group(normal)?,
                MatchOutcome::NotFoundLocusCovered | MatchOutcome::NotFoundEndOfStream => None,
            };
        }

        let evidence = match &group {
            Some(g) if g.locus == record.locus => g.evidence_for(record),
            _ => NormalEvidence::Uncovered,
        };
        let row = build_row(record, evidence);
        writeln!(writer, "{}", row.to_line())?;
        summary.record(row.status);

        if summary.rows % PROGRESS_INTERVAL == 0 {
            debug!(rows = summary.rows, locus = %record.locus, "comparison progress");
        }
    }

    writer.flush()?;
    info!(
        rows = summary.rows,
        supported = summary.supported,
        unsupported = summary.unsupported,
        uncovered = summary.uncovered,
        skipped_anchors = summary.skipped_anchors,
        "tumor/normal comparison complete"
    );
    Ok(summary)
}
