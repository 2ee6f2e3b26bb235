//! Tab-delimited qualifying-variant files.

use std::io::Write;

use anyhow::{anyhow, Result};
use thiserror::Error;

use crate::genomics::{Locus, QualifiedVariant, StrandTally, VariantClass, VariantKey, NO_VARIANT};

/// Header line of a qualifying-variant file.
pub const QUALIFIED_HEADER: &str =
    "#support\tcoverage\tfraction\tcontig\tposition\tref\tvariant\ttype\tstrand\traw\tkey\n";

/// Columns a reader requires; the trailing `key` column is optional.
pub const MIN_QUALIFIED_COLUMNS: usize = 10;

/// Failure to parse one qualifying-variant line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// Fewer columns than [`MIN_QUALIFIED_COLUMNS`].
    #[error("expected at least 10 columns, found {0}")]
    TooFewColumns(usize),

    /// A column held an unparsable value.
    #[error("invalid {column} '{value}'")]
    InvalidColumn {
        /// Column name.
        column: &'static str,
        /// Offending text.
        value: String,
    },
}

/// Format one record as a line (without trailing newline).
pub fn format_qualified(variant: &QualifiedVariant) -> String {
    let key = variant
        .key
        .as_ref()
        .map(VariantKey::to_string)
        .unwrap_or_else(|| NO_VARIANT.to_string());
    format!(
        "{support}\t{coverage}\t{fraction:.4}\t{contig}\t{position}\t{reference}\t{variant}\t{class}\t{strands}\t{raw}\t{key}",
        support = variant.support,
        coverage = variant.coverage,
        fraction = variant.fraction,
        contig = variant.locus.contig,
        position = variant.locus.position,
        reference = variant.reference,
        variant = variant.variant,
        class = variant.class.flag(),
        strands = variant.strands,
        raw = variant.raw,
    )
}

/// Write records with a header.
pub fn write_qualified<W: Write>(writer: &mut W, variants: &[QualifiedVariant]) -> Result<()> {
    writer.write_all(QUALIFIED_HEADER.as_bytes())?;
    for variant in variants {
        writeln!(writer, "{}", format_qualified(variant))?;
    }
    writer.flush()?;
    Ok(())
}

/// Render records into a string (useful for tests and snapshots).
pub fn render_qualified(variants: &[QualifiedVariant]) -> Result<String> {
    let mut buffer = Vec::new();
    write_qualified(&mut buffer, variants)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered variants are not valid UTF-8"))
}

/// Parse one non-header line.
pub fn parse_qualified(line: &str) -> Result<QualifiedVariant, RecordError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() < MIN_QUALIFIED_COLUMNS {
        return Err(RecordError::TooFewColumns(columns.len()));
    }

    let class = VariantClass::from_flag(columns[7]).ok_or_else(|| invalid("type", columns[7]))?;
    let reference = columns[5]
        .chars()
        .next()
        .ok_or_else(|| invalid("ref", columns[5]))?;
    let key = match columns.get(10).copied() {
        Some(NO_VARIANT) | None => fallback_key(class, columns[6]),
        Some(text) => Some(text.parse().map_err(|_| invalid("key", text))?),
    };

    Ok(QualifiedVariant {
        support: parse_column("support", columns[0])?,
        coverage: parse_column("coverage", columns[1])?,
        fraction: parse_column("fraction", columns[2])?,
        locus: Locus::new(columns[3], parse_column("position", columns[4])?),
        reference,
        variant: columns[6].to_string(),
        key,
        class,
        strands: columns[8]
            .parse::<StrandTally>()
            .map_err(|_| invalid("strand", columns[8]))?,
        raw: columns[9].to_string(),
    })
}

/// Key recoverable from the `variant` column alone (substitutions only).
fn fallback_key(class: VariantClass, variant: &str) -> Option<VariantKey> {
    let mut chars = variant.chars();
    match (class, chars.next(), chars.next()) {
        (VariantClass::Substitution, Some(base), None) => Some(VariantKey::Substitution(base)),
        _ => None,
    }
}

fn parse_column<T: std::str::FromStr>(column: &'static str, value: &str) -> Result<T, RecordError> {
    value.parse().map_err(|_| invalid(column, value))
}

fn invalid(column: &'static str, value: &str) -> RecordError {
    RecordError::InvalidColumn {
        column,
        value: value.to_string(),
    }
}
