//! Pileup decoding, variant qualification and tumor/normal comparison.
//!
//! This module exposes the building blocks of both passes: the pileup line
//! decoder and [`VariantQualifier`] for turning a pileup into a
//! qualifying-variant table, and [`LocusStream`], [`LocusMatcher`] and
//! [`compare_streams`] for merge-joining two such tables.

mod types;
mod pileup;
mod variant_caller;
mod variant_table;
mod target_index;
mod contig_order;
mod locus_stream;
mod matcher;
mod comparison;
pub mod io;

pub use types::{IndelDirection, Locus, ParseVariantKeyError, StrandTally, VariantClass, VariantKey};
pub use pileup::{
    decode_line, is_reference_only, tally_read_bases, tally_reference_only, BaseCall,
    DecodeError, DecodedPileup, PileupLine, PileupSite, ReadBaseTally, ReadBaseTokens, ReadToken,
    MIN_PILEUP_FIELDS,
};
pub use variant_caller::{
    ConfigError, QualifiedVariant, QualifyMode, Thresholds, VariantQualifier, NO_VARIANT,
};
pub use variant_table::{
    format_qualified, parse_qualified, render_qualified, write_qualified, RecordError,
    MIN_QUALIFIED_COLUMNS, QUALIFIED_HEADER,
};
pub use target_index::{TargetIndex, TargetIndexError};
pub use contig_order::{validate_contig_orders, ContigOrder, ContigOrderMismatch};
pub use locus_stream::{quote_line, LocusStream, StreamError, MAX_QUOTED_LINE};
pub use matcher::{LocusMatcher, MatchError, MatchOutcome};
pub use comparison::{
    build_row, compare_streams, ComparisonError, ComparisonRow, ComparisonSummary,
    NormalEvidence, NormalStatus, COMPARISON_HEADER,
};
