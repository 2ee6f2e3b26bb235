//! Decoder for one line of samtools-style pileup text.
//!
//! The read-base column is walked by [`ReadBaseTokens`], an iterator that owns
//! an explicit byte cursor. Each call anchor (a base letter or `.`/`,`) yields
//! exactly one [`BaseCall`]; an anchor followed by `+`/`-` is reinterpreted as
//! an indel whose run length and sequence are consumed in the same step.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::trace;

use crate::genomics::{IndelDirection, Locus, StrandTally, VariantKey};

/// Minimum number of tab-separated fields for a decodable line.
pub const MIN_PILEUP_FIELDS: usize = 4;

/// Errors that make a pileup line undecodable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A numeric or character field could not be parsed.
    #[error("invalid {field} '{value}'")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Offending text.
        value: String,
    },

    /// An indel declared more sequence characters than the field holds.
    #[error("indel at offset {offset} declares {declared} bases but only {remaining} remain")]
    TruncatedIndel {
        /// Offset of the anchor character.
        offset: usize,
        /// Declared run length.
        declared: u32,
        /// Characters left after the run length.
        remaining: usize,
    },

    /// An indel sign was not followed by a run length.
    #[error("indel at offset {offset} has no run length")]
    MissingIndelLength {
        /// Offset of the anchor character.
        offset: usize,
    },

    /// A read-start marker `^` was the final character of the field.
    #[error("read-start marker at offset {offset} has no mapping quality")]
    TruncatedReadStart {
        /// Offset of the `^`.
        offset: usize,
    },
}

/// Location, reference base and coverage of one pileup line.
#[derive(Debug, Clone, PartialEq)]
pub struct PileupSite {
    /// Contig and 1-based position.
    pub locus: Locus,
    /// Uppercased reference base (`N` when unknown).
    pub reference: char,
    /// Reported read depth.
    pub coverage: u32,
    /// Source fields joined with `|`, kept for audit columns.
    pub raw: String,
}

/// One decoded call from the read-base column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseCall {
    /// Allele identity.
    pub key: VariantKey,
    /// Strand of the anchor character.
    pub forward: bool,
}

/// Token produced by [`ReadBaseTokens`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadToken {
    /// A substitution or indel call.
    Call(BaseCall),
    /// `*` placeholder for a deletion counted on an earlier line.
    Gap,
    /// Character outside the pileup alphabet.
    Unrecognized {
        /// Byte offset in the field.
        offset: usize,
        /// Offending byte.
        byte: u8,
    },
}

/// Iterator over the read-base column of a pileup line.
#[derive(Debug, Clone)]
pub struct ReadBaseTokens<'a> {
    bytes: &'a [u8],
    cursor: usize,
    reference: char,
    failed: bool,
}

impl<'a> ReadBaseTokens<'a> {
    /// Tokenize `bases` against the given reference base.
    pub fn new(bases: &'a str, reference: char) -> Self {
        Self {
            bytes: bases.as_bytes(),
            cursor: 0,
            reference: reference.to_ascii_uppercase(),
            failed: false,
        }
    }

    fn anchor(&mut self, offset: usize, byte: u8) -> Result<ReadToken, DecodeError> {
        let matches_reference = byte == b'.' || byte == b',';
        let forward = if matches_reference {
            byte == b'.'
        } else {
            byte.is_ascii_uppercase()
        };

        let sign = self
            .bytes
            .get(self.cursor)
            .copied()
            .and_then(IndelDirection::from_sign);

        let key = match sign {
            Some(direction) => {
                self.cursor += 1;
                let (length, sequence) = self.indel_body(offset)?;
                // At an N reference a `.`/`,` anchor folds onto N.
                let anchor = if matches_reference {
                    self.reference
                } else {
                    byte.to_ascii_uppercase() as char
                };
                VariantKey::Indel {
                    anchor,
                    direction,
                    length,
                    sequence,
                }
            }
            None => {
                let base = match (matches_reference, self.reference) {
                    (true, 'N') => byte as char,
                    (true, reference) => reference,
                    (false, _) => byte.to_ascii_uppercase() as char,
                };
                VariantKey::Substitution(base)
            }
        };

        Ok(ReadToken::Call(BaseCall { key, forward }))
    }

    fn indel_body(&mut self, offset: usize) -> Result<(u32, String), DecodeError> {
        let digits_start = self.cursor;
        while self
            .bytes
            .get(self.cursor)
            .is_some_and(|byte| byte.is_ascii_digit())
        {
            self.cursor += 1;
        }
        if self.cursor == digits_start {
            return Err(DecodeError::MissingIndelLength { offset });
        }

        let digits = &self.bytes[digits_start..self.cursor];
        let length: u32 = std::str::from_utf8(digits)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| DecodeError::InvalidField {
                field: "indel length",
                value: String::from_utf8_lossy(digits).into_owned(),
            })?;

        let remaining = self.bytes.len() - self.cursor;
        if remaining < length as usize {
            return Err(DecodeError::TruncatedIndel {
                offset,
                declared: length,
                remaining,
            });
        }

        let end = self.cursor + length as usize;
        let sequence = String::from_utf8_lossy(&self.bytes[self.cursor..end]).to_ascii_uppercase();
        self.cursor = end;
        Ok((length, sequence))
    }
}

impl Iterator for ReadBaseTokens<'_> {
    type Item = Result<ReadToken, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let offset = self.cursor;
            let byte = *self.bytes.get(offset)?;
            self.cursor += 1;

            let token = match byte {
                b'*' => Ok(ReadToken::Gap),
                b'$' => continue,
                b'^' => {
                    if self.cursor >= self.bytes.len() {
                        Err(DecodeError::TruncatedReadStart { offset })
                    } else {
                        // Skip the mapping-quality character.
                        self.cursor += 1;
                        continue;
                    }
                }
                b'.' | b',' => self.anchor(offset, byte),
                _ if byte.is_ascii_alphabetic() => self.anchor(offset, byte),
                _ => Ok(ReadToken::Unrecognized { offset, byte }),
            };

            if token.is_err() {
                self.failed = true;
            }
            return Some(token);
        }
    }
}

/// Per-key counts decoded from one read-base column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadBaseTally {
    /// Strand tallies keyed by allele, in key order.
    pub calls: BTreeMap<VariantKey, StrandTally>,
    /// `*` placeholders seen.
    pub gaps: u32,
    /// Characters skipped as unrecognized.
    pub unrecognized: u32,
}

impl ReadBaseTally {
    fn record(&mut self, call: BaseCall) {
        self.calls.entry(call.key).or_default().observe(call.forward);
    }

    /// Reads accounted for: every call plus every gap placeholder.
    pub fn observed_reads(&self) -> u32 {
        self.calls.values().map(StrandTally::total).sum::<u32>() + self.gaps
    }

    /// Tally for one key (zero when absent).
    pub fn tally(&self, key: &VariantKey) -> StrandTally {
        self.calls.get(key).copied().unwrap_or_default()
    }
}

/// Decode a read-base column with the general scanner.
pub fn tally_read_bases(bases: &str, reference: char) -> Result<ReadBaseTally, DecodeError> {
    let mut tally = ReadBaseTally::default();
    for token in ReadBaseTokens::new(bases, reference) {
        match token? {
            ReadToken::Call(call) => tally.record(call),
            ReadToken::Gap => tally.gaps += 1,
            ReadToken::Unrecognized { offset, byte } => {
                trace!(offset, byte = %(byte as char).escape_default(), "skipping unrecognized read-base character");
                tally.unrecognized += 1;
            }
        }
    }
    Ok(tally)
}

/// Whether a read-base column holds only reference-matching calls.
pub fn is_reference_only(bases: &str) -> bool {
    !bases.is_empty() && bases.bytes().all(|byte| byte == b'.' || byte == b',')
}

/// Tally a reference-only column without running the scanner.
///
/// Produces the same [`ReadBaseTally`] as [`tally_read_bases`] for any input
/// accepted by [`is_reference_only`].
pub fn tally_reference_only(bases: &str, reference: char) -> ReadBaseTally {
    let forward = bases.bytes().filter(|&byte| byte == b'.').count() as u32;
    let reverse = bases.len() as u32 - forward;
    let reference = reference.to_ascii_uppercase();

    let mut tally = ReadBaseTally::default();
    let key_for = |literal: char| {
        if reference == 'N' {
            VariantKey::Substitution(literal)
        } else {
            VariantKey::Substitution(reference)
        }
    };
    if forward > 0 {
        tally.calls.entry(key_for('.')).or_default().forward += forward;
    }
    if reverse > 0 {
        tally.calls.entry(key_for(',')).or_default().reverse += reverse;
    }
    tally
}

/// A covered pileup line after decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPileup {
    /// Location, reference and coverage.
    pub site: PileupSite,
    /// Decoded calls.
    pub tally: ReadBaseTally,
}

impl DecodedPileup {
    /// Key that reference-matching calls resolve to.
    pub fn reference_key(&self) -> VariantKey {
        VariantKey::Substitution(self.site.reference)
    }

    /// Strand tally of reference-matching calls.
    pub fn reference_tally(&self) -> StrandTally {
        self.tally.tally(&self.reference_key())
    }

    /// Calls whose key differs from the reference key.
    pub fn variant_calls(&self) -> impl Iterator<Item = (&VariantKey, &StrandTally)> {
        let reference = self.reference_key();
        self.tally
            .calls
            .iter()
            .filter(move |(key, _)| **key != reference)
    }
}

/// Classification of one pileup line.
#[derive(Debug, Clone, PartialEq)]
pub enum PileupLine {
    /// Covered line with decoded calls.
    Covered(DecodedPileup),
    /// Zero coverage or an empty read-base column.
    Uncovered(PileupSite),
    /// Too few fields to locate the line.
    Malformed {
        /// Number of tab-separated fields found.
        field_count: usize,
    },
}

/// Decode one pileup line.
pub fn decode_line(line: &str) -> Result<PileupLine, DecodeError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < MIN_PILEUP_FIELDS {
        return Ok(PileupLine::Malformed {
            field_count: fields.len(),
        });
    }

    let position: u64 = parse_field("position", fields[1])?;
    let reference = fields[2]
        .chars()
        .next()
        .filter(char::is_ascii)
        .ok_or_else(|| DecodeError::InvalidField {
            field: "reference base",
            value: fields[2].to_string(),
        })?
        .to_ascii_uppercase();
    let coverage: u32 = parse_field("coverage", fields[3])?;
    let bases = fields.get(4).copied().unwrap_or("");

    let site = PileupSite {
        locus: Locus::new(fields[0], position),
        reference,
        coverage,
        raw: fields.join("|"),
    };

    if coverage == 0 || bases.is_empty() {
        return Ok(PileupLine::Uncovered(site));
    }

    let tally = if is_reference_only(bases) {
        tally_reference_only(bases, reference)
    } else {
        tally_read_bases(bases, reference)?
    };

    Ok(PileupLine::Covered(DecodedPileup { site, tally }))
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, DecodeError> {
    value.trim().parse().map_err(|_| DecodeError::InvalidField {
        field,
        value: value.to_string(),
    })
}
