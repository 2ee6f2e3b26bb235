use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

/// Genomic coordinate: contig name plus 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Locus {
    /// Reference contig/chromosome name.
    pub contig: Arc<str>,
    /// 1-based position on the contig.
    pub position: u64,
}

impl Locus {
    /// Construct a new locus.
    pub fn new(contig: impl Into<Arc<str>>, position: u64) -> Self {
        Self {
            contig: contig.into(),
            position,
        }
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.contig, self.position)
    }
}

/// Direction of an indel relative to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndelDirection {
    /// Bases present in the read but not the reference (`+`).
    Insertion,
    /// Reference bases missing from the read (`-`).
    Deletion,
}

impl IndelDirection {
    /// Pileup sign character.
    pub fn sign(self) -> char {
        match self {
            IndelDirection::Insertion => '+',
            IndelDirection::Deletion => '-',
        }
    }

    /// Parse a pileup sign character.
    pub fn from_sign(sign: u8) -> Option<Self> {
        match sign {
            b'+' => Some(IndelDirection::Insertion),
            b'-' => Some(IndelDirection::Deletion),
            _ => None,
        }
    }

    /// Short label used in the qualifying-variant `variant` column.
    pub fn label(self) -> char {
        match self {
            IndelDirection::Insertion => 'I',
            IndelDirection::Deletion => 'D',
        }
    }
}

/// Canonical identity of one observed allele at a locus.
///
/// The `Display` form is the single canonical stringification: a substitution
/// renders as its base, an indel as `<anchor><sign><length><sequence>`.
/// `FromStr` accepts exactly that form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VariantKey {
    /// Single-base call (uppercased base, or a literal `.`/`,` at an `N` reference).
    Substitution(char),
    /// Insertion or deletion anchored to a call character.
    Indel {
        /// Uppercased anchor base.
        anchor: char,
        /// Insertion or deletion.
        direction: IndelDirection,
        /// Declared run length.
        length: u32,
        /// Inserted/deleted bases, uppercased.
        sequence: String,
    },
}

impl VariantKey {
    /// Whether this key is an indel.
    pub fn is_indel(&self) -> bool {
        matches!(self, VariantKey::Indel { .. })
    }

    /// Label for the `variant` column: the base, or `I-<len>` / `D-<len>`.
    pub fn variant_label(&self) -> String {
        match self {
            VariantKey::Substitution(base) => base.to_string(),
            VariantKey::Indel {
                direction, length, ..
            } => format!("{}-{}", direction.label(), length),
        }
    }

    /// Indel sequence, if any.
    pub fn indel_sequence(&self) -> Option<&str> {
        match self {
            VariantKey::Substitution(_) => None,
            VariantKey::Indel { sequence, .. } => Some(sequence),
        }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKey::Substitution(base) => write!(f, "{}", base),
            VariantKey::Indel {
                anchor,
                direction,
                length,
                sequence,
            } => write!(f, "{}{}{}{}", anchor, direction.sign(), length, sequence),
        }
    }
}

/// Failure to parse a canonical variant key.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid variant key '{0}'")]
pub struct ParseVariantKeyError(pub String);

impl FromStr for VariantKey {
    type Err = ParseVariantKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseVariantKeyError(s.to_string());
        let mut chars = s.chars();
        let anchor = chars.next().ok_or_else(invalid)?;
        let rest = chars.as_str();
        if rest.is_empty() {
            return Ok(VariantKey::Substitution(anchor));
        }

        let direction = rest
            .bytes()
            .next()
            .and_then(IndelDirection::from_sign)
            .ok_or_else(invalid)?;
        let body = &rest[1..];
        let digits = body.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(invalid());
        }
        let length: u32 = body[..digits].parse().map_err(|_| invalid())?;
        let sequence = &body[digits..];
        if sequence.chars().count() != length as usize {
            return Err(invalid());
        }

        Ok(VariantKey::Indel {
            anchor,
            direction,
            length,
            sequence: sequence.to_string(),
        })
    }
}

/// Forward/reverse read counts backing one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrandTally {
    /// Calls observed on the forward strand.
    pub forward: u32,
    /// Calls observed on the reverse strand.
    pub reverse: u32,
}

impl StrandTally {
    /// Construct a tally from explicit counts.
    pub fn new(forward: u32, reverse: u32) -> Self {
        Self { forward, reverse }
    }

    /// Record one call on the given strand.
    pub fn observe(&mut self, forward: bool) {
        if forward {
            self.forward += 1;
        } else {
            self.reverse += 1;
        }
    }

    /// Total supporting calls.
    pub fn total(&self) -> u32 {
        self.forward + self.reverse
    }

    /// Whether calls were seen on both strands.
    pub fn both_strands(&self) -> bool {
        self.forward > 0 && self.reverse > 0
    }
}

impl fmt::Display for StrandTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}-{}", self.forward, self.reverse)
    }
}

impl FromStr for StrandTally {
    type Err = ParseVariantKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseVariantKeyError(s.to_string());
        let body = s.strip_prefix('+').ok_or_else(invalid)?;
        let (forward, reverse) = body.split_once('-').ok_or_else(invalid)?;
        Ok(Self {
            forward: forward.parse().map_err(|_| invalid())?,
            reverse: reverse.parse().map_err(|_| invalid())?,
        })
    }
}

/// Class flag written in the qualifying-variant `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VariantClass {
    /// Single-base substitution (`S`).
    Substitution,
    /// Insertion or deletion (`I`).
    Indel,
    /// Covered locus with no non-reference call (`N`).
    NonVariant,
    /// Locus without coverage (`U`).
    Uncovered,
}

impl VariantClass {
    /// Single-letter flag.
    pub fn flag(self) -> char {
        match self {
            VariantClass::Substitution => 'S',
            VariantClass::Indel => 'I',
            VariantClass::NonVariant => 'N',
            VariantClass::Uncovered => 'U',
        }
    }

    /// Parse a single-letter flag.
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "S" => Some(VariantClass::Substitution),
            "I" => Some(VariantClass::Indel),
            "N" => Some(VariantClass::NonVariant),
            "U" => Some(VariantClass::Uncovered),
            _ => None,
        }
    }

    /// Whether rows of this class carry a real variant.
    pub fn is_variant(self) -> bool {
        matches!(self, VariantClass::Substitution | VariantClass::Indel)
    }
}
