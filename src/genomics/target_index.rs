use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufRead, Write};

use thiserror::Error;

use crate::genomics::{Locus, ParseVariantKeyError, VariantKey};

const HEADER: &str = "#contig\tposition\tkey\n";

/// Errors raised while reading or writing a target index.
#[derive(Debug, Error)]
pub enum TargetIndexError {
    /// Underlying I/O failure.
    #[error("target index I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line did not have the `contig<TAB>position<TAB>key` shape.
    #[error("malformed target index line {line_no}: '{content}'")]
    Malformed {
        /// 1-based line number.
        line_no: usize,
        /// Offending line.
        content: String,
    },

    /// A key column did not hold a canonical variant key.
    #[error("target index line {line_no}: {source}")]
    Key {
        /// 1-based line number.
        line_no: usize,
        /// Parse failure.
        #[source]
        source: ParseVariantKeyError,
    },
}

/// Loci and the variant keys that qualified at them in the tumor pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetIndex {
    entries: BTreeMap<Locus, BTreeSet<VariantKey>>,
}

impl TargetIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` qualified at `locus`.
    pub fn insert(&mut self, locus: Locus, key: VariantKey) {
        self.entries.entry(locus).or_default().insert(key);
    }

    /// Whether any key qualified at `locus`.
    pub fn contains_locus(&self, locus: &Locus) -> bool {
        self.entries.contains_key(locus)
    }

    /// Keys recorded at `locus`.
    pub fn keys_at(&self, locus: &Locus) -> Option<&BTreeSet<VariantKey>> {
        self.entries.get(locus)
    }

    /// Number of indexed loci.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no loci.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(locus, keys)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Locus, &BTreeSet<VariantKey>)> {
        self.entries.iter()
    }

    /// Write the index as one `contig<TAB>position<TAB>key` line per key.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), TargetIndexError> {
        writer.write_all(HEADER.as_bytes())?;
        for (locus, keys) in &self.entries {
            for key in keys {
                writeln!(writer, "{}\t{}\t{}", locus.contig, locus.position, key)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Read an index written by [`TargetIndex::write_to`].
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self, TargetIndexError> {
        let mut index = Self::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }

            let malformed = || TargetIndexError::Malformed {
                line_no,
                content: line.clone(),
            };
            let mut fields = line.splitn(3, '\t');
            let (Some(contig), Some(position), Some(key)) =
                (fields.next(), fields.next(), fields.next())
            else {
                return Err(malformed());
            };
            let position: u64 = position.parse().map_err(|_| malformed())?;
            let key: VariantKey = key
                .parse()
                .map_err(|source| TargetIndexError::Key { line_no, source })?;
            index.insert(Locus::new(contig, position), key);
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_preserves_indel_identity() {
        let mut index = TargetIndex::new();
        index.insert(Locus::new("chr1", 500), VariantKey::Substitution('T'));
        index.insert(Locus::new("chr1", 500), "A+2AC".parse().unwrap());
        index.insert(Locus::new("chr2", 12), "N-1G".parse().unwrap());
        index.insert(Locus::new("chr2", 40), VariantKey::Substitution(','));

        let mut buffer = Vec::new();
        index.write_to(&mut buffer).unwrap();
        let restored = TargetIndex::read_from(Cursor::new(buffer)).unwrap();

        assert_eq!(restored, index);
        assert_eq!(restored.keys_at(&Locus::new("chr1", 500)).unwrap().len(), 2);
    }

    #[test]
    fn malformed_lines_report_line_numbers() {
        let text = "#contig\tposition\tkey\nchr1\t10\tT\nchr1\tabc\tT\n";
        let err = TargetIndex::read_from(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, TargetIndexError::Malformed { line_no: 3, .. }));

        let text = "chr1\t10\tA+5AC\n";
        let err = TargetIndex::read_from(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, TargetIndexError::Key { line_no: 1, .. }));
    }
}
