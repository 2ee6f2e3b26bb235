//! Forward-only cursor over a qualifying-variant file.
//!
//! Construction runs one pre-scan over the whole input to discover the contig
//! order, then rewinds. After that the stream only moves forward: `advance`
//! promotes the single buffered lookahead record or reads the next line, and
//! `peek_shares_locus` fills that buffer. Nothing outside this type can reach
//! into the buffer.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::genomics::{parse_qualified, ContigOrder, Locus, QualifiedVariant, RecordError};

/// Longest line excerpt quoted in error messages.
pub const MAX_QUOTED_LINE: usize = 120;

/// Errors raised while streaming a qualifying-variant file.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Underlying I/O failure.
    #[error("{source_name}: I/O error: {error}")]
    Io {
        /// File name or label of the stream.
        source_name: String,
        /// I/O error.
        #[source]
        error: std::io::Error,
    },

    /// A line could not be parsed as a record.
    #[error("{source_name}:{line_no}: {error} in '{content}'")]
    Malformed {
        /// File name or label of the stream.
        source_name: String,
        /// 1-based line number.
        line_no: usize,
        /// Truncated line content.
        content: String,
        /// Parse failure.
        #[source]
        error: RecordError,
    },

    /// A contig reappeared after a different contig had started.
    #[error("{source_name}:{line_no}: contig {contig} reappears after {previous}; input is not sorted")]
    ContigNotContiguous {
        /// File name or label of the stream.
        source_name: String,
        /// 1-based line number.
        line_no: usize,
        /// Contig that reappeared.
        contig: String,
        /// Contig that preceded it.
        previous: String,
    },

    /// A position went backwards within one contig.
    #[error("{source_name}:{line_no}: {locus} follows {previous}; input is not sorted")]
    OutOfOrder {
        /// File name or label of the stream.
        source_name: String,
        /// 1-based line number.
        line_no: usize,
        /// Locus of the offending record.
        locus: Locus,
        /// Locus of the record before it.
        previous: Locus,
    },
}

/// Shorten a line for inclusion in an error message.
pub fn quote_line(line: &str) -> String {
    if line.chars().count() <= MAX_QUOTED_LINE {
        line.to_string()
    } else {
        let head: String = line.chars().take(MAX_QUOTED_LINE).collect();
        format!("{}...", head)
    }
}

fn is_skipped(line: &str) -> bool {
    line.starts_with('#') || line.trim().is_empty()
}

/// Forward-only reader of [`QualifiedVariant`] records.
#[derive(Debug)]
pub struct LocusStream<R> {
    reader: R,
    source_name: String,
    line_no: usize,
    buffer: String,
    current: Option<QualifiedVariant>,
    lookahead: Option<QualifiedVariant>,
    exhausted: bool,
    previous: Option<Locus>,
    contig_order: ContigOrder,
}

impl LocusStream<BufReader<File>> {
    /// Open a qualifying-variant file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let file = File::open(path).map_err(|error| StreamError::Io {
            source_name: source_name.clone(),
            error,
        })?;
        Self::new(BufReader::new(file), source_name)
    }
}

impl<R: BufRead + Seek> LocusStream<R> {
    /// Wrap a reader, discovering its contig order and rewinding it.
    pub fn new(mut reader: R, source_name: impl Into<String>) -> Result<Self, StreamError> {
        let source_name = source_name.into();
        let contig_order = discover_contig_order(&mut reader, &source_name)?;
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|error| StreamError::Io {
                source_name: source_name.clone(),
                error,
            })?;
        debug!(source = %source_name, contigs = contig_order.len(), "discovered contig order");

        Ok(Self {
            reader,
            source_name,
            line_no: 0,
            buffer: String::new(),
            current: None,
            lookahead: None,
            exhausted: false,
            previous: None,
            contig_order,
        })
    }
}

impl<R: BufRead> LocusStream<R> {
    /// Move to the next record. Returns `false` once the stream is exhausted.
    pub fn advance(&mut self) -> Result<bool, StreamError> {
        self.current = match self.lookahead.take() {
            Some(record) => Some(record),
            None => self.read_record()?,
        };
        if self.current.is_none() {
            self.exhausted = true;
        }
        Ok(self.current.is_some())
    }

    /// Whether the next record sits on the same locus as the current one.
    ///
    /// Buffers the next record; the following [`advance`](Self::advance)
    /// returns it without reading.
    pub fn peek_shares_locus(&mut self) -> Result<bool, StreamError> {
        if self.lookahead.is_none() && !self.exhausted {
            self.lookahead = self.read_record()?;
        }
        Ok(match (&self.current, &self.lookahead) {
            (Some(current), Some(next)) => current.locus == next.locus,
            _ => false,
        })
    }

    /// Record the stream is positioned on.
    pub fn current(&self) -> Option<&QualifiedVariant> {
        self.current.as_ref()
    }

    /// Whether the stream has run past its last record.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Contig order discovered at construction.
    pub fn contig_order(&self) -> &ContigOrder {
        &self.contig_order
    }

    /// Label used in error messages.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    fn read_record(&mut self) -> Result<Option<QualifiedVariant>, StreamError> {
        loop {
            self.buffer.clear();
            let read = self
                .reader
                .read_line(&mut self.buffer)
                .map_err(|error| StreamError::Io {
                    source_name: self.source_name.clone(),
                    error,
                })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            if is_skipped(&self.buffer) {
                continue;
            }

            let record = parse_qualified(&self.buffer).map_err(|error| StreamError::Malformed {
                source_name: self.source_name.clone(),
                line_no: self.line_no,
                content: quote_line(self.buffer.trim_end()),
                error,
            })?;
            self.check_order(&record.locus)?;
            return Ok(Some(record));
        }
    }

    fn check_order(&mut self, locus: &Locus) -> Result<(), StreamError> {
        if let Some(previous) = &self.previous {
            if previous.contig == locus.contig && locus.position < previous.position {
                return Err(StreamError::OutOfOrder {
                    source_name: self.source_name.clone(),
                    line_no: self.line_no,
                    locus: locus.clone(),
                    previous: previous.clone(),
                });
            }
        }
        self.previous = Some(locus.clone());
        Ok(())
    }
}

/// Read the contig column of every record in first-seen order.
fn discover_contig_order<R: BufRead>(
    reader: &mut R,
    source_name: &str,
) -> Result<ContigOrder, StreamError> {
    let mut order = ContigOrder::new();
    let mut line = String::new();
    let mut line_no = 0;

    loop {
        line.clear();
        let read = reader.read_line(&mut line).map_err(|error| StreamError::Io {
            source_name: source_name.to_string(),
            error,
        })?;
        if read == 0 {
            break;
        }
        line_no += 1;
        if is_skipped(&line) {
            continue;
        }

        let contig = line.split('\t').nth(3).ok_or_else(|| StreamError::Malformed {
            source_name: source_name.to_string(),
            line_no,
            content: quote_line(line.trim_end()),
            error: RecordError::TooFewColumns(line.split('\t').count()),
        })?;

        if order.last() == Some(contig) {
            continue;
        }
        if !order.push(contig) {
            return Err(StreamError::ContigNotContiguous {
                source_name: source_name.to_string(),
                line_no,
                contig: contig.to_string(),
                previous: order.last().unwrap_or_default().to_string(),
            });
        }
    }

    Ok(order)
}
