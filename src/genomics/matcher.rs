use std::cmp::Ordering;
use std::io::BufRead;

use thiserror::Error;

use crate::genomics::{ContigOrder, Locus, LocusStream, StreamError};

/// Where a search left the stream relative to the target locus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The stream's current record is on the target locus.
    ExactMatch,
    /// The stream passed the target without a record on it.
    NotFoundLocusCovered,
    /// The stream ran out before reaching the target.
    NotFoundEndOfStream,
}

impl MatchOutcome {
    /// Whether the target was found.
    pub fn is_match(self) -> bool {
        self == MatchOutcome::ExactMatch
    }
}

/// Errors raised while searching a stream.
#[derive(Debug, Error)]
pub enum MatchError {
    /// A contig missing from the validated order.
    #[error("contig {0} is not in the validated contig order")]
    UnknownContig(String),

    /// Failure reading the searched stream.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Advances a stream towards target loci given in ascending order.
#[derive(Debug, Clone, Copy)]
pub struct LocusMatcher<'a> {
    order: &'a ContigOrder,
}

impl<'a> LocusMatcher<'a> {
    /// Create a matcher over a validated contig order.
    pub fn new(order: &'a ContigOrder) -> Self {
        Self { order }
    }

    /// Advance `stream` until it reaches or passes `target`.
    ///
    /// A record past the target is left current so a later target can still
    /// match it. When the target's contig is absent from the stream the search
    /// stops at the first record of a later contig.
    pub fn seek<R: BufRead>(
        &self,
        stream: &mut LocusStream<R>,
        target: &Locus,
    ) -> Result<MatchOutcome, MatchError> {
        if self.order.rank(&target.contig).is_none() {
            return Err(MatchError::UnknownContig(target.contig.to_string()));
        }

        loop {
            let ordering = match stream.current() {
                Some(current) => self
                    .order
                    .compare(&current.locus, target)
                    .ok_or_else(|| MatchError::UnknownContig(current.locus.contig.to_string()))?,
                None if stream.is_exhausted() => return Ok(MatchOutcome::NotFoundEndOfStream),
                None => Ordering::Less,
            };

            match ordering {
                Ordering::Equal => return Ok(MatchOutcome::ExactMatch),
                Ordering::Greater => return Ok(MatchOutcome::NotFoundLocusCovered),
                Ordering::Less => {
                    if !stream.advance()? {
                        return Ok(MatchOutcome::NotFoundEndOfStream);
                    }
                }
            }
        }
    }
}
