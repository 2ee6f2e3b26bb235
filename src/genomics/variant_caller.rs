use thiserror::Error;

use crate::genomics::{
    DecodedPileup, Locus, PileupSite, StrandTally, TargetIndex, VariantClass, VariantKey,
};

/// Invalid qualifier configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Support fraction outside `[0, 1)` or not finite.
    #[error("minimum support fraction must be in [0, 1), got {0}")]
    FractionOutOfRange(f64),
}

/// Support thresholds a non-reference key must meet to qualify.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Thresholds {
    min_supporting_reads: u32,
    min_support_fraction: f64,
    require_both_strands: bool,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_supporting_reads: 0,
            min_support_fraction: 0.0,
            require_both_strands: false,
        }
    }
}

impl Thresholds {
    /// Validate and construct thresholds.
    pub fn new(
        min_supporting_reads: u32,
        min_support_fraction: f64,
        require_both_strands: bool,
    ) -> Result<Self, ConfigError> {
        if !(0.0..1.0).contains(&min_support_fraction) {
            return Err(ConfigError::FractionOutOfRange(min_support_fraction));
        }
        Ok(Self {
            min_supporting_reads,
            min_support_fraction,
            require_both_strands,
        })
    }

    /// Minimum supporting reads.
    pub fn min_supporting_reads(&self) -> u32 {
        self.min_supporting_reads
    }

    /// Minimum supporting fraction of coverage.
    pub fn min_support_fraction(&self) -> f64 {
        self.min_support_fraction
    }

    /// Whether calls on both strands are required.
    pub fn require_both_strands(&self) -> bool {
        self.require_both_strands
    }

    /// Whether a key with this tally passes at the given coverage.
    pub fn passes(&self, tally: &StrandTally, coverage: u32) -> bool {
        let count = tally.total();
        count >= self.min_supporting_reads
            && support_fraction(count, coverage) >= self.min_support_fraction
            && (!self.require_both_strands || tally.both_strands())
    }
}

fn support_fraction(count: u32, coverage: u32) -> f64 {
    if coverage == 0 {
        0.0
    } else {
        count as f64 / coverage as f64
    }
}

/// How the qualifier treats loci.
#[derive(Debug, Clone)]
pub enum QualifyMode {
    /// Apply thresholds everywhere and record qualifying keys.
    Discovery,
    /// Emit every non-reference key at indexed loci; thresholds elsewhere.
    Targeted(TargetIndex),
}

/// One qualifying-variant record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QualifiedVariant {
    /// Contig and position.
    pub locus: Locus,
    /// Uppercased reference base.
    pub reference: char,
    /// Allele identity; `None` for non-variant and uncovered rows.
    pub key: Option<VariantKey>,
    /// `variant` column: base, `I-<len>`/`D-<len>`, or `None`.
    pub variant: String,
    /// Row class.
    pub class: VariantClass,
    /// Reads supporting the key.
    pub support: u32,
    /// Reported coverage.
    pub coverage: u32,
    /// `support / coverage`.
    pub fraction: f64,
    /// Strand breakdown of the supporting reads.
    pub strands: StrandTally,
    /// `|`-joined source fields.
    pub raw: String,
}

impl QualifiedVariant {
    /// Record for a called substitution or indel.
    pub fn called(site: &PileupSite, key: VariantKey, strands: StrandTally) -> Self {
        let class = if key.is_indel() {
            VariantClass::Indel
        } else {
            VariantClass::Substitution
        };
        let support = strands.total();
        Self {
            locus: site.locus.clone(),
            reference: site.reference,
            variant: key.variant_label(),
            key: Some(key),
            class,
            support,
            coverage: site.coverage,
            fraction: support_fraction(support, site.coverage),
            strands,
            raw: site.raw.clone(),
        }
    }

    /// Anchor record for a covered locus with no non-reference call.
    pub fn non_variant(site: &PileupSite, strands: StrandTally) -> Self {
        Self {
            locus: site.locus.clone(),
            reference: site.reference,
            key: None,
            variant: NO_VARIANT.to_string(),
            class: VariantClass::NonVariant,
            support: site.coverage,
            coverage: site.coverage,
            fraction: 1.0,
            strands,
            raw: site.raw.clone(),
        }
    }

    /// Anchor record for a locus without usable coverage.
    pub fn uncovered(site: &PileupSite) -> Self {
        Self {
            locus: site.locus.clone(),
            reference: site.reference,
            key: None,
            variant: NO_VARIANT.to_string(),
            class: VariantClass::Uncovered,
            support: 0,
            coverage: 0,
            fraction: 0.0,
            strands: StrandTally::default(),
            raw: site.raw.clone(),
        }
    }

    /// Identity used to pair tumor and normal rows at one locus.
    ///
    /// Falls back to the `variant` column when the row carries no parsed key.
    pub fn identity(&self) -> String {
        match &self.key {
            Some(key) => key.to_string(),
            None => self.variant.clone(),
        }
    }

    /// Indel sequence, if the row is an indel with a known key.
    pub fn indel_sequence(&self) -> Option<&str> {
        self.key.as_ref().and_then(VariantKey::indel_sequence)
    }
}

/// Placeholder text for rows without a variant.
pub const NO_VARIANT: &str = "None";

/// Applies [`Thresholds`] to decoded pileup lines.
#[derive(Debug)]
pub struct VariantQualifier {
    thresholds: Thresholds,
    mode: QualifyMode,
    discovered: TargetIndex,
}

impl VariantQualifier {
    /// Create a qualifier for the given mode.
    pub fn new(thresholds: Thresholds, mode: QualifyMode) -> Self {
        Self {
            thresholds,
            mode,
            discovered: TargetIndex::new(),
        }
    }

    /// Discovery-mode qualifier.
    pub fn discovery(thresholds: Thresholds) -> Self {
        Self::new(thresholds, QualifyMode::Discovery)
    }

    /// Targeted-mode qualifier driven by a tumor-pass index.
    pub fn targeted(thresholds: Thresholds, targets: TargetIndex) -> Self {
        Self::new(thresholds, QualifyMode::Targeted(targets))
    }

    /// Active thresholds.
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Whether thresholds are bypassed at `locus`.
    pub fn overrides(&self, locus: &Locus) -> bool {
        match &self.mode {
            QualifyMode::Discovery => false,
            QualifyMode::Targeted(targets) => targets.contains_locus(locus),
        }
    }

    /// Qualify one covered line.
    ///
    /// Returns the qualifying keys in key order, a single non-variant anchor
    /// when the line has no non-reference call, or nothing when non-reference
    /// calls exist but none qualify.
    pub fn qualify(&mut self, decoded: &DecodedPileup) -> Vec<QualifiedVariant> {
        let site = &decoded.site;
        let override_thresholds = self.overrides(&site.locus);
        let discovering = matches!(self.mode, QualifyMode::Discovery);

        let mut emitted = Vec::new();
        let mut saw_variant = false;
        for (key, tally) in decoded.variant_calls() {
            saw_variant = true;
            if !override_thresholds && !self.thresholds.passes(tally, site.coverage) {
                continue;
            }
            if discovering {
                self.discovered.insert(site.locus.clone(), key.clone());
            }
            emitted.push(QualifiedVariant::called(site, key.clone(), *tally));
        }

        if !saw_variant {
            emitted.push(QualifiedVariant::non_variant(site, decoded.reference_tally()));
        }
        emitted
    }

    /// Anchor row for an uncovered line.
    pub fn qualify_uncovered(&self, site: &PileupSite) -> QualifiedVariant {
        QualifiedVariant::uncovered(site)
    }

    /// Keys accumulated so far in discovery mode.
    pub fn discovered(&self) -> &TargetIndex {
        &self.discovered
    }

    /// Consume the qualifier, returning the discovered index.
    pub fn into_discovered(self) -> TargetIndex {
        self.discovered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{decode_line, PileupLine};
    use test_case::test_case;

    fn decoded(line: &str) -> DecodedPileup {
        match decode_line(line).unwrap() {
            PileupLine::Covered(decoded) => decoded,
            other => panic!("expected covered line, got {:?}", other),
        }
    }

    #[test_case(-0.1 ; "negative")]
    #[test_case(1.0 ; "one")]
    #[test_case(f64::NAN ; "nan")]
    fn fraction_outside_unit_interval_is_rejected(fraction: f64) {
        assert!(matches!(
            Thresholds::new(0, fraction, false),
            Err(ConfigError::FractionOutOfRange(_))
        ));
    }

    #[test]
    fn reference_calls_never_qualify() {
        let mut qualifier = VariantQualifier::discovery(Thresholds::default());
        let rows = qualifier.qualify(&decoded("chr1\t100\tA\t5\tAaA.,\tIIIII"));
        assert_eq!(rows.len(), 1);
        let anchor = &rows[0];
        assert_eq!(anchor.class, VariantClass::NonVariant);
        assert_eq!(anchor.support, 5);
        assert_eq!(anchor.fraction, 1.0);
        assert_eq!(anchor.strands, StrandTally::new(3, 2));
        assert!(qualifier.discovered().is_empty());
    }

    #[test]
    fn thresholds_filter_and_discovery_records_keys() {
        let thresholds = Thresholds::new(2, 0.2, false).unwrap();
        let mut qualifier = VariantQualifier::discovery(thresholds);
        let rows = qualifier.qualify(&decoded("chr1\t500\tC\t8\t..TtT,G,\tIIIIIIII"));

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.key, Some(VariantKey::Substitution('T')));
        assert_eq!(row.class, VariantClass::Substitution);
        assert_eq!(row.support, 3);
        assert_eq!(row.coverage, 8);
        assert_eq!(row.strands, StrandTally::new(2, 1));
        assert!((row.fraction - 0.375).abs() < 1e-12);

        let keys = qualifier.discovered().keys_at(&Locus::new("chr1", 500)).unwrap();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn both_strand_requirement_rejects_single_strand_support() {
        let thresholds = Thresholds::new(1, 0.0, true).unwrap();
        let mut qualifier = VariantQualifier::discovery(thresholds);
        let rows = qualifier.qualify(&decoded("chr1\t5\tC\t4\t.TTg\tIIII"));
        // T is forward-only, G reverse-only: neither qualifies, no anchor either.
        assert!(rows.is_empty());
    }

    #[test]
    fn targeted_loci_bypass_thresholds() {
        let mut targets = TargetIndex::new();
        targets.insert(Locus::new("chr1", 20), VariantKey::Substitution('G'));
        let thresholds = Thresholds::new(10, 0.5, true).unwrap();
        let mut qualifier = VariantQualifier::targeted(thresholds, targets);

        let rows = qualifier.qualify(&decoded("chr1\t20\tA\t6\t....Ct\tIIIIII"));
        let keys: Vec<String> = rows.iter().map(QualifiedVariant::identity).collect();
        assert_eq!(keys, vec!["C", "T"]);

        let rows = qualifier.qualify(&decoded("chr1\t21\tA\t6\t....Ct\tIIIIII"));
        assert!(rows.is_empty());
        assert!(qualifier.discovered().is_empty());
    }

    #[test]
    fn indel_rows_use_direction_labels() {
        let mut qualifier = VariantQualifier::discovery(Thresholds::default());
        let rows = qualifier.qualify(&decoded("chr3\t9\tA\t2\tA+2AC.\tII"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].class, VariantClass::Indel);
        assert_eq!(rows[0].variant, "I-2");
        assert_eq!(rows[0].indel_sequence(), Some("AC"));
        assert_eq!(rows[0].identity(), "A+2AC");
    }

    #[test]
    fn uncovered_rows_are_anchors() {
        let qualifier = VariantQualifier::discovery(Thresholds::default());
        let PileupLine::Uncovered(site) = decode_line("chr1\t3\tG\t0\t*\t*").unwrap() else {
            panic!("expected uncovered");
        };
        let row = qualifier.qualify_uncovered(&site);
        assert_eq!(row.class, VariantClass::Uncovered);
        assert_eq!(row.identity(), NO_VARIANT);
        assert_eq!(row.coverage, 0);
    }
}
