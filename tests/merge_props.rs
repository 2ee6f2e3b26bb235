use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

use proptest::prelude::*;
use somatic_pileup::genomics::{
    compare_streams, format_qualified, Locus, LocusStream, QualifiedVariant, StrandTally,
    VariantClass, VariantKey, NO_VARIANT, QUALIFIED_HEADER,
};

type Sample = BTreeMap<(usize, u64), BTreeSet<char>>;

fn sample() -> impl Strategy<Value = Sample> {
    proptest::collection::btree_map(
        (0usize..3, 1u64..40),
        proptest::collection::btree_set(
            prop_oneof![Just('A'), Just('C'), Just('G'), Just('T')],
            0..3,
        ),
        0..25,
    )
}

fn contig(index: usize) -> String {
    format!("chr{}", index + 1)
}

fn row(locus: Locus, base: Option<char>) -> QualifiedVariant {
    let raw = format!("{}|{}|N|12", locus.contig, locus.position);
    match base {
        Some(base) => QualifiedVariant {
            locus,
            reference: 'N',
            key: Some(VariantKey::Substitution(base)),
            variant: base.to_string(),
            class: VariantClass::Substitution,
            support: 3,
            coverage: 12,
            fraction: 0.25,
            strands: StrandTally::new(2, 1),
            raw,
        },
        None => QualifiedVariant {
            locus,
            reference: 'N',
            key: None,
            variant: NO_VARIANT.to_string(),
            class: VariantClass::NonVariant,
            support: 12,
            coverage: 12,
            fraction: 1.0,
            strands: StrandTally::new(6, 6),
            raw,
        },
    }
}

fn render(sample: &Sample) -> String {
    let mut text = String::from(QUALIFIED_HEADER);
    for ((index, position), bases) in sample {
        let locus = Locus::new(contig(*index), *position);
        if bases.is_empty() {
            text.push_str(&format_qualified(&row(locus.clone(), None)));
            text.push('\n');
        }
        for base in bases {
            text.push_str(&format_qualified(&row(locus.clone(), Some(*base))));
            text.push('\n');
        }
    }
    text
}

fn stream(text: String, name: &str) -> LocusStream<Cursor<Vec<u8>>> {
    LocusStream::new(Cursor::new(text.into_bytes()), name).unwrap()
}

proptest! {
    #[test]
    fn every_tumor_variant_gets_one_correctly_classified_row(
        tumor in sample(),
        normal in sample(),
    ) {
        let mut tumor_stream = stream(render(&tumor), "tumor");
        let mut normal_stream = stream(render(&normal), "normal");
        let mut out = Vec::new();
        let summary = compare_streams(&mut tumor_stream, &mut normal_stream, &mut out).unwrap();

        let expected: Vec<(String, char, &str)> = tumor
            .iter()
            .flat_map(|(&(index, position), bases)| {
                let status = |base: &char| match normal.get(&(index, position)) {
                    None => "UNCOVERED",
                    Some(normal_bases) if normal_bases.contains(base) => "SUPPORTED",
                    Some(_) => "UNSUPPORTED",
                };
                bases
                    .iter()
                    .map(move |base| (format!("{}:{}", contig(index), position), *base, status(base)))
                    .collect::<Vec<_>>()
            })
            .collect();

        let table = String::from_utf8(out).unwrap();
        let actual: Vec<(String, char, &str)> = table
            .lines()
            .filter(|line| !line.starts_with('#'))
            .map(|line| {
                let columns: Vec<&str> = line.split('\t').collect();
                (
                    columns[0].to_string(),
                    columns[2].chars().next().unwrap(),
                    columns[13],
                )
            })
            .collect();

        prop_assert_eq!(summary.rows as usize, expected.len());
        prop_assert_eq!(
            summary.skipped_anchors as usize,
            tumor.values().filter(|bases| bases.is_empty()).count()
        );
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn stream_yields_records_in_file_order(sample in sample()) {
        let mut stream = stream(render(&sample), "sample");
        let mut seen = Vec::new();
        while stream.advance().unwrap() {
            let record = stream.current().unwrap();
            let rank = stream.contig_order().rank(&record.locus.contig).unwrap();
            seen.push((rank, record.locus.position));
        }

        let mut sorted = seen.clone();
        sorted.sort();
        prop_assert_eq!(&seen, &sorted);
        prop_assert!(stream.is_exhausted());

        let expected_rows: usize = sample.values().map(|bases| bases.len().max(1)).sum();
        prop_assert_eq!(seen.len(), expected_rows);
    }
}
