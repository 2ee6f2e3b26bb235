#[path = "common/mod.rs"]
mod common;

use std::collections::HashSet;
use std::io::Cursor;

use blake3::hash;
use common::{fixture_config, qualify_text, NORMAL_PILEUP, TUMOR_PILEUP};
use somatic_pileup::genomics::{compare_streams, LocusStream};

#[test]
fn full_pipeline_is_deterministic() {
    let mut fingerprints = HashSet::new();
    for _ in 0..5 {
        let (tumor_report, tumor) = qualify_text(fixture_config(), TUMOR_PILEUP);
        let (_, normal) = qualify_text(
            fixture_config().with_targets(tumor_report.discovered),
            NORMAL_PILEUP,
        );

        let mut tumor_stream =
            LocusStream::new(Cursor::new(tumor.into_bytes()), "tumor").expect("tumor stream opens");
        let mut normal_stream = LocusStream::new(Cursor::new(normal.into_bytes()), "normal")
            .expect("normal stream opens");
        let mut combined = Vec::new();
        compare_streams(&mut tumor_stream, &mut normal_stream, &mut combined)
            .expect("comparison succeeds");

        fingerprints.insert(hash(&combined));
    }

    assert_eq!(fingerprints.len(), 1, "outputs diverged across runs");
}
