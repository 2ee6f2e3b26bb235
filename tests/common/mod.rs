#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use somatic_pileup::{PipelineConfig, QualifyPass, QualifyReport};

/// Tumor pileup covering chr1..chr3: an all-reference line, a substitution,
/// a deletion seen on both strands, an uncovered line and a second substitution.
pub const TUMOR_PILEUP: &str = "\
chr1\t100\tA\t5\tAaA.,\tIIIII
chr1\t500\tA\t10\t..TTt,,,.,\tIIIIIIIIII
chr2\t50\tC\t4\t.C-2TTc-2tt,\tIIII
chr2\t60\tG\t0\t*\t*
chr3\t5\tG\t6\t..AAaa\tIIIIII
";

/// Normal pileup without chr2; chr1:500 is reference-only.
pub const NORMAL_PILEUP: &str = "\
chr1\t500\tA\t20\t..........,,,,,,,,,,\tIIIIIIIIIIIIIIIIIIII
chr3\t5\tG\t8\t...,,aAA\tIIIIIIII
";

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("SOMATIC_PILEUP_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set SOMATIC_PILEUP_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Run a qualify pass over in-memory pileup text.
pub fn qualify_text(config: PipelineConfig, pileup: &str) -> (QualifyReport, String) {
    let mut out = Vec::new();
    let report = QualifyPass::new(config)
        .run(Cursor::new(pileup), "fixture.pileup", &mut out)
        .expect("qualify pass succeeds");
    (report, String::from_utf8(out).expect("output is UTF-8"))
}

/// Thresholds used by the fixture scenarios.
pub fn fixture_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_threshold_values(2, 0.1, false)
        .expect("valid thresholds")
}

/// Rows of a tab-separated table, header excluded.
pub fn data_lines(table: &str) -> Vec<&str> {
    table.lines().filter(|line| !line.starts_with('#')).collect()
}
