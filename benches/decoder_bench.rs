//! Decoder and qualifier throughput

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use somatic_pileup::genomics::{decode_line, tally_read_bases};
use somatic_pileup::{PipelineConfig, QualifyPass};

const REFERENCE_ONLY: &str = "chr1\t1000\tA\t40\t....................,,,,,,,,,,,,,,,,,,,,\tIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIII";
const MIXED: &str = "chr1\t1001\tC\t40\t^I..TTt,,A+2ACa+2ac..,,G-3TTAg-3tta*.,.,$.,GgTt..,,^~.$,.\tIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIII";

fn synthetic_pileup(lines: usize) -> String {
    let mut text = String::new();
    for position in 0..lines {
        let bases = if position % 10 == 0 {
            "..TTt,,A+2ACa+2ac..,,G-3TTAg-3tta*"
        } else {
            "....................,,,,,,,,,,,,,,,,,,,,"
        };
        text.push_str(&format!("chr1\t{}\tC\t40\t{}\tI\n", position + 1, bases));
    }
    text
}

fn benchmark_decoder(c: &mut Criterion) {
    c.bench_function("decode_reference_only_line", |b| {
        b.iter(|| decode_line(black_box(REFERENCE_ONLY)))
    });

    c.bench_function("decode_mixed_line", |b| {
        b.iter(|| decode_line(black_box(MIXED)))
    });

    let column = MIXED.split('\t').nth(4).unwrap_or_default();
    c.bench_function("tally_mixed_read_bases", |b| {
        b.iter(|| tally_read_bases(black_box(column), 'C'))
    });
}

fn benchmark_qualify_pass(c: &mut Criterion) {
    let pileup = synthetic_pileup(10_000);
    c.bench_function("qualify_10k_lines", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(pileup.len());
            let report = QualifyPass::new(PipelineConfig::default())
                .run(Cursor::new(pileup.as_bytes()), "bench", &mut out)
                .expect("synthetic pileup qualifies");
            black_box(report.summary)
        })
    });
}

criterion_group!(benches, benchmark_decoder, benchmark_qualify_pass);
criterion_main!(benches);
