//! Micro benchmarks for the gzip splicing hot path. Pure CPU - no network,
//! no IO: members are built up front with flate2 and pushed through the
//! splicer in the chunk sizes Hyper typically delivers.
//!
//! ```bash
//! cargo bench --bench bench_splice
//! # Save a named baseline for regression comparison:
//! cargo bench --bench bench_splice -- --save-baseline v0_1_0
//! ```

use std::io::{Read, Write};
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use gzsplice_proxy_lib::{crc32_combine, GzipSplicer, InjectionArtifact, DEFAULT_MARKUP};

/// Chunk granularity of the pushes, roughly what Hyper hands a body adapter.
const CHUNK: usize = 16 * 1024;

const TEMPLATE: &[u8] =
    b"<html><head><title>bench</title></head><body><p>lorem ipsum dolor</p></body></html>\n";

fn html_document(target_len: usize) -> Vec<u8> {
    TEMPLATE.iter().copied().cycle().take(target_len).collect()
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data)
        .unwrap_or_else(|e| panic!("gzip write failed: {e}"));
    enc.finish()
        .unwrap_or_else(|e| panic!("gzip finish failed: {e}"))
}

fn gunzip(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut out)
        .unwrap_or_else(|e| panic!("gunzip failed: {e}"));
    out
}

fn splice(member: &[u8], artifact: &Arc<InjectionArtifact>) -> Vec<u8> {
    let mut splicer = GzipSplicer::new(Arc::clone(artifact));
    let mut out = Vec::with_capacity(member.len() + 256);
    for piece in member.chunks(CHUNK) {
        out.extend_from_slice(&splicer.push(piece));
    }
    let tail = splicer
        .finish()
        .unwrap_or_else(|e| panic!("splice finish failed: {e}"));
    out.extend_from_slice(&tail);
    out
}

fn build_artifact() -> Arc<InjectionArtifact> {
    match InjectionArtifact::build(DEFAULT_MARKUP.as_bytes()) {
        Ok(artifact) => Arc::new(artifact),
        Err(e) => panic!("artifact build failed: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Benchmark 1: splicer throughput over compressed members of growing size
// ---------------------------------------------------------------------------
fn bench_splice_throughput(c: &mut Criterion) {
    let artifact = build_artifact();

    // Sanity: the spliced output must stay a valid member before measuring.
    let probe_body = html_document(64 * 1024);
    let mut expected = DEFAULT_MARKUP.as_bytes().to_vec();
    expected.extend_from_slice(&probe_body);
    assert_eq!(
        gunzip(&splice(&gzip(&probe_body), &artifact)),
        expected,
        "splice fixture is invalid"
    );

    let mut group = c.benchmark_group("splice_throughput");
    for plain_len in [16 * 1024, 256 * 1024, 1024 * 1024] {
        let member = gzip(&html_document(plain_len));
        group.throughput(Throughput::Bytes(member.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(plain_len), &member, |b, m| {
            b.iter(|| splice(std::hint::black_box(m), &artifact));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark 2: CRC combination alone - the only per-response math that is
// not a straight memmove
// ---------------------------------------------------------------------------
fn bench_crc32_combine(c: &mut Criterion) {
    let body = html_document(1024 * 1024);
    let crc1 = crc32fast::hash(DEFAULT_MARKUP.as_bytes());
    let crc2 = crc32fast::hash(&body);
    let len2 = body.len() as u64;

    c.bench_function("crc32_combine_1mib_suffix", |b| {
        b.iter(|| crc32_combine(std::hint::black_box(crc1), std::hint::black_box(crc2), len2));
    });
}

// ---------------------------------------------------------------------------
// Benchmark 3: one-time artifact construction (startup cost)
// ---------------------------------------------------------------------------
fn bench_artifact_build(c: &mut Criterion) {
    c.bench_function("artifact_build_default_markup", |b| {
        b.iter(|| InjectionArtifact::build(std::hint::black_box(DEFAULT_MARKUP.as_bytes())));
    });
}

criterion_group!(
    splice_benches,
    bench_splice_throughput,
    bench_crc32_combine,
    bench_artifact_build,
);
criterion_main!(splice_benches);
