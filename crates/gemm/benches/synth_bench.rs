//! Synthesiser throughput and determinism-check cost.

use criterion::{criterion_group, criterion_main, Criterion};
use kernelforge_core::{DeviceProfile, Precision};
use kernelforge_gemm::{GemmDescriptor, GemmKernel, PrecisionTriple};

fn bench_synthesize_small(c: &mut Criterion) {
    let descriptor = GemmDescriptor::new(32, 32, 32, PrecisionTriple::uniform(Precision::FP32));
    c.bench_function("gemm_synthesize_32x32x32_fp32", |b| {
        b.iter(|| GemmKernel::synthesize(&descriptor, DeviceProfile::default()).unwrap())
    });
}

fn bench_synthesize_large_mixed_precision(c: &mut Criterion) {
    let mem = PrecisionTriple {
        a: Precision::FP16,
        b: Precision::FP16,
        c: Precision::FP32,
    };
    let descriptor = GemmDescriptor::new(512, 512, 512, mem);
    c.bench_function("gemm_synthesize_512x512x512_fp16", |b| {
        b.iter(|| GemmKernel::synthesize(&descriptor, DeviceProfile::discrete()).unwrap())
    });
}

criterion_group!(
    benches,
    bench_synthesize_small,
    bench_synthesize_large_mixed_precision
);
criterion_main!(benches);
