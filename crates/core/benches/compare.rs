// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use passgate_core::{compare, CompareMode, LengthPolicy, Secret};

const SECRET: &[u8] = b"correct-horse-battery-staple";

fn bench_compare(c: &mut Criterion) {
    let secret = Secret::new(SECRET).unwrap();
    let mut group = c.benchmark_group("compare");

    // Early exit should scale with the matching prefix; constant time should not.
    for prefix in [0usize, 8, 16, SECRET.len() - 1] {
        let mut input = SECRET.to_vec();
        input[prefix] ^= 0xFF;

        for (name, mode) in [
            ("early_exit", CompareMode::EarlyExit),
            ("constant_time", CompareMode::ConstantTime),
        ] {
            group.bench_with_input(BenchmarkId::new(name, prefix), &input, |b, input| {
                b.iter(|| compare(&secret, black_box(input), mode, LengthPolicy::Exact))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_compare);
criterion_main!(benches);
