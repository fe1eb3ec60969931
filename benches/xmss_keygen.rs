use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use xmss::hash::sha2::Sha256Hash;
use xmss::{Xmss, XmssConfig, WotsConfig};

fn key_pair(c: &mut Criterion) {
    let wots = WotsConfig::compact_32(Arc::new(Sha256Hash)).unwrap();
    let config = XmssConfig::new(None, wots, 6).unwrap();

    let mut rng = StdRng::seed_from_u64(0xBE8C);
    let mut compact = vec![0u8; config.compact_private_keys_length()];
    let mut sk_prf = vec![0u8; 32];
    let mut public_seed = vec![0u8; 32];
    rng.fill_bytes(&mut compact);
    rng.fill_bytes(&mut sk_prf);
    rng.fill_bytes(&mut public_seed);

    let mut group = c.benchmark_group("xmss_key_pair_h6");
    group.sample_size(10);
    for parallelism in [1usize, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(parallelism),
            &parallelism,
            |b, &parallelism| {
                b.iter(|| {
                    Xmss::key_pair(&config, &compact, &sk_prf, &public_seed, true, parallelism)
                        .unwrap()
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, key_pair);
criterion_main!(benches);
