use bloom_core::{encode, BloomFilter, Item};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn bench_filter(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let ints: Vec<u64> = (0..10_000).map(|_| rng.random()).collect();
    let mut filled = BloomFilter::new(ints.len(), 0.01).unwrap();
    filled.add_bulk(&ints).unwrap();

    c.bench_function("add_int", |b| {
        let mut bf = BloomFilter::new(ints.len(), 0.01).unwrap();
        let mut i = 0usize;
        b.iter(|| {
            bf.add(black_box(&ints[i % ints.len()])).unwrap();
            i += 1;
        })
    });
    c.bench_function("contains_int", |b| {
        b.iter(|| black_box(filled.contains(black_box(&ints[17])).unwrap()))
    });
    c.bench_function("add_bulk_10k", |b| {
        b.iter(|| {
            let mut bf = BloomFilter::new(ints.len(), 0.01).unwrap();
            bf.add_bulk(black_box(&ints)).unwrap();
            bf
        })
    });

    let nested = Item::Seq(vec![
        Item::text("tuple"),
        Item::Int(42),
        Item::Set((0..16).map(Item::Int).collect()),
    ]);
    c.bench_function("encode_nested", |b| b.iter(|| black_box(encode(black_box(&nested)))));
}

criterion_group!(benches, bench_filter);
criterion_main!(benches);
