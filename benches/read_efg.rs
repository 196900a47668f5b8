use criterion::{criterion_group, criterion_main, Criterion};
use qcparse::efg::raw_matrices;

pub fn read_efg(c: &mut Criterion) {
    let contents =
        std::fs::read_to_string("testfiles/efg/adduct_input.inp.out")
            .unwrap();
    c.bench_function("read efg", |b| b.iter(|| raw_matrices(&contents)));
}

criterion_group!(benches, read_efg);
criterion_main!(benches);
