use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slotguard_smt::backends::smtlib_printer::{render_script, to_smtlib};
use slotguard_smt::sorts::SmtSort;
use slotguard_smt::terms::SmtTerm;

/// `depth` nested stores over a default mapping, read at a fresh key.
fn store_chain(depth: u32) -> SmtTerm {
    let mut m = SmtTerm::const_array(SmtSort::bitvec(160), SmtTerm::bv(0u8, 256));
    for i in 0..depth {
        let key = SmtTerm::var(format!("k{i}"));
        let old = m.clone().select(key.clone());
        m = m.store(key, old.bvadd(SmtTerm::bv(1u8, 256)));
    }
    m.select(SmtTerm::var("t"))
}

fn bench_print_store_chain_8(c: &mut Criterion) {
    let term = store_chain(8).bvuge(SmtTerm::bv(3u8, 256));
    c.bench_function("print_store_chain_8", |b| {
        b.iter(|| to_smtlib(black_box(&term)))
    });
}

fn bench_print_store_chain_32(c: &mut Criterion) {
    let term = store_chain(32).bvuge(SmtTerm::bv(3u8, 256));
    c.bench_function("print_store_chain_32", |b| {
        b.iter(|| to_smtlib(black_box(&term)))
    });
}

fn bench_render_script(c: &mut Criterion) {
    let decls: Vec<(String, SmtSort)> = (0..32)
        .map(|i| (format!("k{i}"), SmtSort::bitvec(160)))
        .chain(std::iter::once(("t".to_string(), SmtSort::bitvec(160))))
        .collect();
    let assertions = vec![store_chain(32).bvult(SmtTerm::bv(2u8, 256))];
    let comments = vec!["bench".to_string()];
    c.bench_function("render_script_32", |b| {
        b.iter(|| render_script(&comments, black_box(&decls), black_box(&assertions)))
    });
}

criterion_group!(
    benches,
    bench_print_store_chain_8,
    bench_print_store_chain_32,
    bench_render_script,
);
criterion_main!(benches);
