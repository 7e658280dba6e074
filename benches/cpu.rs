use criterion::{criterion_group, criterion_main, Criterion};
use dotmatrix::test::{build_test, TestOptions};

fn benchmark_cpu_clock(c: &mut Criterion) {
    let mut gb = build_test(TestOptions {
        ppu_enabled: Some(false),
        timer_enabled: Some(false),
        boot: Some(false),
    });
    gb.load_rom_empty().unwrap();
    gb.boot();

    // parks the CPU so that the interpreter loop is measured
    // over a stable halted instruction stream
    gb.cpu().set_halted(true);

    c.bench_function("cpu_cycles", |b| {
        b.iter(|| {
            gb.clocks_cycles(1_000_000).unwrap();
        })
    });
}

criterion_group!(benches, benchmark_cpu_clock);
criterion_main!(benches);
