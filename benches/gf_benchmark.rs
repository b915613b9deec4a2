use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use sgfrd_core::domain::{Birth, Domain};
use sgfrd_core::gf::{GreensFunction2DAbsSym, GreensFunction2DRadAbs};
use sgfrd_core::scheduler::Scheduler;
use sgfrd_core::{ReactionRule, Species};

fn bench_draw_r(c: &mut Criterion) {
    let gf = GreensFunction2DAbsSym::new(1.0, 1.0);
    c.bench_function("abs_sym_draw_r", |b| {
        let mut u = 0.1;
        b.iter(|| {
            u = (u + 0.6180339887).fract();
            black_box(gf.draw_r(u, 0.05))
        })
    });
}

fn bench_draw_time(c: &mut Criterion) {
    let gf = GreensFunction2DAbsSym::new(1.0, 1.0);
    c.bench_function("abs_sym_draw_time", |b| {
        let mut u = 0.1;
        b.iter(|| {
            u = (u + 0.6180339887).fract();
            black_box(gf.draw_time(u))
        })
    });
}

fn bench_rad_abs_construction(c: &mut Criterion) {
    c.bench_function("rad_abs_new", |b| {
        b.iter(|| black_box(GreensFunction2DRadAbs::new(1.0, 0.5, 0.1, 1.0)))
    });
}

fn bench_scheduler_churn(c: &mut Criterion) {
    c.bench_function("scheduler_add_pop", |b| {
        b.iter(|| {
            let mut s = Scheduler::new();
            for i in 0..256 {
                s.add(
                    Domain::Birth(Birth {
                        rule: ReactionRule::birth(Species::new("A"), 1.0),
                    }),
                    (i * 7 % 97) as f64,
                );
            }
            while let Some(next) = s.pop_next() {
                black_box(next.2);
            }
        })
    });
}

criterion_group!(
    benches,
    bench_draw_r,
    bench_draw_time,
    bench_rad_abs_construction,
    bench_scheduler_churn
);
criterion_main!(benches);
