//! Slow ticker hot path benchmarks.
//!
//! Measures one input sample and one sigma-delta step against the
//! simulation board. Both run inside the 1 kHz ticker thread.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use toolhead_common::pin::PinSpec;
use toolhead_control::switch::{InputBehavior, InputPoller, SwitchShared};
use toolhead_hal::{Board, SigmaDelta, SimBoard};

fn poller(board: &SimBoard, behavior: InputBehavior) -> InputPoller {
    let input = board.digital_input(&PinSpec::gpio(1, 30)).unwrap();
    InputPoller::new("bench", input, behavior, Arc::new(SwitchShared::new(false)))
}

fn bench_poller_steady(c: &mut Criterion) {
    let board = SimBoard::new();
    let mut poller = poller(&board, InputBehavior::Momentary);

    c.bench_function("poller_tick_steady", |b| {
        b.iter(|| black_box(&mut poller).tick());
    });
}

fn bench_poller_longpush_held(c: &mut Criterion) {
    let board = SimBoard::new();
    let mut poller = poller(&board, InputBehavior::LongPush);
    board.set_input(1, 30, true);
    poller.tick();

    c.bench_function("poller_tick_longpush_held", |b| {
        b.iter(|| black_box(&mut poller).tick());
    });
}

fn bench_poller_toggle_edges(c: &mut Criterion) {
    let board = SimBoard::new();
    let mut poller = poller(&board, InputBehavior::Toggle);
    let mut level = false;

    c.bench_function("poller_tick_toggle_edges", |b| {
        b.iter(|| {
            level = !level;
            board.set_input(1, 30, level);
            black_box(&mut poller).tick();
        });
    });
}

fn bench_sigma_delta(c: &mut Criterion) {
    let board = SimBoard::new();
    let pin = board.digital_output(&PinSpec::gpio(2, 4)).unwrap();
    let modulator = SigmaDelta::new(pin, 255);
    modulator.pwm(100);

    c.bench_function("sigma_delta_on_tick", |b| {
        b.iter(|| black_box(&modulator).on_tick());
    });
}

criterion_group!(
    benches,
    bench_poller_steady,
    bench_poller_longpush_held,
    bench_poller_toggle_edges,
    bench_sigma_delta,
);
criterion_main!(benches);
