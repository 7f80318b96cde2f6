use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use trellis_core::binding::{expr, Binding};
use trellis_core::reactive::{Effect, Memo, Runtime, Signal};
use trellis_core::state::{StateScope, Store};
use trellis_core::view::{ComponentRegistry, Renderer, ViewNode};
use trellis_core::Context;

fn signal_notify(c: &mut Criterion) {
    let rt = Runtime::new();
    let signal = Signal::new(&rt, 0u64);
    let hits = Arc::new(AtomicUsize::new(0));

    let effects: Vec<Effect> = (0..16)
        .map(|_| {
            let (s, h) = (signal.clone(), hits.clone());
            Effect::new(&rt, move || {
                black_box(s.get());
                h.fetch_add(1, Ordering::Relaxed);
            })
        })
        .collect();

    let mut next = 0u64;
    c.bench_function("signal_set_16_effects", |b| {
        b.iter(|| {
            next += 1;
            signal.set(black_box(next));
        })
    });
    drop(effects);
}

fn batched_memo(c: &mut Criterion) {
    let rt = Runtime::new();
    let inputs: Vec<Signal<i64>> = (0..8).map(|n| Signal::new(&rt, n)).collect();
    let sources = inputs.clone();
    let sum = Memo::new(&rt, move || sources.iter().map(Signal::get).sum::<i64>());

    let mut round = 0i64;
    c.bench_function("batch_8_writes_one_memo", |b| {
        b.iter(|| {
            round += 1;
            rt.batch(|| {
                for signal in &inputs {
                    signal.set(round);
                }
            });
            black_box(sum.get_untracked())
        })
    });
}

fn derived_expression(c: &mut Criterion) {
    let store = Store::in_memory(&Runtime::new());
    store.set(StateScope::Workspace, "count", json!(41));
    let ctx = Context::new().with_prop("step", json!(1));

    c.bench_function("evaluate_derived", |b| {
        b.iter(|| expr::evaluate(black_box("state.count + props.step > 40 ? 'big' : 'small'"), &ctx, &store))
    });
}

fn render_loop(c: &mut Criterion) {
    let store = Store::in_memory(&Runtime::new());
    let tasks: Vec<_> = (0..100).map(|id| json!({"id": id, "title": format!("task {id}")})).collect();
    store.set(StateScope::Workspace, "tasks", json!(tasks));
    let renderer = Renderer::new(store, Arc::new(ComponentRegistry::new()));

    let tree: ViewNode = ViewNode::element("ul")
        .child(ViewNode::each(
            Binding::workspace("tasks"),
            "task",
            ViewNode::element("li")
                .child(ViewNode::text(Binding::prop("task.title")))
                .into(),
        ))
        .into();
    let ctx = Context::new();

    c.bench_function("render_100_item_loop", |b| b.iter(|| black_box(renderer.render(&tree, &ctx))));
}

criterion_group!(benches, signal_notify, batched_memo, derived_expression, render_loop);
criterion_main!(benches);
