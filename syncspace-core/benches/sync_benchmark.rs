use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use syncspace_core::{AppendOnly, ChatMessage, FullReplace, Identity, LastWriteWins, SyncedView};
use syncspace_core::model::{BoardState, Column, Task};

fn sample_board(tasks: usize) -> BoardState {
    let boards = ["todo", "in_progress", "review", "done"]
        .iter()
        .map(|id| Column {
            id: id.to_string(),
            title: id.to_string(),
            color: String::new(),
        })
        .collect();
    let tasks = (0..tasks)
        .map(|i| Task {
            id: format!("t{i}"),
            title: format!("Task {i}"),
            description: String::new(),
            priority: "medium".into(),
            status: ["todo", "in_progress", "review", "done"][i % 4].into(),
            due_date: None,
            assigned_to: Vec::new(),
            workspace_id: "ws".into(),
        })
        .collect();
    BoardState { boards, tasks }
}

fn bench_chat_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("Reconcile");
    group.throughput(Throughput::Elements(1));

    let remote = ChatMessage::local(&Identity::new("other", "Bob"), "hello there");

    group.bench_function("append_remote_message", |b| {
        let mut view: SyncedView<AppendOnly<ChatMessage>> = SyncedView::new("me", Vec::new());
        b.iter(|| {
            view.apply_remote(Some("other"), black_box(remote.clone()));
        })
    });

    group.bench_function("suppress_echo", |b| {
        let mut view: SyncedView<AppendOnly<ChatMessage>> = SyncedView::new("me", Vec::new());
        b.iter(|| {
            black_box(view.apply_remote(Some("me"), black_box(remote.clone())));
        })
    });

    group.finish();
}

fn bench_replace(c: &mut Criterion) {
    let mut group = c.benchmark_group("Replace");

    let content = "lorem ipsum ".repeat(1000);
    group.bench_function("document_lww_12kb", |b| {
        let mut view: SyncedView<LastWriteWins<String>> = SyncedView::new("me", String::new());
        b.iter(|| {
            black_box(view.apply_remote(Some("other"), black_box(content.clone())));
        })
    });

    let board = sample_board(500);
    group.bench_function("board_reload_500_tasks", |b| {
        let mut view: SyncedView<FullReplace<BoardState>> =
            SyncedView::new("me", BoardState::default());
        b.iter(|| {
            view.apply_remote(Some("other"), black_box(board.clone()));
            black_box(view.state().layout());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_chat_reconcile, bench_replace);
criterion_main!(benches);
