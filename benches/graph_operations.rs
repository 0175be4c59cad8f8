//! Benchmark suite for graph operations

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use asgdb::storage::{load_from_slice, load_from_file, save_to_file, save_to_vec};
use asgdb::{CodecConfig, EdgeKind, Factory, Node, NodeId, NodeKind, PreorderTraversal, VisitContext, Visitor, ROOT_ID};
use tempfile::TempDir;

/// One compilation unit with `method_count` methods; every method calls the previous one
fn create_test_graph(method_count: usize) -> (Factory, Vec<NodeId>) {
    let mut f = Factory::new();
    let cu = f.create(NodeKind::CompilationUnit);
    let class = f.create(NodeKind::Class);
    f.add_edge(ROOT_ID, EdgeKind::PackageHasMembers, cu).unwrap();
    f.add_edge(cu, EdgeKind::CompilationUnitHasTypes, class).unwrap();
    f.set_name(class, "Bench").unwrap();

    let mut methods = Vec::with_capacity(method_count);
    for i in 0..method_count {
        let method = f.create(NodeKind::Method);
        let body = f.create(NodeKind::Block);
        let stmt = f.create(NodeKind::ExpressionStatement);
        let call = f.create(NodeKind::MethodCall);
        f.add_edge(class, EdgeKind::ClassHasMembers, method).unwrap();
        f.set_edge(method, EdgeKind::MethodHasBody, body).unwrap();
        f.add_edge(body, EdgeKind::BlockHasStatements, stmt).unwrap();
        f.set_edge(stmt, EdgeKind::ExpressionStatementHasExpression, call).unwrap();
        f.set_name(method, &format!("func_{}", i)).unwrap();
        if let Some(&prev) = methods.last() {
            f.set_edge(call, EdgeKind::MethodCallInvokes, prev).unwrap();
        }
        methods.push(method);
    }
    (f, methods)
}

#[derive(Default)]
struct Counter(usize);

impl Visitor for Counter {
    fn visit(&mut self, _node: &Node, _ctx: &mut VisitContext<'_>) {
        self.0 += 1;
    }
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for size in [100, 1000, 10000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| black_box(create_test_graph(size)));
        });
    }

    group.finish();
}

fn bench_reverse_edges(c: &mut Criterion) {
    let mut group = c.benchmark_group("enable_reverse_edges");

    for size in [1000, 10000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || create_test_graph(size).0,
                |mut f| {
                    f.enable_reverse_edges();
                    black_box(f)
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_preorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("preorder");

    for size in [100, 1000, 10000] {
        let (f, _) = create_test_graph(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut counter = Counter::default();
                let mut t = PreorderTraversal::new();
                t.set_factory(&f);
                t.set_cross_edge_to_traversal(EdgeKind::MethodCallInvokes);
                t.add_visitor(&mut counter);
                t.run_from(ROOT_ID).unwrap();
                black_box(counter.0);
            });
        });
    }

    group.finish();
}

fn bench_save_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let cfg = CodecConfig::default();

    for size in [1000, 10000] {
        let (mut f, _) = create_test_graph(size);
        let bytes = save_to_vec(&mut f, &cfg).unwrap();

        group.bench_with_input(BenchmarkId::new("save", size), &size, |b, _| {
            b.iter(|| black_box(save_to_vec(&mut f, &cfg).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("load", size), &size, |b, _| {
            b.iter(|| black_box(load_from_slice(&bytes, &cfg).unwrap()));
        });

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bench.asg");
        save_to_file(&mut f, &path, &cfg).unwrap();
        group.bench_with_input(BenchmarkId::new("load_file", size), &size, |b, _| {
            b.iter(|| black_box(load_from_file(&path, &cfg).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_reverse_edges, bench_preorder, bench_save_load);
criterion_main!(benches);
