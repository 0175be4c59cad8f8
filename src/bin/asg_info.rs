//! asg-info - print a summary of a saved graph
//!
//! Usage: asg-info <file.asg> [--config <config.json>] [--filter <file.flt>]

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use asgdb::storage::load_from_file;
use asgdb::{EdgeKind, EngineConfig, Node, NodeId, PreorderTraversal, VisitContext, Visitor};

/// Counts visited nodes and traversed edges per kind
#[derive(Default)]
struct KindCounter {
    nodes: BTreeMap<&'static str, usize>,
    edges: BTreeMap<&'static str, usize>,
    max_depth: u32,
}

impl Visitor for KindCounter {
    fn visit(&mut self, node: &Node, ctx: &mut VisitContext<'_>) {
        *self.nodes.entry(node.kind().name()).or_default() += 1;
        self.max_depth = self.max_depth.max(ctx.depth());
    }

    fn visit_edge(&mut self, _src: &Node, edge: EdgeKind, _target: NodeId, _ctx: &mut VisitContext<'_>) {
        *self.edges.entry(edge.name()).or_default() += 1;
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: asg-info <file.asg> [--config <config.json>] [--filter <file.flt>]");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  <file.asg>     Saved graph");
        eprintln!("  --config       Engine config (JSON)");
        eprintln!("  --filter       Filter file saved for this graph");
        std::process::exit(1);
    }

    let path = PathBuf::from(&args[1]);
    let config = match arg_value(&args, "--config") {
        Some(cfg) => EngineConfig::from_json_file(cfg.as_ref())
            .with_context(|| format!("failed to read config {}", cfg))?,
        None => EngineConfig::default(),
    };

    let loaded = load_from_file(&path, &config.codec)
        .with_context(|| format!("failed to load {:?}", path))?;
    let mut factory = loaded.factory;

    if let Some(flt) = arg_value(&args, "--filter") {
        factory
            .load_filter(flt.as_ref())
            .with_context(|| format!("failed to load filter {}", flt))?;
    }
    if config.reverse_edges {
        factory.enable_reverse_edges();
    }
    if factory.node_count() == 0 {
        bail!("graph {:?} has no nodes", path);
    }

    let mut counter = KindCounter::default();
    {
        let mut traversal = PreorderTraversal::with_config(config.traversal.clone());
        traversal.set_factory(&factory);
        traversal.add_visitor(&mut counter);
        traversal.run()?;
    }

    let summary = serde_json::json!({
        "file": path,
        "header": loaded.header.props,
        "slots": factory.slot_count(),
        "nodes": factory.node_count(),
        "strings": factory.strings().len(),
        "filtered": factory.filter().filtered_count(),
        "visited": counter.nodes,
        "edges": counter.edges,
        "max_depth": counter.max_depth,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
