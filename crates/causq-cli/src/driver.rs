//! Subcommand execution over a loaded model directory.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{info, info_span};

use causq_engine::{EngineState, IncrementalEngine, PurgeNode, reachability_hyperpath};
use causq_model::{MethodId, Model, ModelData, input};

use crate::args::{CliArgs, Command};
use crate::resolve::{resolve_method, resolve_methods};

pub fn run(args: CliArgs) -> Result<()> {
    init_tracing(args.verbose);

    let mut model = load_model(&args.model)?;
    if !args.no_optimize {
        let _span = info_span!("optimize").entered();
        model.optimize();
    }
    info!(
        methods = model.adj.n_methods(),
        typeflows = model.adj.n_typeflows(),
        types = model.adj.n_types(),
        "model ready"
    );

    match args.command {
        Command::Purge { methods } => purge(&model, &methods),
        Command::Missing => missing(&model),
        Command::Hyperpath { method, purge } => hyperpath(&model, &method, &purge),
        Command::Batch { tree, verify } => batch(&model, &tree, verify),
        Command::Cutoffs { top } => cutoffs(&model, top),
        Command::Bench { iterations } => bench(&model, iterations),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load all model tables from a directory.
pub fn load_model(dir: &Path) -> Result<Model> {
    let _span = info_span!("load_model").entered();

    let read_text = |name: &str| -> Result<String> {
        fs::read_to_string(dir.join(name)).with_context(|| format!("reading {name}"))
    };
    let read_bytes = |name: &str| -> Result<Vec<u8>> {
        fs::read(dir.join(name)).with_context(|| format!("reading {name}"))
    };

    let type_names = input::parse_names(&read_text("types.txt")?);
    let method_names = input::parse_names(&read_text("methods.txt")?);
    let data = ModelData {
        typestates: input::parse_typestates(type_names.len(), &read_bytes("typestates.bin")?)?,
        interflows: input::parse_typeflow_edges(&read_bytes("interflows.bin")?)?,
        direct_invokes: input::parse_method_edges(&read_bytes("direct_invokes.bin")?)?,
        typeflow_methods: input::parse_typeflow_methods(&read_bytes("typeflow_methods.bin")?)?,
        typeflow_filters: input::parse_typeflow_filters(&read_bytes("typeflow_filters.bin")?)?,
        type_names,
        method_names,
    };
    Ok(Model::new(data)?)
}

fn read_specs_from_stdin() -> Result<Vec<String>> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("reading method names from stdin")?;
    Ok(buf.lines().map(str::to_owned).collect())
}

fn purge(model: &Model, specs: &[String]) -> Result<()> {
    let specs = if specs.is_empty() {
        read_specs_from_stdin()?
    } else {
        specs.to_vec()
    };
    let purged = resolve_methods(model, &specs)?;

    let baseline = EngineState::simulate_purge(&model.adj, &[]);
    info!(reachable = baseline.reachable_count(), "baseline run");
    let after = EngineState::simulate_purge(&model.adj, &purged);
    info!(reachable = after.reachable_count(), purged = purged.len(), "purged run");

    for i in 1..model.adj.n_methods() {
        let m = MethodId(i as u32);
        if baseline.is_reached(m) && !after.is_reached(m) {
            println!("{}", model.method_name(m));
        }
    }
    Ok(())
}

fn missing(model: &Model) -> Result<()> {
    let baseline = EngineState::simulate_purge(&model.adj, &[]);
    for i in 1..model.adj.n_methods() {
        let m = MethodId(i as u32);
        if !baseline.is_reached(m) {
            println!("{}", model.method_name(m));
        }
    }
    Ok(())
}

fn hyperpath(model: &Model, method: &str, purge_specs: &[String]) -> Result<()> {
    let target = resolve_method(model, method)?;
    let purged = resolve_methods(model, purge_specs)?;

    let state = EngineState::simulate_purge_detailed(&model.adj, &purged);
    if !state.is_reached(target) {
        println!("Not reachable");
        return Ok(());
    }

    let hp = reachability_hyperpath(&model.adj, &state, target);
    for edge in &hp.edges {
        match edge.via_type {
            Some(ty) => println!(
                "{} -> {} (via {})",
                model.method_name(edge.from),
                model.method_name(edge.to),
                model.type_name(ty)
            ),
            None => println!(
                "{} -> {}",
                model.method_name(edge.from),
                model.method_name(edge.to)
            ),
        }
    }
    if hp.saturation_lost {
        println!("(witness incomplete: lost due to saturation)");
    }
    Ok(())
}

/// JSON shape of a purge-tree node; method specs resolve like CLI args.
#[derive(Debug, Deserialize)]
struct PurgeNodeSpec {
    #[serde(default)]
    methods: Vec<String>,
    #[serde(default)]
    children: Vec<PurgeNodeSpec>,
}

fn resolve_tree(model: &Model, spec: &PurgeNodeSpec) -> Result<PurgeNode> {
    let methods = resolve_methods(model, &spec.methods)?;
    let children = spec
        .children
        .iter()
        .map(|child| resolve_tree(model, child))
        .collect::<Result<Vec<_>>>()?;
    Ok(PurgeNode::with_children(methods, children))
}

fn subtree_methods(node: &PurgeNode, out: &mut Vec<MethodId>) {
    out.extend_from_slice(&node.methods);
    for child in &node.children {
        subtree_methods(child, out);
    }
}

/// Pre-order purge sets matching the driver's yield order, for `--verify`:
/// at each node, the accumulated purges minus off-path siblings and minus
/// the node's own descendants.
fn verification_purges(
    nodes: &[PurgeNode],
    active: &[MethodId],
    out: &mut Vec<Vec<MethodId>>,
) {
    for (i, node) in nodes.iter().enumerate() {
        let mut removed = Vec::new();
        for (j, sibling) in nodes.iter().enumerate() {
            if j != i {
                subtree_methods(sibling, &mut removed);
            }
        }
        let mut here = active.to_vec();
        here.retain(|m| !removed.contains(m));

        let mut desc = Vec::new();
        for child in &node.children {
            subtree_methods(child, &mut desc);
        }
        let mut at_yield = here.clone();
        at_yield.retain(|m| node.methods.contains(m) || !desc.contains(m));
        out.push(at_yield);

        verification_purges(&node.children, &here, out);
    }
}

fn batch(model: &Model, tree: &Path, verify: bool) -> Result<()> {
    let text = fs::read_to_string(tree).with_context(|| format!("reading {}", tree.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text).context("parsing purge tree")?;
    let specs: Vec<PurgeNodeSpec> = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    let forest = specs
        .iter()
        .map(|spec| resolve_tree(model, spec))
        .collect::<Result<Vec<_>>>()?;

    let baseline = EngineState::simulate_purge(&model.adj, &[]).reachable_count();

    let expected = if verify {
        let mut active = Vec::new();
        for node in &forest {
            subtree_methods(node, &mut active);
        }
        let mut out = Vec::new();
        verification_purges(&forest, &active, &mut out);
        Some(out)
    } else {
        None
    };

    let mut engine = IncrementalEngine::new(&model.adj, &forest);
    let mut index = 0usize;
    while let Some(node) = engine.next() {
        let reachable = engine.current_state().reachable_count();
        println!(
            "[{index}] purged {} methods: {reachable} reachable, cut {}",
            node.methods.len(),
            baseline.saturating_sub(reachable)
        );
        if let Some(expected) = &expected {
            let fresh = EngineState::simulate_purge(&model.adj, &expected[index]);
            anyhow::ensure!(
                engine.current_state().reachability_equals(&fresh),
                "node {index} diverges from the from-scratch run"
            );
        }
        index += 1;
    }
    if verify {
        info!(nodes = index, "all nodes match from-scratch runs");
    }
    Ok(())
}

fn cutoffs(model: &Model, top: usize) -> Result<()> {
    let baseline = EngineState::simulate_purge(&model.adj, &[]);
    let reachable: Vec<MethodId> = (1..model.adj.n_methods())
        .map(|i| MethodId(i as u32))
        .filter(|&m| baseline.is_reached(m))
        .collect();

    // One from-scratch run per method; the model is shared, each worker
    // owns its state.
    let mut cuts: Vec<(MethodId, usize)> = reachable
        .par_iter()
        .map(|&m| {
            let after = EngineState::simulate_purge(&model.adj, &[m]);
            let cut = (0..model.adj.n_methods())
                .filter(|&i| {
                    let mid = MethodId(i as u32);
                    baseline.is_reached(mid) && !after.is_reached(mid)
                })
                .count();
            (m, cut)
        })
        .collect();

    cuts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (m, cut) in cuts.into_iter().take(top) {
        println!("{cut:8} {}", model.method_name(m));
    }
    Ok(())
}

fn bench(model: &Model, iterations: u32) -> Result<()> {
    let start = Instant::now();
    let mut reachable = 0usize;
    for _ in 0..iterations {
        reachable = EngineState::simulate_purge(&model.adj, &[]).reachable_count();
    }
    let elapsed = start.elapsed();
    println!(
        "{} runs, {:.6} s/run, {reachable} methods reachable",
        iterations,
        elapsed.as_secs_f64() / f64::from(iterations.max(1))
    );
    Ok(())
}

#[cfg(test)]
#[path = "../tests/driver.rs"]
mod tests;
