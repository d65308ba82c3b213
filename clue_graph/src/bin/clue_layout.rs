//! Lay out a clue-tree snapshot from the command line.
//!
//! ```text
//! clue-layout <tree.json> [--config editor.toml] [--collapse <clue-id>]...
//! ```
//!
//! Reads the body of `GET /scripts/{id}/clue-tree`, applies the collapses,
//! runs the layout engine and prints the placement as JSON on stdout.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use clue_graph::{
    compute_visibility, CollapsedSet, EditorConfig, GraphModel, LayoutEngine, LayoutInput, LayoutNode,
    LayoutSource, Position, VisibleFields,
};
use mystery_model::{ClueId, ClueTree, TreeIssues};

struct Args {
    tree: PathBuf,
    config: Option<PathBuf>,
    collapse: Vec<ClueId>,
}

#[derive(Serialize)]
struct Placement {
    positions: HashMap<ClueId, Position>,
    source: LayoutSource,
    hidden: usize,
    issues: TreeIssues,
}

fn parse_args() -> Result<Args> {
    let mut tree = None;
    let mut config = None;
    let mut collapse = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            "--collapse" => {
                let id = args.next().context("--collapse needs a clue id")?;
                collapse.push(id.parse().with_context(|| format!("Invalid clue id {:?}", id))?);
            }
            flag if flag.starts_with("--") => bail!("Unknown option {}", flag),
            _ if tree.is_none() => tree = Some(PathBuf::from(&arg)),
            _ => bail!("Unexpected argument {}", arg),
        }
    }

    let tree = tree.context("Usage: clue-layout <tree.json> [--config editor.toml] [--collapse <id>]...")?;
    Ok(Args {
        tree,
        config,
        collapse,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,clue_graph=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => EditorConfig::load(path).with_context(|| format!("Failed to load config {:?}", path))?,
        None => EditorConfig::default(),
    };

    let content = std::fs::read_to_string(&args.tree)
        .with_context(|| format!("Failed to read {:?}", args.tree))?;
    let tree: ClueTree =
        serde_json::from_str(&content).with_context(|| format!("Invalid clue tree in {:?}", args.tree))?;

    let graph = GraphModel::from_tree(tree);
    tracing::info!(clues = graph.len(), edges = graph.edge_count(), "Loaded clue tree");

    let collapsed: CollapsedSet = args.collapse.iter().copied().collect();
    for id in collapsed.iter().filter(|id| !graph.contains(*id)) {
        tracing::warn!(clue = %id, "Ignoring collapse of unknown clue");
    }

    let ids: Vec<ClueId> = graph.node_ids().collect();
    let edges: Vec<_> = graph.edges().collect();
    let visibility = compute_visibility(&ids, &edges, &collapsed);

    let engine = LayoutEngine::new(config.layout.clone());
    let (width, height) = config.layout.node_size(&VisibleFields::default());
    let input = LayoutInput {
        nodes: visibility
            .visible
            .iter()
            .map(|&id| LayoutNode { id, width, height })
            .collect(),
        edges: visibility.visible_edges(&edges),
        saved: HashMap::new(),
    };
    let outcome = engine.layout(&input);

    let placement = Placement {
        positions: outcome.positions,
        source: outcome.source,
        hidden: visibility.hidden.len(),
        issues: graph.issues().clone(),
    };
    println!("{}", serde_json::to_string_pretty(&placement)?);

    Ok(())
}
