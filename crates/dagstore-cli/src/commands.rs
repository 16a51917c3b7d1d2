//! Command handlers.
//!
//! Handlers write results to `out` and diagnostics to stderr, so the
//! output of list commands stays one key per line.

use std::io::Write;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::Value;

use dagstore_core::{Dag, DagConfig, GraphStore, TraversalOrder, VertexKey, VertexStream};

use crate::GraphCommand;

/// Runs one graph command against `dag`.
pub fn run<S, W>(dag: &Dag<S>, command: &GraphCommand, out: &mut W) -> anyhow::Result<()>
where
    S: GraphStore + 'static,
    W: Write,
{
    match command {
        GraphCommand::AddVertex { key, payload } => {
            cmd_add_vertex(dag, key.as_deref(), payload, out)
        }
        GraphCommand::GetVertex { key } => cmd_get_vertex(dag, key, out),
        GraphCommand::AddEdge { from, to } => {
            let id = dag.add_edge(&parse_key(from)?, &parse_key(to)?)?;
            writeln!(out, "{id}")?;
            Ok(())
        }
        GraphCommand::DeleteEdge { from, to } => {
            dag.delete_edge(&parse_key(from)?, &parse_key(to)?)?;
            Ok(())
        }
        GraphCommand::DeleteVertex { key } => {
            dag.delete_vertex(&parse_key(key)?)?;
            Ok(())
        }
        GraphCommand::IsEdge { from, to } => {
            let exists = dag.is_edge(&parse_key(from)?, &parse_key(to)?)?;
            writeln!(out, "{exists}")?;
            Ok(())
        }
        GraphCommand::Path { from, to } => cmd_path(dag, from, to, out),
        GraphCommand::Roots => drain("roots", dag.stream_roots()?, out),
        GraphCommand::Leaves => drain("leaves", dag.stream_leaves()?, out),
        GraphCommand::Ancestors { key, dfs } => {
            let key = parse_key(key)?;
            if *dfs {
                dag.walk_ancestors(&key, TraversalOrder::Dfs, |k| print_key(out, k))
            } else {
                drain("ancestors", dag.stream_ancestors(&key)?, out)
            }
        }
        GraphCommand::Descendants { key, dfs } => {
            let key = parse_key(key)?;
            if *dfs {
                dag.walk_descendants(&key, TraversalOrder::Dfs, |k| print_key(out, k))
            } else {
                drain("descendants", dag.stream_descendants(&key)?, out)
            }
        }
        GraphCommand::Stats => cmd_stats(dag, out),
        GraphCommand::Show => {
            write!(out, "{dag}")?;
            Ok(())
        }
    }
}

/// Prints the effective configuration as TOML.
pub fn print_config<W: Write>(config: &DagConfig, out: &mut W) -> anyhow::Result<()> {
    write!(out, "{}", config.to_toml()?)?;
    Ok(())
}

fn parse_key(raw: &str) -> anyhow::Result<VertexKey> {
    Ok(VertexKey::new(raw)?)
}

fn print_key<W: Write>(out: &mut W, key: &VertexKey) -> anyhow::Result<()> {
    writeln!(out, "{key}")?;
    Ok(())
}

fn cmd_add_vertex<S: GraphStore, W: Write>(
    dag: &Dag<S>,
    key: Option<&str>,
    payload: &str,
    out: &mut W,
) -> anyhow::Result<()> {
    let payload: Value = serde_json::from_str(payload).context("payload is not valid JSON")?;
    let key = match key {
        Some(key) => dag.add_vertex_with_key(parse_key(key)?, payload)?,
        None => dag.add_vertex(payload)?,
    };
    print_key(out, &key)
}

fn cmd_get_vertex<S: GraphStore, W: Write>(
    dag: &Dag<S>,
    key: &str,
    out: &mut W,
) -> anyhow::Result<()> {
    let vertex = dag.get_vertex(&parse_key(key)?)?;
    writeln!(out, "{}", serde_json::to_string_pretty(vertex.payload())?)?;
    Ok(())
}

fn cmd_path<S: GraphStore, W: Write>(
    dag: &Dag<S>,
    from: &str,
    to: &str,
    out: &mut W,
) -> anyhow::Result<()> {
    match dag.shortest_path(&parse_key(from)?, &parse_key(to)?)? {
        Some(path) => {
            let hops: Vec<&str> = path.iter().map(VertexKey::as_str).collect();
            writeln!(out, "{}", hops.join(" -> "))?;
        }
        None => eprintln!("{} no path from {from} to {to}", "note:".yellow()),
    }
    Ok(())
}

fn cmd_stats<S: GraphStore + 'static, W: Write>(dag: &Dag<S>, out: &mut W) -> anyhow::Result<()> {
    writeln!(out, "{}", "Graph".bold())?;
    writeln!(out, "  {} {}", "Vertices:".cyan(), dag.order()?)?;
    writeln!(out, "  {} {}", "Edges:".cyan(), dag.size()?)?;
    writeln!(out, "  {} {}", "Roots:".cyan(), dag.roots()?.len())?;
    writeln!(out, "  {} {}", "Leaves:".cyan(), dag.leaves()?.len())?;
    writeln!(out, "  {} {}", "Max depth:".cyan(), dag.max_depth())?;
    Ok(())
}

/// Prints every key the stream yields, then reports its errors.
///
/// Item failures don't stop the listing, but they do fail the command.
fn drain<W: Write>(what: &str, mut stream: VertexStream, out: &mut W) -> anyhow::Result<()> {
    for key in stream.by_ref() {
        print_key(out, &key)?;
    }
    let errors = stream.drain_errors();
    for err in &errors {
        eprintln!("{} {err}", "warning:".yellow());
    }
    if !errors.is_empty() {
        bail!("{} error(s) while listing {what}", errors.len());
    }
    Ok(())
}
