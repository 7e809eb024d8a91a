//! # Graph Subcommand
//!
//! Prints the case and stage transition tables, in lifecycle order, as
//! text, JSON or YAML.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;

use concierge_state::{case_transition_table, stage_transition_table, LifecycleStatus};

/// Output format for the transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GraphFormat {
    /// One `STATUS -> NEXT, NEXT` line per status.
    #[default]
    Text,
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

/// Arguments for the `concierge graph` subcommand.
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = GraphFormat::Text)]
    pub format: GraphFormat,
}

/// One status and its outbound edges.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct GraphRow {
    pub status: &'static str,
    pub next: Vec<&'static str>,
    pub terminal: bool,
}

/// Both transition tables.
#[derive(Debug, Serialize)]
pub struct GraphDocument {
    pub case: Vec<GraphRow>,
    pub stage: Vec<GraphRow>,
}

fn rows<S: LifecycleStatus>(table: &[(S, &'static [S])]) -> Vec<GraphRow> {
    table
        .iter()
        .map(|(status, edges)| GraphRow {
            status: status.name(),
            next: edges.iter().map(|s| s.name()).collect(),
            terminal: edges.is_empty(),
        })
        .collect()
}

impl GraphDocument {
    /// Build the document from the constant tables.
    pub fn build() -> Self {
        Self {
            case: rows(case_transition_table()),
            stage: rows(stage_transition_table()),
        }
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        for (title, rows) in [("case", &self.case), ("stage", &self.stage)] {
            out.push_str(title);
            out.push_str(":\n");
            for row in rows {
                let next = if row.terminal {
                    "(terminal)".to_string()
                } else {
                    row.next.join(", ")
                };
                out.push_str(&format!("  {} -> {}\n", row.status, next));
            }
        }
        out
    }
}

/// Render the graph in the requested format.
pub fn render(format: GraphFormat) -> Result<String> {
    let doc = GraphDocument::build();
    match format {
        GraphFormat::Text => Ok(doc.to_text()),
        GraphFormat::Json => {
            serde_json::to_string_pretty(&doc).context("failed to serialize graph as JSON")
        }
        GraphFormat::Yaml => serde_yaml::to_string(&doc).context("failed to serialize graph as YAML"),
    }
}

/// Execute the graph subcommand.
pub fn run_graph(args: &GraphArgs) -> Result<u8> {
    let out = render(args.format)?;
    print!("{out}");
    if !out.ends_with('\n') {
        println!();
    }
    Ok(0)
}
