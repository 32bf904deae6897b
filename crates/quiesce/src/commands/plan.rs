use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use quiesce_core::QuiesceConfig;
use quiesce_core::sweep::{DependencyGraph, ExecutionPlan, SweepError};

/// Sweeper declaration file: one `[[sweeper]]` table per resource type.
#[derive(Debug, Deserialize)]
struct SweeperFile {
    #[serde(default, rename = "sweeper")]
    sweepers: Vec<SweeperDecl>,
}

#[derive(Debug, Deserialize)]
struct SweeperDecl {
    name: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PlanOutput<'a> {
    sweepers: usize,
    only: Option<&'a [String]>,
    waves: &'a [Vec<String>],
}

pub(crate) fn handle_plan_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = matches.get_one::<String>("graph") else {
        return Err("Sweeper declaration file is required".into());
    };
    let json_output = matches.get_flag("json");

    info!(event = "cli.plan_started", path = path.as_str());

    let graph = match load_graph(Path::new(path)) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("❌ Failed to read sweeper declarations: {}", e);
            error!(event = "cli.plan_failed", path = path.as_str(), error = %e);
            return Err(e);
        }
    };

    let only: Option<Vec<String>> = match matches.get_many::<String>("only") {
        Some(names) => Some(names.cloned().collect()),
        None => QuiesceConfig::load_hierarchy()?.sweep.run,
    };

    let plan = match ExecutionPlan::build_filtered(&graph, only.as_deref()) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("❌ Cannot plan sweep: {}", e);
            error!(event = "cli.plan_failed", path = path.as_str(), error = %e);
            return Err(e.into());
        }
    };

    let sweepers = plan.sweepers().count();
    if json_output {
        let output = PlanOutput {
            sweepers,
            only: only.as_deref(),
            waves: plan.waves(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if plan.is_empty() {
        println!("No sweepers declared.");
    } else {
        println!("Sweep plan: {} sweeper(s) in {} wave(s)", sweepers, plan.len());
        for (index, wave) in plan.waves().iter().enumerate() {
            println!("  Wave {}: {}", index + 1, wave.join(", "));
        }
    }

    info!(
        event = "cli.plan_completed",
        sweepers = sweepers,
        waves = plan.len()
    );
    Ok(())
}

/// Read a declaration file into a dependency graph, rejecting repeated names.
fn load_graph(path: &Path) -> Result<DependencyGraph, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    parse_graph(&content).map_err(|e| format!("'{}': {}", path.display(), e).into())
}

fn parse_graph(content: &str) -> Result<DependencyGraph, Box<dyn std::error::Error>> {
    let file: SweeperFile = toml::from_str(content)?;
    let mut graph = DependencyGraph::new();
    for decl in file.sweepers {
        if graph.contains_key(&decl.name) {
            return Err(SweepError::DuplicateSweeper { name: decl.name }.into());
        }
        let dependencies: BTreeSet<String> = decl.dependencies.into_iter().collect();
        graph.insert(decl.name, dependencies);
    }
    Ok(graph)
}
