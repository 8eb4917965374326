//! Render command
//!
//! Usage: arbor render <TREE> [--update <TREE>]... [--config <FILE>] [--lane <LANE>] [--ops]
//!
//! Mounts a JSON tree description on an in-memory host, applies each update
//! in order, and prints one JSON line per step with the resulting markup and
//! the commits it produced.

use std::path::{Path, PathBuf};

use arbor_core::logging_facility::{init, Profile};
use arbor_core::{
    Child, CommitReport, Diagnostic, HostOp, Lanes, MemoryHost, Reconciler, ReconcilerConfig,
};
use clap::Args;
use serde::Serialize;

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// JSON tree description to mount
    pub tree: PathBuf,

    /// JSON tree descriptions rendered after the mount, in order
    #[arg(short, long = "update")]
    pub updates: Vec<PathBuf>,

    /// Reconciler configuration (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Lane every render is scheduled on
    #[arg(short, long, default_value = "sync")]
    pub lane: String,

    /// Include the host operation log of each step
    #[arg(long)]
    pub ops: bool,

    /// Emit reconciler logs on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct StepOutput {
    step: usize,
    source: String,
    markup: String,
    commits: Vec<CommitReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ops: Option<Vec<HostOp>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<Diagnostic>,
}

/// Execute render command
pub fn execute(args: RenderArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.verbose {
        init(Profile::Development);
    }

    let lane = Lanes::parse_name(&args.lane).ok_or_else(|| format!("unknown lane {:?}", args.lane))?;

    let config = match &args.config {
        Some(path) => ReconcilerConfig::from_path(path)?,
        None => ReconcilerConfig::default(),
    }
    .with_env_overrides()?;

    let mut reconciler = Reconciler::new(MemoryHost::new(), config)?;

    let sources = std::iter::once(&args.tree).chain(args.updates.iter());
    for (step, path) in sources.enumerate() {
        let description = load_description(path)?;
        let output = run_step(&mut reconciler, step, path, description, lane, args.ops);
        println!("{}", serde_json::to_string(&output)?);
    }

    Ok(())
}

fn load_description(path: &Path) -> Result<Child, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| format!("invalid JSON in {}: {}", path.display(), e))?;
    Ok(Child::from_json(&value))
}

fn run_step(
    reconciler: &mut Reconciler<MemoryHost>,
    step: usize,
    path: &Path,
    description: Child,
    lane: arbor_core::Lane,
    with_ops: bool,
) -> StepOutput {
    let commits_before = reconciler.commit_log().len();
    reconciler.host_mut().clear_ops();

    reconciler.render_with_lane(description, lane);
    reconciler.run_until_idle();

    StepOutput {
        step,
        source: path.display().to_string(),
        markup: reconciler.host().to_markup(),
        commits: reconciler.commit_log()[commits_before..].to_vec(),
        ops: with_ops.then(|| reconciler.host_mut().take_ops()),
        diagnostics: reconciler.diagnostics_mut().take(),
    }
}
