//! Nogan command-line tools.
//!
//! Provides the `nogan` binary for working with nogan snapshots:
//!
//! - `demo` writes a small root-to-slot scenario.
//! - `inspect` summarizes a snapshot, including its feedback loops.
//! - `inject` runs a pulse through a snapshot and prints the result.
//! - `save`, `restore` and `list` move snapshots in and out of a SQLite
//!   database.
//!
//! The database path defaults to `NOGAN_DB_PATH`, then `nogan.db`.
//! Results are printed to stdout as JSON; diagnostics go to stderr.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::json;

use nogan_core::{CellId, CellKind, Channel, Nogan, Pulse, Timing, WireColour, WireId, Wiring};
use nogan_engine::{Engine, PropagationConfig, PropagationError};
use nogan_storage::{SnapshotId, SnapshotStore, SqliteStore};

/// Nogan signal graph tools.
#[derive(Parser)]
#[command(name = "nogan", about = "Nogan signal graph tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Write the root-to-slot demo snapshot.
    Demo {
        /// Output file (default: stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Summarize a snapshot file.
    Inspect {
        /// Snapshot file.
        snapshot: PathBuf,
    },

    /// Run a pulse through a snapshot file.
    Inject {
        /// Snapshot file.
        snapshot: PathBuf,

        /// Inject at this cell.
        #[arg(long, conflicts_with = "wire", required_unless_present = "wire")]
        cell: Option<u32>,

        /// Fire this wire instead.
        #[arg(long)]
        wire: Option<u32>,

        /// Channel: red, green or blue.
        #[arg(short, long, default_value = "red", value_parser = parse_channel)]
        channel: Channel,

        /// Pulse as JSON, e.g. '{"type":"ping"}'.
        #[arg(short, long, default_value = r#"{"type":"raw"}"#, value_parser = parse_pulse)]
        pulse: Pulse,

        /// Plan only; leave the snapshot file untouched.
        #[arg(long)]
        dry_run: bool,

        /// Include the dispatch trace in the output.
        #[arg(long)]
        trace: bool,

        /// Write the result here instead of over the input file.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Store a snapshot file in the database.
    Save {
        /// Snapshot file.
        snapshot: PathBuf,

        /// Label to save under.
        #[arg(short, long)]
        label: String,

        /// Path to the snapshot database.
        #[arg(long)]
        db: Option<String>,
    },

    /// Write a stored snapshot to a file.
    Restore {
        /// Snapshot ID (default: newest with --label).
        #[arg(long, required_unless_present = "label")]
        id: Option<i64>,

        /// Restore the newest snapshot with this label.
        #[arg(short, long, conflicts_with = "id")]
        label: Option<String>,

        /// Output file (default: stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Path to the snapshot database.
        #[arg(long)]
        db: Option<String>,
    },

    /// List stored snapshots.
    List {
        /// Path to the snapshot database.
        #[arg(long)]
        db: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Demo { out } => run_demo(out.as_deref()),
        Commands::Inspect { snapshot } => run_inspect(&snapshot),
        Commands::Inject {
            snapshot,
            cell,
            wire,
            channel,
            pulse,
            dry_run,
            trace,
            out,
        } => {
            let target = match (cell, wire) {
                (_, Some(wire)) => Target::Wire(WireId(wire)),
                (Some(cell), None) => Target::Cell(CellId(cell)),
                (None, None) => {
                    eprintln!("Error: one of --cell or --wire is required");
                    process::exit(1);
                }
            };
            let options = InjectOptions {
                target,
                channel,
                pulse,
                dry_run,
                trace,
            };
            run_inject(&snapshot, options, out.as_deref())
        }
        Commands::Save {
            snapshot,
            label,
            db,
        } => run_save(&snapshot, &label, &db_path(db)),
        Commands::Restore { id, label, out, db } => {
            run_restore(id, label.as_deref(), out.as_deref(), &db_path(db))
        }
        Commands::List { db } => run_list(&db_path(db)),
    };
    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

fn db_path(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("NOGAN_DB_PATH").ok())
        .unwrap_or_else(|| "nogan.db".to_string())
}

fn parse_channel(s: &str) -> Result<Channel, String> {
    serde_json::from_value(json!(s.to_lowercase()))
        .map_err(|_| format!("invalid channel '{}', expected red/green/blue", s))
}

fn parse_pulse(s: &str) -> Result<Pulse, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid pulse '{}': {}", s, e))
}

/// Where an injected pulse enters the graph.
enum Target {
    Cell(CellId),
    Wire(WireId),
}

struct InjectOptions {
    target: Target,
    channel: Channel,
    pulse: Pulse,
    dry_run: bool,
    trace: bool,
}

fn print_json(value: &serde_json::Value) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e));
    println!("{}", json);
}

/// Reads and validates a snapshot file. Errors carry their exit code.
fn read_snapshot(path: &Path) -> Result<Nogan, i32> {
    let text = fs::read_to_string(path).map_err(|e| {
        eprintln!("Error: failed to read '{}': {}", path.display(), e);
        3
    })?;
    Nogan::from_json(&text).map_err(|e| {
        eprintln!("Error: '{}' is not a valid snapshot: {}", path.display(), e);
        1
    })
}

/// Writes a snapshot to `out`, or to stdout when `out` is `None`.
fn write_snapshot(nogan: &mut Nogan, out: Option<&Path>) -> Result<(), i32> {
    let json = nogan.to_json().map_err(|e| {
        eprintln!("Error: failed to serialize snapshot: {}", e);
        1
    })?;
    match out {
        Some(path) => fs::write(path, json).map_err(|e| {
            eprintln!("Error: failed to write '{}': {}", path.display(), e);
            3
        }),
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}

fn open_store(db_path: &str) -> Result<SqliteStore, i32> {
    SqliteStore::new(db_path).map_err(|e| {
        eprintln!("Error: failed to open database '{}': {}", db_path, e);
        3
    })
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

/// The root-to-slot scenario: a root-kind cell wired to a slot.
fn demo() -> Result<Nogan, nogan_core::NoganError> {
    let mut nogan = Nogan::new();
    let origin = nogan.create_cell(CellKind::Root, [0.0, 0.0], CellId::ROOT)?;
    let slot = nogan.create_cell(CellKind::Slot, [1.0, 0.0], CellId::ROOT)?;
    nogan.create_wire(WireColour::Any, Timing::Now, origin, slot)?;
    Ok(nogan)
}

/// Execute the demo subcommand.
///
/// Returns exit code: 0 = success, 1 = build error, 3 = I/O error.
fn run_demo(out: Option<&Path>) -> i32 {
    let mut nogan = match demo() {
        Ok(nogan) => nogan,
        Err(e) => {
            eprintln!("Error: failed to build demo: {}", e);
            return 1;
        }
    };
    match write_snapshot(&mut nogan, out) {
        Ok(()) => {
            tracing::info!(cells = nogan.cell_count(), wires = nogan.wire_count(), "wrote demo");
            0
        }
        Err(code) => code,
    }
}

/// Execute the inspect subcommand.
fn run_inspect(path: &Path) -> i32 {
    let nogan = match read_snapshot(path) {
        Ok(nogan) => nogan,
        Err(code) => return code,
    };

    let wiring = Wiring::new(&nogan);
    let cells: Vec<_> = nogan
        .cells()
        .map(|cell| {
            json!({
                "id": cell.id,
                "type": cell.kind,
                "parent": cell.parent,
                "fire": cell.fire,
            })
        })
        .collect();

    print_json(&json!({
        "nextCell": nogan.next_cell(),
        "nextWire": nogan.next_wire(),
        "cells": cells,
        "wires": nogan.wires().collect::<Vec<_>>(),
        "archivedCells": nogan.archived_cells().collect::<Vec<_>>(),
        "archivedWires": nogan.archived_wires().collect::<Vec<_>>(),
        "deletedCells": nogan.deleted_cells(),
        "deletedWires": nogan.deleted_wires(),
        "fired": nogan.fired(),
        "feedbackLoops": wiring.feedback_loops(),
    }));
    0
}

/// Execute the inject subcommand.
///
/// Returns exit code: 0 = success, 1 = propagation error, 3 = I/O error.
fn run_inject(path: &Path, options: InjectOptions, out: Option<&Path>) -> i32 {
    let mut nogan = match read_snapshot(path) {
        Ok(nogan) => nogan,
        Err(code) => return code,
    };

    let engine = Engine::new(PropagationConfig {
        trace_enabled: options.trace,
    });
    let planned = match options.target {
        Target::Cell(cell) => engine.plan(&nogan, cell, options.channel, options.pulse),
        Target::Wire(wire) => engine.plan_wire(&nogan, wire, options.channel, options.pulse),
    };
    let plan = match planned {
        Ok(plan) => plan,
        Err(e) => return report_propagation(e),
    };

    if options.dry_run {
        print_json(&json!({ "committed": false, "plan": plan }));
        return 0;
    }

    let commit = match plan.commit(&mut nogan) {
        Ok(commit) => commit,
        Err(e) => return report_propagation(e),
    };
    if let Err(code) = write_snapshot(&mut nogan, Some(out.unwrap_or(path))) {
        return code;
    }
    tracing::info!(
        operations = commit.operations.len(),
        evaluations = commit.stats.evaluations,
        "committed pulse"
    );
    print_json(&json!({ "committed": true, "plan": commit }));
    0
}

fn report_propagation(error: PropagationError) -> i32 {
    eprintln!("Propagation error: {}", error);
    1
}

/// Execute the save subcommand.
fn run_save(path: &Path, label: &str, db_path: &str) -> i32 {
    let mut nogan = match read_snapshot(path) {
        Ok(nogan) => nogan,
        Err(code) => return code,
    };
    let mut store = match open_store(db_path) {
        Ok(store) => store,
        Err(code) => return code,
    };
    let id = match store.save(label, &mut nogan) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error: failed to save snapshot: {}", e);
            return 3;
        }
    };
    let digest = nogan
        .cached_json()
        .map(nogan_storage::digest_hex)
        .unwrap_or_default();
    print_json(&json!({ "id": id, "label": label, "digest": digest }));
    0
}

/// Execute the restore subcommand.
fn run_restore(id: Option<i64>, label: Option<&str>, out: Option<&Path>, db_path: &str) -> i32 {
    let store = match open_store(db_path) {
        Ok(store) => store,
        Err(code) => return code,
    };

    let id = match (id, label) {
        (Some(id), _) => SnapshotId(id),
        (None, Some(label)) => match store.latest(label) {
            Ok(Some(id)) => id,
            Ok(None) => {
                eprintln!("Error: no snapshot labelled '{}'", label);
                return 1;
            }
            Err(e) => {
                eprintln!("Error: failed to query snapshots: {}", e);
                return 3;
            }
        },
        (None, None) => {
            eprintln!("Error: one of --id or --label is required");
            return 1;
        }
    };

    let mut nogan = match store.load(id) {
        Ok(nogan) => nogan,
        Err(e) => {
            eprintln!("Error: failed to load snapshot {}: {}", id, e);
            return 3;
        }
    };
    match write_snapshot(&mut nogan, out) {
        Ok(()) => 0,
        Err(code) => code,
    }
}

/// Execute the list subcommand.
fn run_list(db_path: &str) -> i32 {
    let store = match open_store(db_path) {
        Ok(store) => store,
        Err(code) => return code,
    };
    match store.list() {
        Ok(list) => {
            print_json(&json!(list));
            0
        }
        Err(e) => {
            eprintln!("Error: failed to list snapshots: {}", e);
            3
        }
    }
}
