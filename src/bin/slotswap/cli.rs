use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Snapshot/restore slots over a scene file
#[derive(Parser, Debug)]
#[command(name = "slotswap", version, about = "SlotSwap CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Capture the default collection of an entity and print it
    Inspect {
        #[arg(long)]
        scene: PathBuf,
        /// Entity id (uid) inside the scene
        #[arg(long)]
        entity: String,
        /// Print the full JSON tree instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Run a swap script against an entity
    ///
    /// Script format (array of objects):
    /// [
    ///   {"op":"add-slot"},
    ///   {"op":"set","store_id":"geometry","key":"character","value":"Female 2"},
    ///   {"op":"add-slot"},
    ///   {"op":"advance"},
    ///   {"op":"select","slot":2},
    ///   {"op":"preserve","field":"hair","on":true},
    ///   {"op":"capture"},
    ///   {"op":"spawn","id":"Person#2"},
    ///   {"op":"dump"}
    /// ]
    Run {
        #[arg(long)]
        scene: PathBuf,
        #[arg(long)]
        entity: String,
        /// JSON file with operations
        #[arg(long)]
        script: PathBuf,
        /// Write the resulting scene here
        #[arg(long)]
        out: Option<PathBuf>,
    },
}
