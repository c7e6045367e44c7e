use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the causq binary.
#[derive(Parser, Debug)]
#[command(
    name = "causq",
    version,
    about = "Reachability-under-purge queries over call-and-type-flow graphs"
)]
pub struct CliArgs {
    /// Directory with the model tables (types.txt, methods.txt, *.bin).
    #[arg(short = 'm', long = "model")]
    pub model: PathBuf,

    /// Skip redundancy pruning of the typeflow graph.
    #[arg(long = "no-optimize")]
    pub no_optimize: bool,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate deleting methods and list what else becomes unreachable.
    Purge {
        /// Methods to purge: exact name, trailing '*' prefix pattern, or a
        /// decimal id. Reads one method per line from stdin when empty.
        methods: Vec<String>,
    },

    /// List methods that are unreachable even without any purge.
    Missing,

    /// Explain how a method is reached, as from -> to witness edges.
    Hyperpath {
        /// The method to explain.
        method: String,
        /// Methods to purge before explaining, comma separated.
        #[arg(long, value_delimiter = ',')]
        purge: Vec<String>,
    },

    /// Walk a JSON purge tree incrementally and report each node's cut.
    Batch {
        /// JSON file: {"methods": [...], "children": [...]} or an array of
        /// such nodes.
        tree: PathBuf,
        /// Re-validate every node against a from-scratch run (slow).
        #[arg(long)]
        verify: bool,
    },

    /// Rank methods by how many others their removal would cut off.
    Cutoffs {
        /// How many methods to report.
        #[arg(long, default_value_t = 25)]
        top: usize,
    },

    /// Time repeated full reachability runs.
    Bench {
        #[arg(long, default_value_t = 20)]
        iterations: u32,
    },
}

#[cfg(test)]
#[path = "../tests/args.rs"]
mod tests;
