//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::domain::{ManualId, PolicyId, SectionId};

/// Numbered section hierarchies for policy manuals: create, move, reorder and delete sections
#[derive(Parser, Debug)]
#[command(name = "sectree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Store file (overrides config)
    #[arg(long, global = true, env = "SECTREE_STORE", value_hint = ValueHint::FilePath)]
    pub store: Option<PathBuf>,

    /// Actor recorded on changes (overrides config)
    #[arg(long, global = true)]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List sections of a manual by level and order
    List {
        manual: ManualId,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the section hierarchy of a manual as JSON
    Hierarchy {
        manual: ManualId,
        /// Print only ids and children (a reorder payload)
        #[arg(long)]
        payload: bool,
    },

    /// Show the section hierarchy of a manual as a tree
    Tree { manual: ManualId },

    /// Create a section as the last child of its parent
    Create {
        manual: ManualId,
        #[arg(short, long)]
        title: String,
        /// Parent section (default: root level)
        #[arg(short, long)]
        parent: Option<SectionId>,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Update title, description or collapsed state of a section
    Update {
        section: SectionId,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the description
        #[arg(long)]
        clear_description: bool,
        #[arg(long)]
        collapsed: Option<bool>,
    },

    /// Move a section (with its subsections) to a new parent and position
    Move {
        section: SectionId,
        /// New parent section (default: root level)
        #[arg(short, long)]
        parent: Option<SectionId>,
        /// Position among the new siblings, 0-based
        #[arg(short, long, default_value_t = 0)]
        index: u32,
    },

    /// Apply a full ordering from a JSON hierarchy payload
    Reorder {
        manual: ManualId,
        /// Payload file, `-` for stdin
        #[arg(value_hint = ValueHint::FilePath)]
        payload: PathBuf,
    },

    /// Close gaps in sibling order and recompute all numbers
    Renumber { manual: ManualId },

    /// Delete a section, its subsections and their policies
    Delete { section: SectionId },

    /// Manage policies
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },

    /// Check a manual for structural problems
    Verify { manual: ManualId },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommands {
    /// Add a policy to a section
    Add {
        section: SectionId,
        #[arg(short, long)]
        title: String,
    },

    /// Acknowledge the current version of a policy
    Ack { policy: PolicyId },

    /// Delete a policy and everything that references it
    Delete { policy: PolicyId },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,

    /// Print a config template
    Template,
}
