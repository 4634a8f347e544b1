//! CLI Adapter
//!
//! Command-line interface for the moonshot scanner.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    execute, format_usd, load_app_config, surge_ranking, CliApp, Command, GlobalCmd, ScanCmd, ScannerContext,
    SurgeCmd,
};
