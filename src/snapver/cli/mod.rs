//! # CLI Behavior
//!
//! One possible UI client for snapver. The CLI is the only place that knows
//! about terminal I/O, exit codes and output formatting.
//!
//! ## Naming a document
//!
//! Every per-document command takes `<file>`: a base name (`doc`), the
//! working document (`doc.txt`) or any of its backups (`doc.bak.2`). All of
//! them resolve to the same group. Backups are looked up in `--dir`, else the
//! configured `backup-dir`, else the current directory.
//!
//! ## Versions
//!
//! `V1` is always the oldest backup. Listings show the newest first.
//! Versions are accepted as `V3`, `v3` or `3`.
//!
//! ## Module Structure
//!
//! - `commands`: per-command handlers that call the API and print
//! - `render`: tables, colors and messages
//! - `setup`: argument parsing via clap

mod commands;
mod render;
pub mod setup;

pub use commands::run;
