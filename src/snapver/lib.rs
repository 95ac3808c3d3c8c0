//! # Snapver
//!
//! Snapver is a **UI-agnostic backup version registry**. Point it at a
//! directory of backup copies (`doc.bak`, `doc.bak.1`, `doc_old.bak`, ...) and
//! it orders them into versions, measures how much changed between
//! neighbours, and keeps an editable tag with an append-only audit history
//! for the whole lineage.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Facade over commands, group locks, scan membership       │
//! │  - Forwards warnings and errors to the log sink             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs) and core modules             │
//! │  - scanner, ranker, diff, metadata, merge                   │
//! │  - Return Rust types, never print                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - AttributeStore trait: xattr, sidecar files, in-memory    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lineage Guarantee
//!
//! Backup tools rename and duplicate files, and attributes do not always
//! survive that. Every member of a group therefore carries the full audit
//! trail, and [`merge::reconcile`] re-broadcasts the union of all trails
//! whenever the group is refreshed or edited. As long as one member keeps
//! its trail, no entry is lost.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`commands`]: Named commands returning `CmdResult`
//! - [`scanner`], [`ranker`], [`diff`]: the version table pipeline
//! - [`metadata`], [`merge`], [`audit`]: tags, audit trails and their encoding
//! - [`store`]: attribute storage backends
//! - [`session`], [`lock`]: background scans and group write locks
//! - [`events`]: the log sink interface
//! - [`config`], [`init`], [`logging`]: configuration and startup
//! - [`model`], [`error`]: core data types and errors

pub mod api;
pub mod audit;
pub mod commands;
pub mod config;
pub mod diff;
pub mod error;
pub mod events;
pub mod init;
pub mod lock;
pub mod logging;
pub mod merge;
pub mod metadata;
pub mod model;
pub mod ranker;
pub mod scanner;
pub mod session;
pub mod store;
