//! # Sidecar Sync
//!
//! Keeps a plain-text sidecar (`<source>.cabi.txt`) next to every document
//! of a watched directory tree, so downstream tools can read text without
//! parsing PDFs, Office files or images.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Sidecar Sync                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  MonitorAdapter ──┐                                             │
//! │                   ├──► EventQueue ──► Dispatcher ──► sidecars   │
//! │  scanner::scan ───┘        ▲              │                     │
//! │                            │              ▼                     │
//! │              stop() ───────┘      ConverterRegistry             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All events are handled one at a time, in arrival order, by a single
//! dispatcher thread. A slow converter delays everything queued behind it.
//! Rapid repeated edits are not debounced: each one reconverts, and a
//! conversion can observe a half-written source.

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod event;
pub mod monitor;
pub mod queue;
pub mod scanner;
pub mod sidecar;

pub use config::SyncConfig;
pub use dispatcher::{Dispatcher, Outcome};
pub use engine::SidecarSync;
pub use error::{Result, SyncError};
pub use event::Event;
pub use monitor::MonitorAdapter;
pub use queue::{EventQueue, EventReceiver};
pub use sidecar::{SIDECAR_SUFFIX, is_sidecar, sidecar_path};
