// src/core/mod.rs

/// Data structures shared across the crate: the per-target `ScanReport` and
/// every probe payload it is built from.
pub mod models;

/// Proxy address resolution and scan-wide knobs.
pub mod config;

pub mod socks;

/// The `Transport` capability and its SOCKS-proxied implementation.
pub mod transport;

/// Process-lifetime state: the lazily built transport and the descriptor cache.
pub mod context;

pub mod directory;
pub mod extractors;
pub mod html;
pub mod image_meta;

/// The individual probes and the orchestrator that merges them per target.
pub mod scanner;

/// Target list loading, multi-target runs and JSON output.
pub mod report;
