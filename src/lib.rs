//! Probes onion services through a SOCKS proxy and aggregates a privacy report
//! per target: leaked metadata, linked onions, embedded secrets, TLS
//! certificate details, service banners and relay directory information.

pub mod core;
pub mod error;
pub mod logging;

pub use crate::core::context::ScanContext;
pub use crate::core::models::{ScanReport, ScanResults};
pub use crate::core::scanner::Scanner;
