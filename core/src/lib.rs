//! sonobat-core - attack-surface knowledge graph engine
//!
//! This crate holds the graph-native store that represents hosts, services,
//! endpoints, inputs, and the observations and vulnerabilities discovered
//! about them, the tool-output ingestion pipeline that populates it, and the
//! Datalog engine autonomous agents use to query derived facts about the
//! attack surface.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod datalog;
pub mod error;
pub mod facts;
pub mod graph;
pub mod ingest;
pub mod monitoring;
pub mod query;
pub mod types;

pub use error::{ResourceBound, Result, SonobatError};
pub use facts::Fact;
pub use graph::{Edge, EdgeKind, GraphStore, Node, NodeKind};
pub use types::Value;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
