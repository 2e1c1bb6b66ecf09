//! # driftgraph
//!
//! Inspector for streams written by `driftgraph-core`: header summaries,
//! node listings and manifests against a built-in catalog.

pub mod catalog;
pub mod cli;
pub mod report;
