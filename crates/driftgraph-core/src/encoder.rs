//! # Encoder
//!
//! Writes a `SerializationPlan`: header first, then the node stream in
//! plan order.

use crate::formats::{FormatterCache, write_header, write_node};
use crate::planner::SerializationPlan;
use crate::DriftError;
use std::io::Write;

/// Write a planned graph to `writer`.
pub fn encode(writer: &mut dyn Write, plan: &SerializationPlan) -> Result<(), DriftError> {
    write_header(writer, plan)?;
    let mut formatters = FormatterCache::new();
    for node in plan.nodes() {
        write_node(writer, node, &mut formatters)?;
    }
    tracing::trace!(
        nodes = plan.nodes().len(),
        formatters = formatters.len(),
        "node stream written"
    );
    Ok(())
}
