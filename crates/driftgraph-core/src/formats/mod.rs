//! Binary format layer: stream header, node codec, primitive formatters.

pub mod formatter;
pub mod header;
pub mod wire;

pub use formatter::{Formatter, FormatterCache};
pub use header::{DeserializedHeader, Preamble, WireHeader, read_header, write_header};
pub use wire::{read_node, write_node};
