//! Byte-level codecs.
//!
//! - [`binary`] - Fixed-width little-endian primitives, shared by the
//!   superblock and the node codec

pub mod binary;
