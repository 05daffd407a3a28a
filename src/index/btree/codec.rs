//! Node codec - one [`TreeNode`] to one page's worth of bytes and back.
//!
//! # Layout (little-endian)
//! ```text
//! Offset  Size        Field
//! ------  ----        -----
//! 0       4           page_id (u32)
//! 4       1           is_leaf (1 = leaf, 0 = internal)
//! 5       2           entry_count (u16)
//! 7       4           next (u32)
//! 11      4           parent (u32)
//! 15      ...         entries, ascending by key:
//!                       key_len (u16) + key bytes
//!                       str_len (u16) + string bytes
//!                       bool (1)
//!                       float (f32, 4)
//!                       int (i64, 8)
//! ...     4 × n       children (u32): n = 0 for a leaf,
//!                                     entry_count + 1 for an internal node
//! ```
//!
//! Bytes past the encoded length are whatever the page held before
//! (zeros, for a freshly allocated page).

use crate::codec::binary::{self, FixedWidth};
use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::Page;

use super::node::{Entry, TreeNode};
use super::value::Value;

/// Serializes tree nodes using the [`binary`] codec for every field.
///
/// # Example
/// ```
/// use pagetree::index::btree::{NodeCodec, TreeNode};
/// use pagetree::PageId;
///
/// let codec = NodeCodec::new();
/// let node = TreeNode::new_leaf(PageId::new(1));
/// let bytes = codec.encode(&node).unwrap();
/// assert_eq!(bytes.len(), 15);
/// assert_eq!(codec.decode(&bytes).unwrap(), node);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeCodec;

impl NodeCodec {
    pub fn new() -> Self {
        NodeCodec
    }

    /// Encode a node to its exact byte representation.
    ///
    /// # Errors
    /// Returns `Error::Serialization` if the node's children do not match
    /// its shape (a leaf with children, an internal node without exactly
    /// `entries + 1` children), a count or length does not fit its u16
    /// field, or the result is larger than [`PAGE_SIZE`].
    pub fn encode(&self, node: &TreeNode) -> Result<Vec<u8>> {
        let expected_children = if node.is_leaf() { 0 } else { node.len() + 1 };
        if node.children().len() != expected_children {
            return Err(Error::Serialization(format!(
                "{} ({}) has {} entries and {} children",
                node.page_id(),
                if node.is_leaf() { "leaf" } else { "internal" },
                node.len(),
                node.children().len()
            )));
        }
        let entry_count = u16::try_from(node.len()).map_err(|_| {
            Error::Serialization(format!("{} has too many entries", node.page_id()))
        })?;

        let mut buf = Vec::with_capacity(PAGE_SIZE);
        binary::encode_into(node.page_id().0, &mut buf);
        binary::encode_into(u8::from(node.is_leaf()), &mut buf);
        binary::encode_into(entry_count, &mut buf);
        binary::encode_into(node.next().0, &mut buf);
        binary::encode_into(node.parent().0, &mut buf);

        for entry in node.entries() {
            write_prefixed_str(&entry.key, &mut buf)?;

            let value = &entry.value;
            write_prefixed_str(value.string_value(), &mut buf)?;
            binary::encode_into(u8::from(value.bool_value()), &mut buf);
            binary::encode_into(value.float_value(), &mut buf);
            binary::encode_into(value.int_value(), &mut buf);
        }

        for child in node.children() {
            binary::encode_into(child.0, &mut buf);
        }

        if buf.len() > PAGE_SIZE {
            return Err(Error::Serialization(format!(
                "{} encodes to {} bytes, exceeding the {}-byte page",
                node.page_id(),
                buf.len(),
                PAGE_SIZE
            )));
        }
        Ok(buf)
    }

    /// Encode a node into a zero-padded page.
    pub fn encode_page(&self, node: &TreeNode) -> Result<Page> {
        Page::from_bytes(&self.encode(node)?)
    }

    /// Decode a node from the front of `bytes`.
    ///
    /// Trailing bytes past the encoded node are ignored, so a whole page can
    /// be passed in.
    ///
    /// # Errors
    /// Returns `Error::Deserialization` if any field would run past the end
    /// of the buffer, the leaf flag or a bool byte is missing or not 0/1, or
    /// a string is not valid UTF-8.
    pub fn decode(&self, bytes: &[u8]) -> Result<TreeNode> {
        let mut reader = Reader::new(bytes);

        let page_id = PageId::new(reader.read::<u32>("page id")?);
        let is_leaf = reader.read_flag("leaf flag")?;
        let entry_count = reader.read::<u16>("entry count")? as usize;
        let next = PageId::new(reader.read::<u32>("next pointer")?);
        let parent = PageId::new(reader.read::<u32>("parent pointer")?);

        let mut entries = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let key = reader.read_prefixed_str("key")?;
            let string_value = reader.read_prefixed_str("string value")?;
            let bool_value = reader.read_flag("bool value")?;
            let float_value = reader.read::<f32>("float value")?;
            let int_value = reader.read::<i64>("int value")?;
            entries.push(Entry::new(
                key,
                Value::new(string_value, bool_value, float_value, int_value),
            ));
        }

        let child_count = if is_leaf { 0 } else { entry_count + 1 };
        let mut children = Vec::with_capacity(child_count);
        for _ in 0..child_count {
            children.push(PageId::new(reader.read::<u32>("child pointer")?));
        }

        Ok(TreeNode::from_parts(
            page_id, is_leaf, entries, children, parent, next,
        ))
    }
}

fn write_prefixed_str(value: &str, buf: &mut Vec<u8>) -> Result<()> {
    let len = u16::try_from(value.len()).map_err(|_| {
        Error::Serialization(format!(
            "string of {} bytes exceeds the u16 length prefix",
            value.len()
        ))
    })?;
    binary::encode_into(len, buf);
    buf.extend_from_slice(&binary::encode_str(value));
    Ok(())
}

/// Bounds-checked cursor over an encoded node.
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// A one-byte boolean that must be exactly 0 or 1.
    fn read_flag(&mut self, field: &str) -> Result<bool> {
        let offset = self.offset;
        match self.read::<u8>(field)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::Deserialization(format!(
                "invalid {} {} at offset {}",
                field, other, offset
            ))),
        }
    }

    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                Error::Deserialization(format!(
                    "{} needs {} bytes at offset {}, buffer has {}",
                    field,
                    len,
                    self.offset,
                    self.bytes.len()
                ))
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn read<T: FixedWidth>(&mut self, field: &str) -> Result<T> {
        let raw = self.take(T::WIDTH, field)?;
        binary::decode(raw)
    }

    fn read_prefixed_str(&mut self, field: &str) -> Result<String> {
        let len = self.read::<u16>(field)? as usize;
        let raw = self.take(len, field)?;
        binary::decode_str(raw)
    }
}
