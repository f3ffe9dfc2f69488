//! HPACK header compression (RFC 7541) for the fairline proxy core.
//!
//! A connection owns one [`Encoder`] and one [`Decoder`]; each wraps an
//! [`IndexingTable`] that unifies the immutable 61-entry static table with a
//! bounded, insertion-ordered dynamic table. All operations are synchronous
//! and single-owner -- run them on the connection's worker.
//!
//! # Example
//!
//! ```rust
//! use fairline_hpack::{Decoder, Encoder, HeaderField};
//!
//! let mut encoder = Encoder::new(4096);
//! let mut decoder = Decoder::new(4096);
//!
//! let headers = vec![
//!     HeaderField::new(b":method", b"GET"),
//!     HeaderField::new(b":path", b"/"),
//!     HeaderField::new(b":authority", b"www.example.com"),
//! ];
//!
//! let mut wire = [0u8; 256];
//! let written = encoder.encode(&headers, &mut wire, None).unwrap();
//! let block = decoder.decode(&wire[..written], 16384, 4096).unwrap();
//! assert_eq!(block.fields, headers);
//! ```

pub mod block;
pub mod error;
mod huffman;
mod integer;
pub mod statictable;
mod strings;
pub mod table;

pub use block::{DecodedBlock, Decoder, Encoder, Representation};
pub use error::HpackError;
pub use table::{DynamicTable, IndexingTable};

/// A single header name/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

impl HeaderField {
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Dynamic table cost of this field (RFC 7541 Section 4.1):
    /// `len(name) + len(value) + 32`.
    pub(crate) fn size(&self) -> usize {
        self.name.len() + self.value.len() + 32
    }
}

/// How strongly a table lookup matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    None,
    Name,
    Exact,
}

/// Which index space a lookup result points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    None,
    Static,
    Dynamic,
}

/// Result of looking a header field up in an indexing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupResult {
    pub index: u32,
    pub kind: IndexKind,
    pub matched: Match,
}

impl LookupResult {
    pub(crate) fn none() -> Self {
        Self {
            index: 0,
            kind: IndexKind::None,
            matched: Match::None,
        }
    }
}
