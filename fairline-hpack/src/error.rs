use thiserror::Error;

/// Errors produced by the HPACK codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HpackError {
    /// Malformed input: a bad prefix integer, an invalid index, a Huffman
    /// error, an exhausted buffer, or a table-size update that breaks the
    /// block rules.
    #[error("compression error")]
    Compression,
    /// Cumulative decoded header size exceeded the caller's limit.
    #[error("header size exceeded")]
    SizeExceeded,
}
