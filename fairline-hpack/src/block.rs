//! Block-level HPACK drivers (RFC 7541 Section 6).
//!
//! [`Decoder::decode`] walks one header block, dispatching on each field's
//! representation and resolving indices through the connection's
//! [`IndexingTable`]. [`Encoder::encode`] is the dual: it picks a
//! representation per field, feeding the table so both peers converge on the
//! same dynamic state.

use tracing::trace;

use crate::error::HpackError;
use crate::integer::{decode_integer, encode_integer};
use crate::strings::{decode_string, encode_string};
use crate::table::IndexingTable;
use crate::{HeaderField, Match};

/// Field representations, classified from the first byte of a field. The
/// high nibble covers every bit pattern, so classification is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// `1xxxxxxx` -- indexed header field (Section 6.1).
    Indexed,
    /// `01xxxxxx` -- literal with incremental indexing (Section 6.2.1).
    IndexedLiteral,
    /// `0000xxxx` -- literal without indexing (Section 6.2.2).
    NoIndexLiteral,
    /// `0001xxxx` -- literal never indexed (Section 6.2.3).
    NeverIndexLiteral,
    /// `001xxxxx` -- dynamic table size update (Section 6.3).
    TableSizeUpdate,
}

impl Representation {
    pub fn classify(byte: u8) -> Self {
        if byte & 0x80 != 0 {
            Representation::Indexed
        } else if byte & 0x40 != 0 {
            Representation::IndexedLiteral
        } else if byte & 0x20 != 0 {
            Representation::TableSizeUpdate
        } else if byte & 0x10 != 0 {
            Representation::NeverIndexLiteral
        } else {
            Representation::NoIndexLiteral
        }
    }
}

/// Literal representations the encoder emits.
#[derive(Debug, Clone, Copy)]
enum LiteralKind {
    /// Incremental indexing: the peer remembers the field.
    Incremental,
    /// Never indexed: sensitive fields that must not enter any table.
    NeverIndex,
}

impl LiteralKind {
    fn prefix(self) -> u8 {
        match self {
            LiteralKind::Incremental => 6,
            LiteralKind::NeverIndex => 4,
        }
    }

    fn flags(self) -> u8 {
        match self {
            LiteralKind::Incremental => 0x40,
            LiteralKind::NeverIndex => 0x10,
        }
    }
}

/// Outcome of decoding one header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlock {
    /// Recovered fields, in wire order.
    pub fields: Vec<HeaderField>,
    /// Bytes of input consumed.
    pub consumed: usize,
    /// An uppercase ASCII letter appeared in a literal name. HTTP/2 requires
    /// lower-case names on the wire; the block is still fully decoded and
    /// the caller decides whether to treat this as a stream error.
    pub name_case_violation: bool,
}

/// HPACK block decoder; owns the decoding-context indexing table for one
/// connection.
pub struct Decoder {
    table: IndexingTable,
}

impl Decoder {
    pub fn new(max_table_size: usize) -> Self {
        Self {
            table: IndexingTable::new(max_table_size),
        }
    }

    pub fn table(&self) -> &IndexingTable {
        &self.table
    }

    /// Decode one header block.
    ///
    /// `max_header_size` bounds the cumulative `len(name) + len(value)` of
    /// emitted fields; `max_table_size` is the transport's ceiling on
    /// dynamic-table-size updates. On error the table keeps any mutations
    /// applied before the failure point and the caller discards partial
    /// output; a connection-level error follows per RFC 7541 Section 2.3.3.
    pub fn decode(
        &mut self,
        buf: &[u8],
        max_header_size: usize,
        max_table_size: u32,
    ) -> Result<DecodedBlock, HpackError> {
        let mut fields = Vec::new();
        let mut at = 0usize;
        let mut field_seen = false;
        let mut violation = false;
        let mut total_size = 0usize;

        while at < buf.len() {
            match Representation::classify(buf[at]) {
                Representation::Indexed => {
                    let (index, n) = decode_integer(&buf[at..], 7)?;
                    at += n;
                    let index = u32::try_from(index).map_err(|_| HpackError::Compression)?;
                    let field = self.table.get(index)?;
                    trace!(index, name = ?field.name, "decoded indexed field");
                    total_size += field.name.len() + field.value.len();
                    if total_size > max_header_size {
                        return Err(HpackError::SizeExceeded);
                    }
                    fields.push(field);
                    field_seen = true;
                }
                rep @ (Representation::IndexedLiteral
                | Representation::NoIndexLiteral
                | Representation::NeverIndexLiteral) => {
                    let prefix = if rep == Representation::IndexedLiteral { 6 } else { 4 };
                    let (index, n) = decode_integer(&buf[at..], prefix)?;
                    at += n;

                    let name = if index != 0 {
                        let index = u32::try_from(index).map_err(|_| HpackError::Compression)?;
                        self.table.get(index)?.name
                    } else {
                        let (name, n) = decode_string(&buf[at..])?;
                        at += n;
                        if name.iter().any(u8::is_ascii_uppercase) {
                            violation = true;
                        }
                        name
                    };

                    let (value, n) = decode_string(&buf[at..])?;
                    at += n;

                    let field = HeaderField { name, value };
                    trace!(name = ?field.name, ?rep, "decoded literal field");
                    if rep == Representation::IndexedLiteral {
                        self.table.insert(field.clone());
                    }
                    total_size += field.name.len() + field.value.len();
                    if total_size > max_header_size {
                        return Err(HpackError::SizeExceeded);
                    }
                    fields.push(field);
                    field_seen = true;
                }
                Representation::TableSizeUpdate => {
                    // Only allowed before the first field of a block.
                    if field_seen {
                        return Err(HpackError::Compression);
                    }
                    let (size, n) = decode_integer(&buf[at..], 5)?;
                    at += n;
                    if size > u64::from(max_table_size) {
                        return Err(HpackError::Compression);
                    }
                    trace!(size, "dynamic table size update");
                    self.table.update_maximum_size(size as usize);
                }
            }
        }

        Ok(DecodedBlock {
            fields,
            consumed: at,
            name_case_violation: violation,
        })
    }
}

/// HPACK block encoder; owns the encoding-context indexing table for one
/// connection.
pub struct Encoder {
    table: IndexingTable,
}

impl Encoder {
    pub fn new(max_table_size: usize) -> Self {
        Self {
            table: IndexingTable::with_reverse_index(max_table_size),
        }
    }

    pub fn table(&self) -> &IndexingTable {
        &self.table
    }

    /// Encode `fields` into `out`, in order. `table_size_update`, when set,
    /// resizes the dynamic table and emits the update ahead of the first
    /// field. Returns bytes written; a full buffer is a compression error.
    pub fn encode(
        &mut self,
        fields: &[HeaderField],
        out: &mut [u8],
        table_size_update: Option<u32>,
    ) -> Result<usize, HpackError> {
        let mut at = 0usize;

        if let Some(size) = table_size_update {
            self.table.update_maximum_size(size as usize);
            at += encode_integer(&mut out[at..], u64::from(size), 5, 0x20)?;
        }

        let mut scratch = Vec::new();
        for field in fields {
            // HTTP/2 requires lower-case names on the wire.
            scratch.clear();
            scratch.extend(field.name.iter().map(u8::to_ascii_lowercase));
            at += self.encode_field(&scratch, &field.value, &mut out[at..])?;
        }
        Ok(at)
    }

    fn encode_field(
        &mut self,
        name: &[u8],
        value: &[u8],
        out: &mut [u8],
    ) -> Result<usize, HpackError> {
        // Representation choice per RFC 7541 Section 7.1.3: authorization
        // and low-entropy cookie values must not enter either table.
        let never_index = name == b"authorization" || (name == b"cookie" && value.len() < 20);

        // The lookup happens before any insertion, so emitted indices match
        // the state the peer resolves them against.
        let result = self.table.lookup(name, value);
        trace!(name = ?name, matched = ?result.matched, index = result.index, "encoding field");

        match result.matched {
            Match::Exact => encode_integer(out, u64::from(result.index), 7, 0x80),
            Match::Name => {
                let kind = if never_index {
                    LiteralKind::NeverIndex
                } else {
                    self.table.insert(HeaderField::new(name, value));
                    LiteralKind::Incremental
                };
                let mut at =
                    encode_integer(out, u64::from(result.index), kind.prefix(), kind.flags())?;
                at += encode_string(&mut out[at..], value)?;
                Ok(at)
            }
            Match::None => {
                let kind = if never_index {
                    LiteralKind::NeverIndex
                } else {
                    self.table.insert(HeaderField::new(name, value));
                    LiteralKind::Incremental
                };
                if out.is_empty() {
                    return Err(HpackError::Compression);
                }
                out[0] = kind.flags();
                let mut at = 1;
                at += encode_string(&mut out[at..], name)?;
                at += encode_string(&mut out[at..], value)?;
                Ok(at)
            }
        }
    }
}
