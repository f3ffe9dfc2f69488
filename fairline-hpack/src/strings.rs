//! String literals (RFC 7541 Section 5.2): `[H | length] payload`, where the
//! high bit of the first length byte selects Huffman coding.

use crate::error::HpackError;
use crate::huffman;
use crate::integer::{decode_integer, encode_integer};

const HUFFMAN_FLAG: u8 = 0x80;

/// Encode `data` as a string literal, Huffman-coded iff strictly shorter.
/// Returns bytes written.
pub(crate) fn encode_string(buf: &mut [u8], data: &[u8]) -> Result<usize, HpackError> {
    let coded_len = huffman::encoded_len(data);
    if coded_len < data.len() {
        let at = encode_integer(buf, coded_len as u64, 7, HUFFMAN_FLAG)?;
        let end = at + coded_len;
        if buf.len() < end {
            return Err(HpackError::Compression);
        }
        huffman::encode(data, &mut buf[at..end]);
        Ok(end)
    } else {
        let at = encode_integer(buf, data.len() as u64, 7, 0)?;
        let end = at + data.len();
        if buf.len() < end {
            return Err(HpackError::Compression);
        }
        buf[at..end].copy_from_slice(data);
        Ok(end)
    }
}

/// Decode a string literal. Returns the bytes and the wire length consumed.
pub(crate) fn decode_string(buf: &[u8]) -> Result<(Vec<u8>, usize), HpackError> {
    if buf.is_empty() {
        return Err(HpackError::Compression);
    }
    let coded = buf[0] & HUFFMAN_FLAG != 0;
    let (len, at) = decode_integer(buf, 7)?;
    let len = usize::try_from(len).map_err(|_| HpackError::Compression)?;
    let end = at.checked_add(len).ok_or(HpackError::Compression)?;
    if buf.len() < end {
        return Err(HpackError::Compression);
    }

    let payload = &buf[at..end];
    let data = if coded {
        let mut out = Vec::with_capacity(len * 2);
        huffman::decode(payload, &mut out)?;
        out
    } else {
        payload.to_vec()
    };
    Ok((data, end))
}
