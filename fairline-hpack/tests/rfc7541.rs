//! RFC 7541 Appendix C vectors, byte-for-byte, plus cross-peer convergence
//! over multi-block sequences.

use fairline_hpack::{Decoder, Encoder, HeaderField, HpackError};

fn field(name: &str, value: &str) -> HeaderField {
    HeaderField::new(name.as_bytes(), value.as_bytes())
}

fn decode_all(decoder: &mut Decoder, buf: &[u8]) -> Vec<HeaderField> {
    let block = decoder.decode(buf, 16384, 4096).unwrap();
    assert_eq!(block.consumed, buf.len());
    assert!(!block.name_case_violation);
    block.fields
}

/// Build a raw (non-Huffman) string literal.
fn raw(data: &[u8]) -> Vec<u8> {
    assert!(data.len() < 127);
    let mut out = vec![data.len() as u8];
    out.extend_from_slice(data);
    out
}

// -- C.2: single representations --

#[test]
fn c2_1_literal_with_indexing() {
    let mut wire = vec![0x40];
    wire.extend(raw(b"custom-key"));
    wire.extend(raw(b"custom-header"));

    let mut decoder = Decoder::new(4096);
    let fields = decode_all(&mut decoder, &wire);
    assert_eq!(fields, vec![field("custom-key", "custom-header")]);
    assert_eq!(decoder.table().size(), 55);
    assert_eq!(decoder.table().dynamic_len(), 1);
}

#[test]
fn c2_2_literal_without_indexing() {
    let mut wire = vec![0x04];
    wire.extend(raw(b"/sample/path"));

    let mut decoder = Decoder::new(4096);
    let fields = decode_all(&mut decoder, &wire);
    assert_eq!(fields, vec![field(":path", "/sample/path")]);
    assert_eq!(decoder.table().dynamic_len(), 0);
}

#[test]
fn c2_3_literal_never_indexed() {
    let mut wire = vec![0x10];
    wire.extend(raw(b"password"));
    wire.extend(raw(b"secret"));

    let mut decoder = Decoder::new(4096);
    let fields = decode_all(&mut decoder, &wire);
    assert_eq!(fields, vec![field("password", "secret")]);
    assert_eq!(decoder.table().dynamic_len(), 0);
}

#[test]
fn c2_4_indexed_field() {
    let mut decoder = Decoder::new(4096);
    let fields = decode_all(&mut decoder, &[0x82]);
    assert_eq!(fields, vec![field(":method", "GET")]);
}

// -- C.3: requests without Huffman coding (decoder side) --

#[test]
fn c3_request_sequence() {
    let mut decoder = Decoder::new(4096);

    // C.3.1
    let mut wire = vec![0x82, 0x86, 0x84, 0x41];
    wire.extend(raw(b"www.example.com"));
    let fields = decode_all(&mut decoder, &wire);
    assert_eq!(
        fields,
        vec![
            field(":method", "GET"),
            field(":scheme", "http"),
            field(":path", "/"),
            field(":authority", "www.example.com"),
        ]
    );
    assert_eq!(decoder.table().size(), 57);
    assert_eq!(decoder.table().dynamic_len(), 1);

    // C.3.2: the authority now comes from the dynamic table at 62.
    let mut wire = vec![0x82, 0x86, 0x84, 0xbe, 0x58];
    wire.extend(raw(b"no-cache"));
    let fields = decode_all(&mut decoder, &wire);
    assert_eq!(fields[3], field(":authority", "www.example.com"));
    assert_eq!(fields[4], field("cache-control", "no-cache"));
    assert_eq!(decoder.table().size(), 110);

    // C.3.3
    let mut wire = vec![0x82, 0x87, 0x85, 0xbf, 0x40];
    wire.extend(raw(b"custom-key"));
    wire.extend(raw(b"custom-value"));
    let fields = decode_all(&mut decoder, &wire);
    assert_eq!(
        fields,
        vec![
            field(":method", "GET"),
            field(":scheme", "https"),
            field(":path", "/index.html"),
            field(":authority", "www.example.com"),
            field("custom-key", "custom-value"),
        ]
    );
    assert_eq!(decoder.table().size(), 164);
    assert_eq!(decoder.table().dynamic_len(), 3);
}

// -- C.4: the same requests with Huffman coding, byte-exact encoder output --

#[test]
fn c4_request_sequence_encoder_is_byte_exact() {
    let mut encoder = Encoder::new(4096);
    let mut decoder = Decoder::new(4096);
    let mut buf = [0u8; 256];

    // C.4.1
    let request = vec![
        field(":method", "GET"),
        field(":scheme", "http"),
        field(":path", "/"),
        field(":authority", "www.example.com"),
    ];
    let written = encoder.encode(&request, &mut buf, None).unwrap();
    assert_eq!(
        &buf[..written],
        &[
            0x82, 0x86, 0x84, 0x41, 0x8c, 0xf1, 0xe3, 0xc2, 0xe5, 0xf2, 0x3a, 0x6b, 0xa0, 0xab,
            0x90, 0xf4, 0xff,
        ]
    );
    assert_eq!(encoder.table().size(), 57);
    assert_eq!(decode_all(&mut decoder, &buf[..written]), request);

    // C.4.2
    let request = vec![
        field(":method", "GET"),
        field(":scheme", "http"),
        field(":path", "/"),
        field(":authority", "www.example.com"),
        field("cache-control", "no-cache"),
    ];
    let written = encoder.encode(&request, &mut buf, None).unwrap();
    assert_eq!(
        &buf[..written],
        &[0x82, 0x86, 0x84, 0xbe, 0x58, 0x86, 0xa8, 0xeb, 0x10, 0x64, 0x9c, 0xbf]
    );
    assert_eq!(encoder.table().size(), 110);
    assert_eq!(decode_all(&mut decoder, &buf[..written]), request);

    // C.4.3
    let request = vec![
        field(":method", "GET"),
        field(":scheme", "https"),
        field(":path", "/index.html"),
        field(":authority", "www.example.com"),
        field("custom-key", "custom-value"),
    ];
    let written = encoder.encode(&request, &mut buf, None).unwrap();
    assert_eq!(
        &buf[..written],
        &[
            0x82, 0x87, 0x85, 0xbf, 0x40, 0x88, 0x25, 0xa8, 0x49, 0xe9, 0x5b, 0xa9, 0x7d, 0x7f,
            0x89, 0x25, 0xa8, 0x49, 0xe9, 0x5b, 0xb8, 0xe8, 0xb4, 0xbf,
        ]
    );
    assert_eq!(encoder.table().size(), 164);
    assert_eq!(encoder.table().dynamic_len(), 3);
    assert_eq!(decode_all(&mut decoder, &buf[..written]), request);

    // Both peers converge on the same dynamic state.
    assert_eq!(decoder.table().size(), 164);
    assert_eq!(decoder.table().dynamic_len(), 3);
}

// -- C.5: responses with a 256-byte table, exercising eviction --

#[test]
fn c5_response_sequence_evicts() {
    let mut decoder = Decoder::new(256);

    // C.5.1: four literals with indexing fill the table to 222 bytes.
    let mut wire = vec![0x48];
    wire.extend(raw(b"302"));
    wire.push(0x58);
    wire.extend(raw(b"private"));
    wire.push(0x61);
    wire.extend(raw(b"Mon, 21 Oct 2013 20:13:21 GMT"));
    wire.push(0x6e);
    wire.extend(raw(b"https://www.example.com"));

    let fields = decode_all(&mut decoder, &wire);
    assert_eq!(fields.len(), 4);
    assert_eq!(decoder.table().size(), 222);
    assert_eq!(decoder.table().dynamic_len(), 4);

    // C.5.2: ":status 307" evicts ":status 302"; the rest are dynamic refs.
    let mut wire = vec![0x48];
    wire.extend(raw(b"307"));
    wire.extend_from_slice(&[0xc1, 0xc0, 0xbf]);

    let fields = decode_all(&mut decoder, &wire);
    assert_eq!(
        fields,
        vec![
            field(":status", "307"),
            field("cache-control", "private"),
            field("date", "Mon, 21 Oct 2013 20:13:21 GMT"),
            field("location", "https://www.example.com"),
        ]
    );
    assert_eq!(decoder.table().size(), 222);
    assert_eq!(decoder.table().dynamic_len(), 4);

    // C.5.3: two more insertions evict down to three entries.
    let mut wire = vec![0x88, 0xc1, 0x61];
    wire.extend(raw(b"Mon, 21 Oct 2013 20:13:22 GMT"));
    wire.push(0xc0);
    wire.push(0x5a);
    wire.extend(raw(b"gzip"));
    wire.push(0x77);
    wire.extend(raw(b"foo=ASDJKHQKBZXOQWEOPIUAXQWEOIU; max-age=3600; version=1"));

    let fields = decode_all(&mut decoder, &wire);
    assert_eq!(
        fields,
        vec![
            field(":status", "200"),
            field("cache-control", "private"),
            field("date", "Mon, 21 Oct 2013 20:13:22 GMT"),
            field("location", "https://www.example.com"),
            field("content-encoding", "gzip"),
            field(
                "set-cookie",
                "foo=ASDJKHQKBZXOQWEOPIUAXQWEOIU; max-age=3600; version=1"
            ),
        ]
    );
    assert_eq!(decoder.table().size(), 215);
    assert_eq!(decoder.table().dynamic_len(), 3);
    // Newest to oldest: set-cookie, content-encoding, date.
    let table = decoder.table().dynamic();
    assert_eq!(table.get(1).unwrap().name, b"set-cookie");
    assert_eq!(table.get(2).unwrap().name, b"content-encoding");
    assert_eq!(table.get(3).unwrap().name, b"date");
}

// -- C.6: Huffman responses, encoder and decoder converging under eviction --

#[test]
fn c6_response_sequence_converges() {
    let mut encoder = Encoder::new(4096);
    let mut decoder = Decoder::new(4096);
    let mut buf = [0u8; 512];

    // Both peers agree to a 256-byte table up front.
    let responses = [
        vec![
            field(":status", "302"),
            field("cache-control", "private"),
            field("date", "Mon, 21 Oct 2013 20:13:21 GMT"),
            field("location", "https://www.example.com"),
        ],
        vec![
            field(":status", "307"),
            field("cache-control", "private"),
            field("date", "Mon, 21 Oct 2013 20:13:21 GMT"),
            field("location", "https://www.example.com"),
        ],
        vec![
            field(":status", "200"),
            field("cache-control", "private"),
            field("date", "Mon, 21 Oct 2013 20:13:22 GMT"),
            field("location", "https://www.example.com"),
            field("content-encoding", "gzip"),
            field(
                "set-cookie",
                "foo=ASDJKHQKBZXOQWEOPIUAXQWEOIU; max-age=3600; version=1",
            ),
        ],
    ];

    let mut table_size_update = Some(256);
    for response in &responses {
        let written = encoder.encode(response, &mut buf, table_size_update.take()).unwrap();
        let block = decoder.decode(&buf[..written], 16384, 4096).unwrap();
        assert_eq!(&block.fields, response);

        // Bit-identical table evolution on both sides.
        assert_eq!(decoder.table().size(), encoder.table().size());
        assert_eq!(decoder.table().dynamic_len(), encoder.table().dynamic_len());
        assert!(decoder.table().size() <= 256);
    }

    assert_eq!(decoder.table().dynamic_len(), 3);
    assert_eq!(decoder.table().size(), 215);
}

// -- Eviction down to a known two-entry state --

#[test]
fn eviction_leaves_status_and_cache_control() {
    let mut decoder = Decoder::new(256);

    // One big placeholder entry: 68 + 120 + 32 = 220 bytes.
    let name = format!("x-{}", "p".repeat(66));
    let value = "v".repeat(120);
    let mut wire = vec![0x40];
    wire.extend(raw(name.as_bytes()));
    wire.extend(raw(value.as_bytes()));
    decode_all(&mut decoder, &wire);
    assert_eq!(decoder.table().size(), 220);

    // cache-control: private (52 bytes) evicts the placeholder...
    let mut wire = vec![0x58];
    wire.extend(raw(b"private"));
    decode_all(&mut decoder, &wire);

    // ...and :status 307 (42 bytes) fits alongside it.
    let mut wire = vec![0x48];
    wire.extend(raw(b"307"));
    decode_all(&mut decoder, &wire);

    let table = decoder.table().dynamic();
    assert_eq!(table.len(), 2);
    assert_eq!(decoder.table().size(), 94);
    assert_eq!(
        (table.get(1).unwrap(), table.get(2).unwrap()),
        (&field(":status", "307"), &field("cache-control", "private"))
    );
}

// -- Round trips over a persistent connection --

#[test]
fn multi_block_round_trip() {
    let mut encoder = Encoder::new(4096);
    let mut decoder = Decoder::new(4096);
    let mut buf = [0u8; 1024];

    let blocks = [
        vec![
            field(":method", "GET"),
            field(":path", "/"),
            field(":scheme", "https"),
            field(":authority", "cdn.example.net"),
            field("accept", "*/*"),
            field("x-request-id", "9f1b"),
        ],
        vec![
            field(":method", "POST"),
            field(":path", "/upload"),
            field(":scheme", "https"),
            field(":authority", "cdn.example.net"),
            field("content-type", "application/json"),
            field("x-request-id", "9f1c"),
        ],
        vec![
            field(":method", "GET"),
            field(":path", "/"),
            field(":scheme", "https"),
            field(":authority", "cdn.example.net"),
            field("accept", "*/*"),
            field("x-request-id", "9f1b"),
        ],
    ];

    let mut sizes = Vec::new();
    for block in &blocks {
        let written = encoder.encode(block, &mut buf, None).unwrap();
        sizes.push(written);
        let decoded = decoder.decode(&buf[..written], 16384, 4096).unwrap();
        assert_eq!(&decoded.fields, block);
    }

    // The third block repeats the first; indexed representations shrink it.
    assert!(sizes[2] < sizes[0]);
}

#[test]
fn failed_block_reports_compression_error() {
    let mut decoder = Decoder::new(4096);
    // A valid literal followed by a truncated one.
    let mut wire = vec![0x40];
    wire.extend(raw(b"x-a"));
    wire.extend(raw(b"1"));
    wire.push(0x40);
    wire.push(0x7f); // name length promised, bytes missing

    assert_eq!(decoder.decode(&wire, 16384, 4096), Err(HpackError::Compression));
}
