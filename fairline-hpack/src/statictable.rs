//! HPACK static table (RFC 7541 Appendix A).
//!
//! Name lookup dispatches on the name length and a single distinguishing
//! byte before a prefix compare, so a miss costs a couple of comparisons and
//! a hit costs one `memcmp`. Only `:method`, `:path`, `:scheme` and
//! `:status` catalogue more than one value; every other name checks its
//! single catalogued value inline.

use crate::{IndexKind, LookupResult, Match};

/// Number of entries in the static table.
pub const STATIC_TABLE_ENTRIES: u32 = 61;

/// The catalogue, with a dummy row 0 so the table index is the array index.
const TABLE: [(&[u8], &[u8]); 62] = [
    (b"", b""),
    (b":authority", b""),                    // 1
    (b":method", b"GET"),                    // 2
    (b":method", b"POST"),                   // 3
    (b":path", b"/"),                        // 4
    (b":path", b"/index.html"),              // 5
    (b":scheme", b"http"),                   // 6
    (b":scheme", b"https"),                  // 7
    (b":status", b"200"),                    // 8
    (b":status", b"204"),                    // 9
    (b":status", b"206"),                    // 10
    (b":status", b"304"),                    // 11
    (b":status", b"400"),                    // 12
    (b":status", b"404"),                    // 13
    (b":status", b"500"),                    // 14
    (b"accept-charset", b""),                // 15
    (b"accept-encoding", b"gzip, deflate"),  // 16
    (b"accept-language", b""),               // 17
    (b"accept-ranges", b""),                 // 18
    (b"accept", b""),                        // 19
    (b"access-control-allow-origin", b""),   // 20
    (b"age", b""),                           // 21
    (b"allow", b""),                         // 22
    (b"authorization", b""),                 // 23
    (b"cache-control", b""),                 // 24
    (b"content-disposition", b""),           // 25
    (b"content-encoding", b""),              // 26
    (b"content-language", b""),              // 27
    (b"content-length", b""),                // 28
    (b"content-location", b""),              // 29
    (b"content-range", b""),                 // 30
    (b"content-type", b""),                  // 31
    (b"cookie", b""),                        // 32
    (b"date", b""),                          // 33
    (b"etag", b""),                          // 34
    (b"expect", b""),                        // 35
    (b"expires", b""),                       // 36
    (b"from", b""),                          // 37
    (b"host", b""),                          // 38
    (b"if-match", b""),                      // 39
    (b"if-modified-since", b""),             // 40
    (b"if-none-match", b""),                 // 41
    (b"if-range", b""),                      // 42
    (b"if-unmodified-since", b""),           // 43
    (b"last-modified", b""),                 // 44
    (b"link", b""),                          // 45
    (b"location", b""),                      // 46
    (b"max-forwards", b""),                  // 47
    (b"proxy-authenticate", b""),            // 48
    (b"proxy-authorization", b""),           // 49
    (b"range", b""),                         // 50
    (b"referer", b""),                       // 51
    (b"refresh", b""),                       // 52
    (b"retry-after", b""),                   // 53
    (b"server", b""),                        // 54
    (b"set-cookie", b""),                    // 55
    (b"strict-transport-security", b""),     // 56
    (b"transfer-encoding", b""),             // 57
    (b"user-agent", b""),                    // 58
    (b"vary", b""),                          // 59
    (b"via", b""),                           // 60
    (b"www-authenticate", b""),              // 61
];

const METHOD_GET: u32 = 2;
const METHOD_POST: u32 = 3;
const PATH_ROOT: u32 = 4;
const PATH_INDEX: u32 = 5;
const SCHEME_HTTP: u32 = 6;
const SCHEME_HTTPS: u32 = 7;
const STATUS_200: u32 = 8;
const STATUS_500: u32 = 14;

/// Fetch an entry by table index (`1..=61`).
pub(crate) fn get(index: u32) -> Option<(&'static [u8], &'static [u8])> {
    if index == 0 || index > STATIC_TABLE_ENTRIES {
        return None;
    }
    Some(TABLE[index as usize])
}

/// Look `(name, value)` up in the static table. Expects lower-case names.
pub(crate) fn lookup(name: &[u8], value: &[u8]) -> LookupResult {
    let index = lookup_name(name);
    if index == 0 {
        return LookupResult::none();
    }

    let exact = match index {
        METHOD_GET => scan_values(METHOD_GET, METHOD_POST, value),
        PATH_ROOT => scan_values(PATH_ROOT, PATH_INDEX, value),
        SCHEME_HTTP => scan_values(SCHEME_HTTP, SCHEME_HTTPS, value),
        STATUS_200 => scan_values(STATUS_200, STATUS_500, value),
        _ => (TABLE[index as usize].1 == value).then_some(index),
    };

    match exact {
        Some(index) => LookupResult {
            index,
            kind: IndexKind::Static,
            matched: Match::Exact,
        },
        None => LookupResult {
            index,
            kind: IndexKind::Static,
            matched: Match::Name,
        },
    }
}

fn scan_values(first: u32, last: u32, value: &[u8]) -> Option<u32> {
    (first..=last).find(|&i| TABLE[i as usize].1 == value)
}

/// Index of the first entry whose name matches, or 0.
///
/// The dispatch scheme follows nghttp2: bucket by length, branch on the last
/// byte, then compare the remaining prefix.
fn lookup_name(name: &[u8]) -> u32 {
    match name.len() {
        3 => match name[2] {
            b'a' if name.starts_with(b"vi") => 60,            // via
            b'e' if name.starts_with(b"ag") => 21,            // age
            _ => 0,
        },
        4 => match name[3] {
            b'e' if name.starts_with(b"dat") => 33,           // date
            b'g' if name.starts_with(b"eta") => 34,           // etag
            b'k' if name.starts_with(b"lin") => 45,           // link
            b'm' if name.starts_with(b"fro") => 37,           // from
            b't' if name.starts_with(b"hos") => 38,           // host
            b'y' if name.starts_with(b"var") => 59,           // vary
            _ => 0,
        },
        5 => match name[4] {
            b'e' if name.starts_with(b"rang") => 50,          // range
            b'h' if name.starts_with(b":pat") => PATH_ROOT,   // :path
            b'w' if name.starts_with(b"allo") => 22,          // allow
            _ => 0,
        },
        6 => match name[5] {
            b'e' if name.starts_with(b"cooki") => 32,         // cookie
            b'r' if name.starts_with(b"serve") => 54,         // server
            b't' if name.starts_with(b"accep") => 19,         // accept
            b't' if name.starts_with(b"expec") => 35,         // expect
            _ => 0,
        },
        7 => match name[6] {
            b'd' if name.starts_with(b":metho") => METHOD_GET, // :method
            b'e' if name.starts_with(b":schem") => SCHEME_HTTP, // :scheme
            b'h' if name.starts_with(b"refres") => 52,        // refresh
            b'r' if name.starts_with(b"refere") => 51,        // referer
            b's' if name.starts_with(b":statu") => STATUS_200, // :status
            b's' if name.starts_with(b"expire") => 36,        // expires
            _ => 0,
        },
        8 => match name[7] {
            b'e' if name.starts_with(b"if-rang") => 42,       // if-range
            b'h' if name.starts_with(b"if-matc") => 39,       // if-match
            b'n' if name.starts_with(b"locatio") => 46,       // location
            _ => 0,
        },
        10 => match name[9] {
            b'e' if name.starts_with(b"set-cooki") => 55,     // set-cookie
            b't' if name.starts_with(b"user-agen") => 58,     // user-agent
            b'y' if name.starts_with(b":authorit") => 1,      // :authority
            _ => 0,
        },
        11 => match name[10] {
            b'r' if name.starts_with(b"retry-afte") => 53,    // retry-after
            _ => 0,
        },
        12 => match name[11] {
            b'e' if name.starts_with(b"content-typ") => 31,   // content-type
            b's' if name.starts_with(b"max-forward") => 47,   // max-forwards
            _ => 0,
        },
        13 => match name[12] {
            b'd' if name.starts_with(b"last-modifie") => 44,  // last-modified
            b'e' if name.starts_with(b"content-rang") => 30,  // content-range
            b'h' if name.starts_with(b"if-none-matc") => 41,  // if-none-match
            b'l' if name.starts_with(b"cache-contro") => 24,  // cache-control
            b'n' if name.starts_with(b"authorizatio") => 23,  // authorization
            b's' if name.starts_with(b"accept-range") => 18,  // accept-ranges
            _ => 0,
        },
        14 => match name[13] {
            b'h' if name.starts_with(b"content-lengt") => 28, // content-length
            b't' if name.starts_with(b"accept-charse") => 15, // accept-charset
            _ => 0,
        },
        15 => match name[14] {
            b'e' if name.starts_with(b"accept-languag") => 17, // accept-language
            b'g' if name.starts_with(b"accept-encodin") => 16, // accept-encoding
            _ => 0,
        },
        16 => match name[15] {
            b'e' if name.starts_with(b"content-languag") => 27, // content-language
            b'e' if name.starts_with(b"www-authenticat") => 61, // www-authenticate
            b'g' if name.starts_with(b"content-encodin") => 26, // content-encoding
            b'n' if name.starts_with(b"content-locatio") => 29, // content-location
            _ => 0,
        },
        17 => match name[16] {
            b'e' if name.starts_with(b"if-modified-sinc") => 40, // if-modified-since
            b'g' if name.starts_with(b"transfer-encodin") => 57, // transfer-encoding
            _ => 0,
        },
        18 => match name[17] {
            b'e' if name.starts_with(b"proxy-authenticat") => 48, // proxy-authenticate
            _ => 0,
        },
        19 => match name[18] {
            b'e' if name.starts_with(b"if-unmodified-sinc") => 43, // if-unmodified-since
            b'n' if name.starts_with(b"content-dispositio") => 25, // content-disposition
            b'n' if name.starts_with(b"proxy-authorizatio") => 49, // proxy-authorization
            _ => 0,
        },
        25 => match name[24] {
            b'y' if name.starts_with(b"strict-transport-securit") => 56,
            _ => 0,
        },
        27 => match name[26] {
            b'n' if name.starts_with(b"access-control-allow-origi") => 20,
            _ => 0,
        },
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_shape() {
        assert_eq!(TABLE.len() as u32, STATIC_TABLE_ENTRIES + 1);
        assert_eq!(get(1), Some((&b":authority"[..], &b""[..])));
        assert_eq!(get(61), Some((&b"www-authenticate"[..], &b""[..])));
        assert_eq!(get(0), None);
        assert_eq!(get(62), None);
    }

    #[test]
    fn every_entry_finds_its_own_name() {
        for (i, &(name, _)) in TABLE.iter().enumerate().skip(1) {
            let found = lookup_name(name);
            assert_ne!(found, 0, "name {:?} not found", name);
            // Multi-valued names resolve to their first entry.
            assert_eq!(TABLE[found as usize].0, name);
            assert!(found as usize <= i);
        }
    }

    #[test]
    fn exact_and_name_matches() {
        let r = lookup(b":method", b"GET");
        assert_eq!((r.index, r.matched), (2, Match::Exact));

        let r = lookup(b":method", b"PUT");
        assert_eq!((r.index, r.matched), (2, Match::Name));

        let r = lookup(b":status", b"404");
        assert_eq!((r.index, r.matched), (13, Match::Exact));

        let r = lookup(b":path", b"/index.html");
        assert_eq!((r.index, r.matched), (5, Match::Exact));

        let r = lookup(b"accept-encoding", b"gzip, deflate");
        assert_eq!((r.index, r.matched), (16, Match::Exact));

        let r = lookup(b"accept-encoding", b"br");
        assert_eq!((r.index, r.matched), (16, Match::Name));

        // Empty value entries match exactly on the empty value.
        let r = lookup(b":authority", b"");
        assert_eq!((r.index, r.matched), (1, Match::Exact));

        let r = lookup(b":authority", b"www.example.com");
        assert_eq!((r.index, r.matched), (1, Match::Name));
    }

    #[test]
    fn unknown_names_miss() {
        for name in [&b"x-custom"[..], b"custom-key", b"", b"a", b":authorityy"] {
            let r = lookup(name, b"whatever");
            assert_eq!(r.matched, Match::None);
            assert_eq!(r.index, 0);
        }
    }
}
