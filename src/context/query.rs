// src/context/query.rs

//! Query-string parsing for `QS_` variables.
//!
//! The bridge hands us the raw query string of the request (websocketd puts
//! it in `QUERY_STRING`). Pairs are split on `&`, names and values are split
//! on the first `=`, and both are form-decoded (`+` → space, `%XX` → byte).

/// Parse a query string into ordered `(name, value)` pairs.
///
/// A leading `?` is ignored, empty segments are skipped, and a segment
/// without `=` yields an empty value.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);

    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| {
            let (name, value) = segment.split_once('=').unwrap_or((segment, ""));
            let name = form_decode(name);
            if name.is_empty() {
                return None;
            }
            Some((name, form_decode(value)))
        })
        .collect()
}

/// Decode one `application/x-www-form-urlencoded` component.
///
/// Malformed escapes are kept literally; invalid UTF-8 becomes U+FFFD.
pub fn form_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => match (hex_value(bytes.get(i + 1)), hex_value(bytes.get(i + 2))) {
                (Some(hi), Some(lo)) => {
                    out.push(hi << 4 | lo);
                    i += 3;
                }
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: Option<&u8>) -> Option<u8> {
    match byte? {
        b @ b'0'..=b'9' => Some(b - b'0'),
        b @ b'a'..=b'f' => Some(b - b'a' + 10),
        b @ b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
