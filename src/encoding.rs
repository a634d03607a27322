// Response body normalization.
//
// Chargify has been seen sending Windows-1252 bytes in documents declared as UTF-8,
// so every body goes through `normalize_response` before it reaches the XML parser.
use std::borrow::Cow;

// Windows-1252 code points for bytes 0x80..=0x9F. Undefined slots map to the C1 control.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

// Strip line-break whitespace between tags and re-encode non-ASCII as character references
pub fn normalize_response(raw: &[u8]) -> String {
    let text = decode_body(raw);
    let joined: String = text.split('\n').map(str::trim).collect();
    to_char_refs(&joined).into_owned()
}

/// Decodes a body as UTF-8, falling back to Windows-1252 when the bytes are not valid UTF-8.
pub fn decode_body(raw: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(raw) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            tracing::warn!(
                len = raw.len(),
                "response body is not valid UTF-8, decoding as Windows-1252"
            );
            Cow::Owned(raw.iter().map(|&b| decode_cp1252_byte(b)).collect())
        }
    }
}

fn decode_cp1252_byte(byte: u8) -> char {
    match byte {
        0x80..=0x9F => CP1252_HIGH[(byte - 0x80) as usize],
        _ => char::from(byte),
    }
}

/// Replaces every non-ASCII character with a numeric XML character reference.
pub fn to_char_refs(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            out.push_str(&format!("&#{};", ch as u32));
        }
    }
    Cow::Owned(out)
}
