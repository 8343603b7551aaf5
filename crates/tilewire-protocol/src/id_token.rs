//! Invite tokens: a 64-bit conversation id as 11 URL-safe characters.
//!
//! The id is written most significant bits first, six bits per character
//! from the URL-safe base64 alphabet (`A-Z`, `a-z`, `0-9`, `-`, `_`).
//! 64 bits is ten full characters plus four bits, so the 11th character
//! only ever uses values `0..16`. No padding is written, and the decoder
//! rejects an 11th character that would carry bits the id doesn't have.
//!
//! ```text
//! 0xcafecafecafecafe  ⇄  yv7K_sr-yvO
//! ```
//!
//! Invite links put the token at the end of a short URL
//! ([`encode_url`]); [`from_query`] also accepts it as the query string
//! of any page URL.

const BITS_PER_CHAR: u32 = 6;
const FULL_CHARS: u32 = u64::BITS / BITS_PER_CHAR;
const LAST_CHAR_BITS: u32 = u64::BITS % BITS_PER_CHAR;

/// Length of an encoded token.
pub const TOKEN_LEN: usize = (FULL_CHARS + 1) as usize;

/// Prefix of an invite link. The token follows directly.
pub const URL_PREFIX: &str = "https://gemelo.org/j/";

const URL_REST: &str = "://gemelo.org/j/";

const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

fn char_value(ch: u8) -> Option<u64> {
    let value = match ch {
        b'A'..=b'Z' => ch - b'A',
        b'a'..=b'z' => ch - b'a' + 26,
        b'0'..=b'9' => ch - b'0' + 52,
        b'-' => 62,
        b'_' => 63,
        _ => return None,
    };
    Some(u64::from(value))
}

/// Encodes an id as an 11-character token.
pub fn encode(id: u64) -> String {
    let mut out = String::with_capacity(TOKEN_LEN);
    let mut bits = id;
    for _ in 0..FULL_CHARS {
        let value = bits >> (u64::BITS - BITS_PER_CHAR);
        out.push(char::from(ALPHABET[value as usize]));
        bits <<= BITS_PER_CHAR;
    }
    let value = bits >> (u64::BITS - LAST_CHAR_BITS);
    out.push(char::from(ALPHABET[value as usize]));
    out
}

/// Decodes a token. Returns `None` if `token` isn't exactly one token.
pub fn decode(token: &str) -> Option<u64> {
    let bytes = token.as_bytes();
    if bytes.len() != TOKEN_LEN {
        return None;
    }

    let (last, full) = bytes.split_last()?;
    let mut id = 0u64;
    for &ch in full {
        id = (id << BITS_PER_CHAR) | char_value(ch)?;
    }

    let last = char_value(*last)?;
    if last >= 1 << LAST_CHAR_BITS {
        return None;
    }
    Some((id << LAST_CHAR_BITS) | last)
}

/// Builds the invite link for an id.
pub fn encode_url(id: u64) -> String {
    format!("{URL_PREFIX}{}", encode(id))
}

/// Extracts the id from an invite link.
///
/// Accepts `http` as well as `https`, and matches the scheme and host
/// case-insensitively. The token itself is case-sensitive.
pub fn decode_url(url: &str) -> Option<u64> {
    let rest = strip_prefix_ignore_case(url, "http")?;
    let rest = strip_prefix_ignore_case(rest, "s").unwrap_or(rest);
    let token = strip_prefix_ignore_case(rest, URL_REST)?;
    decode(token)
}

/// Extracts the id from a query string such as `?yv7K_sr-yvO`.
pub fn from_query(query: &str) -> Option<u64> {
    decode(query.strip_prefix('?').unwrap_or(query))
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}
