//! Value Codec Module
//!
//! Integer <-> byte conversion and content fingerprints shared by every adapter.
//!
//! Integers are stored as their decimal ASCII rendering, which keeps counters
//! readable by other clients of a remote engine.

// == Encode ==
/// Renders an integer as decimal ASCII bytes.
pub fn encode_int64(value: i64) -> Vec<u8> {
    value.to_string().into_bytes()
}

// == Decode ==
/// Parses bytes produced by [`encode_int64`].
///
/// Content after the first NUL byte is ignored. Returns `None` when the
/// remaining bytes are not a base-10 signed 64-bit integer.
pub fn decode_int64(bytes: &[u8]) -> Option<i64> {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end]).ok()?.parse().ok()
}

// == Fingerprint ==
/// Content-addressed token for a value: the lowercase hex MD5 digest.
///
/// Equal content always yields an equal token, so adapters that observe the
/// same stored bytes agree on the token.
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}
