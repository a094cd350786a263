// Locker wire protocol
// Request byte, code framing and characteristic value decoding

use super::LockerError;

/// Written to the write characteristic to ask for a locker
pub const REQUEST_LOCKER: u8 = 0xA4;

/// Frame a human-entered code the way the locker firmware expects:
/// a leading space, the code, then CRLF.
pub fn frame_code(code: &str) -> Result<Vec<u8>, LockerError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(LockerError::InvalidCode);
    }
    Ok(format!(" {code}\r\n").into_bytes())
}

/// Characteristic bytes as trimmed text; invalid UTF-8 is dropped
pub fn decode_text(raw: &[u8]) -> String {
    raw.utf8_chunks()
        .map(|chunk| chunk.valid())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Available-count text as a number; `None` when the locker sent garbage
pub fn parse_available(raw: &[u8]) -> Option<i64> {
    decode_text(raw).parse().ok()
}
