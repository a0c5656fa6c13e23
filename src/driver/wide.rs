//! Null-terminated UTF-16 text as exchanged with the driver.

/// A single UTF-16 code unit (`wchar_t` on the driver's platform).
pub type WideChar = u16;

/// Encodes `text` as UTF-16 with a trailing null.
///
/// Interior nulls are passed through; the driver stops reading at the
/// first one.
pub fn encode_wide(text: &str) -> Vec<WideChar> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Decodes UTF-16 text up to the first null (or the end of `buf`).
pub fn decode_wide(buf: &[WideChar]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_appends_null() {
        let wide = encode_wide("GetCurrentCamera()");
        assert_eq!(wide.last(), Some(&0));
        assert_eq!(wide.len(), "GetCurrentCamera()".len() + 1);
    }

    #[test]
    fn test_decode_stops_at_null() {
        let mut buf = [0u16; 20];
        for (slot, c) in buf.iter_mut().zip("Orius".encode_utf16()) {
            *slot = c;
        }
        buf[10] = 'x' as u16;
        assert_eq!(decode_wide(&buf), "Orius");
    }

    #[test]
    fn test_decode_without_null() {
        let buf: Vec<u16> = "abc".encode_utf16().collect();
        assert_eq!(decode_wide(&buf), "abc");
    }
}
