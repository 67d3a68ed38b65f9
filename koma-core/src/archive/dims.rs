//! Header-only size probing. Pixel decoding belongs to the image layer.

const PNG_SIG: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

pub fn sniff_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    png(bytes).or_else(|| gif(bytes))
}

// signature, IHDR length + tag, then big-endian width and height
fn png(b: &[u8]) -> Option<(u32, u32)> {
    if b.len() < 24 || &b[..8] != PNG_SIG || &b[12..16] != b"IHDR" {
        return None;
    }
    let w = u32::from_be_bytes(b[16..20].try_into().ok()?);
    let h = u32::from_be_bytes(b[20..24].try_into().ok()?);
    Some((w, h))
}

fn gif(b: &[u8]) -> Option<(u32, u32)> {
    if b.len() < 10 || !(b.starts_with(b"GIF87a") || b.starts_with(b"GIF89a")) {
        return None;
    }
    let w = u16::from_le_bytes([b[6], b[7]]);
    let h = u16::from_le_bytes([b[8], b[9]]);
    Some((w as u32, h as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_header() {
        let mut b = PNG_SIG.to_vec();
        b.extend_from_slice(&13u32.to_be_bytes());
        b.extend_from_slice(b"IHDR");
        b.extend_from_slice(&800u32.to_be_bytes());
        b.extend_from_slice(&1200u32.to_be_bytes());
        assert_eq!(sniff_dimensions(&b), Some((800, 1200)));
    }

    #[test]
    fn gif_header() {
        let b = b"GIF89a\x40\x01\xf0\x00rest";
        assert_eq!(sniff_dimensions(b), Some((320, 240)));
    }

    #[test]
    fn unknown_or_truncated() {
        assert_eq!(sniff_dimensions(b"\xff\xd8\xff\xe0"), None);
        assert_eq!(sniff_dimensions(&PNG_SIG[..]), None);
    }
}
