//! Traditional hexdump rendering.
//!
//! ```text
//! 0x40000000: 74 61 67 21 00 00 00 00  40 01 00 00 02 00 01 00  |tag!....@.......|
//! ```

use std::fmt::Write;

/// Render `bytes` as hexdump rows labelled with addresses from `base`.
pub fn format_rows(base: u32, bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let mut line = format!("0x{:08X}: ", base.wrapping_add(i as u32 * 16));

            for j in 0..16 {
                if j == 8 {
                    line.push(' ');
                }
                match chunk.get(j) {
                    Some(byte) => {
                        let _ = write!(line, "{:02X} ", byte);
                    }
                    None => line.push_str("   "),
                }
            }

            line.push_str(" |");
            for byte in chunk {
                line.push(if (0x20..0x7F).contains(byte) {
                    *byte as char
                } else {
                    '.'
                });
            }
            for _ in chunk.len()..16 {
                line.push(' ');
            }
            line.push('|');
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_row() {
        let rows = format_rows(0x1000, b"Hello World\0\0\0\0\0");
        assert_eq!(
            rows,
            vec![
                "0x00001000: 48 65 6C 6C 6F 20 57 6F  72 6C 64 00 00 00 00 00  |Hello World.....|"
            ]
        );
    }

    #[test]
    fn test_partial_row_is_padded() {
        let rows = format_rows(0, &[0u8; 18]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), rows[1].len());
        assert!(rows[1].starts_with("0x00000010: 00 00    "));
        assert!(rows[1].ends_with("|..              |"));
    }
}
