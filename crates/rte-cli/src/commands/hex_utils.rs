//! Hex parsing and formatting for command arguments and output.

use anyhow::{Result, bail};

/// Parse a hex number (with or without 0x prefix).
pub fn parse_hex_address(s: &str) -> Result<u64> {
    let s = s.trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(s, 16).map_err(|e| anyhow::anyhow!("Invalid hex address: {}", e))
}

/// Format a 32-bit target address as `0x` plus eight hex digits.
pub fn format_hex_address(addr: u32) -> String {
    format!("0x{:08X}", addr)
}

/// Parse a byte string such as `00 00 80 3F`, `0000803F` or `0x0000803F`.
/// Bytes are taken in the order written.
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = s
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    if digits.is_empty() {
        bail!("Empty hex value");
    }
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        bail!("Invalid hex value: {}", s);
    }
    if digits.len() % 2 != 0 {
        bail!("Hex value has an odd number of digits: {}", s);
    }

    Ok(digits
        .chunks(2)
        .map(|pair| (hex_value(pair[0]) << 4) | hex_value(pair[1]))
        .collect())
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}
