/// Replace German umlauts and the sharp s with their ASCII digraphs.
///
/// The LCD character ROM has no usable glyphs for them.
pub fn replace_umlauts(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for c in s.chars() {
        match c {
            'Ä' => result.push_str("Ae"),
            'Ö' => result.push_str("Oe"),
            'Ü' => result.push_str("Ue"),
            'ä' => result.push_str("ae"),
            'ö' => result.push_str("oe"),
            'ü' => result.push_str("ue"),
            'ß' => result.push_str("ss"),
            other => result.push(other),
        }
    }

    result
}

/// Parse an integer written either in decimal or with a `0x` prefix in hex
pub fn parse_u8_auto_radix(s: &str) -> Result<u8, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    }
}
