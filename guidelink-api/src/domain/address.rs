const NO_DIGIT_PREFIX_CHARS: usize = 10;

/// Hide the street number and everything after it.
///
/// Addresses without any digit keep only their first ten characters.
pub fn mask_address(address: &str) -> String {
    let address = address.trim();
    match address.find(|c: char| c.is_ascii_digit() || ('０'..='９').contains(&c)) {
        Some(idx) => format!("{}***", address[..idx].trim_end()),
        None => address.chars().take(NO_DIGIT_PREFIX_CHARS).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuts_at_first_digit() {
        assert_eq!(mask_address("Tokyo Shibuya 1-2-3 Apt 4"), "Tokyo Shibuya***");
        assert_eq!(mask_address("東京都渋谷区神南１丁目"), "東京都渋谷区神南***");
    }

    #[test]
    fn no_digit_truncates_by_chars() {
        assert_eq!(mask_address("東京都渋谷区神南一丁目渋谷ビル"), "東京都渋谷区神南一丁");
        assert_eq!(mask_address("Osaka"), "Osaka");
    }
}
