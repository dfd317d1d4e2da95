//! Display helpers for wallet addresses.

/// Keep the first `head` and last `tail` characters of `address`, joined by
/// `...`. Addresses too short to shorten are returned unchanged.
pub fn truncate_address(address: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= head + tail {
        return address.to_string();
    }

    let start: String = chars[..head].iter().collect();
    let end: String = chars[chars.len() - tail..].iter().collect();
    format!("{}...{}", start, end)
}

/// The `first4...last4` form used by the popup and the connection page.
pub fn short_address(address: &str) -> String {
    truncate_address(address, 4, 4)
}
