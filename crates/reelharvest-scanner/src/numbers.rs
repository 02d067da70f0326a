//! Display-count normalization ("1.5K" and friends).

/// Parse a rendered counter such as `1.5K`, `2M`, `3B` or `1,204`.
///
/// A K/M/B multiplier applies only when it is the last non-space character.
/// Text without any digit yields 0.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn parse_count(text: &str) -> u64 {
    let text = text.trim().to_uppercase();

    // Only a trailing suffix scales; letters inside labels like "3 Comments" do not.
    let multiplier = match text.chars().last() {
        Some('K') => 1e3,
        Some('M') => 1e6,
        Some('B') => 1e9,
        _ => 1.0,
    };

    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() => (value * multiplier).round() as u64,
        _ => 0,
    }
}

/// True when the text carries at least one digit.
#[must_use]
pub fn has_digits(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}
