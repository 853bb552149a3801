
#[inline]
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Char-safe truncation that appends `...` only when something was cut.
#[inline]
pub fn safe_truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Rounds to one decimal place, half away from zero.
#[inline]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_truncate_ascii() {
        assert_eq!(safe_truncate("umbrella weather", 8), "umbrella");
    }

    #[test]
    fn test_safe_truncate_multibyte() {
        assert_eq!(safe_truncate("Hujan deras ☔ hari ini", 13), "Hujan deras ☔");
    }

    #[test]
    fn test_safe_truncate_shorter() {
        assert_eq!(safe_truncate("hi", 10), "hi");
    }

    #[test]
    fn test_safe_truncate_ellipsis() {
        assert_eq!(safe_truncate_ellipsis("light rain", 5), "light...");
        assert_eq!(safe_truncate_ellipsis("rain", 10), "rain");
        assert_eq!(safe_truncate_ellipsis("exact", 5), "exact");
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(66.666_666), 66.7);
        assert_eq!(round1(50.0), 50.0);
        assert_eq!(round1(33.35), 33.4);
        assert_eq!(round1(0.0), 0.0);
    }
}
