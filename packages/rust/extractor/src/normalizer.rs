//! Phone-number display normalization.

use prospector_shared::LocaleConfig;

use crate::locator::clean_phone;

/// Canonicalize a raw phone string into the locale's display format.
///
/// Strips separators, drops a leading `+<country_code>` prefix, and groups a
/// bare national number as `ddd ddd dddd`. Anything that does not match the
/// locale's national shape is returned unchanged rather than guessed at.
/// Idempotent: normalizing an already-normalized string is a no-op.
pub fn normalize(raw: &str, locale: &LocaleConfig) -> String {
    let cleaned = clean_phone(raw);
    let cc_prefix = format!("+{}", locale.country_code);

    if let Some(rest) = cleaned.strip_prefix(&cc_prefix) {
        if is_national_number(rest, locale) {
            return group_national(rest);
        }
    }

    if is_national_number(&cleaned, locale) {
        return group_national(&cleaned);
    }

    raw.to_string()
}

fn is_national_number(digits: &str, locale: &LocaleConfig) -> bool {
    digits.len() == locale.national_digits && digits.chars().all(|c| c.is_ascii_digit())
}

/// Space-separate a national number into 3-3-rest groups.
fn group_national(digits: &str) -> String {
    if digits.len() <= 6 {
        return digits.to_string();
    }
    format!("{} {} {}", &digits[..3], &digits[3..6], &digits[6..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locale() -> LocaleConfig {
        LocaleConfig::default()
    }

    #[test]
    fn bare_national_number_is_grouped() {
        assert_eq!(normalize("9611234567", &locale()), "961 123 4567");
    }

    #[test]
    fn separators_are_stripped_before_grouping() {
        assert_eq!(normalize("(961) 123-4567", &locale()), "961 123 4567");
        assert_eq!(normalize("961 123 4567", &locale()), "961 123 4567");
    }

    #[test]
    fn country_code_prefix_is_dropped() {
        assert_eq!(normalize("+529611234567", &locale()), "961 123 4567");
        assert_eq!(normalize("+52 961 123 4567", &locale()), "961 123 4567");
    }

    #[test]
    fn unknown_shapes_pass_through_unchanged() {
        // Don't guess at numbers outside the locale's national shape.
        assert_eq!(normalize("+1 415 555 0100", &locale()), "+1 415 555 0100");
        assert_eq!(normalize("12345", &locale()), "12345");
        assert_eq!(normalize("", &locale()), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "9611234567",
            "+529611234567",
            "961-123-4567",
            "+1 415 555 0100",
            "no phone here",
        ];
        for input in inputs {
            let once = normalize(input, &locale());
            assert_eq!(normalize(&once, &locale()), once, "input: {input}");
        }
    }

    #[test]
    fn other_locales_are_configuration() {
        let spain = LocaleConfig {
            country_code: "34".into(),
            national_digits: 9,
            ..LocaleConfig::default()
        };
        assert_eq!(normalize("+34912345678", &spain), "912 345 678");
    }
}
