use rust_decimal::Decimal;
use validator::ValidationError;

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("negative_amount");
        err.message = Some("must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// National identifier (CPF): 11 digits once punctuation is removed, not a
/// repeated digit, with both check digits valid.
pub fn validate_national_id(value: &str) -> Result<(), ValidationError> {
    if is_valid_national_id(value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("national_id");
        err.message = Some("must be a valid CPF".into());
        Err(err)
    }
}

pub fn normalize_national_id(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

pub fn is_valid_national_id(value: &str) -> bool {
    if value
        .chars()
        .any(|c| !(c.is_ascii_digit() || c == '.' || c == '-' || c == ' '))
    {
        return false;
    }

    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 || digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    (9..11).all(|position| {
        let weighted: u32 = digits[..position]
            .iter()
            .enumerate()
            .map(|(idx, digit)| digit * (position as u32 + 1 - idx as u32))
            .sum();
        (weighted * 10) % 11 % 10 == digits[position]
    })
}

/// Case-insensitive substring match over any of `fields`. An empty needle matches.
pub fn matches_search(needle: Option<&str>, fields: &[&str]) -> bool {
    let needle = match needle.map(str::trim).filter(|n| !n.is_empty()) {
        Some(needle) => needle.to_lowercase(),
        None => return true,
    };
    fields
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn accepts_known_good_identifiers() {
        assert!(is_valid_national_id("529.982.247-25"));
        assert!(is_valid_national_id("52998224725"));
        assert!(is_valid_national_id("111.444.777-35"));
    }

    #[test]
    fn rejects_malformed_identifiers() {
        assert!(!is_valid_national_id(""));
        assert!(!is_valid_national_id("529.982.247-26"));
        assert!(!is_valid_national_id("111.111.111-11"));
        assert!(!is_valid_national_id("5299822472"));
        assert!(!is_valid_national_id("529a98224725"));
    }

    #[test]
    fn normalization_keeps_digits_only() {
        assert_eq!(normalize_national_id("529.982.247-25"), "52998224725");
    }

    #[test]
    fn amounts_and_text() {
        assert!(validate_non_negative(&dec!(0)).is_ok());
        assert!(validate_non_negative(&dec!(10.50)).is_ok());
        assert!(validate_non_negative(&dec!(-0.01)).is_err());
        assert!(validate_not_blank("  ").is_err());
        assert!(validate_not_blank("Ana").is_ok());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        assert!(matches_search(
            Some("noiva"),
            &["Vestido Noiva Clássico", "VN-01"]
        ));
        assert!(matches_search(Some("vn-0"), &["Vestido", "VN-01"]));
        assert!(matches_search(None, &["anything"]));
        assert!(matches_search(Some("  "), &["anything"]));
        assert!(!matches_search(Some("festa"), &["Vestido Noiva", "VN-01"]));
    }
}
