//! Order number validation (Luhn checksum)

/// Returns true when `number` is a non-empty ASCII digit string whose Luhn
/// checksum is divisible by 10.
///
/// Any other input, including surrounding whitespace, is simply invalid.
pub fn is_valid(number: &str) -> bool {
    if number.is_empty() {
        return false;
    }

    let mut sum = 0u32;
    for (i, byte) in number.bytes().rev().enumerate() {
        if !byte.is_ascii_digit() {
            return false;
        }
        let mut digit = u32::from(byte - b'0');
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }

    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Straightforward reference: explicit digit vector, check digit appended
    fn reference_check_digit(payload: &str) -> u32 {
        let digits: Vec<u32> = payload.chars().map(|c| c.to_digit(10).unwrap()).collect();
        let mut sum = 0;
        for (i, d) in digits.iter().rev().enumerate() {
            // payload digits shift by one once the check digit is appended
            let v = if i % 2 == 0 { d * 2 } else { *d };
            sum += if v > 9 { v - 9 } else { v };
        }
        (10 - sum % 10) % 10
    }

    #[test]
    fn test_known_fixtures() {
        assert!(is_valid("12345678903"));
        assert!(!is_valid("12345678901"));
        assert!(is_valid("79927398713"));
        assert!(is_valid("4561261212345467"));
        assert!(!is_valid("4561261212345464"));
        assert!(is_valid("0"));
    }

    #[test]
    fn test_non_digit_input_is_invalid() {
        assert!(!is_valid(""));
        assert!(!is_valid("1234567890a"));
        assert!(!is_valid(" 12345678903"));
        assert!(!is_valid("12345678903\n"));
        assert!(!is_valid("-12345678903"));
        assert!(!is_valid("١٢٣"));
    }

    #[test]
    fn test_matches_reference_for_every_check_digit() {
        let payloads = ["1", "42", "7992739871", "1234567890", "9278923470", "346436439"];
        for payload in payloads {
            let expected = reference_check_digit(payload);
            for check in 0..10u32 {
                let candidate = format!("{payload}{check}");
                assert_eq!(
                    is_valid(&candidate),
                    check == expected,
                    "mismatch for {candidate}"
                );
            }
        }
    }
}
