//! CPF (Cadastro de Pessoas Físicas) numbers.
//!
//! Accepts bare digits or the usual `XXX.XXX.XXX-XX` punctuation and checks
//! both mod-11 verification digits.

/// Strips punctuation and returns the 11 digits, or `None` if the input is
/// not a well-formed, checksum-valid CPF.
pub fn normalize(input: &str) -> Option<String> {
    let mut digits = Vec::with_capacity(11);
    for c in input.trim().chars() {
        match c {
            '0'..='9' => digits.push(c as u8 - b'0'),
            '.' | '-' | ' ' => {}
            _ => return None,
        }
    }

    if digits.len() != 11 {
        return None;
    }
    // 000.000.000-00, 111.111.111-11, ... pass the checksum but are not issued
    if digits.iter().all(|d| *d == digits[0]) {
        return None;
    }
    if check_digit(&digits[..9]) != digits[9] || check_digit(&digits[..10]) != digits[10] {
        return None;
    }

    Some(digits.iter().map(|d| char::from(b'0' + d)).collect())
}

pub fn is_valid(input: &str) -> bool {
    normalize(input).is_some()
}

/// Formats a valid CPF as `XXX.XXX.XXX-XX`.
pub fn format(input: &str) -> Option<String> {
    let d = normalize(input)?;
    Some(format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11]))
}

fn check_digit(digits: &[u8]) -> u8 {
    let first_weight = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| *d as u32 * (first_weight - i as u32))
        .sum();
    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        (11 - remainder) as u8
    }
}
