use std::fmt;

/// Monetary values are integer minor units (fixed point). No floating point
/// ever touches a balance.
pub type Money = i64;

/// Format minor units as a decimal string: 5000 -> "50.00", -1 -> "-0.01".
pub fn format_money(amount: Money) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a decimal string into minor units: "50" -> 5000, "12.5" -> 1250.
/// More than two decimal places is an error, not a silent truncation.
pub fn parse_money(input: &str) -> Result<Money, ParseMoneyError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseMoneyError::InvalidFormat);
    }
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (units_str, frac_str) = match digits.split_once('.') {
        Some((u, f)) => (u, f),
        None => (digits, ""),
    };

    if frac_str.contains('.') {
        return Err(ParseMoneyError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseMoneyError::InvalidFormat)?
    };

    let fraction: i64 = match frac_str.len() {
        0 => 0,
        1 => frac_str.parse::<i64>().map_err(|_| ParseMoneyError::InvalidFormat)? * 10,
        2 => frac_str.parse().map_err(|_| ParseMoneyError::InvalidFormat)?,
        _ => return Err(ParseMoneyError::TooManyDecimals),
    };

    let amount = units
        .checked_mul(100)
        .and_then(|cents| cents.checked_add(fraction))
        .ok_or(ParseMoneyError::OutOfRange)?;

    Ok(if negative { -amount } else { amount })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseMoneyError {
    InvalidFormat,
    TooManyDecimals,
    OutOfRange,
}

impl fmt::Display for ParseMoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMoneyError::InvalidFormat => write!(f, "invalid money format"),
            ParseMoneyError::TooManyDecimals => {
                write!(f, "amounts carry at most two decimal places")
            }
            ParseMoneyError::OutOfRange => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseMoneyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(5000), "50.00");
        assert_eq!(format_money(1234), "12.34");
        assert_eq!(format_money(1), "0.01");
        assert_eq!(format_money(0), "0.00");
        assert_eq!(format_money(50_000_000), "500000.00");
        assert_eq!(format_money(-5000), "-50.00");
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("50.00"), Ok(5000));
        assert_eq!(parse_money("50"), Ok(5000));
        assert_eq!(parse_money("12.34"), Ok(1234));
        assert_eq!(parse_money("12.5"), Ok(1250));
        assert_eq!(parse_money("0.01"), Ok(1));
        assert_eq!(parse_money(".50"), Ok(50));
        assert_eq!(parse_money(" 7 "), Ok(700));
        assert_eq!(parse_money("-50.00"), Ok(-5000));
    }

    #[test]
    fn test_parse_money_invalid() {
        assert!(parse_money("abc").is_err());
        assert!(parse_money("12.34.56").is_err());
        assert!(parse_money("").is_err());
        assert_eq!(parse_money("1.999"), Err(ParseMoneyError::TooManyDecimals));
    }
}
