//! Amounts of money.
//!
//! All amounts are whole numbers of cents so sums are exact. Budgets do not
//! track a currency; every amount is assumed to use two minor units.

const MINOR_UNITS: usize = 2;

/// Largest magnitude of a single amount, in cents.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AmountInvalidity {
    /// Nothing was entered.
    Missing,
    /// The input is not a number.
    NotANumber,
    /// The input has more decimal places than cents allow. Contains the number
    /// of decimal places provided.
    TooPrecise(usize),
    /// The amount is below zero.
    Negative,
    /// The amount's magnitude exceeds [MAX_AMOUNT].
    TooLarge,
}

/// Parse an amount typed by a user into cents.
///
/// Thousands separators and spaces are ignored, and at most two decimal places
/// are accepted.
///
/// # Examples
///
/// ```
/// # use budget_buddy_api::budgets::domain::money::parse_amount;
/// assert_eq!(Ok(1234), parse_amount("12.34"));
/// assert_eq!(Ok(100_000), parse_amount("1,000"));
/// ```
pub fn parse_amount(raw_amount: &str) -> Result<i64, AmountInvalidity> {
    let cleaned_amount = raw_amount.replace(',', "").replace(' ', "");

    if cleaned_amount.is_empty() {
        return Err(AmountInvalidity::Missing);
    }

    if !cleaned_amount.chars().any(|c| c.is_ascii_digit()) {
        return Err(AmountInvalidity::NotANumber);
    }

    let number_to_parse = match cleaned_amount.rsplit_once('.') {
        // No decimal component, so pad with zeroes for the cents.
        None => format!("{}{}", cleaned_amount, "0".repeat(MINOR_UNITS)),

        Some((whole_part, decimal_part)) => {
            if decimal_part.len() > MINOR_UNITS {
                return Err(AmountInvalidity::TooPrecise(decimal_part.len()));
            }

            format!(
                "{}{:0<width$}",
                whole_part,
                decimal_part,
                width = MINOR_UNITS,
            )
        }
    };

    let amount: i64 = number_to_parse
        .parse()
        .map_err(|_| AmountInvalidity::NotANumber)?;

    if amount.unsigned_abs() > MAX_AMOUNT.unsigned_abs() {
        return Err(AmountInvalidity::TooLarge);
    }

    Ok(amount)
}

/// Parse an amount that must not be negative.
pub fn parse_non_negative_amount(raw_amount: &str) -> Result<i64, AmountInvalidity> {
    let amount = parse_amount(raw_amount)?;

    if amount < 0 {
        Err(AmountInvalidity::Negative)
    } else {
        Ok(amount)
    }
}

/// Format cents as a decimal string, eg `1234` becomes `"12.34"`.
pub fn format_amount(value: i64) -> String {
    // Preserve the sign, but then do string manipulation on the absolute
    // value so we don't have to worry about a negative sign.
    let sign = if value.is_negative() { "-" } else { "" };
    let amount_str = value.unsigned_abs().to_string();

    let padded = format!("{:0>width$}", amount_str, width = MINOR_UNITS + 1);
    let decimal_location = padded.len() - MINOR_UNITS;

    format!(
        "{}{}.{}",
        sign,
        &padded[..decimal_location],
        &padded[decimal_location..]
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_whole_number() {
        assert_eq!(Ok(2000), parse_amount("20"));
    }

    #[test]
    fn parse_single_decimal() {
        assert_eq!(Ok(250), parse_amount("2.5"));
    }

    #[test]
    fn parse_leading_decimal() {
        assert_eq!(Ok(50), parse_amount(".5"));
    }

    #[test]
    fn parse_with_separators_and_spaces() {
        assert_eq!(Ok(123_456_78), parse_amount(" 123,456.78 "));
    }

    #[test]
    fn parse_negative() {
        assert_eq!(Ok(-50), parse_amount("-0.50"));
    }

    #[test]
    fn parse_empty() {
        assert_eq!(Err(AmountInvalidity::Missing), parse_amount("   "));
    }

    #[test]
    fn parse_not_a_number() {
        assert_eq!(Err(AmountInvalidity::NotANumber), parse_amount("abc"));
        assert_eq!(Err(AmountInvalidity::NotANumber), parse_amount("-"));
        assert_eq!(Err(AmountInvalidity::NotANumber), parse_amount("1.2.3"));
        assert_eq!(Err(AmountInvalidity::NotANumber), parse_amount("12abc"));
    }

    #[test]
    fn parse_too_precise() {
        assert_eq!(Err(AmountInvalidity::TooPrecise(3)), parse_amount("1.234"));
    }

    #[test]
    fn parse_overflow() {
        assert_eq!(
            Err(AmountInvalidity::NotANumber),
            parse_amount("999999999999999999999")
        );
    }

    #[test]
    fn parse_too_large() {
        assert_eq!(Ok(MAX_AMOUNT), parse_amount("10,000,000,000"));
        assert_eq!(
            Err(AmountInvalidity::TooLarge),
            parse_amount("10000000000.01")
        );
        assert_eq!(
            Err(AmountInvalidity::TooLarge),
            parse_non_negative_amount("50000000000000000")
        );
        assert_eq!(Err(AmountInvalidity::TooLarge), parse_amount("-50000000000000000"));
    }

    #[test]
    fn non_negative_rejects_negative() {
        assert_eq!(
            Err(AmountInvalidity::Negative),
            parse_non_negative_amount("-1")
        );
        assert_eq!(Ok(0), parse_non_negative_amount("0"));
    }

    #[test]
    fn format_value_longer_than_padding() {
        assert_eq!("123.45", format_amount(12345));
    }

    #[test]
    fn format_value_with_only_cents() {
        assert_eq!("0.07", format_amount(7));
        assert_eq!("0.70", format_amount(70));
    }

    #[test]
    fn format_negative_value() {
        assert_eq!("-10.00", format_amount(-1000));
        assert_eq!("-0.07", format_amount(-7));
    }
}
