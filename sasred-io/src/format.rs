//! C-style `%g` number formatting for text export.
#![allow(clippy::cast_sign_loss, clippy::cast_possible_wrap, clippy::cast_possible_truncation)]

/// Significant digits of `%g`.
const PRECISION: usize = 6;

/// Formats `value` the way C's `printf("%g", value)` does: six significant
/// digits, trailing zeros removed, scientific notation for exponents below
/// -4 or at least 6.
#[must_use]
pub fn format_g(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Rounding to the target precision can bump the exponent (999999.7 -> 1e+06),
    // so take it from the rounded scientific form.
    let scientific = format!("{:.*e}", PRECISION - 1, value);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (PRECISION as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_notation() {
        assert_eq!(format_g(100.0), "100");
        assert_eq!(format_g(1.5), "1.5");
        assert_eq!(format_g(-2.25), "-2.25");
        assert_eq!(format_g(0.1 + 0.2), "0.3");
        assert_eq!(format_g(0.0001), "0.0001");
        assert_eq!(format_g(123_456.0), "123456");
        assert_eq!(format_g(3.141_592_65), "3.14159");
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(format_g(0.00001), "1e-05");
        assert_eq!(format_g(0.000_012_345_67), "1.23457e-05");
        assert_eq!(format_g(1_234_567.0), "1.23457e+06");
        assert_eq!(format_g(999_999.7), "1e+06");
        assert_eq!(format_g(-2.5e-120), "-2.5e-120");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(format_g(0.0), "0");
        assert_eq!(format_g(f64::NAN), "nan");
        assert_eq!(format_g(f64::NEG_INFINITY), "-inf");
    }
}
