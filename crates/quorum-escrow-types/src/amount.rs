//! Token amounts.
//!
//! The protocol does all arithmetic on `u128` base units so that fee splits
//! are exact integer operations. [`Decimal`] is only the human-facing view:
//! `1.0` token is `10^18` base units.

use rust_decimal::Decimal;

use crate::constants::TOKEN_DECIMALS;
use crate::{EscrowError, Result};

/// Render base units as a token-denominated decimal (`330000000000000000` → `0.33`).
///
/// # Errors
/// Returns [`EscrowError::InvalidAmount`] if the value exceeds what a
/// `Decimal` can represent at 18 decimal places.
pub fn to_tokens(units: u128) -> Result<Decimal> {
    let mantissa = i128::try_from(units).map_err(|_| EscrowError::InvalidAmount {
        reason: format!("{units} base units do not fit a decimal"),
    })?;
    Decimal::try_from_i128_with_scale(mantissa, TOKEN_DECIMALS)
        .map(|d| d.normalize())
        .map_err(|e| EscrowError::InvalidAmount {
            reason: format!("{units} base units: {e}"),
        })
}

/// Convert a token-denominated decimal into base units (`0.33` → `330000000000000000`).
///
/// # Errors
/// Returns [`EscrowError::InvalidAmount`] for negative values, for more than
/// 18 fractional digits, or on overflow.
pub fn from_tokens(tokens: Decimal) -> Result<u128> {
    if tokens.is_sign_negative() && !tokens.is_zero() {
        return Err(EscrowError::InvalidAmount {
            reason: format!("negative amount {tokens}"),
        });
    }
    let tokens = tokens.normalize();
    let scale = tokens.scale();
    if scale > TOKEN_DECIMALS {
        return Err(EscrowError::InvalidAmount {
            reason: format!("{tokens} has more than {TOKEN_DECIMALS} decimal places"),
        });
    }
    let mantissa = tokens.mantissa().unsigned_abs();
    10u128
        .checked_pow(TOKEN_DECIMALS - scale)
        .and_then(|factor| mantissa.checked_mul(factor))
        .ok_or_else(|| EscrowError::InvalidAmount {
            reason: format!("{tokens} overflows base units"),
        })
}

/// Parse a token string such as `"1.5"` into base units.
///
/// # Errors
/// Returns [`EscrowError::InvalidAmount`] if the string is not a decimal
/// or cannot be represented.
pub fn parse_tokens(s: &str) -> Result<u128> {
    let tokens: Decimal = s.trim().parse().map_err(|e| EscrowError::InvalidAmount {
        reason: format!("cannot parse {s:?}: {e}"),
    })?;
    from_tokens(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ONE_TOKEN;

    #[test]
    fn one_token_renders_as_one() {
        assert_eq!(to_tokens(ONE_TOKEN).unwrap(), Decimal::ONE);
        assert_eq!(to_tokens(0).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn fractional_amounts() {
        assert_eq!(parse_tokens("0.33").unwrap(), 330_000_000_000_000_000);
        assert_eq!(to_tokens(330_000_000_000_000_000).unwrap(), Decimal::new(33, 2));
        assert_eq!(
            to_tokens(999_999_999_550_000_000_000_000_000).unwrap().to_string(),
            "999999999.55"
        );
    }

    #[test]
    fn smallest_unit() {
        assert_eq!(parse_tokens("0.000000000000000001").unwrap(), 1);
    }

    #[test]
    fn too_many_decimals_rejected() {
        let err = parse_tokens("0.0000000000000000001").unwrap_err();
        assert!(matches!(err, EscrowError::InvalidAmount { .. }));
    }

    #[test]
    fn negative_rejected() {
        let err = from_tokens(Decimal::new(-1, 0)).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidAmount { .. }));
    }

    #[test]
    fn garbage_rejected() {
        assert!(parse_tokens("one token").is_err());
    }
}
