//! Unit tests for the Money module
//!
//! Tests cover creation, arithmetic, minor-unit conversion and the
//! locale formatting used in reminder bodies.

use core_kernel::{Currency, Money, MoneyError};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_rounds_to_four_decimal_places() {
        let m = Money::new(dec!(100.123456789), Currency::USD);
        assert_eq!(m.amount(), dec!(100.1235));
    }

    #[test]
    fn test_from_minor_converts_kobo() {
        let m = Money::from_minor(25_000_000, Currency::NGN);
        assert_eq!(m.amount(), dec!(250000));
    }

    #[test]
    fn test_zero_creates_zero_amount() {
        let m = Money::zero(Currency::EUR);
        assert!(m.is_zero());
        assert!(!m.is_negative());
        assert_eq!(m.currency(), Currency::EUR);
    }

    #[test]
    fn test_negative_amount_creation() {
        let m = Money::new(dec!(-100.00), Currency::USD);
        assert!(m.is_negative());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_checked_add_same_currency() {
        let a = Money::new(dec!(100.00), Currency::GBP);
        let b = Money::new(dec!(50.25), Currency::GBP);
        assert_eq!(a.checked_add(&b).unwrap().amount(), dec!(150.25));
    }

    #[test]
    fn test_checked_sub_currency_mismatch() {
        let a = Money::new(dec!(100.00), Currency::NGN);
        let b = Money::new(dec!(1.00), Currency::USD);
        assert_eq!(
            a.checked_sub(&b),
            Err(MoneyError::CurrencyMismatch("NGN".to_string(), "USD".to_string()))
        );
    }

    #[test]
    fn test_operators_same_currency() {
        let a = Money::new(dec!(10.00), Currency::USD);
        let b = Money::new(dec!(2.50), Currency::USD);
        assert_eq!((a + b).amount(), dec!(12.50));
        assert_eq!((a - b).amount(), dec!(7.50));
    }
}

mod minor_units {
    use super::*;

    #[test]
    fn test_to_minor_units_rounds_first() {
        let m = Money::new(dec!(19.995), Currency::USD);
        assert_eq!(m.to_minor_units().unwrap(), 2000);
    }

    #[test]
    fn test_to_minor_units_naira() {
        let m = Money::new(dec!(150000), Currency::NGN);
        assert_eq!(m.to_minor_units().unwrap(), 15_000_000);
    }
}

mod currency {
    use super::*;

    #[test]
    fn test_all_currencies_have_symbols_and_locales() {
        for currency in Currency::ALL {
            assert!(!currency.symbol().is_empty());
            assert!(currency.locale().contains('-'));
            assert_eq!(currency.decimal_places(), 2);
        }
    }

    #[test]
    fn test_currency_serializes_uppercase() {
        let json = serde_json::to_string(&Currency::NGN).unwrap();
        assert_eq!(json, "\"NGN\"");
    }

    #[test]
    fn test_currency_parse_is_case_insensitive() {
        assert_eq!(" gbp ".parse::<Currency>().unwrap(), Currency::GBP);
        assert!("XYZ".parse::<Currency>().is_err());
    }
}

mod display {
    use super::*;

    #[test]
    fn test_display_matches_format() {
        let m = Money::new(dec!(1500), Currency::USD);
        assert_eq!(m.to_string(), "$1,500.00");
        assert_eq!(format!("{}", m), m.format());
    }

    #[test]
    fn test_small_amounts_have_no_grouping() {
        assert_eq!(Money::new(dec!(999.9), Currency::NGN).format(), "₦999.90");
        assert_eq!(Money::new(dec!(0), Currency::GBP).format(), "£0.00");
    }

    #[test]
    fn test_large_amounts_group_every_three_digits() {
        let m = Money::new(dec!(1234567.891), Currency::USD);
        assert_eq!(m.format(), "$1,234,567.89");

        let m = Money::new(dec!(1234567.891), Currency::EUR);
        assert_eq!(m.format(), "1.234.567,89\u{a0}€");
    }
}
