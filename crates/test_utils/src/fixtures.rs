//! Pre-built Test Fixtures
//!
//! Ready-to-use values that keep tests consistent and predictable.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{Currency, FixedClock, Money};
use domain_billing::{ClientDetails, UserSettings};
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// $500.00
    pub fn usd_500() -> Money {
        Money::new(dec!(500.00), Currency::USD)
    }

    /// ₦250,000.00
    pub fn ngn_250k() -> Money {
        Money::new(dec!(250000.00), Currency::NGN)
    }
}

/// Fixture for dates used across scheduling tests
pub struct DateFixtures;

impl DateFixtures {
    /// Due date of the standard invoice (Jan 10, 2024)
    pub fn due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    /// Midnight UTC on a given day of January 2024
    pub fn january(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    /// A clock frozen at midnight on a given day of January 2024
    pub fn clock_on_january(day: u32) -> FixedClock {
        FixedClock::new(Self::january(day))
    }
}

/// Fixture for client details
pub struct ClientFixtures;

impl ClientFixtures {
    /// A client reachable only by email
    pub fn email_only() -> ClientDetails {
        ClientDetails {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: None,
        }
    }

    /// A client with a Nigerian local phone number
    pub fn with_phone() -> ClientDetails {
        ClientDetails {
            name: "Chidi Okafor".to_string(),
            email: "chidi@example.com".to_string(),
            phone: Some("0803 123 4567".to_string()),
        }
    }
}

/// Fixture for owner settings
pub struct SettingsFixtures;

impl SettingsFixtures {
    /// Settings with working email and Twilio credentials
    pub fn configured() -> UserSettings {
        UserSettings {
            business_name: Some("Acme Studio".to_string()),
            resend_api_key: Some("re_test".to_string()),
            twilio_account_sid: Some("AC_test".to_string()),
            twilio_auth_token: Some("token".to_string()),
            twilio_phone_number: Some("+15550100".to_string()),
            ..Default::default()
        }
    }
}
