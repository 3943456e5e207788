//! Property-Based Test Generators
//!
//! Proptest strategies that respect domain invariants.

use core_kernel::{Currency, Money};
use domain_billing::{Channel, EscalationLevel};
use proptest::prelude::*;

/// Strategy for supported currencies
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop::sample::select(Currency::ALL.to_vec())
}

/// Strategy for positive amounts in minor units
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..10_000_000_000i64
}

/// Strategy for positive Money in any supported currency
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (positive_amount_minor_strategy(), currency_strategy())
        .prop_map(|(amount, currency)| Money::from_minor(amount, currency))
}

pub fn escalation_level_strategy() -> impl Strategy<Value = EscalationLevel> {
    prop::sample::select(EscalationLevel::ALL.to_vec())
}

pub fn channel_strategy() -> impl Strategy<Value = Channel> {
    prop::sample::select(Channel::ALL.to_vec())
}

/// Strategy for invoice numbers such as `INV-2024-0042`
pub fn invoice_number_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{2,4}-20[0-9]{2}-[0-9]{3,5}"
}
