//! Core Kernel - Foundational types shared by the receivables services
//!
//! This crate provides the building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic and locale formatting
//! - Strongly-typed identifiers
//! - Port error and health types for the adapter layer
//! - A clock abstraction for deterministic scheduling

pub mod clock;
pub mod identifiers;
pub mod money;
pub mod ports;

pub use clock::{Clock, FixedClock, SystemClock};
pub use identifiers::{ClientId, InvoiceId, NotificationId, ReminderId, UserId};
pub use money::{Currency, Money, MoneyError};
pub use ports::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
