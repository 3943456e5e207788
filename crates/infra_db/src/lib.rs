//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the receivables engine using SQLx. One adapter,
//! [`PgBillingStore`], implements every billing port: invoices, clients,
//! reminders, owner settings and notifications.
//!
//! Status changes that must not race are written as conditional updates
//! (`... WHERE status = $expected`), and the reminder plan relies on a unique
//! index over (invoice, channel, level, scheduled date) so that planning
//! twice inserts nothing.
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PgBillingStore};
//!
//! let pool = create_pool(DatabaseConfig::new(url)).await?;
//! run_migrations(&pool).await?;
//! let store = PgBillingStore::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
mod rows;

pub use adapters::PgBillingStore;
pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
