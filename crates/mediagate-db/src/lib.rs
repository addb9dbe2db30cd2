//! Record persistence for media files and identities
//!
//! [`RecordStore`] is the seam the workflow engine writes through. Two
//! implementations share its invariants: [`PostgresRecordStore`] backed by
//! `sqlx`, and [`MemoryRecordStore`] for tests and tooling.

pub mod db;

pub use db::memory::MemoryRecordStore;
pub use db::postgres::PostgresRecordStore;
pub use db::setup::{connect_pool, run_migrations, setup_database};
pub use db::store::{RecordChange, RecordStore};
pub use db::transaction::TransactionGuard;
