//! Record store implementations and database setup
//
// Store trait and change set
pub mod store;
//
// Backends
pub mod memory;
pub mod postgres;
//
// Pool, migrations and transaction utilities
pub mod setup;
pub mod transaction;
