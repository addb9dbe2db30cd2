//! Data models for the application

mod attributes;
mod identity;
mod record;

pub use attributes::*;
pub use identity::*;
pub use record::*;
