//! Data models for the site content store.
//!
//! Field names serialize in camelCase to match the dashboard scripts.

mod alert;
mod item;
mod roster;
mod site;

pub use alert::*;
pub use item::*;
pub use roster::*;
pub use site::*;
