//! Data structures for unit archetypes.
//!
//! Templates are plain data deserialized from RON. Reading files is left to
//! the caller; this module only parses strings.

mod unit_data;

pub use unit_data::{UnitCatalog, UnitData, WeaponData};
