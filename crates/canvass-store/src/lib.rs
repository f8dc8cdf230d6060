//! canvass-store — Reference store implementation for canvass.
//!
//! `MemoryStore` keeps forms and responses in process memory and
//! enforces the same unique constraints a database-backed store would:
//! one form per slug, one response per (form, identity key).

mod memory;

pub use memory::MemoryStore;
