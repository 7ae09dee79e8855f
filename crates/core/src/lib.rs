//! Remark core types and pure formatting logic.
//!
//! This crate holds everything the notification pipeline needs that has
//! no I/O: the read-only snapshots of external entities ([`model`]) and
//! the plain-text layout engine ([`layout`]) used to render email
//! bodies. It deliberately has no internal dependencies so both the
//! notify crate and future consumers can share it.

pub mod layout;
pub mod model;
pub mod types;
