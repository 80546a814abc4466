//! HBnB Types - Pure entity definitions
//!
//! This crate contains only plain data types (no storage, no async runtime):
//! the six entity kinds, their shared base attributes, and the attribute
//! mapping clients see.

pub mod entity;
pub mod kind;
pub mod timestamp;

pub use entity::*;
pub use kind::Kind;
pub use timestamp::{Timestamp, TIMESTAMP_FORMAT};
