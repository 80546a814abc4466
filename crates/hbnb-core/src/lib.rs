//! HBnB Core Library
//!
//! Storage port, model construction, relationship resolution and search,
//! shared by every storage backend and the HTTP layer.

// Re-export pure types from hbnb-types
pub use hbnb_types::*;

pub mod error;
pub mod model;
pub mod ports;
pub mod resolver;
pub mod search;

pub use error::{HbnbError, Result};
pub use ports::Storage;
pub use search::{search_places, PlaceFilter};
