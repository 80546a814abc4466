//! Storage trait for persistence
//!
//! One interface, two backends. Route handlers hold an `Arc<dyn Storage>`
//! and never learn which backend is behind it.
//!
//! Lifecycle: `reload` once at startup, then per request any number of
//! reads and staged writes, `save` to make them durable, and `close` when
//! the request ends. Anything staged but not saved when `close` runs is
//! discarded.

use crate::Result;
use async_trait::async_trait;
use hbnb_types::{Amenity, City, Entity, Kind, Place, Review};
use std::collections::HashMap;

#[async_trait]
pub trait Storage: Send + Sync {
    /// All entities of `kind`, or of every kind, keyed `"Kind.id"`.
    ///
    /// Entities come back with bare attributes; relationships are only
    /// resolved through the accessor methods below.
    async fn get_all(&self, kind: Option<Kind>) -> Result<HashMap<String, Entity>>;

    /// One entity, or `None` if there is no match (including an empty id)
    async fn get(&self, kind: Kind, id: &str) -> Result<Option<Entity>>;

    /// Number of entities of `kind`, or of every kind
    async fn count(&self, kind: Option<Kind>) -> Result<usize>;

    /// Stage an entity for storage. An entity whose id is already stored
    /// replaces the stored one.
    async fn new(&self, entity: Entity) -> Result<()>;

    /// Flush staged creates, updates and deletes to the durable medium.
    /// A no-op when nothing is staged.
    async fn save(&self) -> Result<()>;

    /// Stage removal of `entity` and of everything that depends on it.
    /// Unknown entities are ignored.
    async fn delete(&self, entity: &Entity) -> Result<()>;

    /// Drop all staged state and re-read the durable medium
    async fn reload(&self) -> Result<()>;

    /// End the current request scope
    async fn close(&self) -> Result<()>;

    /// Cities whose `state_id` is `state_id`
    async fn cities_of(&self, state_id: &str) -> Result<Vec<City>>;

    /// Places whose `city_id` is `city_id`
    async fn places_of(&self, city_id: &str) -> Result<Vec<Place>>;

    /// Reviews whose `place_id` is `place_id`
    async fn reviews_of(&self, place_id: &str) -> Result<Vec<Review>>;

    /// Amenities linked to a place
    async fn amenities_of(&self, place_id: &str) -> Result<Vec<Amenity>>;

    /// Stage a place/amenity link. Returns `false` if it already existed.
    async fn link_amenity(&self, place_id: &str, amenity_id: &str) -> Result<bool>;

    /// Stage removal of a place/amenity link. Returns `false` if there was none.
    async fn unlink_amenity(&self, place_id: &str, amenity_id: &str) -> Result<bool>;

    /// `count(kind)` for every kind
    async fn counts(&self) -> Result<Vec<(Kind, usize)>> {
        let mut counts = Vec::with_capacity(Kind::ALL.len());
        for kind in Kind::ALL {
            counts.push((kind, self.count(Some(kind)).await?));
        }
        Ok(counts)
    }
}
