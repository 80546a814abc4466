//! Entity definitions

use crate::{Kind, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attributes shared by every entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    pub id: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Base {
    /// Fresh identity: random id, both timestamps set to the same instant
    pub fn new() -> Self {
        let now = Timestamp::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Refresh `updated_at`; `id` and `created_at` never change
    pub fn touch(&mut self) {
        self.updated_at = Timestamp::after(&self.updated_at);
    }
}

impl Default for Base {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(flatten)]
    pub base: Base,
    pub state_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub base: Base,
    pub email: String,
    /// Password hash (PHC string)
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(flatten)]
    pub base: Base,
    pub city_id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub number_rooms: i64,
    #[serde(default)]
    pub number_bathrooms: i64,
    #[serde(default)]
    pub max_guest: i64,
    #[serde(default)]
    pub price_by_night: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Linked amenities. The file backend stores this list as-is; the
    /// relational backend keeps it in a join table and fills it on load.
    #[serde(default)]
    pub amenity_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(flatten)]
    pub base: Base,
    pub place_id: String,
    pub user_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amenity {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
}

/// Any stored object.
///
/// The serde representation is the durable record: every attribute plus a
/// `__class__` tag naming the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__class__")]
pub enum Entity {
    Amenity(Amenity),
    City(City),
    Place(Place),
    Review(Review),
    State(State),
    User(User),
}

/// Record fields that never appear in the client-facing mapping
const INTERNAL_FIELDS: &[&str] = &["password", "amenity_ids"];

impl Entity {
    pub fn kind(&self) -> Kind {
        match self {
            Entity::Amenity(_) => Kind::Amenity,
            Entity::City(_) => Kind::City,
            Entity::Place(_) => Kind::Place,
            Entity::Review(_) => Kind::Review,
            Entity::State(_) => Kind::State,
            Entity::User(_) => Kind::User,
        }
    }

    pub fn base(&self) -> &Base {
        match self {
            Entity::Amenity(e) => &e.base,
            Entity::City(e) => &e.base,
            Entity::Place(e) => &e.base,
            Entity::Review(e) => &e.base,
            Entity::State(e) => &e.base,
            Entity::User(e) => &e.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut Base {
        match self {
            Entity::Amenity(e) => &mut e.base,
            Entity::City(e) => &mut e.base,
            Entity::Place(e) => &mut e.base,
            Entity::Review(e) => &mut e.base,
            Entity::State(e) => &mut e.base,
            Entity::User(e) => &mut e.base,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    /// Storage key, `"<Kind>.<id>"`
    pub fn key(&self) -> String {
        storage_key(self.kind(), self.id())
    }

    pub fn touch(&mut self) {
        self.base_mut().touch();
    }

    /// Foreign keys held by this entity, as `(parent kind, parent id)`
    pub fn foreign_keys(&self) -> Vec<(Kind, &str)> {
        match self {
            Entity::City(c) => vec![(Kind::State, c.state_id.as_str())],
            Entity::Place(p) => vec![
                (Kind::City, p.city_id.as_str()),
                (Kind::User, p.user_id.as_str()),
            ],
            Entity::Review(r) => vec![
                (Kind::Place, r.place_id.as_str()),
                (Kind::User, r.user_id.as_str()),
            ],
            Entity::Amenity(_) | Entity::State(_) | Entity::User(_) => Vec::new(),
        }
    }

    /// Durable record, including backend-internal fields
    pub fn to_record(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Rebuild an entity from a durable record, keeping every value verbatim
    pub fn from_record(record: Value) -> serde_json::Result<Self> {
        serde_json::from_value(record)
    }

    /// Client-facing attribute mapping.
    ///
    /// Same shape on every backend: all attributes plus `__class__`, without
    /// the password hash or the amenity link list.
    pub fn to_dict(&self) -> Map<String, Value> {
        let mut map = match self.to_record() {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for field in INTERNAL_FIELDS {
            map.remove(*field);
        }
        map
    }
}

/// Build a storage key from its parts
pub fn storage_key(kind: Kind, id: &str) -> String {
    format!("{}.{}", kind.name(), id)
}

macro_rules! entity_variants {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Entity {
                fn from(v: $variant) -> Self {
                    Entity::$variant(v)
                }
            }

            impl TryFrom<Entity> for $variant {
                type Error = Entity;

                fn try_from(e: Entity) -> Result<Self, Self::Error> {
                    match e {
                        Entity::$variant(v) => Ok(v),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

entity_variants!(Amenity, City, Place, Review, State, User);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_place() -> Place {
        Place {
            base: Base::new(),
            city_id: "c1".into(),
            user_id: "u1".into(),
            name: "Loft".into(),
            description: None,
            number_rooms: 2,
            number_bathrooms: 1,
            max_guest: 4,
            price_by_night: 90,
            latitude: Some(37.77),
            longitude: None,
            amenity_ids: vec!["a1".into()],
        }
    }

    #[test]
    fn test_fresh_base_has_equal_timestamps() {
        let base = Base::new();
        assert_eq!(base.created_at, base.updated_at);
        assert!(!base.id.is_empty());
    }

    #[test]
    fn test_touch_keeps_identity() {
        let mut base = Base::new();
        let before = base.clone();
        base.touch();
        assert_eq!(base.id, before.id);
        assert_eq!(base.created_at, before.created_at);
        assert!(base.updated_at.parse() > before.updated_at.parse());
    }

    #[test]
    fn test_record_carries_class_tag() {
        let entity = Entity::from(sample_place());
        let record = entity.to_record().unwrap();
        assert_eq!(record["__class__"], "Place");
        assert_eq!(record["amenity_ids"], json!(["a1"]));

        let back = Entity::from_record(record).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn test_dict_hides_internal_fields() {
        let user = Entity::User(User {
            base: Base::new(),
            email: "a@b.c".into(),
            password: "$argon2id$...".into(),
            first_name: Some("Ada".into()),
            last_name: None,
        });
        let dict = user.to_dict();
        assert_eq!(dict["__class__"], "User");
        assert_eq!(dict["email"], "a@b.c");
        assert!(!dict.contains_key("password"));

        let place = Entity::from(sample_place()).to_dict();
        assert!(!place.contains_key("amenity_ids"));
        assert_eq!(place["price_by_night"], 90);
    }

    #[test]
    fn test_restore_keeps_odd_values() {
        let record = json!({
            "__class__": "State",
            "id": "x",
            "created_at": "yesterday",
            "updated_at": "today",
            "name": "Nevada"
        });
        let entity = Entity::from_record(record).unwrap();
        assert_eq!(entity.id(), "x");
        assert_eq!(entity.base().created_at.as_str(), "yesterday");
        assert_eq!(entity.key(), "State.x");
    }

    #[test]
    fn test_foreign_keys() {
        let entity = Entity::from(sample_place());
        assert_eq!(
            entity.foreign_keys(),
            vec![(Kind::City, "c1"), (Kind::User, "u1")]
        );
        let city = City::try_from(entity);
        assert!(city.is_err());
    }
}
