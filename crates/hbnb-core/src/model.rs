//! Building and updating entities from attribute mappings

use crate::{HbnbError, Result};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use hbnb_types::{Entity, Kind, Timestamp};
use rand::rngs::OsRng;
use serde_json::{Map, Value};

/// Keys no update may overwrite, whatever the kind
pub const IDENTITY_KEYS: &[&str] = &["id", "created_at", "updated_at", "__class__"];

/// Build a new entity of `kind` from client-style attributes.
///
/// A missing `id` is generated and missing timestamps are set to now; any
/// given values are kept as they are. A User's plaintext `password` is
/// hashed. Missing required attributes or wrongly typed values are
/// reported as `InvalidAttributes`.
pub fn build(kind: Kind, mut attrs: Map<String, Value>) -> Result<Entity> {
    attrs.remove("__class__");

    let has_id = matches!(attrs.get("id"), Some(Value::String(s)) if !s.is_empty());
    if !has_id {
        attrs.insert(
            "id".to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
    }

    let now = Timestamp::now();
    for key in ["created_at", "updated_at"] {
        if attrs.get(key).map_or(true, Value::is_null) {
            attrs.insert(key.to_string(), Value::String(now.to_string()));
        }
    }

    if kind == Kind::User {
        hash_password_field(&mut attrs)?;
    }

    attrs.insert("__class__".to_string(), Value::String(kind.name().to_string()));
    Entity::from_record(Value::Object(attrs)).map_err(|e| HbnbError::InvalidAttributes {
        kind,
        reason: e.to_string(),
    })
}

/// Rebuild a persisted entity. Every value, including id, timestamps and
/// the password hash, is kept exactly as stored.
pub fn restore(record: Value) -> Result<Entity> {
    Ok(Entity::from_record(record)?)
}

/// Split a `<Class>.<id>` storage key into its kind and id
pub fn split_key(key: &str) -> Result<(Kind, &str)> {
    let (class, id) = key
        .split_once('.')
        .ok_or_else(|| HbnbError::UnknownKind(key.to_string()))?;
    Ok((class.parse::<Kind>()?, id))
}

/// Merge `attrs` into `entity` and refresh `updated_at`.
///
/// Identity keys, keys listed in `protected` and keys the kind does not
/// have are skipped. Nothing changes if the merged record does not fit the
/// kind.
pub fn apply_update(
    entity: &mut Entity,
    attrs: &Map<String, Value>,
    protected: &[&str],
) -> Result<()> {
    let kind = entity.kind();
    let mut record = match entity.to_record()? {
        Value::Object(map) => map,
        other => {
            return Err(HbnbError::Serialization(format!(
                "{kind} record is not a mapping: {other}"
            )))
        }
    };

    let mut changes = Map::new();
    for (key, value) in attrs {
        if IDENTITY_KEYS.contains(&key.as_str()) || protected.contains(&key.as_str()) {
            continue;
        }
        if !record.contains_key(key) {
            continue;
        }
        changes.insert(key.clone(), value.clone());
    }
    if kind == Kind::User {
        hash_password_field(&mut changes)?;
    }
    record.extend(changes);

    let mut updated =
        Entity::from_record(Value::Object(record)).map_err(|e| HbnbError::InvalidAttributes {
            kind,
            reason: e.to_string(),
        })?;
    updated.touch();
    *entity = updated;
    Ok(())
}

/// Hash a plaintext password into a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HbnbError::PasswordHash(e.to_string()))
}

/// Check a plaintext password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn hash_password_field(attrs: &mut Map<String, Value>) -> Result<()> {
    if let Some(Value::String(plain)) = attrs.get("password") {
        let hashed = hash_password(plain)?;
        attrs.insert("password".to_string(), Value::String(hashed));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbnb_types::{Place, User};
    use serde_json::json;

    fn attrs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_build_fills_identity() {
        let entity = build(Kind::State, attrs(json!({"name": "California"}))).unwrap();
        assert_eq!(entity.kind(), Kind::State);
        assert!(!entity.id().is_empty());
        assert_eq!(entity.base().created_at, entity.base().updated_at);
    }

    #[test]
    fn test_build_keeps_given_identity() {
        let entity = build(
            Kind::Amenity,
            attrs(json!({
                "id": "fixed",
                "created_at": "2017-09-28T21:03:54.052298",
                "updated_at": "whenever",
                "name": "Wifi"
            })),
        )
        .unwrap();
        assert_eq!(entity.id(), "fixed");
        assert_eq!(entity.base().updated_at.as_str(), "whenever");
    }

    #[test]
    fn test_restore_keeps_stored_hash() {
        let entity = restore(json!({
            "__class__": "User",
            "id": "u1",
            "created_at": "2017-09-28T21:03:54.052298",
            "updated_at": "2017-09-28T21:03:54.052298",
            "email": "a@b.c",
            "password": "$argon2id$stored",
            "first_name": null,
            "last_name": null
        }))
        .unwrap();
        let user = User::try_from(entity).unwrap();
        assert_eq!(user.password, "$argon2id$stored");

        assert!(restore(json!({"__class__": "Nope", "id": "x"})).is_err());
    }

    #[test]
    fn test_split_key() {
        let (kind, id) = split_key("Place.a.b").unwrap();
        assert_eq!(kind, Kind::Place);
        assert_eq!(id, "a.b");

        assert!(matches!(
            split_key("BaseModel.x"),
            Err(HbnbError::UnknownKind(name)) if name == "BaseModel"
        ));
        assert!(matches!(split_key("State"), Err(HbnbError::UnknownKind(_))));
    }

    #[test]
    fn test_build_rejects_missing_required() {
        let err = build(Kind::City, attrs(json!({"name": "Fresno"}))).unwrap_err();
        assert!(matches!(err, HbnbError::InvalidAttributes { kind: Kind::City, .. }));
    }

    #[test]
    fn test_build_place_defaults() {
        let entity = build(
            Kind::Place,
            attrs(json!({"city_id": "c", "user_id": "u", "name": "Hut"})),
        )
        .unwrap();
        let place = Place::try_from(entity).unwrap();
        assert_eq!(place.number_rooms, 0);
        assert!(place.amenity_ids.is_empty());
        assert!(place.latitude.is_none());
    }

    #[test]
    fn test_user_password_is_hashed() {
        let entity = build(
            Kind::User,
            attrs(json!({"email": "a@b.c", "password": "pwd"})),
        )
        .unwrap();
        let user = User::try_from(entity).unwrap();
        assert_ne!(user.password, "pwd");
        assert!(verify_password("pwd", &user.password));
        assert!(!verify_password("other", &user.password));
    }

    #[test]
    fn test_update_skips_protected_and_unknown() {
        let mut entity = build(
            Kind::City,
            attrs(json!({"state_id": "s1", "name": "Fresno"})),
        )
        .unwrap();
        let before = entity.base().clone();

        apply_update(
            &mut entity,
            &attrs(json!({
                "id": "hijack",
                "created_at": "never",
                "state_id": "s2",
                "name": "Modesto",
                "population": 3
            })),
            &["state_id"],
        )
        .unwrap();

        assert_eq!(entity.id(), before.id);
        assert_eq!(entity.base().created_at, before.created_at);
        assert!(entity.base().updated_at.parse() > before.updated_at.parse());
        let record = entity.to_record().unwrap();
        assert_eq!(record["name"], "Modesto");
        assert_eq!(record["state_id"], "s1");
        assert!(record.get("population").is_none());
    }

    #[test]
    fn test_update_with_bad_type_leaves_entity_alone() {
        let mut entity = build(Kind::State, attrs(json!({"name": "Ohio"}))).unwrap();
        let before = entity.clone();
        let err = apply_update(&mut entity, &attrs(json!({"name": 12})), &[]).unwrap_err();
        assert!(matches!(err, HbnbError::InvalidAttributes { .. }));
        assert_eq!(entity, before);
    }
}
