//! Relationship resolution over a plain set of entities
//!
//! Backends without native joins (the file backend) answer relationship
//! queries by scanning every stored entity and comparing foreign keys, and
//! implement cascade deletes as an explicit walk. Every foreign key in the
//! model is an ownership edge, so removing a parent removes everything that
//! points at it.

use hbnb_types::{storage_key, Entity, Kind, Place};
use std::collections::{HashMap, HashSet, VecDeque};

/// Entities of `child` kind whose foreign key to `parent` equals `parent_id`
pub fn children<'a, I>(entities: I, child: Kind, parent: Kind, parent_id: &str) -> Vec<Entity>
where
    I: IntoIterator<Item = &'a Entity>,
{
    entities
        .into_iter()
        .filter(|e| e.kind() == child && references(e, parent, parent_id))
        .cloned()
        .collect()
}

/// Keep only the entities that are a `T`
pub fn of_kind<T>(entities: Vec<Entity>) -> Vec<T>
where
    T: TryFrom<Entity>,
{
    entities
        .into_iter()
        .filter_map(|e| T::try_from(e).ok())
        .collect()
}

/// Storage keys removed when `root` is deleted, `root` first.
///
/// Only keys present in `objects` are returned.
pub fn cascade(objects: &HashMap<String, Entity>, root: &Entity) -> Vec<String> {
    let mut removed = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();

    let root_key = root.key();
    if !objects.contains_key(&root_key) {
        return removed;
    }
    queue.push_back((root.kind(), root.id().to_string()));
    seen.insert(root_key);

    while let Some((kind, id)) = queue.pop_front() {
        removed.push(storage_key(kind, &id));
        for dependent in objects.values() {
            if !references(dependent, kind, &id) {
                continue;
            }
            if seen.insert(dependent.key()) {
                queue.push_back((dependent.kind(), dependent.id().to_string()));
            }
        }
    }

    removed
}

/// Drop `amenity_id` from every place's link list. Returns the number of
/// places that changed.
pub fn unlink_everywhere<'a, I>(places: I, amenity_id: &str) -> usize
where
    I: IntoIterator<Item = &'a mut Place>,
{
    let mut changed = 0;
    for place in places {
        let before = place.amenity_ids.len();
        place.amenity_ids.retain(|id| id != amenity_id);
        if place.amenity_ids.len() != before {
            changed += 1;
        }
    }
    changed
}

fn references(entity: &Entity, parent: Kind, parent_id: &str) -> bool {
    entity
        .foreign_keys()
        .into_iter()
        .any(|(kind, id)| kind == parent && id == parent_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbnb_types::{Base, City, Review, State, User};

    fn base(id: &str) -> Base {
        Base {
            id: id.to_string(),
            ..Base::new()
        }
    }

    fn place(id: &str, city_id: &str, user_id: &str) -> Place {
        Place {
            base: base(id),
            city_id: city_id.into(),
            user_id: user_id.into(),
            name: id.into(),
            description: None,
            number_rooms: 0,
            number_bathrooms: 0,
            max_guest: 0,
            price_by_night: 0,
            latitude: None,
            longitude: None,
            amenity_ids: vec!["a1".into(), "a2".into()],
        }
    }

    fn world() -> HashMap<String, Entity> {
        let entities: Vec<Entity> = vec![
            State { base: base("s1"), name: "CA".into() }.into(),
            City { base: base("c1"), state_id: "s1".into(), name: "SF".into() }.into(),
            City { base: base("c2"), state_id: "s2".into(), name: "NY".into() }.into(),
            User {
                base: base("u1"),
                email: "e".into(),
                password: "p".into(),
                first_name: None,
                last_name: None,
            }
            .into(),
            place("p1", "c1", "u1").into(),
            place("p2", "c2", "u1").into(),
            Review {
                base: base("r1"),
                place_id: "p1".into(),
                user_id: "u2".into(),
                text: "ok".into(),
            }
            .into(),
        ];
        entities.into_iter().map(|e| (e.key(), e)).collect()
    }

    #[test]
    fn test_children_filters_by_foreign_key() {
        let objects = world();
        let cities = children(objects.values(), Kind::City, Kind::State, "s1");
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].id(), "c1");
        assert!(children(objects.values(), Kind::City, Kind::State, "zz").is_empty());
    }

    #[test]
    fn test_cascade_from_state() {
        let objects = world();
        let root = objects["State.s1"].clone();
        let removed = cascade(&objects, &root);
        assert_eq!(removed[0], "State.s1");
        let removed: HashSet<_> = removed.into_iter().collect();
        let expected: HashSet<String> = ["State.s1", "City.c1", "Place.p1", "Review.r1"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(removed, expected);
    }

    #[test]
    fn test_cascade_from_user_reaches_reviews_of_owned_places() {
        let objects = world();
        let root = objects["User.u1"].clone();
        let removed: HashSet<_> = cascade(&objects, &root).into_iter().collect();
        assert!(removed.contains("Place.p1"));
        assert!(removed.contains("Place.p2"));
        assert!(removed.contains("Review.r1"));
        assert!(!removed.contains("City.c1"));
    }

    #[test]
    fn test_cascade_of_unknown_root_is_empty() {
        let objects = world();
        let ghost: Entity = State { base: base("ghost"), name: "X".into() }.into();
        assert!(cascade(&objects, &ghost).is_empty());
    }

    #[test]
    fn test_unlink_everywhere() {
        let mut places = vec![place("p1", "c1", "u1"), place("p2", "c1", "u1")];
        places[1].amenity_ids.clear();
        assert_eq!(unlink_everywhere(places.iter_mut(), "a1"), 1);
        assert_eq!(places[0].amenity_ids, vec!["a2".to_string()]);
        assert_eq!(unlink_everywhere(places.iter_mut(), "a1"), 0);
    }
}
