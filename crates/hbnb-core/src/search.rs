//! Place search by state, city and amenity

use crate::{Result, Storage};
use hbnb_types::{Kind, Place};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;

/// Search filter. Every list is optional; a null list is an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceFilter {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub states: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub cities: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub amenities: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl PlaceFilter {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.cities.is_empty() && self.amenities.is_empty()
    }
}

/// Places in any of the given states or cities that have every given amenity.
///
/// Without a state or city filter the candidates are all places. Unknown ids
/// match nothing. Each place appears once.
pub async fn search_places(storage: &dyn Storage, filter: &PlaceFilter) -> Result<Vec<Place>> {
    if filter.is_empty() {
        return all_places(storage).await;
    }

    let mut places = if filter.states.is_empty() && filter.cities.is_empty() {
        all_places(storage).await?
    } else {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        let mut city_ids = Vec::new();
        for state_id in &filter.states {
            for city in storage.cities_of(state_id).await? {
                city_ids.push(city.base.id);
            }
        }
        city_ids.extend(filter.cities.iter().cloned());

        for city_id in &city_ids {
            for place in storage.places_of(city_id).await? {
                if seen.insert(place.base.id.clone()) {
                    found.push(place);
                }
            }
        }
        found
    };

    if !filter.amenities.is_empty() {
        places.retain(|place| {
            filter
                .amenities
                .iter()
                .all(|amenity_id| place.amenity_ids.contains(amenity_id))
        });
    }

    Ok(places)
}

async fn all_places(storage: &dyn Storage) -> Result<Vec<Place>> {
    let mut places: Vec<Place> = storage
        .get_all(Some(Kind::Place))
        .await?
        .into_values()
        .filter_map(|e| Place::try_from(e).ok())
        .collect();
    places.sort_by(|a, b| {
        (a.base.created_at.as_str(), a.base.id.as_str())
            .cmp(&(b.base.created_at.as_str(), b.base.id.as_str()))
    });
    Ok(places)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_null_lists_are_empty() {
        let filter: PlaceFilter =
            serde_json::from_value(json!({ "states": null, "amenities": ["a1"] })).unwrap();
        assert!(filter.states.is_empty());
        assert!(filter.cities.is_empty());
        assert_eq!(filter.amenities, vec!["a1"]);

        let filter: PlaceFilter = serde_json::from_value(json!({ "cities": null })).unwrap();
        assert!(filter.is_empty());

        assert!(serde_json::from_value::<PlaceFilter>(json!({ "states": "s1" })).is_err());
    }
}
