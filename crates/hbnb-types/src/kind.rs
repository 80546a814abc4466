//! Entity kind tags

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The type tag of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    Amenity,
    City,
    Place,
    Review,
    State,
    User,
}

impl Kind {
    /// Every kind, in the order used for aggregate listings
    pub const ALL: [Kind; 6] = [
        Kind::Amenity,
        Kind::City,
        Kind::Place,
        Kind::Review,
        Kind::State,
        Kind::User,
    ];

    /// Class-style name, used in snapshot keys and `__class__`
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Amenity => "Amenity",
            Kind::City => "City",
            Kind::Place => "Place",
            Kind::Review => "Review",
            Kind::State => "State",
            Kind::User => "User",
        }
    }

    /// Plural collection name, used for table names and the stats endpoint
    pub fn collection(&self) -> &'static str {
        match self {
            Kind::Amenity => "amenities",
            Kind::City => "cities",
            Kind::Place => "places",
            Kind::Review => "reviews",
            Kind::State => "states",
            Kind::User => "users",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when a string names no known kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl std::fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown kind: {}", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for Kind {
    type Err = UnknownKind;

    /// Accepts either the class name (`State`) or the collection name (`states`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|k| k.name() == s || k.collection() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_spellings() {
        assert_eq!("State".parse::<Kind>(), Ok(Kind::State));
        assert_eq!("amenities".parse::<Kind>(), Ok(Kind::Amenity));
        assert!("Country".parse::<Kind>().is_err());
    }

    #[test]
    fn test_names_are_distinct() {
        let mut names: Vec<_> = Kind::ALL.iter().map(|k| k.collection()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Kind::ALL.len());
    }
}
