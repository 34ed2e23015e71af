//! Event categories and the locations they map to.
//!
//! Every feed event may carry one of six [`Category`] labels. A
//! [`LocationTable`] maps each label to a [`Location`]: either an opaque room
//! identifier understood by the import target, or [`Location::Freeform`] for
//! events that have a category but no dedicated physical space.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tracing::warn;

/// The closed set of category labels used by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Foster,
    Meeting,
    Chapel,
    Gym,
    Library,
    Studio,
}

impl Category {
    /// All categories, in declaration order.
    pub const ALL: [Category; 6] = [
        Self::Foster,
        Self::Meeting,
        Self::Chapel,
        Self::Gym,
        Self::Library,
        Self::Studio,
    ];

    /// Returns the label as it appears in the feed.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Foster => "Foster",
            Self::Meeting => "Meeting",
            Self::Chapel => "Chapel",
            Self::Gym => "Gym",
            Self::Library => "Library",
            Self::Studio => "Studio",
        }
    }

    /// Returns the room identifier this category maps to by default.
    ///
    /// `Meeting` has no room.
    fn default_room(&self) -> Option<&'static str> {
        match self {
            Self::Foster => Some("6f1c2a9e-room-foster"),
            Self::Meeting => None,
            Self::Chapel => Some("0b7d4e11-room-chapel"),
            Self::Gym => Some("a39e5c02-room-gym"),
            Self::Library => Some("d2f8b7c4-room-library"),
            Self::Studio => Some("71ac0e5d-room-studio"),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a string is not one of the known category labels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category label: {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.label() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Where an event takes place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Location {
    /// The event asserts no category at all.
    #[default]
    Unassigned,
    /// The event has a category that owns no dedicated room.
    Freeform,
    /// The event is held in the room with this opaque identifier.
    Room(String),
}

impl Location {
    /// Returns true if no category was asserted.
    ///
    /// Used to omit the location from serialized records.
    pub fn is_unassigned(&self) -> bool {
        matches!(self, Self::Unassigned)
    }

    /// Returns the room identifier, if any.
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::Room(id) => Some(id),
            Self::Unassigned | Self::Freeform => None,
        }
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Room(id) => serializer.serialize_str(id),
            Self::Unassigned | Self::Freeform => serializer.serialize_none(),
        }
    }
}

/// Immutable mapping from category to location.
///
/// Built once at start-up, either from the compiled-in defaults or with
/// per-category overrides, and shared read-only by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationTable {
    rooms: BTreeMap<Category, Location>,
}

impl LocationTable {
    /// Builds a table from the defaults with the given room identifiers
    /// replacing the defaults for their categories.
    ///
    /// Overrides for [`Category::Meeting`] are ignored: it never owns a room.
    pub fn with_overrides<I, S>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (Category, S)>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for (category, id) in overrides {
            if category == Category::Meeting {
                warn!("Ignoring room override for the Meeting category");
                continue;
            }
            table.rooms.insert(category, Location::Room(id.into()));
        }
        table
    }

    /// Resolves an optional category to a location.
    ///
    /// No category yields [`Location::Unassigned`].
    pub fn resolve(&self, category: Option<Category>) -> Location {
        match category {
            None => Location::Unassigned,
            Some(category) => self
                .rooms
                .get(&category)
                .cloned()
                .unwrap_or(Location::Freeform),
        }
    }

    /// Iterates over every category and its location.
    pub fn iter(&self) -> impl Iterator<Item = (&Category, &Location)> {
        self.rooms.iter()
    }
}

impl Default for LocationTable {
    fn default() -> Self {
        let rooms = Category::ALL
            .into_iter()
            .map(|category| {
                let location = match category.default_room() {
                    Some(id) => Location::Room(id.to_string()),
                    None => Location::Freeform,
                };
                (category, location)
            })
            .collect();
        Self { rooms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_labels() {
        for category in Category::ALL {
            assert_eq!(category.label().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn rejects_unknown_labels() {
        assert_eq!(
            "Kitchen".parse::<Category>(),
            Err(UnknownCategory("Kitchen".to_string()))
        );
        assert!("foster".parse::<Category>().is_err());
        assert!("".parse::<Category>().is_err());
    }

    #[test]
    fn absent_category_is_unassigned() {
        assert_eq!(LocationTable::default().resolve(None), Location::Unassigned);
    }

    #[test]
    fn meeting_is_freeform() {
        let location = LocationTable::default().resolve(Some(Category::Meeting));
        assert_eq!(location, Location::Freeform);
        assert!(!location.is_unassigned());
        assert_eq!(location.room_id(), None);
    }

    #[test]
    fn foster_has_room() {
        let location = LocationTable::default().resolve(Some(Category::Foster));
        assert_eq!(location.room_id(), Some("6f1c2a9e-room-foster"));
    }

    #[test]
    fn room_categories_have_distinct_ids() {
        let table = LocationTable::default();
        let mut ids: Vec<_> = Category::ALL
            .into_iter()
            .filter_map(|c| table.resolve(Some(c)).room_id().map(str::to_string))
            .collect();
        assert_eq!(ids.len(), 5);
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn overrides_replace_defaults() {
        let table = LocationTable::with_overrides([
            (Category::Gym, "gym-2"),
            (Category::Meeting, "not-a-room"),
        ]);
        assert_eq!(table.resolve(Some(Category::Gym)).room_id(), Some("gym-2"));
        assert_eq!(table.resolve(Some(Category::Meeting)), Location::Freeform);
        assert_eq!(
            table.resolve(Some(Category::Foster)).room_id(),
            Some("6f1c2a9e-room-foster")
        );
    }

    #[test]
    fn location_serialization() {
        assert_eq!(
            serde_json::to_string(&Location::Room("r1".into())).unwrap(),
            "\"r1\""
        );
        assert_eq!(serde_json::to_string(&Location::Freeform).unwrap(), "null");
    }
}
