use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Numeric record identifier, persisted as a decimal string.
///
/// Photo and comment ids are allocated from process-local counters, so the
/// numeric value is what orders them; the string form is only the wire shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The id that follows this one, or `None` once the id space is used up.
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Parse the decimal form. Leading/trailing whitespace is not accepted.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidId(s.to_string()))
    }

    /// Largest numeric id among `ids`, skipping any that are not decimal.
    ///
    /// Snapshots written by other tools may carry non-numeric ids; those can
    /// never collide with allocated ones so they do not take part in seeding.
    pub fn max_of<'a>(ids: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        ids.into_iter().filter_map(|s| Self::parse(s).ok()).max()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let id = RecordId::parse("42").unwrap();
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(String::from(id.next().unwrap()), "43");
    }

    #[test]
    fn parse_rejects_non_decimal() {
        assert_eq!(
            RecordId::parse("abc"),
            Err(TypeError::InvalidId("abc".into()))
        );
        assert!(RecordId::parse("").is_err());
        assert!(RecordId::parse("-1").is_err());
        assert!(RecordId::parse(" 7").is_err());
    }

    #[test]
    fn largest_id_has_no_successor() {
        assert_eq!(RecordId::new(u64::MAX).next(), None);
        let max = RecordId::parse(&u64::MAX.to_string()).unwrap();
        assert_eq!(max.next(), None);
    }

    #[test]
    fn max_of_compares_numerically() {
        // "9" > "10" lexically; numeric comparison must win.
        let max = RecordId::max_of(["9", "10", "2"]).unwrap();
        assert_eq!(max.value(), 10);
    }

    #[test]
    fn max_of_skips_garbage_and_handles_empty() {
        assert_eq!(RecordId::max_of(["x", "3", "y"]), Some(RecordId::new(3)));
        assert_eq!(RecordId::max_of(Vec::<&str>::new()), None);
        assert_eq!(RecordId::max_of(["legacy-id"]), None);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn next_is_strictly_greater(n in any::<u64>()) {
                let id = RecordId::new(n);
                match id.next() {
                    Some(next) => {
                        prop_assert!(next > id);
                        prop_assert_eq!(RecordId::parse(&next.to_string()).unwrap(), next);
                    }
                    None => prop_assert_eq!(n, u64::MAX),
                }
            }
        }
    }
}
