//! Static phrase table consulted before any network call.

use tilescout_core::Coordinate;

const MARINA: Coordinate = Coordinate::new(-122.4410, 37.8065);
const AIRPORT: Coordinate = Coordinate::new(-122.3899, 37.6152);
const PARKING: Coordinate = Coordinate::new(-122.4090, 37.7840);
const DOWNTOWN: Coordinate = Coordinate::new(-122.4076, 37.7884);

/// Known conceptual phrases. Order matters: it breaks fuzzy-score ties.
const KNOWN_PHRASES: &[(&str, Coordinate)] = &[
    ("marina", MARINA),
    ("coastal marina", MARINA),
    ("harbor", MARINA),
    ("airport", AIRPORT),
    ("airplanes", AIRPORT),
    ("runway", AIRPORT),
    ("parking", PARKING),
    ("parking lot", PARKING),
    ("downtown", DOWNTOWN),
];

/// Read-only mapping of normalized phrase to coordinate.
///
/// Conceptual queries such as "parking lot" are not place names a
/// geocoder can answer, so they are pinned to representative spots.
#[derive(Debug, Clone)]
pub struct FallbackTable {
    entries: Vec<(String, Coordinate)>,
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self::from_entries(KNOWN_PHRASES.iter().map(|(k, c)| (k.to_string(), *c)))
    }
}

impl FallbackTable {
    /// Build a table from arbitrary entries. Keys are normalized; the
    /// first occurrence of a duplicate key wins.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Coordinate)>) -> Self {
        let mut table = Self {
            entries: Vec::new(),
        };
        for (phrase, coordinate) in entries {
            let phrase = super::normalize_query(&phrase);
            if table.get(&phrase).is_none() {
                table.entries.push((phrase, coordinate));
            }
        }
        table
    }

    /// Exact lookup of an already-normalized phrase.
    pub fn get(&self, phrase: &str) -> Option<Coordinate> {
        self.entries
            .iter()
            .find(|(key, _)| key == phrase)
            .map(|(_, c)| *c)
    }

    /// Entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Coordinate)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
