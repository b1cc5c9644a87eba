use crate::model::BuildState;

/// Suffix Jenkins appends to a color while a build is running (`blue_anime`).
pub const DEFAULT_BUILDING_SUFFIX: &str = "_anime";

/// Color vocabulary, checked in order. Exact words come before the color
/// substrings so `aborted` and `notbuilt` never fall through to a color match.
const TOKEN_TABLE: &[(&str, BuildState)] = &[
    ("aborted", BuildState::Aborted),
    ("notbuilt", BuildState::NotBuilt),
    ("disabled", BuildState::Disabled),
    ("grey", BuildState::Disabled),
    ("gray", BuildState::Disabled),
    ("red", BuildState::Failure),
    ("yellow", BuildState::Unstable),
    ("blue", BuildState::Success),
];

/// Maps a server status token to `(BuildState, building)`.
///
/// Total over every input: unknown, empty or malformed tokens map to
/// `(Unknown, false)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMapper {
    building_suffix: String,
}

impl Default for StatusMapper {
    fn default() -> Self {
        Self::new(DEFAULT_BUILDING_SUFFIX)
    }
}

impl StatusMapper {
    /// An empty suffix disables building detection.
    pub fn new(building_suffix: &str) -> Self {
        Self {
            building_suffix: building_suffix.trim().to_ascii_lowercase(),
        }
    }

    /// Lowercased suffix that marks a running build.
    pub fn building_suffix(&self) -> &str {
        &self.building_suffix
    }

    /// Maps a raw token. Never fails.
    pub fn map(&self, raw: &str) -> (BuildState, bool) {
        let token = raw.trim().to_ascii_lowercase();

        let (color, building) = match token.strip_suffix(self.building_suffix.as_str()) {
            Some(stripped) if !self.building_suffix.is_empty() => (stripped, true),
            _ => (token.as_str(), false),
        };

        let state = TOKEN_TABLE
            .iter()
            .find(|(needle, _)| color.contains(needle))
            .map(|(_, state)| *state);

        match state {
            Some(state) => (state, building),
            None => (BuildState::Unknown, false),
        }
    }
}
