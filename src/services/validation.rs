//! Identifier validation.
//!
//! Assignment and job ids come from URLs and user input. They are checked
//! here before any request is made so a malformed id never reaches the API.

use uuid::Uuid;

/// Group lengths of the canonical hyphenated UUID form.
const GROUP_LENGTHS: [usize; 5] = [8, 4, 4, 4, 12];

/// True for the canonical 8-4-4-4-12 hex form, in any letter case.
///
/// Braced, URN and unhyphenated forms are rejected even though
/// `Uuid::parse_str` accepts them.
pub fn is_valid_uuid(candidate: &str) -> bool {
    let groups: Vec<&str> = candidate.split('-').collect();
    groups.len() == GROUP_LENGTHS.len()
        && groups
            .iter()
            .zip(GROUP_LENGTHS)
            .all(|(group, len)| group.len() == len && group.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Parse an identifier, rejecting anything that is not a canonical UUID.
pub fn parse_id(candidate: &str) -> Result<Uuid, ValidationError> {
    if !is_valid_uuid(candidate) {
        return Err(ValidationError::MalformedId(candidate.to_string()));
    }
    Uuid::parse_str(candidate).map_err(|_| ValidationError::MalformedId(candidate.to_string()))
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Malformed identifier: {0:?}")]
    MalformedId(String),
}
