use serde::{Deserialize, Serialize};

use super::guid::Guid;

/// A path of lane points notes are placed on.
///
/// `points` are lane point guids in musical order, `division` the number of
/// note columns across the lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lane {
    pub guid: Guid,
    pub template_name: String,
    pub division: u32,
    pub points: Vec<Guid>,
}

impl Lane {
    pub fn first_point(&self) -> Option<&Guid> {
        self.points.first()
    }

    pub fn last_point(&self) -> Option<&Guid> {
        self.points.last()
    }

    /// Whether this lane ends where `other` starts, so both can merge.
    pub fn connects_to(&self, other: &Lane) -> bool {
        self.guid != other.guid
            && self.template_name == other.template_name
            && self.division == other.division
            && self.last_point().is_some()
            && self.last_point() == other.first_point()
    }
}
