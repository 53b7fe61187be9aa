//! Identifiers of chart objects.

use uuid::Uuid;

/// Objects reference each other by guid, never by pointer.
pub type Guid = String;

/// Where new guids come from.
pub trait GuidSource {
    fn next_guid(&mut self) -> Guid;
}

/// Random v4 uuids.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidSource;

impl GuidSource for UuidSource {
    fn next_guid(&mut self) -> Guid {
        Uuid::new_v4().to_string()
    }
}

/// `prefix0`, `prefix1`, ... Deterministic, for tests and initial lanes.
#[derive(Debug, Clone)]
pub struct SequentialGuids {
    prefix: String,
    next: u64,
}

impl SequentialGuids {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl GuidSource for SequentialGuids {
    fn next_guid(&mut self) -> Guid {
        let guid = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        guid
    }
}
