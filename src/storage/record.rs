// LockerAssignment - the durable client-side record
//
// Three independently optional fields. The JSON layout is
// {"code": str|null, "door": str|null, "available": int|null}.

use serde::{Deserialize, Serialize};

/// Last known locker assignment
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockerAssignment {
    /// Code to replay at the locker, absent until the first assignment
    #[serde(default)]
    pub code: Option<String>,
    /// Door identifier reported with the code
    #[serde(default)]
    pub door: Option<String>,
    /// Free lockers at the time of the last read; none when unknown
    #[serde(default)]
    pub available: Option<i64>,
}

impl LockerAssignment {
    pub fn new(code: &str, door: &str, available: Option<i64>) -> Self {
        Self {
            code: Some(code.to_string()),
            door: Some(door.to_string()),
            available,
        }
    }

    /// True when no field has ever been set
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.door.is_none() && self.available.is_none()
    }

    /// Serialize for the sled backend
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserialize from the sled backend
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
