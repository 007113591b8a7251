//! Institution domain model

use crate::ids::ShortUid;
use serde::{Deserialize, Serialize};

/// A canonical institution entity
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Institution {
    pub short_uid: ShortUid,
    pub ror_id: Option<String>,
    pub display_name: String,
    pub country_code: Option<String>,
    pub institution_type: Option<String>,
}

impl Institution {
    pub fn new(short_uid: ShortUid, display_name: impl Into<String>) -> Self {
        Self {
            short_uid,
            ror_id: None,
            display_name: display_name.into(),
            country_code: None,
            institution_type: None,
        }
    }
}
