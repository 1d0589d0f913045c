use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Record;

pub const DEFAULT_ROLE: &str = "member";

/// Bookkeeping fields shared by stored records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Record)]
#[serde(default)]
pub struct Audit {
    #[bind(json = "created_at", validate = "zerotime")]
    pub created_at: Option<DateTime<Utc>>,
    #[bind(json = "updated_by", validate = "max=64")]
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Record)]
#[serde(default)]
pub struct User {
    #[serde(skip_deserializing)]
    #[bind(json = "id", column = "pk, 'id'")]
    pub id: String,
    #[bind(json = "name", column = "varchar(64), 'user_name'", validate = "required,min=1,max=64")]
    pub name: String,
    #[bind(json = "email", validate = "required,email")]
    pub email: String,
    /// Display-only; never stored.
    #[bind(json = "nickname", column = "-", validate = "max=32")]
    pub nickname: Option<String>,
    #[bind(json = "role", validate = "fixed")]
    pub role: String,
    #[serde(flatten)]
    pub audit: Audit,
}
