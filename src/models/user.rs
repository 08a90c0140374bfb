//! Volunteer profile, owned by the account service and read here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User ID (also used as document ID)
    pub id: u64,
    pub username: String,
    /// Display name
    pub name: String,
    /// When the volunteer joined; breaks ties in the ranking
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub join_date: DateTime<Utc>,
    /// Birthday, used for the age shown on ranking details
    pub birthday: Option<NaiveDate>,
}
