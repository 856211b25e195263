//! Inventory data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An item in the fridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Primary key.
    pub id: Uuid,
    pub name: String,
    /// When the item was put in the fridge.
    pub date_entered: DateTime<Utc>,
    pub date_expiry: DateTime<Utc>,
}
