//! Producer Model

use serde::{Deserialize, Serialize};

/// Producer - supplier that ships goods directly to the customer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Producer {
    pub id: i64,
    pub code: String,
    pub name: String,
    /// Endpoint that receives new fulfillment orders
    pub notify_url: Option<String>,
    pub contact_email: Option<String>,
    pub active: bool,
    pub created_at: i64,
}

/// Create producer payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerCreate {
    pub code: String,
    pub name: String,
    pub notify_url: Option<String>,
    pub contact_email: Option<String>,
}
