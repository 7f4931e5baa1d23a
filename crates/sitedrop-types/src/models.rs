use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public view of a site. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub site_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File listing entry. The external URL is left out of listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub id: i64,
    pub site_name: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}
