/// Database row types — these map directly to SQLite rows.
/// Distinct from sitedrop-types API models to keep the DB layer independent.
/// Timestamps are RFC 3339 UTC strings.

pub struct SiteRow {
    pub site_name: String,
    pub password: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct FileRow {
    pub id: i64,
    pub site_name: String,
    pub file_name: String,
    pub file_url: String,
    pub content_sha: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Projection used for listings: no URL, no content SHA.
pub struct FileSummaryRow {
    pub id: i64,
    pub site_name: String,
    pub file_name: String,
    pub created_at: String,
}

pub struct NewFile<'a> {
    pub site_name: &'a str,
    pub file_name: &'a str,
    pub file_url: &'a str,
    pub content_sha: &'a str,
}
