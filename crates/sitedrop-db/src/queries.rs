use crate::models::{FileRow, FileSummaryRow, NewFile, SiteRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, Row};

const SITE_COLUMNS: &str = "site_name, password, created_at, updated_at";
const FILE_COLUMNS: &str =
    "id, site_name, file_name, file_url, content_sha, created_at, updated_at";

impl Database {
    // -- Sites --

    /// Insert a new site. Returns `None` if the name is already taken.
    pub fn create_site(&self, site_name: &str, password_hash: &str) -> Result<Option<SiteRow>> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO sites (site_name, password) VALUES (?1, ?2)
                 ON CONFLICT(site_name) DO NOTHING",
                (site_name, password_hash),
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            query_site(conn, site_name)
        })
    }

    pub fn get_site(&self, site_name: &str) -> Result<Option<SiteRow>> {
        self.with_conn(|conn| query_site(conn, site_name))
    }

    pub fn list_sites(&self) -> Result<Vec<SiteRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {SITE_COLUMNS} FROM sites ORDER BY site_name"))?;
            let rows = stmt
                .query_map([], site_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete a site together with its file rows, in one transaction.
    /// Returns the removed file rows, or `None` if no such site existed.
    pub fn delete_site(&self, site_name: &str) -> Result<Option<Vec<FileRow>>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let files = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {FILE_COLUMNS} FROM files WHERE site_name = ?1 ORDER BY id"
                ))?;
                let rows = stmt
                    .query_map([site_name], file_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            };
            tx.execute("DELETE FROM files WHERE site_name = ?1", [site_name])?;
            let deleted = tx.execute("DELETE FROM sites WHERE site_name = ?1", [site_name])?;
            if deleted == 0 {
                return Ok(None);
            }
            tx.commit()?;
            Ok(Some(files))
        })
    }

    // -- Files --

    pub fn insert_file(&self, file: &NewFile<'_>) -> Result<FileRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO files (site_name, file_name, file_url, content_sha)
                 VALUES (?1, ?2, ?3, ?4)",
                (file.site_name, file.file_name, file.file_url, file.content_sha),
            )?;
            let id = conn.last_insert_rowid();
            query_file(conn, id)?.ok_or_else(|| anyhow::anyhow!("File {} vanished after insert", id))
        })
    }

    pub fn get_file(&self, id: i64) -> Result<Option<FileRow>> {
        self.with_conn(|conn| query_file(conn, id))
    }

    /// Listing projection: id, site name, file name, created timestamp.
    pub fn list_files_for_site(&self, site_name: &str) -> Result<Vec<FileSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, site_name, file_name, created_at
                 FROM files
                 WHERE site_name = ?1
                 ORDER BY created_at, id",
            )?;
            let rows = stmt
                .query_map([site_name], |row| {
                    Ok(FileSummaryRow {
                        id: row.get(0)?,
                        site_name: row.get(1)?,
                        file_name: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_site(conn: &Connection, site_name: &str) -> Result<Option<SiteRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE site_name = ?1"))?;
    let row = stmt.query_row([site_name], site_from_row).optional()?;
    Ok(row)
}

fn query_file(conn: &Connection, id: i64) -> Result<Option<FileRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"))?;
    let row = stmt.query_row([id], file_from_row).optional()?;
    Ok(row)
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRow> {
    Ok(SiteRow {
        site_name: row.get(0)?,
        password: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileRow> {
    Ok(FileRow {
        id: row.get(0)?,
        site_name: row.get(1)?,
        file_name: row.get(2)?,
        file_url: row.get(3)?,
        content_sha: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_file<'a>(site_name: &'a str, file_name: &'a str) -> NewFile<'a> {
        NewFile {
            site_name,
            file_name,
            file_url: "https://example.test/blob",
            content_sha: "abc123",
        }
    }

    #[test]
    fn create_site_rejects_duplicate_name() {
        let db = Database::open_in_memory().unwrap();

        let site = db.create_site("acme", "hash-1").unwrap().unwrap();
        assert_eq!(site.site_name, "acme");
        assert_eq!(site.password, "hash-1");

        assert!(db.create_site("acme", "hash-2").unwrap().is_none());
        assert_eq!(db.get_site("acme").unwrap().unwrap().password, "hash-1");
    }

    #[test]
    fn get_missing_site_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_site("nobody").unwrap().is_none());
    }

    #[test]
    fn list_sites_is_ordered_by_name() {
        let db = Database::open_in_memory().unwrap();
        db.create_site("zeta", "h").unwrap();
        db.create_site("alpha", "h").unwrap();

        let names: Vec<String> = db.list_sites().unwrap().into_iter().map(|s| s.site_name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn insert_and_get_file() {
        let db = Database::open_in_memory().unwrap();
        db.create_site("acme", "h").unwrap();

        let row = db.insert_file(&new_file("acme", "report.txt_1700000000")).unwrap();
        let fetched = db.get_file(row.id).unwrap().unwrap();
        assert_eq!(fetched.site_name, "acme");
        assert_eq!(fetched.file_name, "report.txt_1700000000");
        assert_eq!(fetched.content_sha, "abc123");

        assert!(db.get_file(row.id + 1).unwrap().is_none());
    }

    #[test]
    fn insert_file_requires_existing_site() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.insert_file(&new_file("ghost", "a_1")).is_err());
    }

    #[test]
    fn duplicate_stored_name_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_site("acme", "h").unwrap();

        db.insert_file(&new_file("acme", "a_1")).unwrap();
        assert!(db.insert_file(&new_file("acme", "a_1")).is_err());
        db.insert_file(&new_file("acme", "a_2")).unwrap();
    }

    #[test]
    fn list_files_only_returns_site_files() {
        let db = Database::open_in_memory().unwrap();
        db.create_site("acme", "h").unwrap();
        db.create_site("other", "h").unwrap();
        db.insert_file(&new_file("acme", "a_1")).unwrap();
        db.insert_file(&new_file("acme", "b_1")).unwrap();
        db.insert_file(&new_file("other", "c_1")).unwrap();

        let files = db.list_files_for_site("acme").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.site_name == "acme"));
        assert_eq!(db.list_files_for_site("other").unwrap().len(), 1);
    }

    #[test]
    fn delete_site_removes_its_files() {
        let db = Database::open_in_memory().unwrap();
        db.create_site("acme", "h").unwrap();
        db.create_site("other", "h").unwrap();
        let gone = db.insert_file(&new_file("acme", "a_1")).unwrap();
        let kept = db.insert_file(&new_file("other", "a_1")).unwrap();

        let removed = db.delete_site("acme").unwrap().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, gone.id);
        assert_eq!(removed[0].content_sha, "abc123");

        assert!(db.get_site("acme").unwrap().is_none());
        assert!(db.get_file(gone.id).unwrap().is_none());
        assert!(db.get_file(kept.id).unwrap().is_some());

        assert!(db.delete_site("acme").unwrap().is_none());
    }

    #[test]
    fn failed_site_delete_keeps_its_files() {
        let db = Database::open_in_memory().unwrap();
        db.create_site("acme", "h").unwrap();
        let file = db.insert_file(&new_file("acme", "a_1")).unwrap();
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER keep_sites BEFORE DELETE ON sites
                 BEGIN SELECT RAISE(ABORT, 'sites are read-only'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        assert!(db.delete_site("acme").is_err());
        assert!(db.get_site("acme").unwrap().is_some());
        assert!(db.get_file(file.id).unwrap().is_some());
    }
}
