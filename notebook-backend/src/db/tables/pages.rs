//! Page database operations

use chrono::Utc;
use rusqlite::{params, Result as SqliteResult};

use crate::models::{NewPage, Page};
use super::super::Database;

impl Database {
    /// Create a page at the end of the page list
    pub fn create_page(&self, new_page: &NewPage) -> SqliteResult<Page> {
        let conn = self.conn();
        let position: i64 = conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM pages",
            [],
            |row| row.get(0),
        )?;

        conn.execute(
            "INSERT INTO pages (name, starred, position, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![new_page.name, new_page.starred, position, Utc::now().to_rfc3339()],
        )?;

        Ok(Page {
            id: conn.last_insert_rowid(),
            name: new_page.name.clone(),
            starred: new_page.starred,
            position,
        })
    }

    /// List all pages ordered by position
    pub fn list_pages(&self) -> SqliteResult<Vec<Page>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, name, starred, position FROM pages ORDER BY position, id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Page {
                id: row.get(0)?,
                name: row.get(1)?,
                starred: row.get(2)?,
                position: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    /// Delete a single page. Its sections must already be gone.
    pub fn delete_page(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn();
        let count = conn.execute("DELETE FROM pages WHERE id = ?1", params![id])?;
        Ok(count > 0)
    }
}
