//! Section database operations

use chrono::Utc;
use rusqlite::{params, Result as SqliteResult};

use crate::db::sqlite::placeholders;
use crate::db::SectionWhere;
use crate::models::{NewSection, Section};
use super::super::Database;

impl Database {
    /// Create a section at the end of its page
    pub fn create_section(&self, new_section: &NewSection) -> SqliteResult<Section> {
        let conn = self.conn();
        let position: i64 = conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM sections WHERE page_id = ?1",
            params![new_section.page_id],
            |row| row.get(0),
        )?;

        conn.execute(
            "INSERT INTO sections (name, page_id, position, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                new_section.name,
                new_section.page_id,
                position,
                Utc::now().to_rfc3339()
            ],
        )?;

        Ok(Section {
            id: conn.last_insert_rowid(),
            name: new_section.name.clone(),
            page_id: new_section.page_id,
            position,
        })
    }

    /// List sections matching `filter`, ordered by page then position
    pub fn list_sections(&self, filter: &SectionWhere) -> SqliteResult<Vec<Section>> {
        let conn = self.conn();
        let (clause, values) = section_where_clause(filter);
        let sql = format!(
            "SELECT id, name, page_id, position FROM sections{} ORDER BY page_id, position, id",
            clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), |row| {
            Ok(Section {
                id: row.get(0)?,
                name: row.get(1)?,
                page_id: row.get(2)?,
                position: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    /// Delete sections matching `filter`. Their notes must already be gone.
    pub fn delete_sections(&self, filter: &SectionWhere) -> SqliteResult<usize> {
        let conn = self.conn();
        let (clause, values) = section_where_clause(filter);
        if clause.is_empty() {
            // Refuse an unscoped delete
            return Ok(0);
        }
        conn.execute(
            &format!("DELETE FROM sections{}", clause),
            rusqlite::params_from_iter(values.iter()),
        )
    }
}

fn section_where_clause(filter: &SectionWhere) -> (String, Vec<i64>) {
    let mut conditions = Vec::new();
    let mut values: Vec<i64> = Vec::new();

    if let Some(ref ids) = filter.ids {
        conditions.push(format!("id IN ({})", placeholders(values.len() + 1, ids.len())));
        values.extend(ids);
    }
    if let Some(ref page_ids) = filter.page_ids {
        conditions.push(format!(
            "page_id IN ({})",
            placeholders(values.len() + 1, page_ids.len())
        ));
        values.extend(page_ids);
    }

    // An empty IN list matches nothing
    if filter.ids.as_ref().is_some_and(|v| v.is_empty())
        || filter.page_ids.as_ref().is_some_and(|v| v.is_empty())
    {
        return (" WHERE 0".to_string(), Vec::new());
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}
