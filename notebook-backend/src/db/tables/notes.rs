//! Note database operations

use chrono::{NaiveDate, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Result as SqliteResult, Row};
use std::collections::BTreeSet;

use crate::db::sqlite::{parse_timestamp, placeholders};
use crate::db::NoteWhere;
use crate::models::{NewNote, Note, NoteUpdate};
use super::super::Database;

const NOTE_COLUMNS: &str = "id, section_id, content, completed, completed_by, completed_at, \
                            date, tags, created_by, created_at";

impl Database {
    /// Create a note and return the stored row
    pub fn create_note(&self, new_note: &NewNote) -> SqliteResult<Note> {
        let conn = self.conn();
        let now = Utc::now();
        let tags_json = encode_tags(&new_note.tags)?;

        conn.execute(
            "INSERT INTO notes (section_id, content, completed, date, tags, created_by, created_at)
             VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6)",
            params![
                new_note.section_id,
                new_note.content,
                new_note.date.map(|d| d.to_string()),
                tags_json,
                new_note.created_by,
                now.to_rfc3339(),
            ],
        )?;

        Ok(Note {
            id: conn.last_insert_rowid(),
            section_id: new_note.section_id,
            content: new_note.content.clone(),
            completed: false,
            completed_by: None,
            completed_at: None,
            date: new_note.date,
            tags: new_note.tags.clone(),
            created_by: new_note.created_by.clone(),
            created_at: now,
        })
    }

    /// List notes matching `filter`, in insertion order
    pub fn list_notes(&self, filter: &NoteWhere) -> SqliteResult<Vec<Note>> {
        let conn = self.conn();
        let (clause, values) = note_where_clause(filter);
        let sql = format!("SELECT {} FROM notes{} ORDER BY id", NOTE_COLUMNS, clause);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), Self::row_to_note)?;
        rows.collect()
    }

    /// Apply a partial update. Returns false when the note does not exist.
    pub fn update_note(&self, id: i64, update: &NoteUpdate) -> SqliteResult<bool> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if let Some(section_id) = update.section_id {
            sets.push("section_id");
            values.push(SqlValue::Integer(section_id));
        }
        if let Some(completed) = update.completed {
            sets.push("completed");
            values.push(SqlValue::Integer(completed as i64));
        }
        if let Some(ref completed_by) = update.completed_by {
            sets.push("completed_by");
            values.push(optional_text(completed_by.clone()));
        }
        if let Some(completed_at) = update.completed_at {
            sets.push("completed_at");
            values.push(optional_text(completed_at.map(|dt| dt.to_rfc3339())));
        }
        if let Some(ref tags) = update.tags {
            sets.push("tags");
            values.push(SqlValue::Text(encode_tags(tags)?));
        }

        let conn = self.conn();
        if sets.is_empty() {
            let exists: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notes WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            return Ok(exists > 0);
        }

        let assignments = sets
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE notes SET {} WHERE id = ?{}",
            assignments,
            sets.len() + 1
        );
        values.push(SqlValue::Integer(id));

        let count = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        Ok(count > 0)
    }

    /// Delete notes matching `filter`. An unscoped filter deletes nothing.
    pub fn delete_notes(&self, filter: &NoteWhere) -> SqliteResult<usize> {
        let conn = self.conn();
        let (clause, values) = note_where_clause(filter);
        if clause.is_empty() {
            return Ok(0);
        }
        conn.execute(
            &format!("DELETE FROM notes{}", clause),
            rusqlite::params_from_iter(values.iter()),
        )
    }

    fn row_to_note(row: &Row) -> SqliteResult<Note> {
        let completed_at: Option<String> = row.get(5)?;
        let date: Option<String> = row.get(6)?;
        let tags_json: String = row.get(7)?;
        let created_at: String = row.get(9)?;

        let tags: BTreeSet<String> = serde_json::from_str(&tags_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Note {
            id: row.get(0)?,
            section_id: row.get(1)?,
            content: row.get(2)?,
            completed: row.get(3)?,
            completed_by: row.get(4)?,
            completed_at: completed_at
                .as_deref()
                .map(|s| parse_timestamp(5, s))
                .transpose()?,
            date: date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            tags,
            created_by: row.get(8)?,
            created_at: parse_timestamp(9, &created_at)?,
        })
    }
}

fn encode_tags(tags: &BTreeSet<String>) -> SqliteResult<String> {
    serde_json::to_string(tags).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn optional_text(value: Option<String>) -> SqlValue {
    value.map(SqlValue::Text).unwrap_or(SqlValue::Null)
}

fn note_where_clause(filter: &NoteWhere) -> (String, Vec<i64>) {
    if filter.ids.as_ref().is_some_and(|v| v.is_empty())
        || filter.section_ids.as_ref().is_some_and(|v| v.is_empty())
    {
        return (" WHERE 0".to_string(), Vec::new());
    }

    let mut conditions = Vec::new();
    let mut values: Vec<i64> = Vec::new();

    if let Some(ref ids) = filter.ids {
        conditions.push(format!("id IN ({})", placeholders(values.len() + 1, ids.len())));
        values.extend(ids);
    }
    if let Some(ref section_ids) = filter.section_ids {
        conditions.push(format!(
            "section_id IN ({})",
            placeholders(values.len() + 1, section_ids.len())
        ));
        values.extend(section_ids);
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{normalize_tags, NewPage, NewSection};

    fn seeded() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let page = db.create_page(&NewPage { name: "Launch".into(), starred: false }).unwrap();
        let section = db
            .create_section(&NewSection { name: "Checklist".into(), page_id: page.id })
            .unwrap();
        (db, section.id)
    }

    fn new_note(section_id: i64, content: &str, tags: &[&str]) -> NewNote {
        NewNote {
            section_id,
            content: content.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 14),
            tags: normalize_tags(tags.iter().copied()),
            created_by: Some("agent".to_string()),
        }
    }

    #[test]
    fn test_create_and_list_round_trips_fields() {
        let (db, section_id) = seeded();
        let created = db.create_note(&new_note(section_id, "Ship v2", &["Urgent"])).unwrap();

        let listed = db.list_notes(&NoteWhere::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].date, created.date);
        assert!(listed[0].tags.contains("urgent"));
        assert_eq!(listed[0].created_by.as_deref(), Some("agent"));
    }

    #[test]
    fn test_update_note_completion_and_tags() {
        let (db, section_id) = seeded();
        let note = db.create_note(&new_note(section_id, "Write docs", &[])).unwrap();
        let now = Utc::now();

        let updated = db
            .update_note(
                note.id,
                &NoteUpdate {
                    completed: Some(true),
                    completed_by: Some(Some("sam".into())),
                    completed_at: Some(Some(now)),
                    tags: Some(normalize_tags(["docs"])),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(updated);

        let stored = &db.list_notes(&NoteWhere::for_ids(vec![note.id])).unwrap()[0];
        assert!(stored.completed);
        assert_eq!(stored.completed_by.as_deref(), Some("sam"));
        assert!(stored.completed_at.is_some());
        assert!(stored.tags.contains("docs"));

        assert!(!db.update_note(9999, &NoteUpdate { completed: Some(false), ..Default::default() }).unwrap());
    }

    #[test]
    fn test_delete_notes_by_section() {
        let (db, section_id) = seeded();
        db.create_note(&new_note(section_id, "a", &[])).unwrap();
        db.create_note(&new_note(section_id, "b", &[])).unwrap();

        assert_eq!(db.delete_notes(&NoteWhere::default()).unwrap(), 0);
        assert_eq!(db.delete_notes(&NoteWhere::for_sections(vec![section_id])).unwrap(), 2);
        assert!(db.list_notes(&NoteWhere::default()).unwrap().is_empty());
    }
}
