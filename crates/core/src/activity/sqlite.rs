use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{ActivityError, ActivityEvent, ActivityFilter, ActivityRecord, ActivityStore};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS activity_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        event_type TEXT NOT NULL,
        cycle_id TEXT,
        server TEXT,
        data TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_activity_events_timestamp ON activity_events(timestamp);
    CREATE INDEX IF NOT EXISTS idx_activity_events_cycle_id ON activity_events(cycle_id);
    CREATE INDEX IF NOT EXISTS idx_activity_events_event_type ON activity_events(event_type);
    CREATE INDEX IF NOT EXISTS idx_activity_events_server ON activity_events(server);
"#;

/// SQLite-backed activity store
pub struct SqliteActivityStore {
    conn: Mutex<Connection>,
}

impl SqliteActivityStore {
    /// Open (or create) the database file and its tables
    pub fn new(path: &Path) -> Result<Self, ActivityError> {
        let conn = Connection::open(path).map_err(|e| ActivityError::Database(e.to_string()))?;
        Self::init(conn)
    }

    /// In-memory store, mostly for tests
    pub fn in_memory() -> Result<Self, ActivityError> {
        let conn =
            Connection::open_in_memory().map_err(|e| ActivityError::Database(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, ActivityError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| ActivityError::Database(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ActivityError> {
        self.conn
            .lock()
            .map_err(|_| ActivityError::Database("connection lock poisoned".to_string()))
    }

    fn build_where_clause(filter: &ActivityFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref cycle_id) = filter.cycle_id {
            conditions.push("cycle_id = ?");
            params.push(Box::new(cycle_id.clone()));
        }

        if let Some(ref event_type) = filter.event_type {
            conditions.push("event_type = ?");
            params.push(Box::new(event_type.clone()));
        }

        if let Some(ref server) = filter.server {
            conditions.push("server = ?");
            params.push(Box::new(server.clone()));
        }

        if let Some(ref from) = filter.from {
            conditions.push("timestamp >= ?");
            params.push(Box::new(from.to_rfc3339()));
        }

        if let Some(ref to) = filter.to {
            conditions.push("timestamp <= ?");
            params.push(Box::new(to.to_rfc3339()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

impl ActivityStore for SqliteActivityStore {
    fn insert(&self, record: &ActivityRecord) -> Result<i64, ActivityError> {
        let data_json = serde_json::to_string(&record.data)
            .map_err(|e| ActivityError::Serialization(e.to_string()))?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO activity_events (timestamp, event_type, cycle_id, server, data) VALUES (?, ?, ?, ?, ?)",
            params![
                record.timestamp.to_rfc3339(),
                record.event_type,
                record.cycle_id,
                record.server,
                data_json,
            ],
        )
        .map_err(|e| ActivityError::Database(e.to_string()))?;

        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &ActivityFilter) -> Result<Vec<ActivityRecord>, ActivityError> {
        let conn = self.conn()?;
        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT id, timestamp, event_type, cycle_id, server, data FROM activity_events {} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ActivityError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let id: i64 = row.get(0)?;
                let timestamp_str: String = row.get(1)?;
                let event_type: String = row.get(2)?;
                let cycle_id: Option<String> = row.get(3)?;
                let server: Option<String> = row.get(4)?;
                let data_json: String = row.get(5)?;
                Ok((id, timestamp_str, event_type, cycle_id, server, data_json))
            })
            .map_err(|e| ActivityError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row_result in rows {
            let (id, timestamp_str, event_type, cycle_id, server, data_json) =
                row_result.map_err(|e| ActivityError::Database(e.to_string()))?;

            let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|e| ActivityError::Database(format!("Invalid timestamp: {}", e)))?
                .into();

            let data: ActivityEvent = serde_json::from_str(&data_json)
                .map_err(|e| ActivityError::Serialization(e.to_string()))?;

            records.push(ActivityRecord {
                id,
                timestamp,
                event_type,
                cycle_id,
                server,
                data,
            });
        }

        Ok(records)
    }

    fn count(&self, filter: &ActivityFilter) -> Result<i64, ActivityError> {
        let conn = self.conn()?;
        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!("SELECT COUNT(*) FROM activity_events {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| ActivityError::Database(e.to_string()))
    }
}
