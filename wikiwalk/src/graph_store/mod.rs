//! The Graph Store: the sole gateway to the on-disk link-graph database.
//!
//! Grounded on `examples/original_source/src/wiki_arena/solver/static_db.py`
//! (`StaticSolverDB`) for the query shapes and chunking discipline, and on
//! the teacher's `wikiwalk::GraphDB` for how to wrap a sqlite connection as
//! an owned, cloneable, async Rust type.

pub mod schema;

use std::path::Path;

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, QueryResult, SqlxSqliteConnector, Statement,
    Value,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::errors::GraphStoreError;

/// Safe fallback used when `PRAGMA compile_options` doesn't report
/// `MAX_VARIABLE_NUMBER` (matches the Python gateway's default).
const DEFAULT_MAX_VARIABLES: usize = 32766;

/// Read-only, cloneable handle onto the pages/redirects/links database.
/// Cloning is cheap: `DatabaseConnection` wraps a connection pool behind
/// an `Arc`, the same way the teacher clones `web::Data<GraphDB>` per
/// request.
#[derive(Clone)]
pub struct GraphStore {
    db: DatabaseConnection,
    max_variables: usize,
}

impl GraphStore {
    /// Opens the database at `database_path`. A missing file is logged as
    /// an error but does not fail construction: the pool is opened lazily
    /// (`min_connections(0)`), so the first real failure surfaces from the
    /// first query issued against it, per the error handling design.
    pub async fn connect(database_path: &Path) -> Result<Self, GraphStoreError> {
        if !database_path.exists() {
            log::error!(
                "graph database file not found at {}; operations will fail until it appears",
                database_path.display()
            );
        }

        let opts = SqliteConnectOptions::new()
            .filename(database_path)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(0)
            .connect_with(opts)
            .await?;

        let db = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);
        let max_variables = Self::discover_max_variables(&db).await;
        Ok(GraphStore { db, max_variables })
    }

    /// Wraps an already-open connection, discovering the variable limit
    /// the same way `connect` does. Used by tests that build an in-memory
    /// fixture database directly through the sea-orm entities.
    pub async fn from_connection(db: DatabaseConnection) -> Self {
        let max_variables = Self::discover_max_variables(&db).await;
        GraphStore { db, max_variables }
    }

    async fn discover_max_variables(db: &DatabaseConnection) -> usize {
        let rows = db
            .query_all(Statement::from_string(
                DbBackend::Sqlite,
                "PRAGMA compile_options".to_owned(),
            ))
            .await;

        let rows = match rows {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!(
                    "failed to read sqlite compile_options: {e}, using default {DEFAULT_MAX_VARIABLES}"
                );
                return DEFAULT_MAX_VARIABLES;
            }
        };

        for row in &rows {
            if let Ok(option) = row.try_get::<String>("", "compile_options") {
                if let Some(value) = option.strip_prefix("MAX_VARIABLE_NUMBER=") {
                    match value.parse::<usize>() {
                        Ok(parsed) => {
                            log::info!("sqlite MAX_VARIABLE_NUMBER={parsed}");
                            return parsed;
                        }
                        Err(_) => break,
                    }
                }
            }
        }

        log::warn!(
            "MAX_VARIABLE_NUMBER not found in compile_options, using default {DEFAULT_MAX_VARIABLES}"
        );
        DEFAULT_MAX_VARIABLES
    }

    fn chunk_size(&self) -> usize {
        self.max_variables
    }

    fn validate_id(id: u32) -> Result<(), GraphStoreError> {
        if id == 0 {
            return Err(GraphStoreError::InvalidPageId(id));
        }
        Ok(())
    }

    fn validate_title(title: &str) -> Result<(), GraphStoreError> {
        if title.trim().is_empty() {
            return Err(GraphStoreError::InvalidTitle(title.to_owned()));
        }
        Ok(())
    }

    /// On-disk canonical form: spaces become underscores, literal `'`
    /// characters are backslash-escaped. Case is preserved.
    pub fn sanitize_title(title: &str) -> String {
        title.replace(' ', "_").replace('\'', "\\'")
    }

    /// Inverse of `sanitize_title`: underscores become spaces, escaped
    /// quotes are unescaped.
    pub fn readable_title(sanitized: &str) -> String {
        sanitized.replace("\\'", "'").replace('_', " ")
    }

    /// Resolves a human-entered title to its canonical page ID, following
    /// redirects and folding case. `namespace = -1` searches every
    /// namespace.
    pub async fn resolve_title(
        &self,
        title: &str,
        namespace: i32,
    ) -> Result<Option<u32>, GraphStoreError> {
        Self::validate_title(title)?;
        let sanitized = Self::sanitize_title(title);
        log::debug!("resolving title {sanitized:?} (namespace={namespace})");

        let rows = if namespace < 0 {
            self.db
                .query_all(Statement::from_sql_and_values(
                    DbBackend::Sqlite,
                    "SELECT id, title, is_redirect FROM pages WHERE title = ? COLLATE NOCASE",
                    [Value::from(sanitized.clone())],
                ))
                .await?
        } else {
            self.db
                .query_all(Statement::from_sql_and_values(
                    DbBackend::Sqlite,
                    "SELECT id, title, is_redirect FROM pages WHERE title = ? COLLATE NOCASE AND namespace = ?",
                    [Value::from(sanitized.clone()), Value::from(namespace)],
                ))
                .await?
        };

        if rows.is_empty() {
            log::warn!(
                "no page found for title {title:?} (sanitized {sanitized:?}) in namespace {namespace}"
            );
            return Ok(None);
        }

        let candidates: Vec<(i32, String, bool)> = rows
            .iter()
            .map(Self::row_to_candidate)
            .collect::<Result<_, _>>()?;

        if let Some((id, _, _)) = candidates
            .iter()
            .find(|(_, db_title, is_redirect)| *db_title == sanitized && !is_redirect)
        {
            return Ok(Some(*id as u32));
        }
        if let Some((id, _, _)) = candidates.iter().find(|(_, _, is_redirect)| !is_redirect) {
            return Ok(Some(*id as u32));
        }

        let (first_id, _, _) = candidates[0];
        let redirect_row = self
            .db
            .query_one(Statement::from_sql_and_values(
                DbBackend::Sqlite,
                "SELECT target_id FROM redirects WHERE source_id = ?",
                [Value::from(first_id)],
            ))
            .await?;

        match redirect_row {
            Some(row) => Ok(Some(row.try_get::<i32>("", "target_id")? as u32)),
            None => {
                log::warn!(
                    "page {title:?} is a redirect but no target found for id {first_id}"
                );
                Ok(None)
            }
        }
    }

    fn row_to_candidate(row: &QueryResult) -> Result<(i32, String, bool), GraphStoreError> {
        Ok((
            row.try_get("", "id")?,
            row.try_get("", "title")?,
            row.try_get("", "is_redirect")?,
        ))
    }

    /// Readable title for a page ID, or `None` if unknown.
    pub async fn page_title(&self, page_id: u32) -> Result<Option<String>, GraphStoreError> {
        Self::validate_id(page_id)?;
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                DbBackend::Sqlite,
                "SELECT title FROM pages WHERE id = ?",
                [Value::from(page_id as i32)],
            ))
            .await?;
        Ok(match row {
            Some(row) => Some(Self::readable_title(&row.try_get::<String>("", "title")?)),
            None => None,
        })
    }

    /// Page IDs this page links to.
    pub async fn outgoing(&self, page_id: u32) -> Result<Vec<u32>, GraphStoreError> {
        self.adjacency(page_id, "outgoing_links").await
    }

    /// Page IDs that link to this page.
    pub async fn incoming(&self, page_id: u32) -> Result<Vec<u32>, GraphStoreError> {
        self.adjacency(page_id, "incoming_links").await
    }

    async fn adjacency(&self, page_id: u32, column: &str) -> Result<Vec<u32>, GraphStoreError> {
        Self::validate_id(page_id)?;
        let sql = format!("SELECT {column} FROM links WHERE id = ?");
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                DbBackend::Sqlite,
                &sql,
                [Value::from(page_id as i32)],
            ))
            .await?;
        Ok(match row {
            Some(row) => parse_pipe_list(&row.try_get::<String>("", column)?),
            None => Vec::new(),
        })
    }

    /// Sum of `outgoing_links_count` over `ids`, chunked to respect the
    /// storage engine's bound-variable limit.
    pub async fn outgoing_count_sum(&self, ids: &[u32]) -> Result<u64, GraphStoreError> {
        self.count_sum(ids, "outgoing_links_count").await
    }

    /// Sum of `incoming_links_count` over `ids`, chunked the same way.
    pub async fn incoming_count_sum(&self, ids: &[u32]) -> Result<u64, GraphStoreError> {
        self.count_sum(ids, "incoming_links_count").await
    }

    async fn count_sum(&self, ids: &[u32], column: &str) -> Result<u64, GraphStoreError> {
        for &id in ids {
            Self::validate_id(id)?;
        }
        let mut total = 0u64;
        for chunk in ids.chunks(self.chunk_size().max(1)) {
            total += self.count_sum_chunk(chunk, column).await?;
        }
        Ok(total)
    }

    async fn count_sum_chunk(&self, ids: &[u32], column: &str) -> Result<u64, GraphStoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let (placeholders, values) = in_clause(ids);
        let sql = format!("SELECT SUM({column}) AS total FROM links WHERE id IN ({placeholders})");
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(DbBackend::Sqlite, &sql, values))
            .await?;
        let total = match row {
            Some(row) => row.try_get::<Option<i64>>("", "total")?.unwrap_or(0),
            None => 0,
        };
        Ok(total as u64)
    }

    /// Titles for multiple page IDs, positional: unknown IDs yield `None`
    /// in their slot. Chunked the same way as the count sums.
    pub async fn batch_page_titles(
        &self,
        ids: &[u32],
    ) -> Result<Vec<Option<String>>, GraphStoreError> {
        for &id in ids {
            Self::validate_id(id)?;
        }
        let mut results = vec![None; ids.len()];
        for (chunk_start, chunk) in (0..ids.len())
            .step_by(self.chunk_size().max(1))
            .zip(ids.chunks(self.chunk_size().max(1)))
        {
            let chunk_results = self.batch_page_titles_chunk(chunk).await?;
            for (offset, title) in chunk_results.into_iter().enumerate() {
                results[chunk_start + offset] = title;
            }
        }
        Ok(results)
    }

    async fn batch_page_titles_chunk(
        &self,
        ids: &[u32],
    ) -> Result<Vec<Option<String>>, GraphStoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut index_of: std::collections::HashMap<u32, usize> = std::collections::HashMap::new();
        for (i, &id) in ids.iter().enumerate() {
            index_of.insert(id, i);
        }

        let (placeholders, values) = in_clause(ids);
        let sql = format!("SELECT id, title FROM pages WHERE id IN ({placeholders})");
        let rows = self
            .db
            .query_all(Statement::from_sql_and_values(DbBackend::Sqlite, &sql, values))
            .await?;

        let mut results: Vec<Option<String>> = vec![None; ids.len()];
        for row in rows {
            let id: i32 = row.try_get("", "id")?;
            let title: String = row.try_get("", "title")?;
            if let Some(&i) = index_of.get(&(id as u32)) {
                results[i] = Some(Self::readable_title(&title));
            }
        }
        Ok(results)
    }

    /// Shorthand for `resolve_title(title, 0).is_some()`.
    pub async fn page_exists(&self, title: &str) -> Result<bool, GraphStoreError> {
        Ok(self.resolve_title(title, 0).await?.is_some())
    }

    /// `(page_count, total_outgoing_edges)`.
    pub async fn stats(&self) -> Result<(u64, u64), GraphStoreError> {
        let page_count = self
            .db
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                "SELECT COUNT(*) AS c FROM pages".to_owned(),
            ))
            .await?
            .map(|row| row.try_get::<i64>("", "c"))
            .transpose()?
            .unwrap_or(0);

        let total_edges = self
            .db
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                "SELECT SUM(outgoing_links_count) AS s FROM links".to_owned(),
            ))
            .await?
            .map(|row| row.try_get::<Option<i64>>("", "s"))
            .transpose()?
            .flatten()
            .unwrap_or(0);

        Ok((page_count as u64, total_edges as u64))
    }
}

fn parse_pipe_list(raw: &str) -> Vec<u32> {
    raw.split('|')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<u32>().ok())
        .collect()
}

fn in_clause(ids: &[u32]) -> (String, Vec<Value>) {
    let placeholders = vec!["?"; ids.len()].join(",");
    let values = ids.iter().map(|&id| Value::from(id as i32)).collect();
    (placeholders, values)
}
