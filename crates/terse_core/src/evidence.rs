//! Evidence resolution.
//!
//! Loads optional grounding text either from a flat file or from a SQLite
//! store by an explicit row-identifier list. Failure to produce evidence
//! is never fatal: the resolver logs a warning and returns an empty blob,
//! and generation proceeds ungrounded.

use rusqlite::Connection;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::TerseError;

/// Ordered list of row identifiers, parsed from a delimited string.
/// Accepted delimiters: comma, semicolon, space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowIdList(pub Vec<i64>);

impl FromStr for RowIdList {
    type Err = TerseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ids = Vec::new();
        for part in s.split([',', ';', ' ']) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let id: i64 = part
                .parse()
                .map_err(|_| TerseError::IdList(format!("not an integer: {:?}", part)))?;
            ids.push(id);
        }
        Ok(Self(ids))
    }
}

impl RowIdList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Where evidence comes from. File mode takes priority when the caller
/// constructed both; the enum makes that choice explicit at the call site.
#[derive(Debug, Clone)]
pub enum EvidenceSource {
    /// Read the whole file as the evidence blob.
    File(PathBuf),
    /// Fetch rows from a SQLite store by identifier list.
    Store {
        db_path: PathBuf,
        table: String,
        column: String,
        ids: RowIdList,
    },
}

/// Resolve an evidence source into a text blob. Empty means "no evidence";
/// generation continues either way.
pub fn resolve(source: Option<&EvidenceSource>) -> String {
    match source {
        None => String::new(),
        Some(EvidenceSource::File(path)) => match std::fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!("evidence file {} unreadable ({}), continuing without evidence", path.display(), e);
                String::new()
            }
        },
        Some(EvidenceSource::Store {
            db_path,
            table,
            column,
            ids,
        }) => match fetch_rows(db_path, table, column, ids) {
            Ok(blob) if blob.is_empty() => {
                warn!(
                    "evidence query against {} returned no rows for ids {:?}, continuing without evidence",
                    db_path.display(),
                    ids.0
                );
                String::new()
            }
            Ok(blob) => blob,
            Err(e) => {
                warn!("evidence store query failed ({}), continuing without evidence", e);
                String::new()
            }
        },
    }
}

/// Run the parameterized id-set query. The connection lives only for this
/// call; dropping it releases the store even when the query fails.
fn fetch_rows(
    db_path: &PathBuf,
    table: &str,
    column: &str,
    ids: &RowIdList,
) -> Result<String, rusqlite::Error> {
    if ids.is_empty() {
        return Ok(String::new());
    }
    // Table and column names cannot be bound as parameters; reject
    // anything that is not a plain identifier before interpolating.
    if !is_identifier(table) || !is_identifier(column) {
        warn!("rejecting non-identifier table/column {:?}.{:?}", table, column);
        return Ok(String::new());
    }

    let conn = Connection::open(db_path)?;

    // One placeholder per id keeps the identifiers bound individually.
    let placeholders = vec!["?"; ids.len()].join(",");
    let sql = format!(
        "SELECT id, {} FROM {} WHERE id IN ({}) ORDER BY id",
        column, table, placeholders
    );
    debug!("evidence query: {}", sql);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(ids.0.iter()), |row| {
        let id: i64 = row.get(0)?;
        let content: String = row.get(1)?;
        Ok((id, content))
    })?;

    let mut blob = String::new();
    for row in rows {
        let (id, content) = row?;
        blob.push_str(&format!("[evidence#{}] {}\n", id, content));
    }
    Ok(blob)
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed_store(dir: &TempDir) -> PathBuf {
        let db_path = dir.path().join("evidence.db");
        let conn = Connection::open(&db_path).unwrap();
        conn.execute(
            "CREATE TABLE chunks (id INTEGER PRIMARY KEY, content TEXT NOT NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO chunks (id, content) VALUES (1, 'alpha'), (2, 'beta'), (5, 'epsilon')",
            [],
        )
        .unwrap();
        db_path
    }

    #[test]
    fn id_list_parses_mixed_delimiters() {
        let ids: RowIdList = "1, 2;3".parse().unwrap();
        assert_eq!(ids, RowIdList(vec![1, 2, 3]));
    }

    #[test]
    fn id_list_rejects_non_integers() {
        let err = "1,two,3".parse::<RowIdList>().unwrap_err();
        assert_eq!(err.code(), 2);
    }

    #[test]
    fn id_list_preserves_order() {
        let ids: RowIdList = "5 1 2".parse().unwrap();
        assert_eq!(ids, RowIdList(vec![5, 1, 2]));
    }

    #[test]
    fn empty_id_string_parses_to_empty_list() {
        let ids: RowIdList = " ; , ".parse().unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn missing_file_degrades_to_empty_blob() {
        let source = EvidenceSource::File(PathBuf::from("/nonexistent/evidence.txt"));
        assert_eq!(resolve(Some(&source)), "");
    }

    #[test]
    fn file_mode_reads_whole_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("evidence.txt");
        std::fs::write(&path, "grounding text\nsecond line").unwrap();
        let source = EvidenceSource::File(path);
        assert_eq!(resolve(Some(&source)), "grounding text\nsecond line");
    }

    #[test]
    fn store_rows_are_tagged_and_concatenated() {
        let dir = TempDir::new().unwrap();
        let source = EvidenceSource::Store {
            db_path: seed_store(&dir),
            table: "chunks".to_string(),
            column: "content".to_string(),
            ids: "1,2".parse().unwrap(),
        };
        assert_eq!(resolve(Some(&source)), "[evidence#1] alpha\n[evidence#2] beta\n");
    }

    #[test]
    fn zero_row_query_degrades_to_empty_blob() {
        let dir = TempDir::new().unwrap();
        let source = EvidenceSource::Store {
            db_path: seed_store(&dir),
            table: "chunks".to_string(),
            column: "content".to_string(),
            ids: "100,200,300".parse().unwrap(),
        };
        assert_eq!(resolve(Some(&source)), "");
    }

    #[test]
    fn empty_id_list_skips_the_query() {
        let dir = TempDir::new().unwrap();
        let source = EvidenceSource::Store {
            db_path: seed_store(&dir),
            table: "chunks".to_string(),
            column: "content".to_string(),
            ids: RowIdList::default(),
        };
        assert_eq!(resolve(Some(&source)), "");
    }

    #[test]
    fn hostile_table_name_is_rejected() {
        let dir = TempDir::new().unwrap();
        let source = EvidenceSource::Store {
            db_path: seed_store(&dir),
            table: "chunks; DROP TABLE chunks".to_string(),
            column: "content".to_string(),
            ids: "1".parse().unwrap(),
        };
        assert_eq!(resolve(Some(&source)), "");
    }

    #[test]
    fn no_source_is_empty_blob() {
        assert_eq!(resolve(None), "");
    }
}
