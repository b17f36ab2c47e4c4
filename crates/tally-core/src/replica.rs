//! `SQLite`-backed [`ReplicaSource`] over a directory of replica mirrors.
//!
//! One database file per project (`<replica_dir>/<project>.db`) holding the
//! replica schema subset this report reads: `revision`, `page`, and `user`.
//! All functions prepare statements against a per-call connection and return
//! raw rows (never decoded) — decoding is [`crate::row`]'s job.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use rusqlite::Connection;
use rusqlite::types::ValueRef;

use crate::row::{Field, RawRow};
use crate::source::ReplicaSource;

/// File-namespace id on the media project.
const FILE_NAMESPACE: i64 = 6;

/// A directory of per-project replica databases.
#[derive(Debug, Clone)]
pub struct SqliteReplica {
    replica_dir: PathBuf,
}

impl SqliteReplica {
    /// Point at a directory of `<project>.db` files.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory does not exist.
    pub fn open(replica_dir: impl AsRef<Path>) -> Result<Self> {
        let replica_dir = replica_dir.as_ref().to_path_buf();
        ensure!(
            replica_dir.is_dir(),
            "replica directory {} does not exist",
            replica_dir.display()
        );
        Ok(Self { replica_dir })
    }

    /// Path of one project's database file.
    #[must_use]
    pub fn db_path(&self, project: &str) -> PathBuf {
        self.replica_dir.join(format!("{project}.db"))
    }

    fn connection(&self, project: &str) -> Result<Connection> {
        let path = self.db_path(project);
        ensure!(
            path.exists(),
            "no replica database for project '{project}' at {}",
            path.display()
        );
        Connection::open(&path).with_context(|| format!("open replica for '{project}'"))
    }
}

/// Append `?N,?N+1,...` placeholders for `count` parameters starting at
/// position `start` (1-based).
fn push_placeholders(sql: &mut String, start: usize, count: usize) {
    for i in 0..count {
        if i > 0 {
            sql.push(',');
        }
        let _ = write!(sql, "?{}", start + i);
    }
}

fn field_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Field> {
    let value = match row.get_ref(idx)? {
        ValueRef::Null => Field::Null,
        ValueRef::Integer(v) => Field::Int(v),
        ValueRef::Text(raw) | ValueRef::Blob(raw) => Field::Bytes(raw.to_vec()),
        ValueRef::Real(_) => {
            return Err(rusqlite::Error::InvalidColumnType(
                idx,
                "unexpected REAL column".to_string(),
                rusqlite::types::Type::Real,
            ));
        }
    };
    Ok(value)
}

fn collect_rows(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
    arity: usize,
) -> Result<Vec<RawRow>> {
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("prepare replica query: {sql}"))?;

    let mapped = stmt
        .query_map(rusqlite::params_from_iter(params.iter().copied()), |row| {
            (0..arity).map(|idx| field_at(row, idx)).collect::<rusqlite::Result<RawRow>>()
        })
        .context("execute replica query")?;

    let mut rows = Vec::new();
    for row in mapped {
        rows.push(row.context("read replica row")?);
    }
    Ok(rows)
}

impl ReplicaSource for SqliteReplica {
    fn edit_counts_since(
        &self,
        project: &str,
        cohort: &[String],
        since_ts: &str,
    ) -> Result<Vec<RawRow>> {
        if cohort.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connection(project)?;

        let mut sql = String::from(
            "SELECT rev_user_text, COUNT(*) FROM revision \
             WHERE rev_timestamp >= ?1 AND rev_user_text IN (",
        );
        push_placeholders(&mut sql, 2, cohort.len());
        sql.push_str(") GROUP BY rev_user_text");

        let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&since_ts];
        params.extend(cohort.iter().map(|u| u as &dyn rusqlite::types::ToSql));

        collect_rows(&conn, &sql, &params, 2)
            .with_context(|| format!("edit counts on '{project}'"))
    }

    fn registrations(&self, project: &str, cohort: &[String]) -> Result<Vec<RawRow>> {
        if cohort.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connection(project)?;

        let mut sql = String::from("SELECT user_name, user_registration FROM user WHERE user_name IN (");
        push_placeholders(&mut sql, 1, cohort.len());
        sql.push(')');

        let params: Vec<&dyn rusqlite::types::ToSql> =
            cohort.iter().map(|u| u as &dyn rusqlite::types::ToSql).collect();

        collect_rows(&conn, &sql, &params, 2)
            .with_context(|| format!("registrations on '{project}'"))
    }

    fn revisions_between(
        &self,
        project: &str,
        cohort: &[String],
        start_ts: &str,
        end_ts: &str,
    ) -> Result<Vec<RawRow>> {
        if cohort.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connection(project)?;

        let mut sql = String::from(
            "SELECT rev_user_text, page_title, rev_len, rev_parent_id, rev_id, page_namespace \
             FROM revision JOIN page ON rev_page = page_id \
             WHERE rev_timestamp >= ?1 AND rev_timestamp <= ?2 AND rev_user_text IN (",
        );
        push_placeholders(&mut sql, 3, cohort.len());
        sql.push(')');

        let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&start_ts, &end_ts];
        params.extend(cohort.iter().map(|u| u as &dyn rusqlite::types::ToSql));

        collect_rows(&conn, &sql, &params, 6)
            .with_context(|| format!("revisions on '{project}'"))
    }

    fn revision_lengths(&self, project: &str, rev_ids: &[i64]) -> Result<Vec<RawRow>> {
        if rev_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connection(project)?;

        let mut sql = String::from("SELECT rev_id, rev_len FROM revision WHERE rev_id IN (");
        push_placeholders(&mut sql, 1, rev_ids.len());
        sql.push(')');

        let params: Vec<&dyn rusqlite::types::ToSql> =
            rev_ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

        collect_rows(&conn, &sql, &params, 2)
            .with_context(|| format!("revision lengths on '{project}'"))
    }

    fn root_uploads(
        &self,
        project: &str,
        cohort: &[String],
        start_ts: &str,
        end_ts: &str,
    ) -> Result<Vec<RawRow>> {
        if cohort.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connection(project)?;

        let mut sql = format!(
            "SELECT rev_user_text, page_title \
             FROM revision JOIN page ON rev_page = page_id \
             WHERE page_namespace = {FILE_NAMESPACE} AND rev_parent_id = 0 \
             AND rev_timestamp >= ?1 AND rev_timestamp <= ?2 AND rev_user_text IN ("
        );
        push_placeholders(&mut sql, 3, cohort.len());
        sql.push(')');

        let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&start_ts, &end_ts];
        params.extend(cohort.iter().map(|u| u as &dyn rusqlite::types::ToSql));

        collect_rows(&conn, &sql, &params, 2)
            .with_context(|| format!("uploads on '{project}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{EditCountRow, RegistrationRow, RevisionRow, UploadRow, normalize_all};

    /// Replica schema subset used by the report queries.
    const SCHEMA: &str = "
        CREATE TABLE revision (
            rev_id INTEGER PRIMARY KEY,
            rev_page INTEGER NOT NULL,
            rev_user_text BLOB NOT NULL,
            rev_timestamp BLOB NOT NULL,
            rev_len INTEGER,
            rev_parent_id INTEGER NOT NULL
        );
        CREATE TABLE page (
            page_id INTEGER PRIMARY KEY,
            page_title BLOB NOT NULL,
            page_namespace INTEGER NOT NULL
        );
        CREATE TABLE user (
            user_name BLOB PRIMARY KEY,
            user_registration BLOB
        );
    ";

    fn seed_project(dir: &Path, project: &str) -> Connection {
        let conn = Connection::open(dir.join(format!("{project}.db"))).expect("open db");
        conn.execute_batch(SCHEMA).expect("create schema");
        conn
    }

    fn cohort(users: &[&str]) -> Vec<String> {
        users.iter().map(|u| (*u).to_string()).collect()
    }

    #[test]
    fn open_requires_existing_directory() {
        assert!(SqliteReplica::open("/nonexistent/replica/dir").is_err());
    }

    #[test]
    fn missing_project_database_is_fatal() {
        let dir = tempfile::tempdir().expect("temp dir");
        let replica = SqliteReplica::open(dir.path()).expect("open");
        let err = replica
            .registrations("ghostwiki", &cohort(&["alice"]))
            .expect_err("no database");
        assert!(format!("{err:#}").contains("ghostwiki"));
    }

    #[test]
    fn edit_counts_group_by_user_and_respect_cutoff() {
        let dir = tempfile::tempdir().expect("temp dir");
        let conn = seed_project(dir.path(), "wiki1");
        conn.execute_batch(
            "INSERT INTO revision VALUES
                (1, 1, 'alice', '20150105000000', 100, 0),
                (2, 1, 'alice', '20150106000000', 120, 1),
                (3, 1, 'bob',   '20141201000000', 80, 0);",
        )
        .expect("seed revisions");

        let replica = SqliteReplica::open(dir.path()).expect("open");
        let raw = replica
            .edit_counts_since("wiki1", &cohort(&["alice", "bob"]), "20150101000000")
            .expect("query");
        let rows = normalize_all(&raw, EditCountRow::from_raw).expect("normalize");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user, "alice");
        assert_eq!(rows[0].edits, 2);
    }

    #[test]
    fn registrations_return_null_for_ancient_accounts() {
        let dir = tempfile::tempdir().expect("temp dir");
        let conn = seed_project(dir.path(), "wiki1");
        conn.execute_batch(
            "INSERT INTO user VALUES
                ('alice', '20150102030405'),
                ('carol', NULL);",
        )
        .expect("seed users");

        let replica = SqliteReplica::open(dir.path()).expect("open");
        let raw = replica
            .registrations("wiki1", &cohort(&["alice", "carol", "mallory"]))
            .expect("query");
        let mut rows = normalize_all(&raw, RegistrationRow::from_raw).expect("normalize");
        rows.sort_by(|a, b| a.user.cmp(&b.user));

        // mallory has no account: no row, caught later by cohort validation.
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].registered.as_deref(), Some("20150102030405"));
        assert_eq!(rows[1].user, "carol");
        assert_eq!(rows[1].registered, None);
    }

    #[test]
    fn revisions_join_page_metadata_within_window() {
        let dir = tempfile::tempdir().expect("temp dir");
        let conn = seed_project(dir.path(), "wiki1");
        conn.execute_batch(
            "INSERT INTO page VALUES (1, 'Main_Page', 0), (2, 'Talk:Main_Page', 1);
             INSERT INTO revision VALUES
                (10, 1, 'alice', '20150110000000', 500, 0),
                (11, 2, 'alice', '20150111000000', NULL, 10),
                (12, 1, 'alice', '20141225000000', 450, 0);",
        )
        .expect("seed");

        let replica = SqliteReplica::open(dir.path()).expect("open");
        let raw = replica
            .revisions_between(
                "wiki1",
                &cohort(&["alice"]),
                "20150101000000",
                "20150131235959",
            )
            .expect("query");
        let mut rows = normalize_all(&raw, RevisionRow::from_raw).expect("normalize");
        rows.sort_by_key(|r| r.rev_id);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].page_title, "Main_Page");
        assert_eq!(rows[0].namespace, 0);
        assert_eq!(rows[0].length, Some(500));
        assert_eq!(rows[1].page_title, "Talk:Main_Page");
        assert_eq!(rows[1].length, None);
        assert_eq!(rows[1].parent_id, 10);
    }

    #[test]
    fn revision_lengths_look_up_by_id_set() {
        let dir = tempfile::tempdir().expect("temp dir");
        let conn = seed_project(dir.path(), "wiki1");
        conn.execute_batch(
            "INSERT INTO revision VALUES
                (10, 1, 'alice', '20150110000000', 500, 0),
                (11, 1, 'alice', '20150111000000', NULL, 10);",
        )
        .expect("seed");

        let replica = SqliteReplica::open(dir.path()).expect("open");
        let raw = replica
            .revision_lengths("wiki1", &[10, 11, 999])
            .expect("query");
        assert_eq!(raw.len(), 2);

        let empty = replica.revision_lengths("wiki1", &[]).expect("query");
        assert!(empty.is_empty());
    }

    #[test]
    fn root_uploads_filter_namespace_and_parent() {
        let dir = tempfile::tempdir().expect("temp dir");
        let conn = seed_project(dir.path(), "commonswiki");
        conn.execute_batch(
            "INSERT INTO page VALUES
                (1, 'File:A.jpg', 6),
                (2, 'Main_Page', 0),
                (3, 'File:B.png', 6);
             INSERT INTO revision VALUES
                (20, 1, 'dave', '20150110000000', 9000, 0),
                (21, 2, 'dave', '20150111000000', 100, 0),
                (22, 3, 'dave', '20150112000000', 8000, 20);",
        )
        .expect("seed");

        let replica = SqliteReplica::open(dir.path()).expect("open");
        let raw = replica
            .root_uploads(
                "commonswiki",
                &cohort(&["dave"]),
                "20150101000000",
                "20150131235959",
            )
            .expect("query");
        let rows = normalize_all(&raw, UploadRow::from_raw).expect("normalize");

        // Only the namespace-6 root revision qualifies.
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file_title, "File:A.jpg");
    }
}
