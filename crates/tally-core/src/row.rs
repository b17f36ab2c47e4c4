//! Raw replica rows and their normalization into typed records.
//!
//! Replica queries return fixed-arity tuples whose text cells are binary and
//! must be decoded to UTF-8. All decode and shape validation happens here,
//! once per row, so the aggregation fold only ever sees typed records.

use anyhow::{Context, Result, bail};

// ---------------------------------------------------------------------------
// Raw cells
// ---------------------------------------------------------------------------

/// One cell of a raw replica row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// Integer-like column (ids, lengths, counts, namespaces).
    Int(i64),
    /// Binary text column (user names, titles, timestamps).
    Bytes(Vec<u8>),
    /// SQL NULL.
    Null,
}

impl Field {
    /// Build a text cell from a string (stored as bytes, like the replica).
    #[must_use]
    pub fn text(s: &str) -> Self {
        Self::Bytes(s.as_bytes().to_vec())
    }

    /// Decode a required text cell.
    pub fn as_text(&self) -> Result<String> {
        match self {
            Self::Bytes(raw) => String::from_utf8(raw.clone()).context("cell is not valid UTF-8"),
            Self::Int(v) => bail!("expected text cell, got integer {v}"),
            Self::Null => bail!("expected text cell, got NULL"),
        }
    }

    /// Decode an optional text cell (`Null` becomes `None`).
    pub fn as_opt_text(&self) -> Result<Option<String>> {
        match self {
            Self::Null => Ok(None),
            other => other.as_text().map(Some),
        }
    }

    /// Read a required integer cell.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(v) => Ok(*v),
            Self::Bytes(_) => bail!("expected integer cell, got text"),
            Self::Null => bail!("expected integer cell, got NULL"),
        }
    }

    /// Read an optional integer cell (`Null` becomes `None`).
    pub fn as_opt_int(&self) -> Result<Option<i64>> {
        match self {
            Self::Null => Ok(None),
            other => other.as_int().map(Some),
        }
    }
}

/// One raw replica row: a fixed-arity tuple of cells.
pub type RawRow = Vec<Field>;

fn expect_arity(row: &RawRow, arity: usize, shape: &str) -> Result<()> {
    if row.len() == arity {
        Ok(())
    } else {
        bail!("{shape} row has {} cells, expected {arity}", row.len())
    }
}

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

/// A grouped edit count for one user since the lookback start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditCountRow {
    pub user: String,
    pub edits: u64,
}

impl EditCountRow {
    /// Normalize a `(user, count)` raw row.
    pub fn from_raw(row: &RawRow) -> Result<Self> {
        expect_arity(row, 2, "edit-count")?;
        let user = row[0].as_text().context("edit-count user")?;
        let edits = u64::try_from(row[1].as_int().context("edit-count value")?)
            .context("edit-count value is negative")?;
        Ok(Self { user, edits })
    }
}

/// A user registration record; `registered` is `None` for accounts that
/// predate registration-timestamp tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRow {
    pub user: String,
    /// Registration instant in the replica encoding (`YYYYMMDDHHmmss`).
    pub registered: Option<String>,
}

impl RegistrationRow {
    /// Normalize a `(user, registration | NULL)` raw row.
    pub fn from_raw(row: &RawRow) -> Result<Self> {
        expect_arity(row, 2, "registration")?;
        Ok(Self {
            user: row[0].as_text().context("registration user")?,
            registered: row[1].as_opt_text().context("registration timestamp")?,
        })
    }
}

/// One edit in the report window, joined with page metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRow {
    pub user: String,
    pub page_title: String,
    /// Revision length; `None` when the replica has lost the length.
    pub length: Option<i64>,
    /// Parent revision id; 0 for a root revision (page creation). A NULL
    /// parent in the replica also means a root revision and reads as 0.
    pub parent_id: i64,
    pub rev_id: i64,
    pub namespace: i64,
}

impl RevisionRow {
    /// Normalize a `(user, title, len | NULL, parent_id, rev_id, ns)` raw row.
    pub fn from_raw(row: &RawRow) -> Result<Self> {
        expect_arity(row, 6, "revision")?;
        Ok(Self {
            user: row[0].as_text().context("revision user")?,
            page_title: row[1].as_text().context("revision page title")?,
            length: row[2].as_opt_int().context("revision length")?,
            parent_id: row[3].as_opt_int().context("revision parent id")?.unwrap_or(0),
            rev_id: row[4].as_int().context("revision id")?,
            namespace: row[5].as_int().context("revision namespace")?,
        })
    }
}

/// A `(rev_id, length | NULL)` pair from the parent-length query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthRow {
    pub rev_id: i64,
    pub length: Option<i64>,
}

impl LengthRow {
    /// Normalize a `(rev_id, len | NULL)` raw row.
    pub fn from_raw(row: &RawRow) -> Result<Self> {
        expect_arity(row, 2, "revision-length")?;
        Ok(Self {
            rev_id: row[0].as_int().context("length revision id")?,
            length: row[1].as_opt_int().context("length value")?,
        })
    }
}

/// A root revision in the file namespace of the media project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRow {
    pub user: String,
    pub file_title: String,
}

impl UploadRow {
    /// Normalize a `(user, file_title)` raw row.
    pub fn from_raw(row: &RawRow) -> Result<Self> {
        expect_arity(row, 2, "upload")?;
        Ok(Self {
            user: row[0].as_text().context("upload user")?,
            file_title: row[1].as_text().context("upload file title")?,
        })
    }
}

/// Normalize a whole result set with one record type.
///
/// # Errors
///
/// Returns the first per-row normalization error, annotated with the row
/// index for diagnosis.
pub fn normalize_all<T>(rows: &[RawRow], normalize: impl Fn(&RawRow) -> Result<T>) -> Result<Vec<T>> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| normalize(row).with_context(|| format!("row {i}")))
        .collect()
}
