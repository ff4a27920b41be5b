// crates/geodata-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Feature Store
// Description: Durable FeatureStore backed by SQLite WAL.
// Purpose: Persist dataset rows with real transaction scopes for single-node
//          deployments and integration tests.
// Dependencies: geodata-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`FeatureStore`] using `SQLite`. Each
//! dataset maps to one table whose columns follow the declared fields;
//! geometries are stored as GeoJSON text next to an SRID column. A request's
//! transaction scope opens its own connection with `BEGIN IMMEDIATE`, so
//! statements of one request never interleave with another's.
//!
//! The store cannot reproject: a geometry write whose source SRID differs
//! from the column SRID is rejected as invalid.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use geodata_core::DataType;
use geodata_core::DatasetDef;
use geodata_core::interfaces::AttributeFilter;
use geodata_core::interfaces::FeatureStore;
use geodata_core::interfaces::FeatureTransaction;
use geodata_core::interfaces::FilterOp;
use geodata_core::interfaces::RecordWrite;
use geodata_core::interfaces::StoreError;
use geodata_core::interfaces::StoredRecord;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::ToSql;
use rusqlite::types::Value as SqlValue;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// Configuration for the `SQLite` feature store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors surfaced during setup.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Underlying `SQLite` failure.
    #[error("sqlite failure: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Configuration or schema problem.
    #[error("invalid store usage: {0}")]
    Invalid(String),
}

/// Maps a `rusqlite` error onto the store error taxonomy.
fn map_sqlite_error(error: rusqlite::Error) -> StoreError {
    match &error {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::ConstraintViolation => StoreError::Conflict(error.to_string()),
            _ => StoreError::Unavailable(error.to_string()),
        },
        _ => StoreError::Unavailable(error.to_string()),
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Durable feature store backed by one `SQLite` database file.
///
/// # Invariants
/// - Every transaction scope uses its own connection under `BEGIN
///   IMMEDIATE`, serializing writers through `SQLite` locking.
#[derive(Debug, Clone)]
pub struct SqliteFeatureStore {
    config: SqliteStoreConfig,
}

impl SqliteFeatureStore {
    /// Opens (or creates) the database file and applies pragmas.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the file cannot be opened.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let store = Self {
            config,
        };
        // Probe once so misconfiguration fails at startup, not per request.
        store.connect().map_err(|error| match error {
            StoreError::Unavailable(detail) | StoreError::Conflict(detail)
            | StoreError::Invalid(detail) => SqliteStoreError::Invalid(detail),
        })?;
        Ok(store)
    }

    /// Creates the table of a dataset when it does not exist.
    ///
    /// `extra_columns` names server-managed columns (audit stamps, upload
    /// users) that are not declared as dataset fields; they are created as
    /// TEXT.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the DDL fails.
    pub fn ensure_dataset(
        &self,
        dataset: &DatasetDef,
        extra_columns: &[String],
    ) -> Result<(), SqliteStoreError> {
        let connection = self.connect().map_err(|error| {
            SqliteStoreError::Invalid(error.to_string())
        })?;
        let mut columns = Vec::with_capacity(dataset.fields.len() + 3);
        columns.push(format!(
            "{} INTEGER PRIMARY KEY AUTOINCREMENT",
            quote_ident(&dataset.primary_key)
        ));
        for field in &dataset.fields {
            if field.name == dataset.primary_key {
                continue;
            }
            columns
                .push(format!("{} {}", quote_ident(&field.name), column_affinity(field.data_type)));
        }
        if let Some(geometry) = &dataset.geometry {
            columns.push(format!("{} TEXT", quote_ident(&geometry.geometry_column)));
            columns.push(format!("{} INTEGER", quote_ident(&srid_column(&geometry.geometry_column))));
        }
        for name in extra_columns {
            if dataset.field(name).is_none() && dataset.primary_key != *name {
                columns.push(format!("{} TEXT", quote_ident(name)));
            }
        }
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(&dataset.table_name),
            columns.join(", ")
        );
        connection.execute_batch(&ddl)?;
        Ok(())
    }

    /// Opens a configured connection.
    fn connect(&self) -> Result<Connection, StoreError> {
        let connection = Connection::open_with_flags(
            &self.config.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .map_err(map_sqlite_error)?;
        connection
            .busy_timeout(std::time::Duration::from_millis(self.config.busy_timeout_ms))
            .map_err(map_sqlite_error)?;
        connection
            .pragma_update(None, "journal_mode", self.config.journal_mode.pragma_value())
            .map_err(map_sqlite_error)?;
        connection
            .pragma_update(None, "foreign_keys", "on")
            .map_err(map_sqlite_error)?;
        Ok(connection)
    }
}

impl FeatureStore for SqliteFeatureStore {
    fn begin(&self) -> Result<Box<dyn FeatureTransaction + '_>, StoreError> {
        let connection = self.connect()?;
        connection.execute_batch("BEGIN IMMEDIATE").map_err(map_sqlite_error)?;
        Ok(Box::new(SqliteTransaction {
            connection,
            finished: false,
        }))
    }
}

// ============================================================================
// SECTION: Transaction
// ============================================================================

/// One `BEGIN IMMEDIATE` scope over a dedicated connection.
struct SqliteTransaction {
    /// Dedicated connection holding the transaction.
    connection: Connection,
    /// Whether commit or rollback already ran.
    finished: bool,
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.connection.execute_batch("ROLLBACK");
        }
    }
}

impl SqliteTransaction {
    /// Reads one row by primary key.
    fn query_row(
        &self,
        dataset: &DatasetDef,
        pk: &Value,
    ) -> Result<Option<StoredRecord>, StoreError> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1",
            quote_ident(&dataset.table_name),
            quote_ident(&dataset.primary_key)
        );
        let mut statement = self.connection.prepare(&sql).map_err(map_sqlite_error)?;
        let mut rows =
            statement.query([bind_value(pk)?]).map_err(map_sqlite_error)?;
        match rows.next().map_err(map_sqlite_error)? {
            Some(row) => Ok(Some(read_record(dataset, row)?)),
            None => Ok(None),
        }
    }
}

impl FeatureTransaction for SqliteTransaction {
    fn fetch_record(
        &mut self,
        dataset: &DatasetDef,
        pk: &Value,
    ) -> Result<Option<StoredRecord>, StoreError> {
        self.query_row(dataset, pk)
    }

    fn list_records(
        &mut self,
        dataset: &DatasetDef,
        filters: &[AttributeFilter],
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let mut params = Vec::with_capacity(filters.len());
        let mut clauses = Vec::with_capacity(filters.len());
        for filter in filters {
            clauses.push(filter_clause(filter, &mut params)?);
        }
        let selection = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT * FROM {}{selection} ORDER BY {}",
            quote_ident(&dataset.table_name),
            quote_ident(&dataset.primary_key)
        );
        let mut statement = self.connection.prepare(&sql).map_err(map_sqlite_error)?;
        let bound: Vec<&dyn ToSql> =
            params.iter().map(|value| value as &dyn ToSql).collect();
        let mut rows = statement.query(bound.as_slice()).map_err(map_sqlite_error)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqlite_error)? {
            records.push(read_record(dataset, row)?);
        }
        Ok(records)
    }

    fn relation_records(
        &mut self,
        relation_dataset: &DatasetDef,
        fk_field: &str,
        fk_value: &Value,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY {}",
            quote_ident(&relation_dataset.table_name),
            quote_ident(fk_field),
            quote_ident(&relation_dataset.primary_key)
        );
        let mut statement = self.connection.prepare(&sql).map_err(map_sqlite_error)?;
        let mut rows =
            statement.query([bind_value(fk_value)?]).map_err(map_sqlite_error)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqlite_error)? {
            records.push(read_record(relation_dataset, row)?);
        }
        Ok(records)
    }

    fn insert_record(
        &mut self,
        dataset: &DatasetDef,
        write: &RecordWrite,
    ) -> Result<StoredRecord, StoreError> {
        let (mut names, mut params) = column_bindings(dataset, write)?;
        if let Some(pk) = &write.pk {
            names.push(quote_ident(&dataset.primary_key));
            params.push(bind_value(pk)?);
        }
        let placeholders: Vec<String> =
            (1..=params.len()).map(|index| format!("?{index}")).collect();
        let sql = if names.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(&dataset.table_name))
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(&dataset.table_name),
                names.join(", "),
                placeholders.join(", ")
            )
        };
        let bound: Vec<&dyn ToSql> =
            params.iter().map(|value| value as &dyn ToSql).collect();
        self.connection.execute(&sql, bound.as_slice()).map_err(map_sqlite_error)?;

        let pk = match &write.pk {
            Some(pk) => pk.clone(),
            None => Value::from(self.connection.last_insert_rowid()),
        };
        self.query_row(dataset, &pk)?.ok_or_else(|| {
            StoreError::Unavailable("inserted row vanished".to_string())
        })
    }

    fn update_record(
        &mut self,
        dataset: &DatasetDef,
        pk: &Value,
        write: &RecordWrite,
    ) -> Result<Option<StoredRecord>, StoreError> {
        let (names, mut params) = column_bindings(dataset, write)?;
        if names.is_empty() {
            return self.query_row(dataset, pk);
        }
        let assignments: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(index, name)| format!("{name} = ?{}", index + 1))
            .collect();
        params.push(bind_value(pk)?);
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            quote_ident(&dataset.table_name),
            assignments.join(", "),
            quote_ident(&dataset.primary_key),
            params.len()
        );
        let bound: Vec<&dyn ToSql> =
            params.iter().map(|value| value as &dyn ToSql).collect();
        let changed =
            self.connection.execute(&sql, bound.as_slice()).map_err(map_sqlite_error)?;
        if changed == 0 {
            return Ok(None);
        }
        self.query_row(dataset, pk)
    }

    fn delete_record(&mut self, dataset: &DatasetDef, pk: &Value) -> Result<bool, StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote_ident(&dataset.table_name),
            quote_ident(&dataset.primary_key)
        );
        let changed = self
            .connection
            .execute(&sql, [bind_value(pk)?])
            .map_err(map_sqlite_error)?;
        Ok(changed > 0)
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.connection.execute_batch("COMMIT").map_err(map_sqlite_error)?;
        self.finished = true;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<(), StoreError> {
        self.connection.execute_batch("ROLLBACK").map_err(map_sqlite_error)?;
        self.finished = true;
        Ok(())
    }
}

// ============================================================================
// SECTION: Mapping
// ============================================================================

/// Returns the SRID companion column of a geometry column.
fn srid_column(geometry_column: &str) -> String {
    format!("{geometry_column}_srid")
}

/// Quotes an identifier for `SQLite`, doubling embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Returns the column affinity for a declared data type.
const fn column_affinity(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Smallint | DataType::Integer | DataType::Bigint | DataType::Boolean => "INTEGER",
        DataType::Real | DataType::DoublePrecision => "REAL",
        DataType::Numeric
        | DataType::Character
        | DataType::CharacterVarying
        | DataType::Text
        | DataType::Date
        | DataType::Time
        | DataType::Timestamp
        | DataType::TimestampTz
        | DataType::Json
        | DataType::Jsonb
        | DataType::Uuid
        | DataType::File => "TEXT",
    }
}

/// Converts a JSON value into a bindable `SQLite` value.
fn bind_value(value: &Value) -> Result<SqlValue, StoreError> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                Ok(SqlValue::Integer(integer))
            } else if let Some(float) = number.as_f64() {
                Ok(SqlValue::Real(float))
            } else {
                Err(StoreError::Invalid(format!("unbindable number {number}")))
            }
        }
        Value::String(text) => Ok(SqlValue::Text(text.clone())),
        Value::Array(_) | Value::Object(_) => Ok(SqlValue::Text(value.to_string())),
    }
}

/// Renders one attribute filter as a SQL clause, pushing its parameter.
///
/// A null comparand renders as `IS NULL`/`IS NOT NULL` for equality tests
/// and as a clause matching nothing for order comparisons, mirroring SQL
/// NULL semantics.
fn filter_clause(
    filter: &AttributeFilter,
    params: &mut Vec<SqlValue>,
) -> Result<String, StoreError> {
    let column = quote_ident(&filter.field);
    if filter.value.is_null() {
        return Ok(match filter.op {
            FilterOp::Eq => format!("{column} IS NULL"),
            FilterOp::Ne => format!("{column} IS NOT NULL"),
            FilterOp::Lt | FilterOp::Le | FilterOp::Gt | FilterOp::Ge => "0 = 1".to_string(),
        });
    }
    let operator = match filter.op {
        FilterOp::Eq => "=",
        FilterOp::Ne => "!=",
        FilterOp::Lt => "<",
        FilterOp::Le => "<=",
        FilterOp::Gt => ">",
        FilterOp::Ge => ">=",
    };
    params.push(bind_value(&filter.value)?);
    Ok(format!("{column} {operator} ?{}", params.len()))
}

/// Builds the column name and parameter lists of a record write.
fn column_bindings(
    dataset: &DatasetDef,
    write: &RecordWrite,
) -> Result<(Vec<String>, Vec<SqlValue>), StoreError> {
    let mut names = Vec::with_capacity(write.columns.len() + 2);
    let mut params = Vec::with_capacity(write.columns.len() + 2);
    for (name, value) in &write.columns {
        names.push(quote_ident(name));
        params.push(bind_value(value)?);
    }
    if let (Some(geometry_def), Some(geometry)) = (&dataset.geometry, &write.geometry) {
        if geometry.needs_reprojection() {
            return Err(StoreError::Invalid(format!(
                "cannot reproject geometry from {} to {}",
                geometry.source_srid, geometry.target_srid
            )));
        }
        names.push(quote_ident(&geometry_def.geometry_column));
        params.push(if geometry.geojson.is_null() {
            SqlValue::Null
        } else {
            SqlValue::Text(geometry.geojson.to_string())
        });
        names.push(quote_ident(&srid_column(&geometry_def.geometry_column)));
        params.push(SqlValue::Integer(i64::from(geometry.target_srid)));
    }
    Ok((names, params))
}

/// Reads one row into a stored record.
fn read_record(dataset: &DatasetDef, row: &rusqlite::Row<'_>) -> Result<StoredRecord, StoreError> {
    let statement = row.as_ref();
    let geometry_column =
        dataset.geometry.as_ref().map(|geometry| geometry.geometry_column.as_str());
    let skip_srid = geometry_column.map(srid_column);

    let mut record = StoredRecord {
        pk: Value::Null,
        attributes: BTreeMap::new(),
        geometry: geometry_column.map(|_| Value::Null),
    };
    for (index, name) in statement.column_names().iter().enumerate() {
        let raw = row.get_ref(index).map_err(map_sqlite_error)?;
        if *name == dataset.primary_key {
            record.pk = cell_to_json(&raw);
        } else if Some(*name) == geometry_column {
            record.geometry = Some(geometry_from_cell(&raw));
        } else if skip_srid.as_deref() == Some(*name) {
            // SRID companion column is store metadata, not an attribute.
        } else {
            record.attributes.insert((*name).to_string(), cell_to_json(&raw));
        }
    }
    Ok(record)
}

/// Converts one `SQLite` cell into a JSON value.
fn cell_to_json(cell: &ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(integer) => Value::from(*integer),
        ValueRef::Real(real) => Value::from(*real),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::String(String::from_utf8_lossy(blob).into_owned()),
    }
}

/// Parses a stored geometry cell back into GeoJSON.
fn geometry_from_cell(cell: &ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Text(text) => {
            serde_json::from_slice(text).unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}
