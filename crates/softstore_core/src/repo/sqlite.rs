//! SQLite-backed generic CRUD repository.
//!
//! # Responsibility
//! - Persist records as JSON documents in a per-repository table.
//! - Compile boolean condition trees into parameterized SQL.
//!
//! # Invariants
//! - Table and field names are validated against an identifier pattern
//!   before they reach SQL text; values are always bound as parameters.
//! - `create` fills unset `created_at`/`updated_at` at the storage
//!   boundary.
//! - `find` returns rows in insertion order (`rowid`).

use crate::model::audit::{epoch_seconds, field};
use crate::model::record::{Record, RecordId};
use crate::query::{Document, Filter, Where};
use crate::repo::crud::CrudRepository;
use crate::repo::{RepoError, RepoResult};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use serde_json::Value;
use std::marker::PhantomData;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// SQLite document-store implementation of [`CrudRepository`].
///
/// Each record occupies one row `(id, doc)` where `doc` holds the record
/// serialized as a JSON object. Conditions are evaluated in SQL via
/// `json_extract` over the document.
pub struct SqliteCrudRepository<'conn, T: Record> {
    conn: &'conn Connection,
    table: String,
    _record: PhantomData<T>,
}

impl<'conn, T: Record> SqliteCrudRepository<'conn, T> {
    /// Binds a repository to its table, creating the table when missing.
    ///
    /// # Errors
    /// - `InvalidData` when `table` is not a plain SQL identifier.
    pub fn try_new(conn: &'conn Connection, table: &str) -> RepoResult<Self> {
        ensure_identifier(table, "table name")?;

        // The id column is declared without affinity so string and
        // integer keys both compare exactly as bound.
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id PRIMARY KEY NOT NULL,
                doc TEXT NOT NULL
            );"
        ))?;

        info!("event=store_init module=repo status=ok table={table}");

        Ok(Self {
            conn,
            table: table.to_string(),
            _record: PhantomData,
        })
    }

    /// Name of the bound table.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn parse_record(&self, body: &str) -> RepoResult<T> {
        serde_json::from_str(body).map_err(|err| {
            RepoError::InvalidData(format!(
                "undecodable document in `{}`: {err}",
                self.table
            ))
        })
    }

    fn parse_object(&self, body: &str) -> RepoResult<Document> {
        let value: Value = serde_json::from_str(body).map_err(|err| {
            RepoError::InvalidData(format!(
                "undecodable document in `{}`: {err}",
                self.table
            ))
        })?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(RepoError::InvalidData(format!(
                "document in `{}` is not a JSON object",
                self.table
            ))),
        }
    }

    fn fetch_document(&self, id: &T::Id) -> RepoResult<Option<Document>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT doc FROM {} WHERE id = ?1;", self.table))?;
        let mut rows = stmt.query(params![bind_value(&id.to_value())?])?;
        match rows.next()? {
            Some(row) => {
                let body: String = row.get(0)?;
                Ok(Some(self.parse_object(&body)?))
            }
            None => Ok(None),
        }
    }

    fn store_document(&self, id: &SqlValue, doc: Document) -> RepoResult<()> {
        self.conn.execute(
            &format!("UPDATE {} SET doc = ?1 WHERE id = ?2;", self.table),
            params![Value::Object(doc).to_string(), id],
        )?;
        Ok(())
    }
}

impl<T: Record> CrudRepository<T> for SqliteCrudRepository<'_, T> {
    fn create(&self, entity: T) -> RepoResult<T> {
        let mut doc = to_document(&entity)?;

        // Storage-boundary defaults for unset timestamps.
        let now = epoch_seconds();
        default_timestamp(&mut doc, field::CREATED_AT, now);
        default_timestamp(&mut doc, field::UPDATED_AT, now);

        self.conn.execute(
            &format!("INSERT INTO {} (id, doc) VALUES (?1, ?2);", self.table),
            params![
                bind_value(&entity.id().to_value())?,
                Value::Object(doc.clone()).to_string()
            ],
        )?;

        from_document(doc)
    }

    fn create_many(&self, entities: Vec<T>) -> RepoResult<Vec<T>> {
        let mut created = Vec::with_capacity(entities.len());
        for entity in entities {
            created.push(self.create(entity)?);
        }
        Ok(created)
    }

    fn find(&self, filter: Option<&Filter>) -> RepoResult<Vec<T>> {
        let mut sql = format!("SELECT doc FROM {}", self.table);
        let mut binds: Vec<SqlValue> = Vec::new();

        if let Some(condition) = filter.and_then(|f| f.condition.as_ref()) {
            sql.push_str(" WHERE ");
            compile_condition(condition, &mut sql, &mut binds)?;
        }

        sql.push_str(" ORDER BY rowid ASC");

        let limit = filter.and_then(|f| f.limit);
        let offset = filter.map_or(0, |f| f.offset);
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            binds.push(SqlValue::Integer(i64::from(limit)));
            if offset > 0 {
                sql.push_str(" OFFSET ?");
                binds.push(SqlValue::Integer(i64::from(offset)));
            }
        } else if offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            binds.push(SqlValue::Integer(i64::from(offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let body: String = row.get(0)?;
            records.push(self.parse_record(&body)?);
        }
        Ok(records)
    }

    fn find_one(&self, filter: Option<&Filter>) -> RepoResult<Option<T>> {
        let mut limited = filter.cloned().unwrap_or_default();
        limited.limit = Some(1);
        Ok(self.find(Some(&limited))?.pop())
    }

    fn find_by_id(&self, id: &T::Id) -> RepoResult<Option<T>> {
        match self.fetch_document(id)? {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    fn update_all(&self, data: &Document, condition: Option<&Where>) -> RepoResult<u64> {
        let mut sql = format!("SELECT id, doc FROM {}", self.table);
        let mut binds: Vec<SqlValue> = Vec::new();
        if let Some(condition) = condition {
            sql.push_str(" WHERE ");
            compile_condition(condition, &mut sql, &mut binds)?;
        }
        sql.push_str(" ORDER BY rowid ASC");

        let matched = {
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(binds))?;
            let mut matched: Vec<(SqlValue, Document)> = Vec::new();
            while let Some(row) = rows.next()? {
                let row_id: SqlValue = row.get(0)?;
                let body: String = row.get(1)?;
                matched.push((row_id, self.parse_object(&body)?));
            }
            matched
        };

        let mut updated = 0;
        for (row_id, mut doc) in matched {
            merge_patch(&mut doc, data);
            self.store_document(&row_id, doc)?;
            updated += 1;
        }
        Ok(updated)
    }

    fn update_by_id(&self, id: &T::Id, data: &Document) -> RepoResult<()> {
        let Some(mut doc) = self.fetch_document(id)? else {
            return Err(RepoError::NotFound(id.to_string()));
        };
        merge_patch(&mut doc, data);
        self.store_document(&bind_value(&id.to_value())?, doc)
    }

    fn count(&self, condition: Option<&Where>) -> RepoResult<u64> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let mut binds: Vec<SqlValue> = Vec::new();
        if let Some(condition) = condition {
            sql.push_str(" WHERE ");
            compile_condition(condition, &mut sql, &mut binds)?;
        }

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        Ok(count as u64)
    }

    fn delete_by_id(&self, id: &T::Id) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", self.table),
            params![bind_value(&id.to_value())?],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete_all(&self, condition: Option<&Where>) -> RepoResult<u64> {
        let mut sql = format!("DELETE FROM {}", self.table);
        let mut binds: Vec<SqlValue> = Vec::new();
        if let Some(condition) = condition {
            sql.push_str(" WHERE ");
            compile_condition(condition, &mut sql, &mut binds)?;
        }

        let changed = self.conn.execute(&sql, params_from_iter(binds))?;
        Ok(changed as u64)
    }
}

fn to_document<T: Record>(entity: &T) -> RepoResult<Document> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(RepoError::InvalidData(
            "record must serialize to a JSON object".to_string(),
        )),
        Err(err) => Err(RepoError::InvalidData(format!(
            "record serialization failed: {err}"
        ))),
    }
}

fn from_document<T: Record>(doc: Document) -> RepoResult<T> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|err| RepoError::InvalidData(format!("record deserialization failed: {err}")))
}

fn default_timestamp(doc: &mut Document, name: &str, now: i64) {
    let unset = matches!(doc.get(name), None | Some(Value::Null));
    if unset {
        doc.insert(name.to_string(), Value::from(now));
    }
}

fn merge_patch(doc: &mut Document, data: &Document) {
    for (name, value) in data {
        doc.insert(name.clone(), value.clone());
    }
}

fn compile_condition(
    condition: &Where,
    sql: &mut String,
    binds: &mut Vec<SqlValue>,
) -> RepoResult<()> {
    match condition {
        Where::Fields(map) => {
            if map.is_empty() {
                sql.push_str("1 = 1");
                return Ok(());
            }
            sql.push('(');
            let mut first = true;
            for (name, value) in map {
                if !first {
                    sql.push_str(" AND ");
                }
                first = false;
                ensure_identifier(name, "field name")?;
                if value.is_null() {
                    sql.push_str(&format!("json_extract(doc, '$.{name}') IS NULL"));
                } else {
                    sql.push_str(&format!("json_extract(doc, '$.{name}') = ?"));
                    binds.push(bind_value(value)?);
                }
            }
            sql.push(')');
        }
        Where::And(clauses) => {
            if clauses.is_empty() {
                sql.push_str("1 = 1");
                return Ok(());
            }
            sql.push('(');
            for (index, clause) in clauses.iter().enumerate() {
                if index > 0 {
                    sql.push_str(" AND ");
                }
                compile_condition(clause, sql, binds)?;
            }
            sql.push(')');
        }
        Where::Or(clauses) => {
            if clauses.is_empty() {
                sql.push_str("1 = 0");
                return Ok(());
            }
            sql.push('(');
            for (index, clause) in clauses.iter().enumerate() {
                if index > 0 {
                    sql.push_str(" OR ");
                }
                compile_condition(clause, sql, binds)?;
            }
            sql.push(')');
        }
    }
    Ok(())
}

fn bind_value(value: &Value) -> RepoResult<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => number
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| number.as_f64().map(SqlValue::Real))
            .ok_or_else(|| {
                RepoError::InvalidData(format!("unrepresentable numeric value `{number}`"))
            }),
        Value::String(text) => Ok(SqlValue::Text(text.clone())),
        Value::Array(_) | Value::Object(_) => Err(RepoError::InvalidData(
            "filter values must be scalars".to_string(),
        )),
    }
}

fn ensure_identifier(name: &str, what: &str) -> RepoResult<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(RepoError::InvalidData(format!(
            "invalid {what} `{name}`; expected a plain SQL identifier"
        )))
    }
}
