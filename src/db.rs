//! Database module for Horae
//!
//! A small key-value store on top of SQLite: every bucket is a table of
//! `(key BLOB, value BLOB)` pairs. User records live in the `users` bucket
//! keyed by the big-endian chat id.

mod schema;

pub use schema::USERS_BUCKET;
use schema::{
    create_bucket_sql, decode_chat_id, drop_bucket_sql, encode_chat_id, entries_sql,
    is_valid_bucket_name, put_sql, table_name, BUCKET_EXISTS_SQL,
};

use crate::user::{ChatId, User};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),
    #[error("Database lock poisoned")]
    LockPoisoned,
    #[error("Invalid key of {0} bytes in bucket {1}")]
    InvalidKey(usize, String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> DbResult<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.create_bucket_if_not_exists(USERS_BUCKET)?;
        Ok(db)
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn check_name(name: &str) -> DbResult<()> {
        if is_valid_bucket_name(name) {
            Ok(())
        } else {
            Err(DbError::InvalidBucketName(name.to_string()))
        }
    }

    // ==================== Bucket Operations ====================

    pub fn create_bucket_if_not_exists(&self, name: &str) -> DbResult<()> {
        Self::check_name(name)?;
        self.lock()?.execute_batch(&create_bucket_sql(name))?;
        Ok(())
    }

    pub fn bucket_exists(&self, name: &str) -> DbResult<bool> {
        Self::check_name(name)?;
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row(BUCKET_EXISTS_SQL, params![table_name(name)], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Insert or replace one value
    pub fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> DbResult<()> {
        Self::check_name(bucket)?;
        let conn = self.lock()?;
        conn.execute(&put_sql(bucket), params![key, value])
            .map_err(|e| missing_table(e, bucket))?;
        Ok(())
    }

    /// All pairs of a bucket, ordered by key
    pub fn entries(&self, bucket: &str) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Self::check_name(bucket)?;
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&entries_sql(bucket))
            .map_err(|e| missing_table(e, bucket))?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Drop every entry of a bucket by recreating it
    pub fn wipe_bucket(&self, name: &str) -> DbResult<()> {
        if !self.bucket_exists(name)? {
            return Err(DbError::BucketNotFound(name.to_string()));
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute_batch(&drop_bucket_sql(name))?;
        tx.execute_batch(&create_bucket_sql(name))?;
        tx.commit()?;
        tracing::info!(bucket = name, "Bucket wiped");
        Ok(())
    }

    // ==================== User Operations ====================

    pub fn save_user(&self, chat_id: ChatId, user: &User) -> DbResult<()> {
        let value = serde_json::to_vec(user)?;
        self.put(USERS_BUCKET, &encode_chat_id(chat_id), &value)
    }

    /// Every stored user in key order
    pub fn load_users(&self) -> DbResult<Vec<(ChatId, User)>> {
        self.entries(USERS_BUCKET)?
            .into_iter()
            .map(|(key, value)| {
                let chat_id = decode_chat_id(&key)
                    .ok_or_else(|| DbError::InvalidKey(key.len(), USERS_BUCKET.to_string()))?;
                Ok((chat_id, serde_json::from_slice(&value)?))
            })
            .collect()
    }
}

/// Map "no such table" onto `BucketNotFound`
fn missing_table(e: rusqlite::Error, bucket: &str) -> DbError {
    match &e {
        rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("no such table") => {
            DbError::BucketNotFound(bucket.to_string())
        }
        _ => DbError::Sqlite(e),
    }
}
