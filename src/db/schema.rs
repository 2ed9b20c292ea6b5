//! Bucket layout and key encoding

use crate::user::ChatId;
use regex::Regex;
use std::sync::LazyLock;

/// Bucket holding one JSON `User` per chat
pub const USERS_BUCKET: &str = "users";

static BUCKET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]{1,64}$").expect("bucket name pattern is valid")
});

/// Whether `name` can be used as a bucket (and thus table) name
pub fn is_valid_bucket_name(name: &str) -> bool {
    BUCKET_NAME.is_match(name)
}

/// Bucket names are validated before they reach this point.
pub fn create_bucket_sql(name: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS \"bucket_{name}\" (
            key BLOB PRIMARY KEY,
            value BLOB NOT NULL
        )"
    )
}

pub fn drop_bucket_sql(name: &str) -> String {
    format!("DROP TABLE \"bucket_{name}\"")
}

pub fn put_sql(name: &str) -> String {
    format!(
        "INSERT INTO \"bucket_{name}\" (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value"
    )
}

pub fn entries_sql(name: &str) -> String {
    format!("SELECT key, value FROM \"bucket_{name}\" ORDER BY key")
}

pub const BUCKET_EXISTS_SQL: &str =
    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1";

pub fn table_name(bucket: &str) -> String {
    format!("bucket_{bucket}")
}

/// Big-endian 8-byte key
pub fn encode_chat_id(chat_id: ChatId) -> [u8; 8] {
    chat_id.0.to_be_bytes()
}

pub fn decode_chat_id(key: &[u8]) -> Option<ChatId> {
    let bytes: [u8; 8] = key.try_into().ok()?;
    Some(ChatId(i64::from_be_bytes(bytes)))
}
