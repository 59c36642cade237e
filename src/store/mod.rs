use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;

mod achievements;
mod friends;
mod notifications;
mod reservations;
mod wishes;
mod wishlists;

pub use friends::SendOutcome;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid: {0}")]
    Invalid(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Thread-safe SQLite store. One `impl Store` block per entity lives in
/// the submodules.
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path
    pub fn new(db_path: &str) -> StoreResult<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store for testing
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                display_name TEXT DEFAULT '',
                bio TEXT DEFAULT '',
                avatar_url TEXT DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS wish_lists (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT DEFAULT '',
                is_public INTEGER DEFAULT 0,
                share_uuid TEXT UNIQUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            );

            CREATE TABLE IF NOT EXISTS wishes (
                id TEXT PRIMARY KEY,
                wish_list_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT DEFAULT '',
                url TEXT,
                price REAL,
                image_url TEXT,
                priority INTEGER DEFAULT 0,
                is_reserved INTEGER DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (wish_list_id) REFERENCES wish_lists(id),
                FOREIGN KEY (user_id) REFERENCES users(id)
            );

            CREATE TABLE IF NOT EXISTS reservations (
                id TEXT PRIMARY KEY,
                wish_id TEXT UNIQUE NOT NULL,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (wish_id) REFERENCES wishes(id),
                FOREIGN KEY (user_id) REFERENCES users(id)
            );

            CREATE TABLE IF NOT EXISTS friend_requests (
                id TEXT PRIMARY KEY,
                sender_id TEXT NOT NULL,
                receiver_id TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (sender_id) REFERENCES users(id),
                FOREIGN KEY (receiver_id) REFERENCES users(id),
                UNIQUE(sender_id, receiver_id)
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                notification_type TEXT NOT NULL,
                actor_id TEXT,
                resource_type TEXT,
                resource_id TEXT,
                title TEXT DEFAULT '',
                body TEXT DEFAULT '',
                read INTEGER DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            );

            CREATE TABLE IF NOT EXISTS user_achievements (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                achievement_key TEXT NOT NULL,
                granted_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id),
                UNIQUE(user_id, achievement_key)
            );

            CREATE INDEX IF NOT EXISTS idx_wish_lists_user_id ON wish_lists(user_id);
            CREATE INDEX IF NOT EXISTS idx_wishes_wish_list_id ON wishes(wish_list_id);
            CREATE INDEX IF NOT EXISTS idx_wishes_user_id ON wishes(user_id);
            CREATE INDEX IF NOT EXISTS idx_reservations_user_id ON reservations(user_id);
            CREATE INDEX IF NOT EXISTS idx_friend_requests_receiver ON friend_requests(receiver_id, status);
            CREATE INDEX IF NOT EXISTS idx_notifications_user_id ON notifications(user_id, read);
            "#,
        )?;
        Ok(())
    }

    // ==================== User Operations ====================

    pub fn create_user(&self, user: &mut User) -> StoreResult<()> {
        let conn = self.conn()?;
        user.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        user.created_at = now;
        user.updated_at = now;

        conn.execute(
            r#"INSERT INTO users (id, username, email, password_hash, display_name, bio,
                avatar_url, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                &user.id,
                &user.username,
                &user.email,
                &user.password_hash,
                &user.display_name,
                &user.bio,
                &user.avatar_url,
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| on_constraint(e, "Username or email already taken"))?;
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> StoreResult<User> {
        let conn = self.conn()?;
        conn.query_row("SELECT * FROM users WHERE id = ?1", params![id], row_to_user)
            .map_err(|e| not_found(e, format!("User {}", id)))
    }

    pub fn get_user_by_username(&self, username: &str) -> StoreResult<User> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM users WHERE username = ?1",
            params![username],
            row_to_user,
        )
        .map_err(|e| not_found(e, format!("User {}", username)))
    }

    pub fn update_user(&self, user: &mut User) -> StoreResult<()> {
        let conn = self.conn()?;
        user.updated_at = Utc::now();

        let rows = conn.execute(
            r#"UPDATE users SET display_name = ?1, bio = ?2, avatar_url = ?3, updated_at = ?4
               WHERE id = ?5"#,
            params![
                &user.display_name,
                &user.bio,
                &user.avatar_url,
                user.updated_at.to_rfc3339(),
                &user.id,
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("User {}", user.id)));
        }
        Ok(())
    }

    /// Case-insensitive substring match on username and display name
    pub fn search_users(&self, query: &str, exclude_id: &str, limit: i64) -> StoreResult<Vec<PublicUser>> {
        let conn = self.conn()?;
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let mut stmt = conn.prepare(
            r#"SELECT * FROM users
               WHERE id != ?1
                 AND (LOWER(username) LIKE ?2 ESCAPE '\' OR LOWER(display_name) LIKE ?2 ESCAPE '\')
               ORDER BY username ASC LIMIT ?3"#,
        )?;
        let users = stmt
            .query_map(params![exclude_id, pattern, limit], row_to_user)?
            .map(|r| r.map(|u| u.public()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    pub fn count_users(&self) -> StoreResult<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    // ==================== Stats ====================

    pub fn user_stats(&self, user_id: &str) -> StoreResult<UserStats> {
        let conn = self.conn()?;
        let stats = conn.query_row(
            r#"SELECT
                (SELECT COUNT(*) FROM wish_lists WHERE user_id = ?1),
                (SELECT COUNT(*) FROM wishes WHERE user_id = ?1),
                (SELECT COUNT(*) FROM wishes WHERE user_id = ?1 AND is_reserved = 1),
                (SELECT COUNT(*) FROM friend_requests WHERE sender_id = ?1 AND status = 'accepted'),
                (SELECT COUNT(*) FROM reservations WHERE user_id = ?1),
                (SELECT COUNT(*) FROM user_achievements WHERE user_id = ?1)"#,
            params![user_id],
            |row| {
                Ok(UserStats {
                    lists: row.get(0)?,
                    wishes: row.get(1)?,
                    reserved_wishes: row.get(2)?,
                    friends: row.get(3)?,
                    reservations_made: row.get(4)?,
                    achievements: row.get(5)?,
                })
            },
        )?;
        Ok(stats)
    }
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        display_name: row.get("display_name")?,
        bio: row.get("bio")?,
        avatar_url: row.get("avatar_url")?,
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
    })
}

fn not_found(e: rusqlite::Error, what: String) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(what),
        _ => StoreError::Database(e),
    }
}

fn on_constraint(e: rusqlite::Error, msg: &str) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _) if err.code == ErrorCode::ConstraintViolation => {
            StoreError::Conflict(msg.to_string())
        }
        _ => StoreError::Database(e),
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
