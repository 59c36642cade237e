use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use super::{parse_datetime, Store, StoreResult};
use crate::models::UserAchievement;

impl Store {
    // ==================== Achievement Operations ====================

    /// True only the first time `key` is granted to `user_id`
    pub fn grant_achievement(&self, user_id: &str, key: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            r#"INSERT OR IGNORE INTO user_achievements (id, user_id, achievement_key, granted_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![Uuid::new_v4().to_string(), user_id, key, Utc::now().to_rfc3339()],
        )?;
        Ok(rows == 1)
    }

    pub fn list_user_achievements(&self, user_id: &str) -> StoreResult<Vec<UserAchievement>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM user_achievements WHERE user_id = ?1 ORDER BY granted_at ASC, rowid ASC",
        )?;
        let achievements = stmt
            .query_map(params![user_id], |row| {
                Ok(UserAchievement {
                    id: row.get("id")?,
                    user_id: row.get("user_id")?,
                    achievement_key: row.get("achievement_key")?,
                    granted_at: parse_datetime(row.get::<_, String>("granted_at")?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(achievements)
    }
}
