use rusqlite::params;

use super::{parse_datetime, Store, StoreError, StoreResult};
use crate::models::Notification;

impl Store {
    // ==================== Notification Operations ====================

    pub fn create_notification(&self, notification: &Notification) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"INSERT INTO notifications (id, user_id, notification_type, actor_id, resource_type,
                resource_id, title, body, read, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                &notification.id,
                &notification.user_id,
                &notification.notification_type,
                &notification.actor_id,
                &notification.resource_type,
                &notification.resource_id,
                &notification.title,
                &notification.body,
                notification.read,
                notification.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_notifications(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT * FROM notifications WHERE user_id = ?1 AND (?2 = 0 OR read = 0)
               ORDER BY created_at DESC, rowid DESC LIMIT ?3 OFFSET ?4"#,
        )?;
        let notifications = stmt
            .query_map(params![user_id, unread_only, limit, offset], row_to_notification)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notifications)
    }

    pub fn count_notifications(&self, user_id: &str, unread_only: bool) -> StoreResult<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND (?2 = 0 OR read = 0)",
            params![user_id, unread_only],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn mark_notification_read(&self, id: &str, user_id: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("Notification {}", id)));
        }
        Ok(())
    }

    /// Returns how many notifications changed
    pub fn mark_all_notifications_read(&self, user_id: &str) -> StoreResult<usize> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
            params![user_id],
        )?;
        Ok(rows)
    }

    pub fn delete_notification(&self, id: &str, user_id: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("Notification {}", id)));
        }
        Ok(())
    }
}

fn row_to_notification(row: &rusqlite::Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        notification_type: row.get("notification_type")?,
        actor_id: row.get("actor_id")?,
        resource_type: row.get("resource_type")?,
        resource_id: row.get("resource_id")?,
        title: row.get("title")?,
        body: row.get("body")?,
        read: row.get("read")?,
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
    })
}
