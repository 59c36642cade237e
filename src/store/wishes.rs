use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use super::wishlists::wish_list_owner;
use super::{not_found, parse_datetime, Store, StoreError, StoreResult};
use crate::models::Wish;

impl Store {
    // ==================== Wish Operations ====================

    /// Owner is always taken from the list, whatever the caller set
    pub fn create_wish(&self, wish: &mut Wish) -> StoreResult<()> {
        let conn = self.conn()?;
        wish.user_id = wish_list_owner(&conn, &wish.wish_list_id)?;
        wish.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        wish.created_at = now;
        wish.updated_at = now;
        wish.is_reserved = false;

        conn.execute(
            r#"INSERT INTO wishes (id, wish_list_id, user_id, title, description, url, price,
                image_url, priority, is_reserved, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?11)"#,
            params![
                &wish.id,
                &wish.wish_list_id,
                &wish.user_id,
                &wish.title,
                &wish.description,
                &wish.url,
                wish.price,
                &wish.image_url,
                wish.priority,
                wish.created_at.to_rfc3339(),
                wish.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_wish(&self, id: &str) -> StoreResult<Wish> {
        let conn = self.conn()?;
        conn.query_row("SELECT * FROM wishes WHERE id = ?1", params![id], row_to_wish)
            .map_err(|e| not_found(e, format!("Wish {}", id)))
    }

    /// Updates the editable fields. Reservation state is never touched here.
    pub fn update_wish(&self, wish: &mut Wish) -> StoreResult<()> {
        let conn = self.conn()?;
        wish.updated_at = Utc::now();

        let rows = conn.execute(
            r#"UPDATE wishes SET title = ?1, description = ?2, url = ?3, price = ?4,
               image_url = ?5, priority = ?6, updated_at = ?7 WHERE id = ?8"#,
            params![
                &wish.title,
                &wish.description,
                &wish.url,
                wish.price,
                &wish.image_url,
                wish.priority,
                wish.updated_at.to_rfc3339(),
                &wish.id,
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("Wish {}", wish.id)));
        }
        Ok(())
    }

    pub fn delete_wish(&self, id: &str) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM reservations WHERE wish_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM wishes WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("Wish {}", id)));
        }
        tx.commit()?;
        Ok(())
    }

    /// Highest priority first, then oldest first
    pub fn list_wishes(&self, wish_list_id: &str) -> StoreResult<Vec<Wish>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT * FROM wishes WHERE wish_list_id = ?1
               ORDER BY priority DESC, created_at ASC, rowid ASC"#,
        )?;
        let wishes = stmt
            .query_map(params![wish_list_id], row_to_wish)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(wishes)
    }
}

pub(super) fn row_to_wish(row: &rusqlite::Row) -> rusqlite::Result<Wish> {
    Ok(Wish {
        id: row.get("id")?,
        wish_list_id: row.get("wish_list_id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        url: row.get("url")?,
        price: row.get("price")?,
        image_url: row.get("image_url")?,
        priority: row.get("priority")?,
        is_reserved: row.get("is_reserved")?,
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
    })
}
