use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{not_found, parse_datetime, Store, StoreError, StoreResult};
use crate::models::WishList;

const WISH_LIST_SELECT: &str = r#"SELECT l.*,
    (SELECT COUNT(*) FROM wishes w WHERE w.wish_list_id = l.id) AS wish_count,
    (SELECT COUNT(*) FROM wishes w WHERE w.wish_list_id = l.id AND w.is_reserved = 1) AS reserved_count
    FROM wish_lists l"#;

impl Store {
    // ==================== Wish List Operations ====================

    pub fn create_wish_list(&self, list: &mut WishList) -> StoreResult<()> {
        let conn = self.conn()?;
        list.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        list.created_at = now;
        list.updated_at = now;
        list.wish_count = 0;
        list.reserved_count = 0;
        list.share_uuid = if list.is_public {
            Some(Uuid::new_v4().to_string())
        } else {
            None
        };

        conn.execute(
            r#"INSERT INTO wish_lists (id, user_id, name, description, is_public, share_uuid, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                &list.id,
                &list.user_id,
                &list.name,
                &list.description,
                list.is_public,
                &list.share_uuid,
                list.created_at.to_rfc3339(),
                list.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_wish_list(&self, id: &str) -> StoreResult<WishList> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{} WHERE l.id = ?1", WISH_LIST_SELECT),
            params![id],
            row_to_wish_list,
        )
        .map_err(|e| not_found(e, format!("Wish list {}", id)))
    }

    /// Only public lists resolve; a list made private loses its link
    pub fn get_wish_list_by_share_uuid(&self, share_uuid: &str) -> StoreResult<WishList> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{} WHERE l.share_uuid = ?1 AND l.is_public = 1", WISH_LIST_SELECT),
            params![share_uuid],
            row_to_wish_list,
        )
        .map_err(|e| not_found(e, "Shared wish list".to_string()))
    }

    pub fn update_wish_list(&self, list: &mut WishList) -> StoreResult<()> {
        let conn = self.conn()?;
        list.updated_at = Utc::now();

        let rows = conn.execute(
            "UPDATE wish_lists SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![&list.name, &list.description, list.updated_at.to_rfc3339(), &list.id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("Wish list {}", list.id)));
        }
        Ok(())
    }

    /// Toggle public sharing. Going public keeps an existing share uuid
    /// or mints one; going private drops it.
    pub fn set_wish_list_public(&self, id: &str, public: bool) -> StoreResult<WishList> {
        {
            let conn = self.conn()?;
            let current: Option<Option<String>> = conn
                .query_row(
                    "SELECT share_uuid FROM wish_lists WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            let current = current.ok_or_else(|| StoreError::NotFound(format!("Wish list {}", id)))?;

            let share_uuid = match (public, current) {
                (true, Some(existing)) => Some(existing),
                (true, None) => Some(Uuid::new_v4().to_string()),
                (false, _) => None,
            };

            conn.execute(
                "UPDATE wish_lists SET is_public = ?1, share_uuid = ?2, updated_at = ?3 WHERE id = ?4",
                params![public, share_uuid, Utc::now().to_rfc3339(), id],
            )?;
        }
        self.get_wish_list(id)
    }

    pub fn list_wish_lists(
        &self,
        user_id: &str,
        public_only: bool,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<WishList>> {
        let conn = self.conn()?;
        let sql = if public_only {
            format!(
                "{} WHERE l.user_id = ?1 AND l.is_public = 1 ORDER BY l.created_at DESC LIMIT ?2 OFFSET ?3",
                WISH_LIST_SELECT
            )
        } else {
            format!(
                "{} WHERE l.user_id = ?1 ORDER BY l.created_at DESC LIMIT ?2 OFFSET ?3",
                WISH_LIST_SELECT
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let lists = stmt
            .query_map(params![user_id, limit, offset], row_to_wish_list)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lists)
    }

    pub fn count_wish_lists(&self, user_id: &str, public_only: bool) -> StoreResult<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM wish_lists WHERE user_id = ?1 AND (?2 = 0 OR is_public = 1)",
            params![user_id, public_only],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a list together with its wishes and their reservations
    pub fn delete_wish_list(&self, id: &str) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM reservations WHERE wish_id IN (SELECT id FROM wishes WHERE wish_list_id = ?1)",
            params![id],
        )?;
        tx.execute("DELETE FROM wishes WHERE wish_list_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM wish_lists WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("Wish list {}", id)));
        }
        tx.commit()?;
        Ok(())
    }
}

pub(super) fn wish_list_owner(conn: &Connection, wish_list_id: &str) -> StoreResult<String> {
    conn.query_row(
        "SELECT user_id FROM wish_lists WHERE id = ?1",
        params![wish_list_id],
        |row| row.get(0),
    )
    .map_err(|e| not_found(e, format!("Wish list {}", wish_list_id)))
}

fn row_to_wish_list(row: &rusqlite::Row) -> rusqlite::Result<WishList> {
    Ok(WishList {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        is_public: row.get("is_public")?,
        share_uuid: row.get("share_uuid")?,
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
        wish_count: row.get("wish_count")?,
        reserved_count: row.get("reserved_count")?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_create_private_list_has_no_share_uuid() {
        let store = Store::in_memory().unwrap();
        let alice = user(&store, "alice");
        let list = list(&store, &alice, "Birthday");

        assert!(!list.is_public);
        assert!(list.share_uuid.is_none());
        let fetched = store.get_wish_list(&list.id).unwrap();
        assert_eq!(fetched.name, "Birthday");
        assert_eq!(fetched.wish_count, 0);
    }

    #[test]
    fn test_share_uuid_follows_visibility() {
        let store = Store::in_memory().unwrap();
        let alice = user(&store, "alice");
        let list = list(&store, &alice, "Wedding");

        let public = store.set_wish_list_public(&list.id, true).unwrap();
        let uuid = public.share_uuid.clone().unwrap();
        assert!(public.is_public);

        // Sharing again keeps the same link
        let again = store.set_wish_list_public(&list.id, true).unwrap();
        assert_eq!(again.share_uuid.as_deref(), Some(uuid.as_str()));
        assert_eq!(store.get_wish_list_by_share_uuid(&uuid).unwrap().id, list.id);

        let private = store.set_wish_list_public(&list.id, false).unwrap();
        assert!(private.share_uuid.is_none());
        assert!(matches!(
            store.get_wish_list_by_share_uuid(&uuid),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_counts_and_public_filter() {
        let store = Store::in_memory().unwrap();
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        let private = list(&store, &alice, "Private");
        let shared = list(&store, &alice, "Shared");
        store.set_wish_list_public(&shared.id, true).unwrap();
        let w = wish(&store, &private, "Lamp");
        wish(&store, &private, "Rug");
        store.reserve_wish(&w.id, &bob.id).unwrap();

        let all = store.list_wish_lists(&alice.id, false, 50, 0).unwrap();
        assert_eq!(all.len(), 2);
        let private_row = all.iter().find(|l| l.id == private.id).unwrap();
        assert_eq!(private_row.wish_count, 2);
        assert_eq!(private_row.reserved_count, 1);

        let public = store.list_wish_lists(&alice.id, true, 50, 0).unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, shared.id);
        assert_eq!(store.count_wish_lists(&alice.id, false).unwrap(), 2);
        assert_eq!(store.count_wish_lists(&alice.id, true).unwrap(), 1);
    }

    #[test]
    fn test_delete_list_cascades() {
        let store = Store::in_memory().unwrap();
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        let list = list(&store, &alice, "Birthday");
        let w = wish(&store, &list, "Book");
        store.reserve_wish(&w.id, &bob.id).unwrap();

        store.delete_wish_list(&list.id).unwrap();

        assert!(matches!(store.get_wish_list(&list.id), Err(StoreError::NotFound(_))));
        assert!(matches!(store.get_wish(&w.id), Err(StoreError::NotFound(_))));
        assert!(store.list_reservations_by_user(&bob.id).unwrap().is_empty());
        assert!(matches!(store.delete_wish_list(&list.id), Err(StoreError::NotFound(_))));
    }
}
