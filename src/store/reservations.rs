use chrono::Utc;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use super::wishes::row_to_wish;
use super::{on_constraint, parse_datetime, row_to_user, Store, StoreError, StoreResult};
use crate::models::{Reservation, ReservationDetail};

impl Store {
    // ==================== Reservation Operations ====================

    /// First writer wins. The conditional flip of `is_reserved` and the
    /// reservation insert happen in one IMMEDIATE transaction, so a second
    /// reserver sees zero affected rows and gets a conflict.
    pub fn reserve_wish(&self, wish_id: &str, user_id: &str) -> StoreResult<Reservation> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let owner: Option<String> = tx
            .query_row(
                "SELECT user_id FROM wishes WHERE id = ?1",
                params![wish_id],
                |row| row.get(0),
            )
            .optional()?;
        let owner = owner.ok_or_else(|| StoreError::NotFound(format!("Wish {}", wish_id)))?;
        if owner == user_id {
            return Err(StoreError::Invalid("Cannot reserve your own wish".to_string()));
        }

        let now = Utc::now();
        let rows = tx.execute(
            "UPDATE wishes SET is_reserved = 1, updated_at = ?1 WHERE id = ?2 AND is_reserved = 0",
            params![now.to_rfc3339(), wish_id],
        )?;
        if rows == 0 {
            return Err(StoreError::Conflict("Wish is already reserved".to_string()));
        }

        let reservation = Reservation {
            id: Uuid::new_v4().to_string(),
            wish_id: wish_id.to_string(),
            user_id: user_id.to_string(),
            created_at: now,
        };
        tx.execute(
            "INSERT INTO reservations (id, wish_id, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                &reservation.id,
                &reservation.wish_id,
                &reservation.user_id,
                reservation.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| on_constraint(e, "Wish is already reserved"))?;

        tx.commit()?;
        Ok(reservation)
    }

    /// Only the reserving user can cancel; anyone else sees NotFound
    pub fn cancel_reservation(&self, wish_id: &str, user_id: &str) -> StoreResult<Reservation> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let reservation = tx
            .query_row(
                "SELECT * FROM reservations WHERE wish_id = ?1 AND user_id = ?2",
                params![wish_id, user_id],
                row_to_reservation,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("Reservation for wish {}", wish_id)))?;

        tx.execute("DELETE FROM reservations WHERE id = ?1", params![&reservation.id])?;
        tx.execute(
            "UPDATE wishes SET is_reserved = 0, updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), wish_id],
        )?;
        tx.commit()?;
        Ok(reservation)
    }

    pub fn get_reservation_for_wish(&self, wish_id: &str) -> StoreResult<Option<Reservation>> {
        let conn = self.conn()?;
        let reservation = conn
            .query_row(
                "SELECT * FROM reservations WHERE wish_id = ?1",
                params![wish_id],
                row_to_reservation,
            )
            .optional()?;
        Ok(reservation)
    }

    /// Everything `user_id` has reserved, newest first
    pub fn list_reservations_by_user(&self, user_id: &str) -> StoreResult<Vec<ReservationDetail>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT r.id AS r_id, r.wish_id AS r_wish_id, r.user_id AS r_user_id,
                      r.created_at AS r_created_at
               FROM reservations r WHERE r.user_id = ?1
               ORDER BY r.created_at DESC, r.rowid DESC"#,
        )?;
        let reservations = stmt
            .query_map(params![user_id], |row| {
                Ok(Reservation {
                    id: row.get("r_id")?,
                    wish_id: row.get("r_wish_id")?,
                    user_id: row.get("r_user_id")?,
                    created_at: parse_datetime(row.get::<_, String>("r_created_at")?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut details = Vec::with_capacity(reservations.len());
        for reservation in reservations {
            let wish = conn.query_row(
                "SELECT * FROM wishes WHERE id = ?1",
                params![&reservation.wish_id],
                row_to_wish,
            )?;
            let owner = conn.query_row(
                "SELECT * FROM users WHERE id = ?1",
                params![&wish.user_id],
                row_to_user,
            )?;
            details.push(ReservationDetail {
                reservation,
                wish,
                owner: owner.public(),
            });
        }
        Ok(details)
    }
}

fn row_to_reservation(row: &rusqlite::Row) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: row.get("id")?,
        wish_id: row.get("wish_id")?,
        user_id: row.get("user_id")?,
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
    })
}
