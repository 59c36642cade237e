use chrono::Utc;
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};
use uuid::Uuid;

use super::{not_found, parse_datetime, row_to_user, Store, StoreError, StoreResult};
use crate::models::{FriendRequest, FriendRequestStatus, FriendRequestView, PublicUser};

/// What `send_friend_request` ended up doing
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// A new pending request was created
    Sent(FriendRequest),
    /// A previously declined request was reopened
    Resent(FriendRequest),
    /// The receiver had already asked us; their request was accepted instead
    AutoAccepted(FriendRequest),
}

impl SendOutcome {
    pub fn request(&self) -> &FriendRequest {
        match self {
            SendOutcome::Sent(r) | SendOutcome::Resent(r) | SendOutcome::AutoAccepted(r) => r,
        }
    }

    pub fn auto_accepted(&self) -> bool {
        matches!(self, SendOutcome::AutoAccepted(_))
    }
}

impl Store {
    // ==================== Friend Request Operations ====================

    pub fn send_friend_request(&self, sender_id: &str, receiver_id: &str) -> StoreResult<SendOutcome> {
        if sender_id == receiver_id {
            return Err(StoreError::Invalid("Cannot befriend yourself".to_string()));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let receiver_exists: Option<String> = tx
            .query_row("SELECT id FROM users WHERE id = ?1", params![receiver_id], |row| row.get(0))
            .optional()?;
        if receiver_exists.is_none() {
            return Err(StoreError::NotFound(format!("User {}", receiver_id)));
        }

        let now = Utc::now();

        // A pending counter-request wins over anything in our direction,
        // including an old declined row, which the reciprocal upsert flips
        let existing = find_request(&tx, sender_id, receiver_id)?;
        let reverse = find_request(&tx, receiver_id, sender_id)?;

        if let Some(mut reverse) = reverse {
            match reverse.status {
                FriendRequestStatus::Pending => {
                    accept_in_tx(&tx, &reverse)?;
                    tx.commit()?;
                    reverse.status = FriendRequestStatus::Accepted;
                    reverse.updated_at = now;
                    return Ok(SendOutcome::AutoAccepted(reverse));
                }
                FriendRequestStatus::Accepted => {
                    return Err(StoreError::Conflict("Already friends".to_string()));
                }
                FriendRequestStatus::Declined => {}
            }
        }

        if let Some(mut existing) = existing {
            return match existing.status {
                FriendRequestStatus::Accepted => Err(StoreError::Conflict("Already friends".to_string())),
                FriendRequestStatus::Pending => {
                    Err(StoreError::Conflict("Friend request already pending".to_string()))
                }
                FriendRequestStatus::Declined => {
                    tx.execute(
                        "UPDATE friend_requests SET status = 'pending', updated_at = ?1 WHERE id = ?2",
                        params![now.to_rfc3339(), &existing.id],
                    )?;
                    tx.commit()?;
                    existing.status = FriendRequestStatus::Pending;
                    existing.updated_at = now;
                    Ok(SendOutcome::Resent(existing))
                }
            };
        }

        let request = FriendRequest {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            status: FriendRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tx.execute(
            r#"INSERT INTO friend_requests (id, sender_id, receiver_id, status, created_at, updated_at)
               VALUES (?1, ?2, ?3, 'pending', ?4, ?5)"#,
            params![
                &request.id,
                &request.sender_id,
                &request.receiver_id,
                request.created_at.to_rfc3339(),
                request.updated_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(SendOutcome::Sent(request))
    }

    pub fn get_friend_request(&self, id: &str) -> StoreResult<FriendRequest> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM friend_requests WHERE id = ?1",
            params![id],
            row_to_friend_request,
        )
        .map_err(|e| not_found(e, format!("Friend request {}", id)))
    }

    /// Receiver accepts: the request flips to accepted and the reciprocal
    /// accepted row is written in the same transaction.
    pub fn accept_friend_request(&self, id: &str, receiver_id: &str) -> StoreResult<FriendRequest> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut request = pending_for_receiver(&tx, id, receiver_id)?;
        accept_in_tx(&tx, &request)?;
        tx.commit()?;

        request.status = FriendRequestStatus::Accepted;
        request.updated_at = Utc::now();
        Ok(request)
    }

    pub fn decline_friend_request(&self, id: &str, receiver_id: &str) -> StoreResult<FriendRequest> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut request = pending_for_receiver(&tx, id, receiver_id)?;
        let now = Utc::now();
        tx.execute(
            "UPDATE friend_requests SET status = 'declined', updated_at = ?1 WHERE id = ?2",
            params![now.to_rfc3339(), id],
        )?;
        tx.commit()?;

        request.status = FriendRequestStatus::Declined;
        request.updated_at = now;
        Ok(request)
    }

    /// Sender withdraws a request that has not been answered yet
    pub fn cancel_friend_request(&self, id: &str, sender_id: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let request = conn
            .query_row(
                "SELECT * FROM friend_requests WHERE id = ?1 AND sender_id = ?2",
                params![id, sender_id],
                row_to_friend_request,
            )
            .map_err(|e| not_found(e, format!("Friend request {}", id)))?;
        if request.status != FriendRequestStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "Friend request is already {}",
                request.status.as_str()
            )));
        }
        conn.execute("DELETE FROM friend_requests WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Pending requests addressed to `user_id`, with the sender attached
    pub fn list_incoming_requests(&self, user_id: &str) -> StoreResult<Vec<FriendRequestView>> {
        self.list_pending(
            r#"SELECT f.id AS f_id, f.sender_id, f.receiver_id, f.status,
                      f.created_at AS f_created_at, f.updated_at AS f_updated_at, u.*
               FROM friend_requests f JOIN users u ON u.id = f.sender_id
               WHERE f.receiver_id = ?1 AND f.status = 'pending'
               ORDER BY f.created_at DESC"#,
            user_id,
        )
    }

    /// Pending requests sent by `user_id`, with the receiver attached
    pub fn list_outgoing_requests(&self, user_id: &str) -> StoreResult<Vec<FriendRequestView>> {
        self.list_pending(
            r#"SELECT f.id AS f_id, f.sender_id, f.receiver_id, f.status,
                      f.created_at AS f_created_at, f.updated_at AS f_updated_at, u.*
               FROM friend_requests f JOIN users u ON u.id = f.receiver_id
               WHERE f.sender_id = ?1 AND f.status = 'pending'
               ORDER BY f.created_at DESC"#,
            user_id,
        )
    }

    fn list_pending(&self, sql: &str, user_id: &str) -> StoreResult<Vec<FriendRequestView>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let views = stmt
            .query_map(params![user_id], |row| {
                let user = row_to_user(row)?;
                Ok(FriendRequestView {
                    request: FriendRequest {
                        id: row.get("f_id")?,
                        sender_id: row.get("sender_id")?,
                        receiver_id: row.get("receiver_id")?,
                        status: FriendRequestStatus::Pending,
                        created_at: parse_datetime(row.get::<_, String>("f_created_at")?),
                        updated_at: parse_datetime(row.get::<_, String>("f_updated_at")?),
                    },
                    user: user.public(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(views)
    }

    pub fn list_friends(&self, user_id: &str) -> StoreResult<Vec<PublicUser>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT u.* FROM friend_requests f JOIN users u ON u.id = f.receiver_id
               WHERE f.sender_id = ?1 AND f.status = 'accepted'
               ORDER BY u.username ASC"#,
        )?;
        let friends = stmt
            .query_map(params![user_id], row_to_user)?
            .map(|r| r.map(|u| u.public()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(friends)
    }

    pub fn are_friends(&self, a: &str, b: &str) -> StoreResult<bool> {
        if a == b {
            return Ok(false);
        }
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            r#"SELECT COUNT(*) FROM friend_requests
               WHERE sender_id = ?1 AND receiver_id = ?2 AND status = 'accepted'"#,
            params![a, b],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Drops the friendship in both directions
    pub fn remove_friend(&self, user_id: &str, friend_id: &str) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let rows = tx.execute(
            r#"DELETE FROM friend_requests WHERE status = 'accepted'
               AND ((sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1))"#,
            params![user_id, friend_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("Friend {}", friend_id)));
        }
        tx.commit()?;
        Ok(())
    }

    pub fn count_friends(&self, user_id: &str) -> StoreResult<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM friend_requests WHERE sender_id = ?1 AND status = 'accepted'",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn find_request(tx: &Transaction, sender_id: &str, receiver_id: &str) -> StoreResult<Option<FriendRequest>> {
    let request = tx
        .query_row(
            "SELECT * FROM friend_requests WHERE sender_id = ?1 AND receiver_id = ?2",
            params![sender_id, receiver_id],
            row_to_friend_request,
        )
        .optional()?;
    Ok(request)
}

fn pending_for_receiver(tx: &Transaction, id: &str, receiver_id: &str) -> StoreResult<FriendRequest> {
    let request = tx
        .query_row(
            "SELECT * FROM friend_requests WHERE id = ?1 AND receiver_id = ?2",
            params![id, receiver_id],
            row_to_friend_request,
        )
        .map_err(|e| not_found(e, format!("Friend request {}", id)))?;
    if request.status != FriendRequestStatus::Pending {
        return Err(StoreError::Conflict(format!(
            "Friend request is already {}",
            request.status.as_str()
        )));
    }
    Ok(request)
}

fn accept_in_tx(tx: &Transaction, request: &FriendRequest) -> StoreResult<()> {
    let now = Utc::now().to_rfc3339();
    tx.execute(
        "UPDATE friend_requests SET status = 'accepted', updated_at = ?1 WHERE id = ?2",
        params![&now, &request.id],
    )?;
    tx.execute(
        r#"INSERT INTO friend_requests (id, sender_id, receiver_id, status, created_at, updated_at)
           VALUES (?1, ?2, ?3, 'accepted', ?4, ?4)
           ON CONFLICT(sender_id, receiver_id) DO UPDATE SET status = 'accepted', updated_at = excluded.updated_at"#,
        params![
            Uuid::new_v4().to_string(),
            &request.receiver_id,
            &request.sender_id,
            &now,
        ],
    )?;
    Ok(())
}

fn row_to_friend_request(row: &rusqlite::Row) -> rusqlite::Result<FriendRequest> {
    let status: String = row.get("status")?;
    Ok(FriendRequest {
        id: row.get("id")?,
        sender_id: row.get("sender_id")?,
        receiver_id: row.get("receiver_id")?,
        status: FriendRequestStatus::parse(&status).unwrap_or(FriendRequestStatus::Pending),
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_send_and_accept_creates_reciprocal() {
        let store = Store::in_memory().unwrap();
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");

        let outcome = store.send_friend_request(&alice.id, &bob.id).unwrap();
        assert!(matches!(outcome, SendOutcome::Sent(_)));
        assert!(!store.are_friends(&alice.id, &bob.id).unwrap());

        let incoming = store.list_incoming_requests(&bob.id).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].user.username, "alice");
        assert_eq!(store.list_outgoing_requests(&alice.id).unwrap().len(), 1);

        let accepted = store.accept_friend_request(&outcome.request().id, &bob.id).unwrap();
        assert_eq!(accepted.status, FriendRequestStatus::Accepted);
        assert!(store.are_friends(&alice.id, &bob.id).unwrap());
        assert!(store.are_friends(&bob.id, &alice.id).unwrap());
        assert_eq!(store.list_friends(&alice.id).unwrap()[0].username, "bob");
        assert_eq!(store.list_friends(&bob.id).unwrap()[0].username, "alice");
        assert!(store.list_incoming_requests(&bob.id).unwrap().is_empty());
    }

    #[test]
    fn test_cannot_befriend_self() {
        let store = Store::in_memory().unwrap();
        let alice = user(&store, "alice");
        assert!(matches!(
            store.send_friend_request(&alice.id, &alice.id),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn test_duplicate_pending_conflicts() {
        let store = Store::in_memory().unwrap();
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        store.send_friend_request(&alice.id, &bob.id).unwrap();
        assert!(matches!(
            store.send_friend_request(&alice.id, &bob.id),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_reverse_pending_is_auto_accepted() {
        let store = Store::in_memory().unwrap();
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        store.send_friend_request(&alice.id, &bob.id).unwrap();

        let outcome = store.send_friend_request(&bob.id, &alice.id).unwrap();
        assert!(outcome.auto_accepted());
        assert_eq!(outcome.request().sender_id, alice.id);
        assert!(store.are_friends(&alice.id, &bob.id).unwrap());
        assert!(matches!(
            store.send_friend_request(&alice.id, &bob.id),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_only_receiver_can_answer() {
        let store = Store::in_memory().unwrap();
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        let outcome = store.send_friend_request(&alice.id, &bob.id).unwrap();
        let id = outcome.request().id.clone();

        assert!(matches!(
            store.accept_friend_request(&id, &alice.id),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.decline_friend_request(&id, &alice.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_decline_then_resend() {
        let store = Store::in_memory().unwrap();
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        let id = store.send_friend_request(&alice.id, &bob.id).unwrap().request().id.clone();

        let declined = store.decline_friend_request(&id, &bob.id).unwrap();
        assert_eq!(declined.status, FriendRequestStatus::Declined);
        assert!(matches!(
            store.accept_friend_request(&id, &bob.id),
            Err(StoreError::Conflict(_))
        ));

        let outcome = store.send_friend_request(&alice.id, &bob.id).unwrap();
        assert!(matches!(outcome, SendOutcome::Resent(_)));
        assert_eq!(outcome.request().id, id);
        assert_eq!(
            store.get_friend_request(&id).unwrap().status,
            FriendRequestStatus::Pending
        );
    }

    #[test]
    fn test_resend_after_decline_accepts_counter_request() {
        let store = Store::in_memory().unwrap();
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        let id = store.send_friend_request(&alice.id, &bob.id).unwrap().request().id.clone();
        store.decline_friend_request(&id, &bob.id).unwrap();

        let counter = store.send_friend_request(&bob.id, &alice.id).unwrap();
        assert!(matches!(counter, SendOutcome::Sent(_)));

        let outcome = store.send_friend_request(&alice.id, &bob.id).unwrap();
        assert!(outcome.auto_accepted());
        assert_eq!(outcome.request().id, counter.request().id);
        assert!(store.are_friends(&alice.id, &bob.id).unwrap());
        assert!(store.are_friends(&bob.id, &alice.id).unwrap());
        assert_eq!(
            store.get_friend_request(&id).unwrap().status,
            FriendRequestStatus::Accepted
        );
        assert!(store.list_incoming_requests(&alice.id).unwrap().is_empty());
        assert!(store.list_incoming_requests(&bob.id).unwrap().is_empty());
    }

    #[test]
    fn test_cancel_pending_request() {
        let store = Store::in_memory().unwrap();
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        let id = store.send_friend_request(&alice.id, &bob.id).unwrap().request().id.clone();

        assert!(matches!(
            store.cancel_friend_request(&id, &bob.id),
            Err(StoreError::NotFound(_))
        ));
        store.cancel_friend_request(&id, &alice.id).unwrap();
        assert!(matches!(store.get_friend_request(&id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_remove_friend_both_directions() {
        let store = Store::in_memory().unwrap();
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        befriend(&store, &alice, &bob);
        assert_eq!(store.count_friends(&alice.id).unwrap(), 1);

        store.remove_friend(&bob.id, &alice.id).unwrap();
        assert!(!store.are_friends(&alice.id, &bob.id).unwrap());
        assert!(!store.are_friends(&bob.id, &alice.id).unwrap());
        assert_eq!(store.count_friends(&alice.id).unwrap(), 0);
        assert!(matches!(
            store.remove_friend(&bob.id, &alice.id),
            Err(StoreError::NotFound(_))
        ));

        // Friendship can be started over
        befriend(&store, &alice, &bob);
        assert!(store.are_friends(&alice.id, &bob.id).unwrap());
    }

    #[test]
    fn test_request_to_missing_user() {
        let store = Store::in_memory().unwrap();
        let alice = user(&store, "alice");
        assert!(matches!(
            store.send_friend_request(&alice.id, "ghost"),
            Err(StoreError::NotFound(_))
        ));
    }
}
