//! Badges granted when a user's counters cross a threshold.
//!
//! Each entry in [`CATALOG`] is a checker predicate over [`UserStats`].
//! [`evaluate`] runs every checker and records the ones newly earned.

use serde::Serialize;

use crate::models::UserStats;
use crate::store::{Store, StoreResult};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Wishes,
    Lists,
    Friends,
    ReservationsMade,
}

impl Metric {
    pub fn read(&self, stats: &UserStats) -> i64 {
        match self {
            Metric::Wishes => stats.wishes,
            Metric::Lists => stats.lists,
            Metric::Friends => stats.friends,
            Metric::ReservationsMade => stats.reservations_made,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Achievement {
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub metric: Metric,
    pub threshold: i64,
}

impl Achievement {
    pub fn is_earned(&self, stats: &UserStats) -> bool {
        self.metric.read(stats) >= self.threshold
    }
}

pub const CATALOG: &[Achievement] = &[
    Achievement {
        key: "first_wish",
        title: "Wishful Thinker",
        description: "Add your first wish",
        metric: Metric::Wishes,
        threshold: 1,
    },
    Achievement {
        key: "wish_collector",
        title: "Wish Collector",
        description: "Add 50 wishes",
        metric: Metric::Wishes,
        threshold: 50,
    },
    Achievement {
        key: "first_list",
        title: "List Maker",
        description: "Create your first wish list",
        metric: Metric::Lists,
        threshold: 1,
    },
    Achievement {
        key: "list_curator",
        title: "Curator",
        description: "Create 5 wish lists",
        metric: Metric::Lists,
        threshold: 5,
    },
    Achievement {
        key: "first_friend",
        title: "Friendly",
        description: "Make your first friend",
        metric: Metric::Friends,
        threshold: 1,
    },
    Achievement {
        key: "social_butterfly",
        title: "Social Butterfly",
        description: "Have 10 friends",
        metric: Metric::Friends,
        threshold: 10,
    },
    Achievement {
        key: "gift_giver",
        title: "Gift Giver",
        description: "Reserve a gift for a friend",
        metric: Metric::ReservationsMade,
        threshold: 1,
    },
    Achievement {
        key: "secret_santa",
        title: "Secret Santa",
        description: "Reserve 10 gifts",
        metric: Metric::ReservationsMade,
        threshold: 10,
    },
];

pub fn find(key: &str) -> Option<&'static Achievement> {
    CATALOG.iter().find(|a| a.key == key)
}

/// Grant every earned achievement the user does not hold yet and return
/// the newly granted ones.
pub fn evaluate(store: &Store, user_id: &str) -> StoreResult<Vec<&'static Achievement>> {
    let stats = store.user_stats(user_id)?;
    let mut granted = Vec::new();
    for achievement in CATALOG.iter().filter(|a| a.is_earned(&stats)) {
        if store.grant_achievement(user_id, achievement.key)? {
            log::info!("User {} unlocked achievement {}", user_id, achievement.key);
            granted.push(achievement);
        }
    }
    Ok(granted)
}
