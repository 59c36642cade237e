use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

mod validation;

pub use validation::ValidationErrors;

/// User owns wish lists and has friends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password_hash: String) -> Self {
        let username = username.into();
        Self {
            id: String::new(),
            display_name: username.clone(),
            username,
            email: email.into(),
            password_hash,
            bio: String::new(),
            avatar_url: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            bio: self.bio.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// What other users get to see of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: String,
}

/// WishList is a named collection of wishes owned by one user.
/// Public lists are reachable through `share_uuid` without logging in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishList {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub is_public: bool,
    pub share_uuid: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub wish_count: i64,
    #[serde(default)]
    pub reserved_count: i64,
}

impl WishList {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.into(),
            name: name.into(),
            description: String::new(),
            is_public: false,
            share_uuid: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            wish_count: 0,
            reserved_count: 0,
        }
    }
}

/// Wish is a single item on a wish list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wish {
    pub id: String,
    pub wish_list_id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub priority: i32,
    pub is_reserved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wish {
    pub fn new(wish_list: &WishList, title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            wish_list_id: wish_list.id.clone(),
            user_id: wish_list.user_id.clone(),
            title: title.into(),
            description: String::new(),
            url: None,
            price: None,
            image_url: None,
            priority: 0,
            is_reserved: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

/// Reservation is one user's claim on someone else's wish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub wish_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// A reservation together with the wish and whose wish it is
#[derive(Debug, Clone, Serialize)]
pub struct ReservationDetail {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub wish: Wish,
    pub owner: PublicUser,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Declined,
}

impl FriendRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendRequestStatus::Pending => "pending",
            FriendRequestStatus::Accepted => "accepted",
            FriendRequestStatus::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FriendRequestStatus::Pending),
            "accepted" => Some(FriendRequestStatus::Accepted),
            "declined" => Some(FriendRequestStatus::Declined),
            _ => None,
        }
    }
}

/// FriendRequest is directional. Accepted requests always come in pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pending request with the other party attached, for listing
#[derive(Debug, Clone, Serialize)]
pub struct FriendRequestView {
    #[serde(flatten)]
    pub request: FriendRequest,
    pub user: PublicUser,
}

/// Notification is something the user should know about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub actor_id: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A granted achievement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAchievement {
    pub id: String,
    pub user_id: String,
    pub achievement_key: String,
    pub granted_at: DateTime<Utc>,
}

/// Per-user counters used by the dashboard and the achievement checkers
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
    pub lists: i64,
    pub wishes: i64,
    pub reserved_wishes: i64,
    pub friends: i64,
    pub reservations_made: i64,
    pub achievements: i64,
}

// Request/Response types for API

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWishListRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWishListRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWishRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWishRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    /// Absent leaves the price alone, `null` clears it
    #[serde(default, deserialize_with = "present")]
    pub price: Option<Option<f64>>,
    pub image_url: Option<String>,
    pub priority: Option<i32>,
}

/// Marks a field that was sent, so `null` can be told apart from missing
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Either the receiver's id or their username
#[derive(Debug, Deserialize)]
pub struct SendFriendRequest {
    pub receiver_id: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            errors: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
            errors: None,
        }
    }

    pub fn invalid(errors: &ValidationErrors) -> Self {
        Self {
            success: false,
            data: None,
            error: Some("Validation failed".to_string()),
            errors: Some(errors.fields().clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
