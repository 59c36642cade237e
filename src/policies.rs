//! Who may see or touch what.
//!
//! Friendship is looked up by the caller and passed in, so these stay
//! pure and cheap to test.

use crate::models::{Wish, WishList};

pub fn can_view_list(viewer_id: &str, list: &WishList, are_friends: bool) -> bool {
    list.user_id == viewer_id || list.is_public || are_friends
}

pub fn can_edit_list(user_id: &str, list: &WishList) -> bool {
    list.user_id == user_id
}

pub fn can_edit_wish(user_id: &str, wish: &Wish) -> bool {
    wish.user_id == user_id
}

/// Anyone who can see the list may reserve from it, except its owner
pub fn can_reserve(user_id: &str, wish: &Wish, list: &WishList, are_friends: bool) -> bool {
    wish.user_id != user_id && can_view_list(user_id, list, are_friends)
}
