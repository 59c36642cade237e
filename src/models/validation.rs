//! Input rules for the request bodies.
//!
//! Each request type gets a `validate()` that collects every failing
//! field instead of stopping at the first one, so clients can show all
//! problems at once.

use std::collections::BTreeMap;
use url::Url;

use super::{
    CreateWishListRequest, CreateWishRequest, RegisterRequest, UpdateProfileRequest,
    UpdateWishListRequest, UpdateWishRequest,
};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 32;
pub const PASSWORD_MIN: usize = 8;
pub const NAME_MAX: usize = 255;
pub const LIST_DESCRIPTION_MAX: usize = 1000;
pub const WISH_DESCRIPTION_MAX: usize = 2000;
pub const BIO_MAX: usize = 1000;
pub const PRIORITY_MAX: i32 = 5;

/// Field name -> messages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, msgs)| format!("{}: {}", field, msgs.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

fn check_length(errors: &mut ValidationErrors, field: &str, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len < min {
        if min == 1 {
            errors.add(field, "is required");
        } else {
            errors.add(field, format!("must be at least {} characters", min));
        }
    } else if len > max {
        errors.add(field, format!("must be at most {} characters", max));
    }
}

fn check_web_url(errors: &mut ValidationErrors, field: &str, value: &str) {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(_) => errors.add(field, "must be an http or https URL"),
        Err(_) => errors.add(field, "must be a valid URL"),
    }
}

fn check_price(errors: &mut ValidationErrors, price: f64) {
    if !price.is_finite() || price < 0.0 {
        errors.add("price", "must be a non-negative number");
    }
}

fn check_priority(errors: &mut ValidationErrors, priority: i32) {
    if !(0..=PRIORITY_MAX).contains(&priority) {
        errors.add("priority", format!("must be between 0 and {}", PRIORITY_MAX));
    }
}

pub fn is_valid_username(username: &str) -> bool {
    let len = username.chars().count();
    (USERNAME_MIN..=USERNAME_MAX).contains(&len)
        && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && email.len() <= NAME_MAX
        }
        None => false,
    }
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if !is_valid_username(&self.username) {
            errors.add(
                "username",
                format!(
                    "must be {}-{} characters of letters, digits or underscores",
                    USERNAME_MIN, USERNAME_MAX
                ),
            );
        }
        if !is_valid_email(&self.email) {
            errors.add("email", "must be a valid email address");
        }
        if self.password.chars().count() < PASSWORD_MIN {
            errors.add("password", format!("must be at least {} characters", PASSWORD_MIN));
        }
        if let Some(ref name) = self.display_name {
            check_length(&mut errors, "display_name", name.trim(), 1, NAME_MAX);
        }
        errors.into_result()
    }
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(ref name) = self.display_name {
            check_length(&mut errors, "display_name", name.trim(), 1, NAME_MAX);
        }
        if let Some(ref bio) = self.bio {
            check_length(&mut errors, "bio", bio, 0, BIO_MAX);
        }
        if let Some(ref avatar) = self.avatar_url {
            if !avatar.is_empty() {
                check_web_url(&mut errors, "avatar_url", avatar);
            }
        }
        errors.into_result()
    }
}

impl CreateWishListRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_length(&mut errors, "name", self.name.trim(), 1, NAME_MAX);
        check_length(&mut errors, "description", &self.description, 0, LIST_DESCRIPTION_MAX);
        errors.into_result()
    }
}

impl UpdateWishListRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(ref name) = self.name {
            check_length(&mut errors, "name", name.trim(), 1, NAME_MAX);
        }
        if let Some(ref description) = self.description {
            check_length(&mut errors, "description", description, 0, LIST_DESCRIPTION_MAX);
        }
        errors.into_result()
    }
}

impl CreateWishRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_length(&mut errors, "title", self.title.trim(), 1, NAME_MAX);
        check_length(&mut errors, "description", &self.description, 0, WISH_DESCRIPTION_MAX);
        if let Some(ref url) = self.url {
            check_web_url(&mut errors, "url", url);
        }
        if let Some(ref image_url) = self.image_url {
            check_web_url(&mut errors, "image_url", image_url);
        }
        if let Some(price) = self.price {
            check_price(&mut errors, price);
        }
        check_priority(&mut errors, self.priority);
        errors.into_result()
    }
}

impl UpdateWishRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(ref title) = self.title {
            check_length(&mut errors, "title", title.trim(), 1, NAME_MAX);
        }
        if let Some(ref description) = self.description {
            check_length(&mut errors, "description", description, 0, WISH_DESCRIPTION_MAX);
        }
        // Empty string clears the field
        if let Some(ref url) = self.url {
            if !url.is_empty() {
                check_web_url(&mut errors, "url", url);
            }
        }
        if let Some(ref image_url) = self.image_url {
            if !image_url.is_empty() {
                check_web_url(&mut errors, "image_url", image_url);
            }
        }
        if let Some(Some(price)) = self.price {
            check_price(&mut errors, price);
        }
        if let Some(priority) = self.priority {
            check_priority(&mut errors, priority);
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wish_request(title: &str) -> CreateWishRequest {
        CreateWishRequest {
            title: title.to_string(),
            description: String::new(),
            url: None,
            price: None,
            image_url: None,
            priority: 0,
        }
    }

    #[test]
    fn test_username_rules() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("bob_99"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(&"x".repeat(33)));
    }

    #[test]
    fn test_email_rules() {
        assert!(is_valid_email("a@b.c"));
        assert!(!is_valid_email("nope"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@"));
        assert!(!is_valid_email("a@b@c"));
    }

    #[test]
    fn test_register_collects_all_errors() {
        let req = RegisterRequest {
            username: "ab".to_string(),
            email: "bad".to_string(),
            password: "short".to_string(),
            display_name: None,
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("email"));
        assert!(errors.has("password"));
    }

    #[test]
    fn test_wish_title_required() {
        let errors = wish_request("   ").validate().unwrap_err();
        assert!(errors.has("title"));
        assert!(wish_request("Bike").validate().is_ok());
    }

    #[test]
    fn test_wish_url_and_price() {
        let mut req = wish_request("Camera");
        req.url = Some("ftp://example.com/camera".to_string());
        req.price = Some(-1.0);
        req.priority = 9;
        let errors = req.validate().unwrap_err();
        assert!(errors.has("url"));
        assert!(errors.has("price"));
        assert!(errors.has("priority"));

        req.url = Some("https://shop.example.com/camera".to_string());
        req.price = Some(199.99);
        req.priority = 5;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_wish_allows_clearing_url() {
        let req = UpdateWishRequest {
            title: None,
            description: None,
            url: Some(String::new()),
            price: None,
            image_url: Some(String::new()),
            priority: None,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_wish_price_null_clears() {
        let req: UpdateWishRequest = serde_json::from_str(r#"{"price": null}"#).unwrap();
        assert_eq!(req.price, Some(None));
        assert!(req.validate().is_ok());

        let req: UpdateWishRequest = serde_json::from_str(r#"{"title": "Kite"}"#).unwrap();
        assert_eq!(req.price, None);

        let req: UpdateWishRequest = serde_json::from_str(r#"{"price": -5.0}"#).unwrap();
        assert!(req.validate().unwrap_err().has("price"));
    }

    #[test]
    fn test_display_format() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "is required");
        assert_eq!(errors.to_string(), "name: is required");
    }
}
