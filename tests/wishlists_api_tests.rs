use actix_web::{test, web, App};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use wishlist_server::api::{self, AppState};
use wishlist_server::auth::AuthService;
use wishlist_server::cache::Cache;
use wishlist_server::events::{EventDispatcher, EventProcessor};
use wishlist_server::store::Store;

fn create_app_state(store: Arc<Store>) -> AppState {
    let cache = Cache::new(Duration::from_secs(60));
    AppState {
        store: store.clone(),
        auth_service: Arc::new(AuthService::new("test_secret".to_string(), 7)),
        events: EventDispatcher::inline(EventProcessor::new(store, cache.clone())),
        cache,
    }
}

macro_rules! init_app {
    () => {{
        let store = Arc::new(Store::new(":memory:").unwrap());
        test::init_service(
            App::new()
                .app_data(web::Data::new(create_app_state(store)))
                .configure(api::configure_routes),
        )
        .await
    }};
}

/// Register a user and return (token, user id)
macro_rules! register_user {
    ($app:expr, $username:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "username": $username,
                "email": format!("{}@example.com", $username),
                "password": "password123"
            }))
            .to_request();

        let resp: serde_json::Value = test::call_and_read_body_json(&$app, req).await;
        (
            resp["data"]["token"].as_str().unwrap().to_string(),
            resp["data"]["user"]["id"].as_str().unwrap().to_string(),
        )
    }};
}

macro_rules! befriend {
    ($app:expr, $a:expr, $b:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/friend-requests")
            .insert_header(("Authorization", format!("Bearer {}", $a.0)))
            .set_json(json!({ "receiver_id": $b.1 }))
            .to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&$app, req).await;
        let request_id = resp["data"]["request"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/friend-requests/{}/accept", request_id))
            .insert_header(("Authorization", format!("Bearer {}", $b.0)))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), 200);
    }};
}

macro_rules! create_list {
    ($app:expr, $token:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/lists")
            .insert_header(("Authorization", format!("Bearer {}", $token)))
            .set_json($body)
            .to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&$app, req).await;
        resp["data"]["id"].as_str().unwrap().to_string()
    }};
}

// ==================== Wish List Tests ====================

#[actix_web::test]
async fn test_create_and_list_own_lists() {
    let app = init_app!();
    let (token, user_id) = register_user!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/lists")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "name": "Birthday", "description": "Turning 30" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["user_id"], user_id);
    assert_eq!(body["data"]["is_public"], false);
    assert!(body["data"]["share_uuid"].is_null());

    create_list!(app, token, json!({ "name": "Christmas" }));

    let req = test::TestRequest::get()
        .uri("/api/lists?limit=1")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"]["total"], 2);
    assert_eq!(resp["data"]["limit"], 1);
    assert_eq!(resp["data"]["items"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_create_list_requires_name() {
    let app = init_app!();
    let (token, _) = register_user!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/lists")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "name": "   " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["errors"]["name"].is_array());
}

#[actix_web::test]
async fn test_private_list_visibility() {
    let app = init_app!();
    let alice = register_user!(app, "alice");
    let bob = register_user!(app, "bob");
    let carol = register_user!(app, "carol");
    befriend!(app, alice, bob);

    let list_id = create_list!(app, alice.0, json!({ "name": "Birthday" }));

    // Friend can see, stranger gets 404
    let req = test::TestRequest::get()
        .uri(&format!("/api/lists/{}", list_id))
        .insert_header(("Authorization", format!("Bearer {}", bob.0)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["owner"]["username"], "alice");
    assert!(body["data"]["wishes"].is_array());

    let req = test::TestRequest::get()
        .uri(&format!("/api/lists/{}", list_id))
        .insert_header(("Authorization", format!("Bearer {}", carol.0)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    // Friend may look but not edit
    let req = test::TestRequest::put()
        .uri(&format!("/api/lists/{}", list_id))
        .insert_header(("Authorization", format!("Bearer {}", bob.0)))
        .set_json(json!({ "name": "Mine now" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
}

#[actix_web::test]
async fn test_update_and_delete_list() {
    let app = init_app!();
    let (token, _) = register_user!(app, "alice");
    let list_id = create_list!(app, token, json!({ "name": "Birthday" }));

    let req = test::TestRequest::put()
        .uri(&format!("/api/lists/{}", list_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "name": "Big Birthday", "description": "Party" }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"]["name"], "Big Birthday");
    assert_eq!(resp["data"]["description"], "Party");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/lists/{}", list_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);

    let req = test::TestRequest::get()
        .uri(&format!("/api/lists/{}", list_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_user_lists_filtered_for_strangers() {
    let app = init_app!();
    let alice = register_user!(app, "alice");
    let bob = register_user!(app, "bob");
    let carol = register_user!(app, "carol");
    befriend!(app, alice, bob);

    create_list!(app, alice.0, json!({ "name": "Private" }));
    create_list!(app, alice.0, json!({ "name": "Public", "is_public": true }));

    let uri = format!("/api/users/{}/lists", alice.1);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(("Authorization", format!("Bearer {}", bob.0)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"]["total"], 2);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(("Authorization", format!("Bearer {}", carol.0)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"]["total"], 1);
    assert_eq!(resp["data"]["items"][0]["name"], "Public");
}

// ==================== Wish Tests ====================

#[actix_web::test]
async fn test_wishes_ordered_by_priority() {
    let app = init_app!();
    let (token, _) = register_user!(app, "alice");
    let list_id = create_list!(app, token, json!({ "name": "Birthday" }));

    for (title, priority) in [("Socks", 1), ("Bike", 5), ("Book", 3)] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/lists/{}/wishes", list_id))
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({ "title": title, "priority": priority, "price": 10.5 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/lists/{}/wishes", list_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let titles: Vec<&str> = resp["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Bike", "Book", "Socks"]);
}

#[actix_web::test]
async fn test_create_wish_validation() {
    let app = init_app!();
    let (token, _) = register_user!(app, "alice");
    let list_id = create_list!(app, token, json!({ "name": "Birthday" }));

    let req = test::TestRequest::post()
        .uri(&format!("/api/lists/{}/wishes", list_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({
            "title": "Kite",
            "url": "not a url",
            "price": -1.0,
            "priority": 9
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["errors"]["url"].is_array());
    assert!(body["errors"]["price"].is_array());
    assert!(body["errors"]["priority"].is_array());
}

#[actix_web::test]
async fn test_only_owner_adds_wishes() {
    let app = init_app!();
    let alice = register_user!(app, "alice");
    let bob = register_user!(app, "bob");
    let list_id = create_list!(app, alice.0, json!({ "name": "Public", "is_public": true }));

    let req = test::TestRequest::post()
        .uri(&format!("/api/lists/{}/wishes", list_id))
        .insert_header(("Authorization", format!("Bearer {}", bob.0)))
        .set_json(json!({ "title": "Sneaky" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
}

#[actix_web::test]
async fn test_update_and_delete_wish() {
    let app = init_app!();
    let (token, _) = register_user!(app, "alice");
    let list_id = create_list!(app, token, json!({ "name": "Birthday" }));

    let req = test::TestRequest::post()
        .uri(&format!("/api/lists/{}/wishes", list_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "title": "Kite", "url": "https://example.com/kite" }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let wish_id = resp["data"]["id"].as_str().unwrap().to_string();

    // Empty url clears the link
    let req = test::TestRequest::put()
        .uri(&format!("/api/wishes/{}", wish_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "title": "Red kite", "url": "" }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"]["title"], "Red kite");
    assert!(resp["data"]["url"].is_null());

    let req = test::TestRequest::delete()
        .uri(&format!("/api/wishes/{}", wish_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);

    let req = test::TestRequest::get()
        .uri(&format!("/api/wishes/{}", wish_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_update_wish_price_cleared_by_null() {
    let app = init_app!();
    let (token, _) = register_user!(app, "alice");
    let list_id = create_list!(app, token, json!({ "name": "Birthday" }));

    let req = test::TestRequest::post()
        .uri(&format!("/api/lists/{}/wishes", list_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "title": "Kite", "price": 10.5 }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let wish_id = resp["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(resp["data"]["price"], 10.5);

    // Leaving the field out keeps the price
    let req = test::TestRequest::put()
        .uri(&format!("/api/wishes/{}", wish_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "title": "Red kite" }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"]["price"], 10.5);

    let req = test::TestRequest::put()
        .uri(&format!("/api/wishes/{}", wish_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "price": null }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(resp["data"]["price"].is_null());
    assert_eq!(resp["data"]["title"], "Red kite");

    let req = test::TestRequest::get()
        .uri(&format!("/api/wishes/{}", wish_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(resp["data"]["price"].is_null());
}

// ==================== Stats Tests ====================

#[actix_web::test]
async fn test_stats_refresh_after_writes() {
    let app = init_app!();
    let (token, _) = register_user!(app, "alice");

    let req = test::TestRequest::get()
        .uri("/api/stats")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"]["lists"], 0);

    let list_id = create_list!(app, token, json!({ "name": "Birthday" }));
    let req = test::TestRequest::post()
        .uri(&format!("/api/lists/{}/wishes", list_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "title": "Kite" }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/api/stats")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"]["lists"], 1);
    assert_eq!(resp["data"]["wishes"], 1);
    assert_eq!(resp["data"]["achievements"], 2);
}

#[actix_web::test]
async fn test_achievements_catalog() {
    let app = init_app!();
    let (token, _) = register_user!(app, "alice");
    create_list!(app, token, json!({ "name": "Birthday" }));

    let req = test::TestRequest::get()
        .uri("/api/achievements")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let catalog = resp["data"].as_array().unwrap();
    assert_eq!(catalog.len(), 8);

    let first_list = catalog.iter().find(|a| a["key"] == "first_list").unwrap();
    assert_eq!(first_list["unlocked"], true);
    assert!(first_list["granted_at"].is_string());

    let curator = catalog.iter().find(|a| a["key"] == "list_curator").unwrap();
    assert_eq!(curator["unlocked"], false);
    assert!(curator["granted_at"].is_null());
}

#[actix_web::test]
async fn test_search_users_excludes_self() {
    let app = init_app!();
    let (token, _) = register_user!(app, "bobby");
    register_user!(app, "bob");
    register_user!(app, "alice");

    let req = test::TestRequest::get()
        .uri("/api/users?q=bob")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let users = resp["data"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "bob");
    assert!(users[0]["email"].is_null());
}
