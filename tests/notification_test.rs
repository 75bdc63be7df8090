mod common;

use serde_json::Value;
use std::time::Duration;

fn items(body: &Value) -> Vec<Value> {
    body["data"]["items"].as_array().cloned().unwrap_or_default()
}

async fn pause() {
    // created_at ordering needs distinct timestamps
    tokio::time::sleep(Duration::from_millis(15)).await;
}

#[tokio::test]
async fn notifications_require_auth() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/notifications"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .client
        .get(app.url("/notifications"))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn list_empty_for_fresh_user() {
    let app = common::spawn_app().await;
    let (_id, token) = common::register_user(&app, "fresh").await;

    let resp = app
        .client
        .get(app.url("/notifications"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["success"].as_bool().unwrap());
    assert_eq!(items(&body).len(), 0);
    assert_eq!(body["data"]["total"].as_u64().unwrap(), 0);
}

#[tokio::test]
async fn history_is_newest_first_and_read_state_tracks() {
    let app = common::spawn_app().await;
    let (_id, token) = common::register_user(&app, "alice").await;

    let a = common::push_notification(&app, &token, "scan-completed", "A").await;
    pause().await;
    let b = common::push_notification(&app, &token, "farm-update", "B").await;
    pause().await;
    let c = common::push_notification(&app, &token, "reward", "C").await;

    // unread count is 3
    let resp = app
        .client
        .get(app.url("/notifications/unread/count"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["count"].as_u64().unwrap(), 3);

    // full listing comes back C, B, A
    let resp = app
        .client
        .get(app.url("/notifications?limit=10&offset=0"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let listed = items(&body);
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0]["id"], c["id"]);
    assert_eq!(listed[1]["id"], b["id"]);
    assert_eq!(listed[2]["id"], a["id"]);

    // mark B read, unread drops to [C, A]
    let resp = app
        .client
        .patch(app.url(&format!("/notifications/{}/read", b["id"])))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url("/notifications/unread"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let unread = body["data"].as_array().cloned().unwrap();
    assert_eq!(unread.len(), 2);
    assert_eq!(unread[0]["id"], c["id"]);
    assert_eq!(unread[1]["id"], a["id"]);

    let resp = app
        .client
        .get(app.url("/notifications/unread/count"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["count"].as_u64().unwrap(), 2);
}

#[tokio::test]
async fn mark_read_is_idempotent() {
    let app = common::spawn_app().await;
    let (_id, token) = common::register_user(&app, "idem").await;
    let n = common::push_notification(&app, &token, "system-alert", "Frost warning").await;

    for _ in 0..2 {
        let resp = app
            .client
            .patch(app.url(&format!("/notifications/{}/read", n["id"])))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = app
        .client
        .get(app.url(&format!("/notifications/{}", n["id"])))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["is_read"].as_bool().unwrap());
}

#[tokio::test]
async fn mark_nonexistent_notification_read_is_404() {
    let app = common::spawn_app().await;
    let (_id, token) = common::register_user(&app, "none").await;

    let resp = app
        .client
        .patch(app.url("/notifications/999999999/read"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn foreign_notifications_are_forbidden() {
    let app = common::spawn_app().await;
    let (_a_id, a_token) = common::register_user(&app, "owner").await;
    let (_b_id, b_token) = common::register_user(&app, "intruder").await;

    let n = common::push_notification(&app, &a_token, "asset-minted", "New NFT").await;

    let resp = app
        .client
        .get(app.url(&format!("/notifications/{}", n["id"])))
        .bearer_auth(&b_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .patch(app.url(&format!("/notifications/{}/read", n["id"])))
        .bearer_auth(&b_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // still unread for the owner
    let resp = app
        .client
        .get(app.url("/notifications/unread/count"))
        .bearer_auth(&a_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["count"].as_u64().unwrap(), 1);
}

#[tokio::test]
async fn mark_all_read_reports_accurate_counts() {
    let app = common::spawn_app().await;
    let (_id, token) = common::register_user(&app, "bulk").await;

    for i in 1..=3 {
        common::push_notification(&app, &token, "recommendation", &format!("Tip {}", i)).await;
    }

    let resp = app
        .client
        .patch(app.url("/notifications/mark-all-read"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["marked_count"].as_u64().unwrap(), 3);

    // repeat call flips nothing
    let resp = app
        .client
        .patch(app.url("/notifications/mark-all-read"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["marked_count"].as_u64().unwrap(), 0);

    let resp = app
        .client
        .get(app.url("/notifications/unread/count"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["count"].as_u64().unwrap(), 0);
}

#[tokio::test]
async fn mark_many_read_skips_foreign_and_unknown_ids() {
    let app = common::spawn_app().await;
    let (_a_id, a_token) = common::register_user(&app, "many").await;
    let (_b_id, b_token) = common::register_user(&app, "other").await;

    let n1 = common::push_notification(&app, &a_token, "reward", "Points earned").await;
    let n2 = common::push_notification(&app, &a_token, "reward", "More points").await;
    let foreign = common::push_notification(&app, &b_token, "reward", "Not yours").await;

    let resp = app
        .client
        .patch(app.url("/notifications/mark-multiple-read"))
        .bearer_auth(&a_token)
        .json(&serde_json::json!({
            "ids": [n1["id"], n2["id"], foreign["id"], 999999999]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["marked_count"].as_u64().unwrap(), 2);

    // the foreign notification is untouched
    let resp = app
        .client
        .get(app.url("/notifications/unread/count"))
        .bearer_auth(&b_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["count"].as_u64().unwrap(), 1);
}

#[tokio::test]
async fn mark_many_read_rejects_empty_list() {
    let app = common::spawn_app().await;
    let (_id, token) = common::register_user(&app, "empty").await;

    let resp = app
        .client
        .patch(app.url("/notifications/mark-multiple-read"))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "ids": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn pagination_walks_history() {
    let app = common::spawn_app().await;
    let (_id, token) = common::register_user(&app, "pager").await;

    for i in 1..=5 {
        common::push_notification(&app, &token, "farm-update", &format!("Update {}", i)).await;
        pause().await;
    }

    let resp = app
        .client
        .get(app.url("/notifications?limit=2&offset=0"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(items(&body).len(), 2);
    assert_eq!(body["data"]["total"].as_u64().unwrap(), 5);

    let resp = app
        .client
        .get(app.url("/notifications?limit=2&offset=4"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(items(&body).len(), 1);
    assert_eq!(items(&body)[0]["title"], "Update 1");
}

#[tokio::test]
async fn negative_pagination_is_rejected() {
    let app = common::spawn_app().await;
    let (_id, token) = common::register_user(&app, "negpage").await;

    let resp = app
        .client
        .get(app.url("/notifications?limit=-1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = app
        .client
        .get(app.url("/notifications?offset=-10"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn unknown_kind_is_rejected() {
    let app = common::spawn_app().await;
    let (_id, token) = common::register_user(&app, "badkind").await;

    let resp = app
        .client
        .post(app.url("/notifications"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "kind": "weather-report",
            "title": "Nope",
            "message": "Unknown kind",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn cross_user_create_requires_admin() {
    let app = common::spawn_app().await;
    let (target_id, target_token) = common::register_user(&app, "target").await;
    let (_peon_id, peon_token) = common::register_user(&app, "peon").await;
    let (admin_id, admin_token) = common::register_user(&app, "admin").await;
    common::make_admin(&app.db, admin_id).await;

    let payload = serde_json::json!({
        "user_id": target_id,
        "kind": "system-alert",
        "title": "Maintenance window",
        "message": "Scheduled downtime tonight",
    });

    let resp = app
        .client
        .post(app.url("/notifications"))
        .bearer_auth(&peon_token)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .post(app.url("/notifications"))
        .bearer_auth(&admin_token)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // the target owns it
    let resp = app
        .client
        .get(app.url("/notifications/unread/count"))
        .bearer_auth(&target_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["count"].as_u64().unwrap(), 1);
}

#[tokio::test]
async fn latest_tracks_the_newest_item() {
    let app = common::spawn_app().await;
    let (_id, token) = common::register_user(&app, "latest").await;

    // null before anything exists
    let resp = app
        .client
        .get(app.url("/notifications/latest"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].is_null());

    common::push_notification(&app, &token, "scan-completed", "First scan").await;
    pause().await;
    let newest = common::push_notification(&app, &token, "scan-completed", "Second scan").await;

    let resp = app
        .client
        .get(app.url("/notifications/latest"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], newest["id"]);
    assert_eq!(body["data"]["title"], "Second scan");
}

#[tokio::test]
async fn responses_carry_time_ago_and_metadata() {
    let app = common::spawn_app().await;
    let (_id, token) = common::register_user(&app, "shape").await;

    let n = common::push_notification(&app, &token, "token-transfer", "Tokens received").await;
    assert_eq!(n["time_ago"], "just now");
    assert_eq!(n["metadata"]["farm"], "Sunrise Acres");
    assert_eq!(n["is_read"], false);
    assert_eq!(n["kind"], "token-transfer");
}
