//! HTTP tests for the API router, backed by the in-memory store

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`

use chrono::Duration;

use core_kernel::{FixedClock, UserId};
use domain_billing::mock::InMemoryBillingStore;
use domain_billing::{Channel, ReminderStatus};
use domain_messaging::ChannelDispatcher;
use interface_api::{auth::create_token, config::ApiConfig, create_router, AppState, Providers};
use test_utils::{DateFixtures, ScriptedSender, StubGeneratorFactory};

const JWT_SECRET: &str = "test-jwt-secret";
const CRON_SECRET: &str = "test-cron-secret";

struct TestApp {
    router: Router,
    state: AppState,
    store: InMemoryBillingStore,
    clock: FixedClock,
    email: ScriptedSender,
    token: String,
}

impl TestApp {
    /// App frozen at midnight on a day of January 2024
    fn on_january(day: u32) -> Self {
        Self::with_cron_secret(day, CRON_SECRET)
    }

    fn with_cron_secret(day: u32, cron_secret: &str) -> Self {
        let store = InMemoryBillingStore::new();
        let clock = DateFixtures::clock_on_january(day);
        let email = ScriptedSender::accepting();
        let dispatcher = ChannelDispatcher::new()
            .with_sender(Channel::Email, Arc::new(email.clone()))
            .with_sender(Channel::Sms, Arc::new(ScriptedSender::accepting()))
            .with_sender(Channel::Whatsapp, Arc::new(ScriptedSender::accepting()));
        let providers = Providers {
            generators: Arc::new(StubGeneratorFactory::templates_only()),
            dispatcher,
            payment_links: None,
        };
        let config = ApiConfig {
            jwt_secret: JWT_SECRET.to_string(),
            cron_secret: cron_secret.to_string(),
            ..Default::default()
        };

        let state = AppState::build(
            Arc::new(store.clone()),
            config,
            Arc::new(clock.clone()),
            providers,
        );
        let token = create_token(UserId::new(), JWT_SECRET, 3600).unwrap();

        Self {
            router: create_router(state.clone()),
            state,
            store,
            clock,
            email,
            token,
        }
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn api(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.api_as(&self.token, method, uri, body).await
    }

    async fn api_as(&self, token: &str, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {}", token));
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.call(request).await
    }

    async fn trigger(&self, method: &str, authorization: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri("/api/cron/check-reminders");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        self.call(builder.body(Body::empty()).unwrap()).await
    }

    async fn create_invoice(&self, number: &str, send: bool) -> String {
        let (status, body) = self
            .api(
                "POST",
                "/api/v1/invoices",
                Some(json!({
                    "invoice_number": number,
                    "amount": "120.00",
                    "currency": "GBP",
                    "due_date": "2024-01-10",
                    "client": { "name": "Jane Doe", "email": "jane@example.com" },
                    "send": send,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_sent_invoice(&self, phone: Option<&str>) -> String {
        let (status, body) = self
            .api(
                "POST",
                "/api/v1/invoices",
                Some(json!({
                    "invoice_number": "INV-2024-001",
                    "amount": "500.00",
                    "currency": "USD",
                    "due_date": "2024-01-10",
                    "description": "Website redesign",
                    "client": { "name": "Jane Doe", "email": "Jane@Example.com", "phone": phone },
                    "send": true,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

fn bearer(secret: &str) -> String {
    format!("Bearer {}", secret)
}

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let app = TestApp::on_january(1);
    let (status, body) = app
        .call(Request::get("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_follows_store_health() {
    let app = TestApp::on_january(1);
    let ready = || Request::get("/health/ready").body(Body::empty()).unwrap();

    assert_eq!(app.call(ready()).await.0, StatusCode::OK);

    app.store.set_unavailable(true);
    assert_eq!(app.call(ready()).await.0, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_api_requires_token() {
    let app = TestApp::on_january(1);
    let (status, _) = app
        .call(
            Request::post("/api/v1/invoices")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .api_as("garbage", "GET", "/api/v1/clients/00000000-0000-0000-0000-000000000000/stats", None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sent_invoice_gets_three_reminders() {
    let app = TestApp::on_january(1);
    let id = app.create_sent_invoice(None).await;

    let (status, body) = app.api("GET", &format!("/api/v1/invoices/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "sent");
    assert_eq!(body["formatted_amount"], "$500.00");
    assert_eq!(body["client"]["email"], "jane@example.com");

    let reminders = body["reminders"].as_array().unwrap();
    assert_eq!(reminders.len(), 3);
    let dates: Vec<&str> = reminders
        .iter()
        .map(|r| r["scheduled_date"].as_str().unwrap())
        .collect();
    assert!(dates[0].starts_with("2024-01-10"));
    assert!(dates[1].starts_with("2024-01-17"));
    assert!(dates[2].starts_with("2024-01-24"));
    assert!(reminders.iter().all(|r| r["status"] == "pending" && r["type"] == "email"));
}

#[tokio::test]
async fn test_invalid_invoice_is_rejected() {
    let app = TestApp::on_january(1);
    let (status, body) = app
        .api(
            "POST",
            "/api/v1/invoices",
            Some(json!({
                "invoice_number": "INV-1",
                "amount": "10",
                "currency": "USD",
                "due_date": "2024-01-10",
                "client": { "name": "Jane", "email": "nope" },
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_other_users_invoice_is_not_found() {
    let app = TestApp::on_january(1);
    let id = app.create_sent_invoice(None).await;

    let stranger = create_token(UserId::new(), JWT_SECRET, 3600).unwrap();
    let (status, _) = app
        .api_as(&stranger, "GET", &format!("/api/v1/invoices/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cron_rejects_bad_credentials() {
    let app = TestApp::on_january(11);
    app.create_sent_invoice(None).await;

    assert_eq!(app.trigger("POST", None).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(app.trigger("POST", Some(&bearer("wrong"))).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(app.trigger("POST", Some(CRON_SECRET)).await.0, StatusCode::UNAUTHORIZED);

    // nothing ran
    assert!(app.email.sent().await.is_empty());
    assert!(app
        .store
        .all_reminders()
        .await
        .iter()
        .all(|r| r.status == ReminderStatus::Pending));
}

#[tokio::test]
async fn test_empty_cron_secret_disables_trigger() {
    let app = TestApp::with_cron_secret(11, "");
    assert_eq!(app.trigger("GET", Some("Bearer ")).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(app.trigger("GET", None).await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_run_sweeps_and_sends_first_reminder() {
    let app = TestApp::on_january(11);
    let id = app.create_sent_invoice(None).await;

    let (status, body) = app.trigger("POST", Some(&bearer(CRON_SECRET))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        body["results"],
        json!({ "processed": 1, "sent": 1, "failed": 0, "skipped": 0 })
    );

    let sent = app.email.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].destination, "jane@example.com");

    let (_, invoice) = app.api("GET", &format!("/api/v1/invoices/{}", id), None).await;
    assert_eq!(invoice["status"], "overdue");
    assert_eq!(invoice["reminders"][0]["status"], "sent");

    // a second run finds nothing due
    let (status, body) = app.trigger("GET", Some(&bearer(CRON_SECRET))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"]["processed"], 0);
    assert_eq!(app.email.sent().await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_trigger_gets_conflict() {
    let app = TestApp::on_january(11);
    let _running = app.state.run_lock.lock().await;

    let (status, body) = app.trigger("POST", Some(&bearer(CRON_SECRET))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_overdue_cannot_be_set_by_hand() {
    let app = TestApp::on_january(1);
    let id = app.create_sent_invoice(None).await;

    let (status, _) = app
        .api("PUT", &format!("/api/v1/invoices/{}/status", id), Some(json!({ "status": "overdue" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_paying_cancels_pending_reminders() {
    let app = TestApp::on_january(1);
    let id = app.create_sent_invoice(None).await;

    let (status, body) = app
        .api("PUT", &format!("/api/v1/invoices/{}/status", id), Some(json!({ "status": "paid" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paid");

    let reminders = app.store.all_reminders().await;
    assert_eq!(reminders.len(), 3);
    assert!(reminders.iter().all(|r| r.status == ReminderStatus::Cancelled));

    // paying twice is a no-op
    let (status, _) = app
        .api("PUT", &format!("/api/v1/invoices/{}/status", id), Some(json!({ "status": "paid" })))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_transition_is_conflict() {
    let app = TestApp::on_january(1);
    let id = app.create_sent_invoice(None).await;

    let (status, body) = app
        .api("PUT", &format!("/api/v1/invoices/{}/status", id), Some(json!({ "status": "draft" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_manual_sms_without_phone_fails_on_run() {
    let app = TestApp::on_january(5);
    let id = app.create_sent_invoice(None).await;

    let (status, body) = app
        .api(
            "POST",
            &format!("/api/v1/invoices/{}/reminders", id),
            Some(json!({ "channel": "sms", "level": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["type"], "sms");
    assert_eq!(body["escalation_level"], 2);

    let (_, run) = app.trigger("POST", Some(&bearer(CRON_SECRET))).await;
    assert_eq!(run["results"]["failed"], 1);

    let failed = app
        .store
        .all_reminders()
        .await
        .into_iter()
        .find(|r| r.channel == Channel::Sms)
        .unwrap();
    assert_eq!(failed.status, ReminderStatus::Failed);
    assert!(!failed.error_message.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_preview_contains_invoice_facts() {
    let app = TestApp::on_january(1);
    let id = app.create_sent_invoice(Some("0803 123 4567")).await;

    for (channel, level) in [("email", 1), ("sms", 2), ("whatsapp", 3)] {
        let (status, body) = app
            .api(
                "POST",
                &format!("/api/v1/invoices/{}/reminders/preview", id),
                Some(json!({ "channel": channel, "level": level })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let text = body["body"].as_str().unwrap();
        assert!(text.contains("INV-2024-001"), "{}", text);
        assert!(text.contains("$500.00"), "{}", text);
        assert_eq!(body["aiGenerated"], false);
    }

    // previews never send
    assert!(app.email.sent().await.is_empty());
}

#[tokio::test]
async fn test_client_stats() {
    let app = TestApp::on_january(1);
    let id = app.create_sent_invoice(None).await;
    let (_, invoice) = app.api("GET", &format!("/api/v1/invoices/{}", id), None).await;
    let client_id = invoice["client"]["id"].as_str().unwrap();

    let (status, stats) = app
        .api("GET", &format!("/api/v1/clients/{}/stats", client_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_invoices"], 1);
    assert_eq!(stats["paid_invoices"], 0);
}

#[tokio::test]
async fn test_invoice_list_is_newest_first_and_filtered() {
    let app = TestApp::on_january(1);
    let draft = app.create_invoice("INV-A", false).await;
    app.clock.advance(Duration::minutes(1));
    let first_sent = app.create_invoice("INV-B", true).await;
    app.clock.advance(Duration::minutes(1));
    let second_sent = app.create_invoice("INV-C", true).await;

    let (status, body) = app.api("GET", "/api/v1/invoices", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second_sent.as_str(), first_sent.as_str(), draft.as_str()]);

    let (_, all) = app.api("GET", "/api/v1/invoices?status=all&limit=2", None).await;
    assert_eq!(all["data"].as_array().unwrap().len(), 2);

    let (_, drafts) = app.api("GET", "/api/v1/invoices?status=draft", None).await;
    let drafts = drafts["data"].as_array().unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0]["id"], draft.as_str());

    let (status, _) = app.api("GET", "/api/v1/invoices?status=lost", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // other users see nothing
    let stranger = create_token(UserId::new(), JWT_SECRET, 3600).unwrap();
    let (_, theirs) = app.api_as(&stranger, "GET", "/api/v1/invoices", None).await;
    assert!(theirs["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_invoice_removes_its_reminders() {
    let app = TestApp::on_january(1);
    let id = app.create_sent_invoice(None).await;
    let kept = app.create_invoice("INV-2024-002", true).await;
    assert_eq!(app.store.all_reminders().await.len(), 6);

    let stranger = create_token(UserId::new(), JWT_SECRET, 3600).unwrap();
    let (status, _) = app
        .api_as(&stranger, "DELETE", &format!("/api/v1/invoices/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.all_reminders().await.len(), 6);

    let (status, body) = app.api("DELETE", &format!("/api/v1/invoices/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, _) = app.api("GET", &format!("/api/v1/invoices/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let remaining = app.store.all_reminders().await;
    assert_eq!(remaining.len(), 3);
    assert!(remaining.iter().all(|r| r.invoice_id.to_string() != id));
    let (status, _) = app.api("GET", &format!("/api/v1/invoices/{}", kept), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.api("DELETE", &format!("/api/v1/invoices/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_notifications_follow_the_run() {
    let app = TestApp::on_january(11);
    app.create_sent_invoice(None).await;

    let (status, feed) = app.api("GET", "/api/v1/notifications", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(feed.as_array().unwrap().is_empty());

    app.trigger("POST", Some(&bearer(CRON_SECRET))).await;

    let (_, feed) = app.api("GET", "/api/v1/notifications", None).await;
    let feed = feed.as_array().unwrap();
    assert!(!feed.is_empty());
    assert!(feed.iter().all(|n| n["read"] == false));
    assert!(feed.iter().any(|n| n["message"].as_str().unwrap().contains("INV-2024-001")));

    // not visible to anyone else
    let stranger = create_token(UserId::new(), JWT_SECRET, 3600).unwrap();
    let (_, theirs) = app.api_as(&stranger, "GET", "/api/v1/notifications", None).await;
    assert!(theirs.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_mark_notifications_read() {
    let app = TestApp::on_january(11);
    app.create_sent_invoice(None).await;
    app.create_invoice("INV-2024-002", true).await;
    app.trigger("POST", Some(&bearer(CRON_SECRET))).await;

    let (_, feed) = app.api("GET", "/api/v1/notifications", None).await;
    let feed = feed.as_array().unwrap().clone();
    assert!(feed.len() >= 2);

    let first = feed[0]["id"].clone();
    let (status, body) = app
        .api("PATCH", "/api/v1/notifications", Some(json!({ "id": first })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (_, feed) = app.api("GET", "/api/v1/notifications", None).await;
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.iter().filter(|n| n["read"] == true).count(), 1);

    let (status, _) = app
        .api("PATCH", "/api/v1/notifications", Some(json!({ "markAllAsRead": true })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, feed) = app.api("GET", "/api/v1/notifications", None).await;
    assert!(feed.as_array().unwrap().iter().all(|n| n["read"] == true));

    // a stranger cannot mark someone else's notification
    let stranger = create_token(UserId::new(), JWT_SECRET, 3600).unwrap();
    let (status, _) = app
        .api_as(&stranger, "PATCH", "/api/v1/notifications", Some(json!({ "id": first })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mark_read_without_parameters_is_bad_request() {
    let app = TestApp::on_january(1);
    let (status, body) = app.api("PATCH", "/api/v1/notifications", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing parameters");

    let (status, _) = app
        .api("PATCH", "/api/v1/notifications", Some(json!({ "markAllAsRead": false })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
