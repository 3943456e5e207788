//! HTTP provider tests against a local stand-in server

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Form, Json, Router};
use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use core_kernel::{Currency, Money, UserId};
use domain_billing::{EscalationLevel, Invoice};
use domain_messaging::ai::{GeminiProvider, OpenAiCompatibleProvider};
use domain_messaging::channels::{ResendEmailSender, TwilioSender};
use domain_messaging::{
    AiError, ChannelSender, ChannelSettings, ContentGenerator, OutboundMessage, PaymentLinkError,
    PaymentLinkProvider, PaystackLinkProvider, ReminderContext, TwilioSettings,
};

#[derive(Clone, Default)]
struct Captured {
    bodies: Arc<Mutex<Vec<Value>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
}

impl Captured {
    async fn record(&self, headers: HeaderMap, body: Value) {
        self.headers.lock().await.push(headers);
        self.bodies.lock().await.push(body);
    }
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn context() -> ReminderContext {
    ReminderContext {
        invoice_number: "INV-2024-001".into(),
        amount: "$500.00".into(),
        due_date: "Jan 10, 2024".into(),
        description: Some("Website redesign".into()),
        client_name: "Jane Doe".into(),
        history_summary: "This is a new client with no payment history.".into(),
        level: EscalationLevel::Firm,
    }
}

fn invoice() -> Invoice {
    Invoice::new(
        UserId::new(),
        "INV-2024-001",
        Money::new(dec!(2500.50), Currency::NGN),
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        Utc::now(),
    )
    .unwrap()
}

fn email() -> OutboundMessage {
    OutboundMessage {
        subject: Some("Important: Invoice INV-2024-001 Payment Overdue".into()),
        text: "Dear Jane".into(),
        html: Some("<p>Dear Jane</p>".into()),
    }
}

// ============================================================================
// AI providers
// ============================================================================

mod ai_tests {
    use super::*;

    async fn chat(State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        captured.record(headers, body).await;
        Json(json!({
            "choices": [{
                "message": {
                    "content": "```json\n{\"subject\":\"Invoice INV-2024-001\",\"message\":\"Please pay $500.00\",\"tone\":\"firm\",\"suggestedAction\":\"Call\"}\n```"
                }
            }]
        }))
    }

    #[tokio::test]
    async fn test_chat_completion_request_and_parse() {
        let captured = Captured::default();
        let base = serve(
            Router::new()
                .route("/chat/completions", post(chat))
                .with_state(captured.clone()),
        )
        .await;

        let provider = OpenAiCompatibleProvider::with_base_url(reqwest::Client::new(), "groq", base, "test-model", "gsk_test");
        let generated = provider.generate(&context()).await.unwrap();
        assert_eq!(generated.subject, "Invoice INV-2024-001");
        assert_eq!(generated.suggested_action.as_deref(), Some("Call"));

        let bodies = captured.bodies.lock().await;
        assert_eq!(bodies[0]["model"], "test-model");
        assert_eq!(bodies[0]["max_tokens"], 500);
        assert_eq!(bodies[0]["messages"][0]["role"], "system");
        let prompt = bodies[0]["messages"][1]["content"].as_str().unwrap();
        assert!(prompt.contains("ESCALATION LEVEL: 2/3"));

        let headers = captured.headers.lock().await;
        assert_eq!(headers[0]["authorization"], "Bearer gsk_test");
    }

    #[tokio::test]
    async fn test_provider_error_status() {
        let base = serve(Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        ))
        .await;

        let provider = OpenAiCompatibleProvider::with_base_url(reqwest::Client::new(), "openai", base, "m", "sk");
        let err = provider.generate(&context()).await.unwrap_err();
        assert!(matches!(err, AiError::Api { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let base = serve(Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({ "choices": [] })) }),
        ))
        .await;

        let provider = OpenAiCompatibleProvider::with_base_url(reqwest::Client::new(), "xai", base, "m", "xai-1");
        assert!(matches!(provider.generate(&context()).await, Err(AiError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_gemini_request_and_parse() {
        async fn generate(
            Path(model): Path<String>,
            Query(query): Query<HashMap<String, String>>,
        ) -> (StatusCode, Json<Value>) {
            if model != "gemini-1.5-flash:generateContent" || query.get("key").map(String::as_str) != Some("g-key") {
                return (StatusCode::BAD_REQUEST, Json(json!({})));
            }
            (
                StatusCode::OK,
                Json(json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": "{\"subject\":\"S\",\"message\":\"M\",\"tone\":\"firm\"}" }] }
                    }]
                })),
            )
        }

        let base = serve(Router::new().route("/models/:model", post(generate))).await;
        let provider = GeminiProvider::with_base_url(reqwest::Client::new(), base, "g-key");
        let generated = provider.generate(&context()).await.unwrap();
        assert_eq!(generated.message, "M");
    }
}

// ============================================================================
// Channel senders
// ============================================================================

mod channel_tests {
    use super::*;

    #[tokio::test]
    async fn test_resend_request_shape() {
        let captured = Captured::default();
        let base = serve(
            Router::new()
                .route(
                    "/emails",
                    post(|State(c): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                        c.record(headers, body).await;
                        Json(json!({ "id": "email_123" }))
                    }),
                )
                .with_state(captured.clone()),
        )
        .await;

        let settings = ChannelSettings {
            resend_api_key: Some("re_test".into()),
            reply_to: Some("owner@acme.test".into()),
            ..Default::default()
        };
        let sender = ResendEmailSender::with_base_url(reqwest::Client::new(), base);
        let outcome = sender.send("jane@example.com", &email(), &settings).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.message_id.as_deref(), Some("email_123"));

        let bodies = captured.bodies.lock().await;
        assert_eq!(bodies[0]["to"], json!(["jane@example.com"]));
        assert_eq!(bodies[0]["reply_to"], "owner@acme.test");
        assert_eq!(bodies[0]["from"], settings.email_from);
        assert_eq!(captured.headers.lock().await[0]["authorization"], "Bearer re_test");
    }

    #[tokio::test]
    async fn test_resend_rejection_is_failed_outcome() {
        let base = serve(Router::new().route(
            "/emails",
            post(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "message": "Invalid `to` field" })),
                )
            }),
        ))
        .await;

        let settings = ChannelSettings {
            resend_api_key: Some("re_test".into()),
            ..Default::default()
        };
        let sender = ResendEmailSender::with_base_url(reqwest::Client::new(), base);
        let outcome = sender.send("nope", &email(), &settings).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Invalid `to` field"));
    }

    #[tokio::test]
    async fn test_missing_resend_key() {
        let sender = ResendEmailSender::new(reqwest::Client::new());
        let outcome = sender
            .send("jane@example.com", &email(), &ChannelSettings::default())
            .await
            .unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_twilio_whatsapp_form() {
        let forms: Arc<Mutex<Vec<(String, HashMap<String, String>)>>> = Arc::default();
        let base = serve(
            Router::new()
                .route(
                    "/2010-04-01/Accounts/:sid/Messages.json",
                    post(
                        |State(forms): State<Arc<Mutex<Vec<(String, HashMap<String, String>)>>>>,
                         Path(sid): Path<String>,
                         Form(form): Form<HashMap<String, String>>| async move {
                            forms.lock().await.push((sid, form));
                            (StatusCode::CREATED, Json(json!({ "sid": "SM123" })))
                        },
                    ),
                )
                .with_state(forms.clone()),
        )
        .await;

        let settings = ChannelSettings {
            twilio: TwilioSettings {
                account_sid: Some("AC1".into()),
                auth_token: Some("tok".into()),
                phone_number: Some("+15550100".into()),
                whatsapp_number: None,
            },
            ..Default::default()
        };
        let sender = TwilioSender::whatsapp_with_base_url(reqwest::Client::new(), base);
        let message = OutboundMessage {
            subject: None,
            text: "Hi Jane".into(),
            html: None,
        };
        let outcome = sender.send("0803 123 4567", &message, &settings).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message_id.as_deref(), Some("SM123"));

        let forms = forms.lock().await;
        let (sid, form) = &forms[0];
        assert_eq!(sid, "AC1");
        assert_eq!(form["To"], "whatsapp:+2348031234567");
        assert_eq!(form["From"], "whatsapp:+15550100");
        assert_eq!(form["Body"], "Hi Jane");
    }

    #[tokio::test]
    async fn test_twilio_sms_rejection_carries_provider_message() {
        let base = serve(Router::new().route(
            "/2010-04-01/Accounts/:sid/Messages.json",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "code": 21211, "message": "The 'To' number is not a valid phone number." })),
                )
            }),
        ))
        .await;

        let settings = ChannelSettings {
            twilio: TwilioSettings {
                account_sid: Some("AC1".into()),
                auth_token: Some("tok".into()),
                phone_number: Some("+15550100".into()),
                whatsapp_number: None,
            },
            ..Default::default()
        };
        let sender = TwilioSender::sms_with_base_url(reqwest::Client::new(), base);
        let message = OutboundMessage {
            subject: None,
            text: "Hi".into(),
            html: None,
        };
        let outcome = sender.send("12", &message, &settings).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("The 'To' number is not a valid phone number.")
        );
    }

    #[tokio::test]
    async fn test_twilio_without_number() {
        let settings = ChannelSettings {
            twilio: TwilioSettings {
                account_sid: Some("AC1".into()),
                auth_token: Some("tok".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let sender = TwilioSender::sms(reqwest::Client::new());
        let message = OutboundMessage {
            subject: None,
            text: "Hi".into(),
            html: None,
        };
        let outcome = sender.send("+15550100", &message, &settings).await.unwrap();
        assert_eq!(outcome.error.as_deref(), Some("No Twilio phone number configured."));
    }
}

// ============================================================================
// Payment links
// ============================================================================

mod payment_link_tests {
    use super::*;

    #[tokio::test]
    async fn test_paystack_link_in_minor_units() {
        let captured = Captured::default();
        let base = serve(
            Router::new()
                .route(
                    "/transaction/initialize",
                    post(|State(c): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                        c.record(headers, body).await;
                        Json(json!({
                            "status": true,
                            "message": "Authorization URL created",
                            "data": {
                                "authorization_url": "https://checkout.paystack.com/abc",
                                "access_code": "abc",
                                "reference": "ref"
                            }
                        }))
                    }),
                )
                .with_state(captured.clone()),
        )
        .await;

        let settings = ChannelSettings {
            paystack_secret_key: Some("sk_test".into()),
            ..Default::default()
        };
        let provider = PaystackLinkProvider::with_base_url(reqwest::Client::new(), base);
        let url = provider
            .create_link(&invoice(), "jane@example.com", &settings)
            .await
            .unwrap();
        assert_eq!(url, "https://checkout.paystack.com/abc");

        let bodies = captured.bodies.lock().await;
        assert_eq!(bodies[0]["amount"], 250050);
        assert_eq!(bodies[0]["currency"], "NGN");
        assert_eq!(bodies[0]["email"], "jane@example.com");
        assert_eq!(bodies[0]["metadata"]["invoice_number"], "INV-2024-001");
    }

    #[tokio::test]
    async fn test_paystack_refusal() {
        let base = serve(Router::new().route(
            "/transaction/initialize",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "status": false, "message": "Invalid key" })),
                )
            }),
        ))
        .await;

        let settings = ChannelSettings {
            paystack_secret_key: Some("sk_bad".into()),
            ..Default::default()
        };
        let provider = PaystackLinkProvider::with_base_url(reqwest::Client::new(), base);
        let err = provider
            .create_link(&invoice(), "jane@example.com", &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentLinkError::Api { status: 400, ref message } if message == "Invalid key"));
    }

    #[tokio::test]
    async fn test_paystack_not_configured() {
        let provider = PaystackLinkProvider::new(reqwest::Client::new());
        let err = provider
            .create_link(&invoice(), "jane@example.com", &ChannelSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentLinkError::NotConfigured));
    }
}
