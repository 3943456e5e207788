//! HTTP API Layer
//!
//! This crate provides the REST API for the receivables engine using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: invoices, clients, notifications, the reminder run trigger and health
//! - **Middleware**: JWT authentication, tracing, audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState, Providers};
//!
//! let store = Arc::new(PgBillingStore::new(pool));
//! let providers = Providers::http(config.provider_timeout())?;
//! let state = AppState::build(store, config, Arc::new(SystemClock), providers);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::{Clock, HealthCheckable};
use domain_billing::{
    ClientStore, InvoiceStore, LifecycleManager, NotificationStore, ReminderScheduler, ReminderStore,
    SettingsStore,
};
use domain_collections::{Collaborators, EscalationProcessor};
use domain_messaging::{
    ai::ProviderEndpoints, ChannelDispatcher, GeneratorFactory, HttpGeneratorFactory, MessageComposer,
    PaymentLinkProvider, PaystackLinkProvider,
};

use crate::config::ApiConfig;
use crate::handlers::{clients, cron, health, invoices, notifications};
use crate::middleware::{audit_middleware, auth_middleware};

/// External providers a deployment talks to
pub struct Providers {
    pub generators: Arc<dyn GeneratorFactory>,
    pub dispatcher: ChannelDispatcher,
    pub payment_links: Option<Arc<dyn PaymentLinkProvider>>,
}

impl Providers {
    /// The HTTP providers: AI generators, Resend, Twilio and Paystack,
    /// sharing one client
    pub fn http(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            generators: Arc::new(HttpGeneratorFactory::with_client(
                http.clone(),
                ProviderEndpoints::default(),
            )),
            dispatcher: ChannelDispatcher::http(http.clone()),
            payment_links: Some(Arc::new(PaystackLinkProvider::new(http))),
        })
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub lifecycle: Arc<LifecycleManager>,
    pub processor: Arc<EscalationProcessor>,
    pub composer: Arc<MessageComposer>,
    pub settings: Arc<dyn SettingsStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub health: Arc<dyn HealthCheckable>,
    /// Held for the duration of a reminder run
    pub run_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Wires the services over one store implementing every billing port
    pub fn build<S>(store: Arc<S>, config: ApiConfig, clock: Arc<dyn Clock>, providers: Providers) -> Self
    where
        S: InvoiceStore + ClientStore + ReminderStore + SettingsStore + NotificationStore + 'static,
    {
        let scheduler = Arc::new(ReminderScheduler::new(
            store.clone(),
            store.clone(),
            store.clone(),
            clock.clone(),
        ));
        let lifecycle = Arc::new(LifecycleManager::new(
            store.clone(),
            store.clone(),
            store.clone(),
            scheduler.clone(),
            clock.clone(),
        ));
        let composer = Arc::new(MessageComposer::new(providers.generators));

        let processor = Arc::new(EscalationProcessor::new(
            Collaborators {
                invoices: store.clone(),
                clients: store.clone(),
                reminders: store.clone(),
                notifications: store.clone(),
                scheduler,
                composer: composer.clone(),
                dispatcher: Arc::new(providers.dispatcher),
                payment_links: providers.payment_links,
                clock,
            },
            config.providers.clone(),
            config.processor_config(),
        ));

        Self {
            config: Arc::new(config),
            lifecycle,
            processor,
            composer,
            settings: store.clone(),
            notifications: store.clone(),
            health: store,
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Creates the main API router
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // Bearer secret checked in the handler
    let cron_routes = Router::new().route(
        "/check-reminders",
        get(cron::check_reminders).post(cron::check_reminders),
    );

    let invoice_routes = Router::new()
        .route("/", get(invoices::list_invoices).post(invoices::create_invoice))
        .route("/:id", get(invoices::get_invoice).delete(invoices::delete_invoice))
        .route("/:id/status", put(invoices::update_status))
        .route("/:id/reminders", post(invoices::enqueue_reminder))
        .route("/:id/reminders/preview", post(invoices::preview_reminder));

    let client_routes = Router::new().route("/:id/stats", get(clients::client_stats));

    let notification_routes = Router::new().route(
        "/",
        get(notifications::list_notifications).patch(notifications::mark_read),
    );

    // Protected API routes
    let api_routes = Router::new()
        .nest("/invoices", invoice_routes)
        .nest("/clients", client_routes)
        .nest("/notifications", notification_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/cron", cron_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
