use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::{middleware, Router};
use opendal::Operator;
use sea_orm::DatabaseConnection;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_http::validate_request::ValidateRequestHeaderLayer;
use tracing::{info, info_span, Level};

use auth::{access::access_middleware, ManyValidate};

use crate::archive::ArchiveManager;
use crate::capture::CaptureFallback;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::credential::{CredentialIssuer, IngestClient, ViewerTelemetry};
use crate::hook::{webhook::WebHook, EventHook};
use crate::notifier::StatusNotifier;
use crate::route::AppState;
use crate::service::database::DatabaseService;
use crate::session::SessionLifecycle;

pub mod archive;
pub mod capture;
pub mod clock;
pub mod config;
pub mod credential;
pub mod error;
pub mod notifier;
pub mod repository;
pub mod result;
pub mod session;

mod entity;
mod hook;
mod r#macro;
mod migration;
mod route;
mod service;

#[cfg(test)]
mod testing;

/// Outside collaborators, swapped for fakes in tests
pub struct Backends {
    pub db: DatabaseConnection,
    pub storage: Operator,
    pub issuer: Arc<dyn CredentialIssuer>,
    pub telemetry: Arc<dyn ViewerTelemetry>,
    pub capture: CaptureFallback,
    pub clock: Arc<dyn Clock>,
}

impl Backends {
    pub async fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let db = DatabaseService::new(&cfg.database).await?.connection;
        let storage = storage::create_operator(&cfg.archive.storage)?;
        let ingest = Arc::new(IngestClient::new(&cfg.ingest)?);
        Ok(Self {
            db,
            storage,
            issuer: ingest.clone(),
            telemetry: ingest,
            capture: CaptureFallback::from_config(&cfg.capture, clock.clone()),
            clock,
        })
    }
}

fn app_state(cfg: Config, backends: Backends) -> anyhow::Result<AppState> {
    let events = crate::new_broadcast_channel!(64);
    for url in cfg.webhooks.iter() {
        let hook = WebHook::new(url.clone())?;
        let receiver = events.subscribe();
        tokio::spawn(async move { hook.hook(receiver).await });
    }

    let Backends {
        db,
        storage,
        issuer,
        telemetry,
        capture,
        clock,
    } = backends;
    let archive = Arc::new(ArchiveManager::new(
        db.clone(),
        storage,
        clock.clone(),
        cfg.limits,
        cfg.archive.public_base_url.clone(),
    ));
    let capture = Arc::new(capture);
    let sessions = Arc::new(SessionLifecycle::new(
        db.clone(),
        issuer,
        archive.clone(),
        capture.clone(),
        events.clone(),
        clock,
        cfg.limits,
    ));
    let notifier = Arc::new(StatusNotifier::new(db, telemetry, events));

    Ok(AppState {
        config: cfg,
        sessions,
        archive,
        capture,
        notifier,
    })
}

fn router(app_state: AppState) -> Router {
    let cfg = &app_state.config;
    let auth_layer = ValidateRequestHeaderLayer::custom(ManyValidate::new(
        cfg.auth.secret.clone(),
        cfg.auth.tokens.clone(),
    ));
    let cors = if cfg.http.cors {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .merge(
            route::session::route()
                .merge(route::archive::route())
                .merge(route::capture::route())
                .layer(middleware::from_fn(access_middleware))
                .layer(auth_layer),
        )
        .merge(route::status::route())
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(http_log::print_request_response))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let span = info_span!(
                        "http_request",
                        uri = ?request.uri(),
                        method = ?request.method(),
                        span_id = tracing::field::Empty,
                    );
                    span.record(
                        "span_id",
                        span.id().unwrap_or(tracing::Id::from_u64(42)).into_u64(),
                    );
                    span
                })
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO))
                .on_failure(tower_http::trace::DefaultOnFailure::new().level(Level::INFO)),
        )
}

pub async fn serve<F>(cfg: Config, listener: TcpListener, signal: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let backends = Backends::from_config(&cfg).await?;
    serve_with(cfg, backends, listener, signal).await
}

pub async fn serve_with<F>(
    cfg: Config,
    backends: Backends,
    listener: TcpListener,
    signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app_state = app_state(cfg, backends)?;
    let capture = app_state.capture.clone();

    info!("Server listening on {}", listener.local_addr()?);
    let res = axum::serve(listener, router(app_state))
        .with_graceful_shutdown(signal)
        .await;

    // devices are never left open past the server
    capture.release_all().await;
    res.map_err(Into::into)
}
