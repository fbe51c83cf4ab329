use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod cache;
mod cli;
mod config;
mod errors;
mod jobs;
mod models;
mod notification;
mod store;
mod workflow;

use cache::QueryCache;
use store::postgres::PgStore;
use workflow::approval::ApprovalWorkflow;

/// Shared application state passed to handlers.
pub struct AppState {
    pub db: PgStore,
    pub cache: QueryCache,
    pub workflow: ApprovalWorkflow<PgStore>,
    pub notifier: notification::slack::SlackNotifier,
    pub webhook: notification::webhook::WebhookNotifier,
    pub config: config::Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "vendora=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Application { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            handle_application_command(&db, command).await
        }
        Some(cli::Commands::Provider { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            handle_provider_command(&db, command).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    tracing::info!("Connecting to Redis...");
    let redis_client = redis::Client::open(cfg.redis_url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    let cache = QueryCache::new(redis_conn);

    let notifier = notification::slack::SlackNotifier::new(cfg.slack_webhook_url.clone());
    let stale_pending_days = cfg.stale_pending_days;

    let state = Arc::new(AppState {
        db: db.clone(),
        cache: cache.clone(),
        workflow: ApprovalWorkflow::new(db.clone()),
        notifier,
        webhook: notification::webhook::WebhookNotifier::new(),
        config: cfg,
    });

    let app = axum::Router::new()
        // Health endpoints (no auth)
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .route("/readyz", axum::routing::get(readiness_check))
        // Admin API — nested under /api/v1
        .nest("/api/v1", api::api_router())
        .with_state(state)
        // Application payloads are small; 2 MB is generous
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        // Restrict CORS to the dashboard origin (localhost allowed for dev)
        .layer({
            use axum::http::{HeaderName, Method};
            use tower_http::cors::AllowOrigin;
            let dashboard_origin = std::env::var("VENDORA_DASHBOARD_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string());
            CorsLayer::new()
                .allow_origin(AllowOrigin::predicate(move |origin, _| {
                    let origin_str = origin.to_str().unwrap_or("");
                    origin_str == dashboard_origin
                        || origin_str.starts_with("http://localhost:")
                        || origin_str.starts_with("http://127.0.0.1:")
                }))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    HeaderName::from_static("content-type"),
                    HeaderName::from_static("authorization"),
                    HeaderName::from_static("x-admin-key"),
                    HeaderName::from_static("x-request-id"),
                ])
                .allow_credentials(true)
        })
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware));

    jobs::consistency::spawn(db, cache, stale_pending_days);
    tracing::info!("Consistency audit job started (hourly)");

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Vendora admin service listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Middleware: injects a unique X-Request-Id into every response so clients
/// can correlate errors with service logs.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = axum::http::HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

async fn readiness_check() -> &'static str {
    "ok"
}

/// Middleware: injects security headers into every response.
async fn security_headers_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    headers.insert("X-Content-Type-Options", "nosniff".parse().unwrap());
    headers.insert("X-Frame-Options", "DENY".parse().unwrap());
    // Admin API responses must never be cached by the browser
    headers.insert("Cache-Control", "no-store".parse().unwrap());
    headers.insert("Referrer-Policy", "no-referrer".parse().unwrap());
    headers.remove("Server");

    resp
}

async fn handle_application_command(
    db: &PgStore,
    cmd: cli::ApplicationCommands,
) -> anyhow::Result<()> {
    use store::ApplicationStore;

    let workflow = ApprovalWorkflow::new(db.clone());

    match cmd {
        cli::ApplicationCommands::List { status } => {
            let filter = match status.as_deref() {
                None => Some(models::application::ApplicationStatus::Pending),
                Some("all") => None,
                Some(s) => Some(
                    s.parse()
                        .map_err(|e: String| anyhow::anyhow!(e))?,
                ),
            };
            let applications = db.list_applications(filter).await?;

            if applications.is_empty() {
                println!("No applications found.");
                return Ok(());
            }

            println!(
                "{:<38} {:<16} {:<10} {:<24} SUBMITTED",
                "ID", "TYPE", "STATUS", "BUSINESS"
            );
            for a in applications {
                println!(
                    "{:<38} {:<16} {:<10} {:<24} {}",
                    a.id,
                    a.service_type,
                    a.status,
                    a.business_name.as_deref().unwrap_or("-"),
                    a.submitted_at.format("%Y-%m-%d")
                );
            }
        }
        cli::ApplicationCommands::Show { application_id } => {
            let id = parse_id(&application_id)?;
            match db.fetch_application(id).await? {
                Some(a) => {
                    println!("Application {}", a.id);
                    println!("  Applicant: {}", a.applicant_id);
                    println!("  Type:      {}", a.service_type);
                    println!("  Status:    {}", a.status);
                    println!("  Business:  {}", a.business_name.as_deref().unwrap_or("-"));
                    println!("  Submitted: {}", a.submitted_at);
                    if let Some(reviewed) = a.reviewed_at {
                        println!("  Reviewed:  {}", reviewed);
                    }
                    if let Some(notes) = a.admin_notes {
                        println!("  Notes:     {}", notes);
                    }
                }
                None => println!("Application {} not found.", id),
            }
        }
        cli::ApplicationCommands::Approve { application_id } => {
            let id = parse_id(&application_id)?;
            match workflow.approve(id).await {
                Ok(outcome) => println!(
                    "Application {} approved. Provider profile: {}",
                    id, outcome.profile.id
                ),
                Err(e) => println!("Could not approve {}: {}", id, e),
            }
        }
        cli::ApplicationCommands::Reject {
            application_id,
            notes,
        } => {
            let id = parse_id(&application_id)?;
            match workflow.reject(id, &notes).await {
                Ok(_) => println!("Application {} rejected.", id),
                Err(e) => println!("Could not reject {}: {}", id, e),
            }
        }
    }
    Ok(())
}

async fn handle_provider_command(
    db: &PgStore,
    cmd: cli::ProviderCommands,
) -> anyhow::Result<()> {
    match cmd {
        cli::ProviderCommands::List { include_inactive } => {
            let profiles = db.list_profiles(!include_inactive).await?;

            if profiles.is_empty() {
                println!("No provider profiles found.");
                return Ok(());
            }

            println!(
                "{:<38} {:<16} {:<12} {:<8} CREATED",
                "ID", "TYPE", "VERIFIED", "ACTIVE"
            );
            for p in profiles {
                println!(
                    "{:<38} {:<16} {:<12} {:<8} {}",
                    p.id,
                    p.provider_type,
                    format!("{:?}", p.verification_status).to_lowercase(),
                    p.is_active,
                    p.created_at.format("%Y-%m-%d")
                );
            }
        }
        cli::ProviderCommands::Activate { profile_id } => {
            let id = parse_id(&profile_id)?;
            if db.set_profile_active(id, true).await? {
                println!("Profile {} activated.", id);
            } else {
                println!("Profile {} not found.", id);
            }
        }
        cli::ProviderCommands::Deactivate { profile_id } => {
            let id = parse_id(&profile_id)?;
            if db.set_profile_active(id, false).await? {
                println!("Profile {} deactivated.", id);
            } else {
                println!("Profile {} not found.", id);
            }
        }
    }
    Ok(())
}

fn parse_id(raw: &str) -> anyhow::Result<uuid::Uuid> {
    raw.parse().context(format!("invalid ID: {}", raw))
}
