use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures::StreamExt;
use std::env;
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use factfinder::research::formatter;
use factfinder::research::progress::ProgressStream;
use factfinder::{
    research, AppState, ResearchMode, ResearchRequest, ResearchResponse,
};

fn parse_port_from_args() -> Option<u16> {
    let mut args = std::env::args().peekable();
    while let Some(a) = args.next() {
        if a == "--port" {
            if let Some(v) = args.next() {
                if let Ok(p) = v.parse::<u16>() {
                    return Some(p);
                }
            }
        } else if let Some(rest) = a.strip_prefix("--port=") {
            if let Ok(p) = rest.parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

fn port_from_env() -> Option<u16> {
    for k in ["FACTFINDER_PORT", "PORT"] {
        if let Ok(v) = std::env::var(k) {
            if let Ok(p) = v.trim().parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Starting factfinder");

    // Create HTTP client
    let http_timeout = env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60);
    let connect_timeout = env::var("HTTP_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(10);
    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(http_timeout))
        .connect_timeout(std::time::Duration::from_secs(connect_timeout))
        .build()?;

    let state = Arc::new(AppState::new(http_client));

    // Build router
    let app = Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/api/chat", post(research_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Start server
    let port: u16 = parse_port_from_args().or_else(port_from_env).unwrap_or(5000);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {}. Stop the existing process or run with --port {} (or set PORT/FACTFINDER_PORT).",
                bind_addr,
                port.saturating_add(1)
            )
        }
        Err(e) => return Err(e.into()),
    };
    info!("factfinder listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();
        let mut sigint = signal(SignalKind::interrupt()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
            _ = async {
                if let Some(ref mut s) = sigint {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "factfinder",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Mode selection: explicit `mode` field first, then the legacy
/// User-Agent shortcut (`python-requests` forces eval), then the
/// deep-research flag.
fn resolve_mode(request: &ResearchRequest, headers: &HeaderMap) -> ResearchMode {
    if let Some(mode) = request.mode {
        return mode;
    }
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if user_agent.contains("python-requests") {
        return ResearchMode::Eval;
    }
    if request.experimental_deep_research {
        ResearchMode::Interactive
    } else {
        ResearchMode::Eval
    }
}

async fn research_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ResearchRequest>,
) -> Response {
    let question = request
        .messages
        .iter()
        .rev()
        .find_map(|m| {
            let content = m.content.trim();
            (!content.is_empty()).then(|| content.to_string())
        })
        .unwrap_or_default();
    let mode = resolve_mode(&request, &headers);
    info!("research request (mode {:?}): {}", mode, question);

    let mut opts = match mode {
        ResearchMode::Eval => research::ResearchOptions::eval(&state.config),
        ResearchMode::Interactive => research::ResearchOptions::interactive(&state.config),
    };
    if let Some(model) = request.model_id.as_deref().filter(|m| !m.trim().is_empty()) {
        opts.model = model.to_string();
    }
    if let Some(model) = request
        .reasoning_model_id
        .as_deref()
        .filter(|m| !m.trim().is_empty())
    {
        opts.reasoning_model = model.to_string();
    }

    match mode {
        ResearchMode::Eval => {
            let content = if question.is_empty() {
                formatter::hard_fallback(&question)
            } else {
                research::run_research(&state, &question, &opts, &ProgressStream::disabled()).await
            };
            Json(ResearchResponse { content }).into_response()
        }
        ResearchMode::Interactive => {
            let (progress, rx) = ProgressStream::channel();
            if question.is_empty() {
                progress.emit(research::progress::ProgressEvent::Finish {
                    content: formatter::hard_fallback(&question),
                });
            } else {
                let task_state = state.clone();
                let task_question = question.clone();
                let task_opts = opts.clone();
                tokio::spawn(async move {
                    research::run_research(&task_state, &task_question, &task_opts, &progress)
                        .await;
                });
            }
            let stream =
                UnboundedReceiverStream::new(rx).map(|event| Event::default().json_data(&event));
            Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
        }
    }
}
