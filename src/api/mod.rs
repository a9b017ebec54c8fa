//! HTTP API for health checks, quotes and swap jobs
//!
//! Swaps run as background jobs: `POST /swaps` answers `202` with a job id
//! and the outcome is polled from `GET /swaps/{id}`. Jobs only ever sign with
//! the credential the server was started with. Finished jobs are kept for
//! the configured retention window, then evicted.

use crate::config::ApiConfig;
use crate::error::{SwapError, SwapResult};
use crate::swap::SwapOrchestrator;
use crate::types::{SwapIntent, SwapOutcome};
use crate::wallet::Credential;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: SwapOrchestrator,
    pub credential: Option<Credential>,
    pub jobs: Arc<DashMap<Uuid, SwapJob>>,
    tasks: Arc<Mutex<JoinSet<()>>>,
    job_retention: Duration,
}

impl AppState {
    pub fn new(orchestrator: SwapOrchestrator, credential: Option<Credential>) -> Self {
        Self {
            orchestrator,
            credential,
            jobs: Arc::new(DashMap::new()),
            tasks: Arc::new(Mutex::new(JoinSet::new())),
            job_retention: ApiConfig::default().job_retention(),
        }
    }

    pub fn with_job_retention(mut self, retention: Duration) -> Self {
        self.job_retention = retention;
        self
    }

    /// Drop finished jobs older than the retention window
    pub fn evict_finished(&self, now: DateTime<Utc>) -> usize {
        let before = self.jobs.len();
        let retention = self.job_retention;
        self.jobs.retain(|_, job| match job.finished_at {
            Some(finished_at) => (now - finished_at)
                .to_std()
                .map_or(true, |age| age <= retention),
            None => true,
        });
        let evicted = before.saturating_sub(self.jobs.len());
        if evicted > 0 {
            debug!("Evicted {} finished swap job(s)", evicted);
        }
        evicted
    }

    /// Wait up to `grace` for running jobs to wind down, then abort the rest.
    ///
    /// Callers raise the cancellation flag first so monitors stop at their
    /// next poll and record the order hash. Returns the number of jobs that
    /// were still running when the grace period ran out.
    pub async fn drain_jobs(&self, grace: Duration) -> usize {
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() {
            info!("Waiting up to {:?} for {} swap job(s)", grace, tasks.len());
        }

        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    error!("Swap job task failed: {}", e);
                }
            }
        })
        .await;

        let mut abandoned = 0;
        if drained.is_err() {
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }

        for job in self.jobs.iter() {
            match (&job.state, &job.outcome) {
                (JobState::Running, _) => {
                    abandoned += 1;
                    warn!("Swap job {} abandoned while still running", job.id);
                }
                (JobState::Finished, Some(outcome)) if !outcome.success => {
                    if let Some(order_hash) = &outcome.order_hash {
                        warn!(
                            "Swap job {} stopped {} with order {}",
                            job.id, outcome.status, order_hash
                        );
                    }
                }
                _ => {}
            }
        }
        abandoned
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Finished,
}

/// One asynchronous swap execution
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapJob {
    pub id: Uuid,
    pub state: JobState,
    pub intent: SwapIntent,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: Option<SwapOutcome>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/chains", get(get_chains))
        .route("/quote", post(post_quote))
        .route("/swaps", post(post_swap))
        .route("/swaps/:id", get(get_swap))
        .route("/orders/:hash/status", get(get_order_status))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Run the HTTP API server until `shutdown` resolves
pub async fn run_server(
    config: ApiConfig,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> SwapResult<()> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SwapError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| SwapError::Internal(format!("API server failed: {}", e)))?;

    Ok(())
}

/// `SwapError` rendered as an HTTP response
struct ApiError(SwapError);

impl From<SwapError> for ApiError {
    fn from(error: SwapError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SwapError::Configuration(_) | SwapError::UnsupportedChain { .. } => {
                StatusCode::BAD_REQUEST
            }
            SwapError::Authentication(_) => StatusCode::UNAUTHORIZED,
            SwapError::QuoteUnavailable(_) | SwapError::Submission(_) | SwapError::Api { .. } => {
                StatusCode::BAD_GATEWAY
            }
            SwapError::ChainConnection { .. } => StatusCode::SERVICE_UNAVAILABLE,
            SwapError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            SwapError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check - every EVM chain RPC must answer
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let chain_health = state.orchestrator.factory().registry().health_check().await;
    let ready = chain_health.iter().all(|(_, healthy)| *healthy);

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadinessResponse {
            ready,
            details: chain_health
                .into_iter()
                .map(|(chain, healthy)| ChainHealth { chain, healthy })
                .collect(),
        }),
    )
}

async fn get_chains(State(state): State<AppState>) -> impl IntoResponse {
    let chains = state
        .orchestrator
        .factory()
        .registry()
        .chains()
        .cloned()
        .collect::<Vec<_>>();
    Json(chains)
}

async fn post_quote(
    State(state): State<AppState>,
    Json(intent): Json<SwapIntent>,
) -> Result<impl IntoResponse, ApiError> {
    let quote = state.orchestrator.quote(&intent).await?;
    Ok(Json(quote))
}

async fn post_swap(
    State(state): State<AppState>,
    Json(intent): Json<SwapIntent>,
) -> Result<impl IntoResponse, ApiError> {
    let credential = state.credential.clone().ok_or_else(|| {
        SwapError::Authentication("server has no wallet credential configured".to_string())
    })?;
    intent.validate()?;
    state
        .orchestrator
        .factory()
        .registry()
        .resolve(&intent.source_chain)?;

    let now = Utc::now();
    state.evict_finished(now);

    let id = Uuid::new_v4();
    state.jobs.insert(
        id,
        SwapJob {
            id,
            state: JobState::Running,
            intent: intent.clone(),
            created_at: now,
            finished_at: None,
            outcome: None,
        },
    );
    info!(
        "Swap job {} started: {} -> {}",
        id, intent.source_chain, intent.destination_chain
    );

    let mut tasks = state.tasks.lock().await;
    // Reap handles of jobs that already finished
    while tasks.try_join_next().is_some() {}
    tasks.spawn({
        let orchestrator = state.orchestrator.clone();
        let jobs = state.jobs.clone();
        async move {
            let outcome = orchestrator.execute(&intent, Some(credential)).await;
            if !outcome.success {
                warn!("Swap job {} finished unsuccessfully: {}", id, outcome.status);
            }
            if let Some(mut job) = jobs.get_mut(&id) {
                job.state = JobState::Finished;
                job.finished_at = Some(Utc::now());
                job.outcome = Some(outcome);
            }
        }
    });
    drop(tasks);

    Ok((StatusCode::ACCEPTED, Json(JobAccepted { job_id: id })))
}

async fn get_swap(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.jobs.get(&id) {
        Some(job) => Json(job.value().clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("unknown job {}", id),
            }),
        )
            .into_response(),
    }
}

async fn get_order_status(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.orchestrator.order_status(&hash).await?;
    Ok(Json(status))
}

// Response types

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    details: Vec<ChainHealth>,
}

#[derive(Serialize)]
struct ChainHealth {
    chain: String,
    healthy: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobAccepted {
    job_id: Uuid,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::fusion::MockFusionApi;
    use crate::swap::SwapClientFactory;
    use crate::test_support::{intent, quote_response, registry, status, DEV_KEY};
    use crate::types::OrderStatus;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    fn factory(api: MockFusionApi) -> SwapClientFactory {
        let monitor = MonitorConfig {
            poll_interval_ms: 1,
            max_wait_secs: 30,
            continue_on_transient_query_error: true,
        };
        SwapClientFactory::new(Arc::new(api), registry(), monitor)
    }

    fn app_state(api: MockFusionApi, credential: Option<Credential>) -> AppState {
        AppState::new(SwapOrchestrator::new(factory(api)), credential)
    }

    fn finished_job(finished_at: DateTime<Utc>) -> SwapJob {
        SwapJob {
            id: Uuid::new_v4(),
            state: JobState::Finished,
            intent: intent(),
            created_at: finished_at,
            finished_at: Some(finished_at),
            outcome: None,
        }
    }

    fn post_json(uri: &str, body: &impl Serialize) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
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

    #[tokio::test]
    async fn test_health() {
        let app = router(app_state(MockFusionApi::new(), None));
        let (status, body) = send(app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_chains_listing() {
        let app = router(app_state(MockFusionApi::new(), None));
        let (status, body) = send(app, Request::get("/chains").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["arbitrum", "ethereum", "solana"]);
    }

    #[tokio::test]
    async fn test_quote_endpoint() {
        let mut api = MockFusionApi::new();
        api.expect_get_quote()
            .times(1)
            .returning(|_| Ok(quote_response(1)));

        let app = router(app_state(api, None));
        let (status, body) = send(app, post_json("/quote", &intent())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["destinationAmount"], "998877665");
        assert_eq!(body["recommendedPreset"], "fast");
    }

    #[tokio::test]
    async fn test_quote_unsupported_chain() {
        let app = router(app_state(MockFusionApi::new(), None));
        let mut request = intent();
        request.destination_chain = "fantom".to_string();

        let (status, body) = send(app, post_json("/quote", &request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unsupported chain: fantom");
    }

    #[tokio::test]
    async fn test_swap_requires_server_credential() {
        let app = router(app_state(MockFusionApi::new(), None));
        let (status, _) = send(app, post_json("/swaps", &intent())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_swap_job_lifecycle() {
        let mut api = MockFusionApi::new();
        api.expect_get_quote().returning(|_| Ok(quote_response(1)));
        api.expect_place_order()
            .times(1)
            .returning(|_| Ok("0xabc".to_string()));
        api.expect_get_order_status()
            .returning(|_| Ok(status(OrderStatus::Executed)));

        let credential = Credential::from_private_key(DEV_KEY).unwrap();
        let state = app_state(api, Some(credential));
        let (code, body) = send(router(state.clone()), post_json("/swaps", &intent())).await;
        assert_eq!(code, StatusCode::ACCEPTED);
        let job_id = body["jobId"].as_str().unwrap().to_string();

        let mut job = Value::Null;
        for _ in 0..200 {
            let request = Request::get(format!("/swaps/{}", job_id))
                .body(Body::empty())
                .unwrap();
            let (code, body) = send(router(state.clone()), request).await;
            assert_eq!(code, StatusCode::OK);
            if body["state"] == "finished" {
                job = body;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(job["outcome"]["success"], true);
        assert_eq!(job["outcome"]["orderHash"], "0xabc");
        assert_eq!(job["outcome"]["status"], "executed");
        assert!(job["finishedAt"].is_string());
    }

    #[tokio::test]
    async fn test_drain_stops_running_jobs_at_shutdown() {
        let polls = Arc::new(AtomicUsize::new(0));
        let mut api = MockFusionApi::new();
        api.expect_get_quote().returning(|_| Ok(quote_response(1)));
        api.expect_place_order()
            .times(1)
            .returning(|_| Ok("0xabc".to_string()));
        let counter = polls.clone();
        api.expect_get_order_status().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(status(OrderStatus::Pending))
        });
        api.expect_get_ready_to_accept_secret_fills()
            .returning(|_| Ok(Vec::new()));

        let shutdown = Arc::new(RwLock::new(false));
        let orchestrator = SwapOrchestrator::new(factory(api).with_cancellation(shutdown.clone()));
        let credential = Credential::from_private_key(DEV_KEY).unwrap();
        let state = AppState::new(orchestrator, Some(credential));

        let (code, body) = send(router(state.clone()), post_json("/swaps", &intent())).await;
        assert_eq!(code, StatusCode::ACCEPTED);
        let job_id: Uuid = body["jobId"].as_str().unwrap().parse().unwrap();

        for _ in 0..200 {
            if polls.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(polls.load(Ordering::SeqCst) > 0);

        *shutdown.write().await = true;
        let abandoned = state.drain_jobs(Duration::from_secs(5)).await;
        assert_eq!(abandoned, 0);

        let job = state.jobs.get(&job_id).unwrap().clone();
        assert_eq!(job.state, JobState::Finished);
        let outcome = job.outcome.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.status, "cancelled");
        assert_eq!(outcome.order_hash.as_deref(), Some("0xabc"));
    }

    #[tokio::test]
    async fn test_drain_aborts_jobs_past_grace() {
        let mut api = MockFusionApi::new();
        api.expect_get_quote().returning(|_| Ok(quote_response(1)));
        api.expect_place_order()
            .returning(|_| Ok("0xabc".to_string()));
        api.expect_get_order_status()
            .returning(|_| Ok(status(OrderStatus::Pending)));
        api.expect_get_ready_to_accept_secret_fills()
            .returning(|_| Ok(Vec::new()));

        let credential = Credential::from_private_key(DEV_KEY).unwrap();
        let state = app_state(api, Some(credential));
        let (code, _) = send(router(state.clone()), post_json("/swaps", &intent())).await;
        assert_eq!(code, StatusCode::ACCEPTED);

        // no cancellation flag, so the job keeps polling until aborted
        let abandoned = state.drain_jobs(Duration::from_millis(20)).await;
        assert_eq!(abandoned, 1);
        assert!(state.tasks.lock().await.is_empty());
        assert!(state
            .jobs
            .iter()
            .all(|job| job.state == JobState::Running && job.outcome.is_none()));
    }

    #[tokio::test]
    async fn test_finished_jobs_evicted_after_retention() {
        let state = app_state(MockFusionApi::new(), None)
            .with_job_retention(Duration::from_secs(60));
        let now = Utc::now();

        let stale = finished_job(now - chrono::Duration::seconds(61));
        let recent = finished_job(now - chrono::Duration::seconds(30));
        let mut running = finished_job(now - chrono::Duration::seconds(600));
        running.state = JobState::Running;
        running.finished_at = None;

        let (stale_id, recent_id, running_id) = (stale.id, recent.id, running.id);
        for job in [stale, recent, running] {
            state.jobs.insert(job.id, job);
        }

        assert_eq!(state.evict_finished(now), 1);
        assert!(!state.jobs.contains_key(&stale_id));
        assert!(state.jobs.contains_key(&recent_id));
        assert!(state.jobs.contains_key(&running_id));
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let app = router(app_state(MockFusionApi::new(), None));
        let request = Request::get(format!("/swaps/{}", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_order_status_passthrough() {
        let mut api = MockFusionApi::new();
        api.expect_get_order_status()
            .withf(|hash| hash == "0xabc")
            .returning(|_| Ok(status(OrderStatus::PartiallyFilled)));

        let app = router(app_state(api, None));
        let request = Request::get("/orders/0xabc/status")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "partially-filled");
    }

    #[tokio::test]
    async fn test_order_status_upstream_failure() {
        let mut api = MockFusionApi::new();
        api.expect_get_order_status()
            .returning(|_| Err(SwapError::api("get_order_status", "HTTP 404: order not found")));

        let app = router(app_state(api, None));
        let request = Request::get("/orders/0xdead/status")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
