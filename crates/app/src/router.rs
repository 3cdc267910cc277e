use std::collections::HashMap;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use status_sync_core::{
    LoadResult, Post, Preference, ProfileCollection, StateView, StatusLoader, StatusMap,
    UserProfile, UserStatus,
};

use crate::dispatcher::ChannelFetchPort;
use crate::problem::ProblemResponse;
use crate::state::StatusStore;
use crate::telemetry;

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    loader: StatusLoader<ChannelFetchPort>,
    store: StatusStore,
    status_feature_enabled: bool,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        port: ChannelFetchPort,
        store: StatusStore,
        status_feature_enabled: bool,
    ) -> Self {
        Self {
            metrics,
            loader: StatusLoader::new(port),
            store,
            status_feature_enabled,
        }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn loader(&self) -> &StatusLoader<ChannelFetchPort> {
        &self.loader
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    /// View carrying only the configured feature flag.
    fn base_view(&self) -> StateView {
        StateView {
            status_feature_enabled: self.status_feature_enabled,
            ..StateView::default()
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/api/statuses", get(list_statuses))
        .route("/api/statuses/users/:user_id", get(get_status))
        .route("/api/statuses/channel", post(load_channel_and_sidebar))
        .route("/api/statuses/profiles/list", post(load_profiles_list))
        .route("/api/statuses/profiles/map", post(load_profiles_map))
        .route("/api/statuses/profiles/missing", post(load_missing))
        .route("/api/statuses/ids", post(load_by_ids))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> Response {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        Body::from(body),
    )
        .into_response()
}

async fn list_statuses(State(state): State<AppState>) -> Json<StatusMap> {
    Json(state.store().snapshot())
}

async fn get_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserStatus>, ProblemResponse> {
    state
        .store()
        .get(&user_id)
        .map(Json)
        .ok_or_else(|| ProblemResponse::not_found(format!("no status known for user {user_id}")))
}

#[derive(Debug, Deserialize)]
struct ChannelRequest {
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    posts_in_channel: Option<Vec<Post>>,
    #[serde(default)]
    post_visibility: HashMap<String, usize>,
    #[serde(default)]
    direct_show_preferences: Vec<Preference>,
    current_user_id: String,
}

#[derive(Debug, Deserialize)]
struct ProfilesListRequest {
    #[serde(default)]
    users: Option<Vec<UserProfile>>,
}

#[derive(Debug, Deserialize)]
struct ProfilesMapRequest {
    #[serde(default)]
    users: Option<ProfileCollection>,
}

#[derive(Debug, Deserialize)]
struct MissingRequest {
    users: Vec<UserProfile>,
}

#[derive(Debug, Deserialize)]
struct IdsRequest {
    user_ids: Vec<String>,
}

async fn load_channel_and_sidebar(
    State(state): State<AppState>,
    payload: Result<Json<ChannelRequest>, JsonRejection>,
) -> Result<Json<LoadResult>, ProblemResponse> {
    let Json(request) = payload?;
    let view = StateView {
        channel_id: request.channel_id,
        posts_in_channel: request.posts_in_channel,
        post_visibility: request.post_visibility,
        direct_show_preferences: request.direct_show_preferences,
        current_user_id: request.current_user_id,
        ..state.base_view()
    };

    let result = state.loader().load_statuses_for_channel_and_sidebar(&view);
    telemetry::record_loader_call("channel_and_sidebar", result);
    Ok(Json(result))
}

async fn load_profiles_list(
    State(state): State<AppState>,
    payload: Result<Json<ProfilesListRequest>, JsonRejection>,
) -> Result<Json<LoadResult>, ProblemResponse> {
    let Json(request) = payload?;
    let result = state
        .loader()
        .load_statuses_for_profiles_list(&state.base_view(), request.users.as_deref());
    telemetry::record_loader_call("profiles_list", result);
    Ok(Json(result))
}

async fn load_profiles_map(
    State(state): State<AppState>,
    payload: Result<Json<ProfilesMapRequest>, JsonRejection>,
) -> Result<Json<LoadResult>, ProblemResponse> {
    let Json(request) = payload?;
    let result = state
        .loader()
        .load_statuses_for_profiles_map(&state.base_view(), request.users.as_ref());
    telemetry::record_loader_call("profiles_map", result);
    Ok(Json(result))
}

async fn load_missing(
    State(state): State<AppState>,
    payload: Result<Json<MissingRequest>, JsonRejection>,
) -> Result<Json<LoadResult>, ProblemResponse> {
    let Json(request) = payload?;
    let view = StateView {
        current_status_map: state.store().snapshot(),
        ..state.base_view()
    };
    let result = state
        .loader()
        .load_profiles_missing_status(&view, &request.users);
    telemetry::record_loader_call("profiles_missing_status", result);
    Ok(Json(result))
}

async fn load_by_ids(
    State(state): State<AppState>,
    payload: Result<Json<IdsRequest>, JsonRejection>,
) -> Result<Json<LoadResult>, ProblemResponse> {
    let Json(request) = payload?;
    let result = state
        .loader()
        .load_statuses_by_ids(&state.base_view(), request.user_ids);
    telemetry::record_loader_call("by_ids", result);
    Ok(Json(result))
}
