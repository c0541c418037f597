use super::{AppError, AppResult, AppState, Params};
use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::PathBuf;
use tally_engine::{ScanId, ScanRequest, StatusReport};
use tally_storage::{BackendKind, ObjectStoreTarget, Target};

#[derive(Debug, Deserialize)]
pub struct LocalScanParams {
    folder_path: Option<String>,
    scan_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ObjectScanParams {
    bucket: Option<String>,
    prefix: Option<String>,
    region: Option<String>,
    endpoint: Option<String>,
    key_id: Option<String>,
    key_secret: Option<String>,
    scan_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SharedScanParams {
    share_path: Option<String>,
    share_name: Option<String>,
    scan_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    limit: Option<usize>,
    kind: Option<BackendKind>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    limit: Option<usize>,
    offset: Option<usize>,
}

/// Reply to an accepted submission.
#[derive(Debug, Serialize)]
pub struct Accepted {
    success: bool,
    id: String,
    backend_kind: BackendKind,
    name: String,
    target: String,
    message: &'static str,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, name: &str) -> AppResult<String> {
    non_empty(value).ok_or_else(|| AppError::validation(format!("missing required parameter `{name}`")))
}

fn parse_id(id: &str) -> AppResult<ScanId> {
    Ok(id.parse()?)
}

async fn submit(state: &AppState, target: Target, name: Option<String>) -> AppResult<Json<Accepted>> {
    let request = ScanRequest { target, name: non_empty(name) };
    let job = state.scanner.submit(request).await?.job;
    Ok(Json(Accepted {
        success: true,
        id: job.id,
        backend_kind: job.kind,
        name: job.name,
        target: job.target,
        message: "Scan started",
    }))
}

pub async fn submit_local(
    State(state): State<AppState>,
    Params(params): Params<LocalScanParams>,
) -> AppResult<Json<Accepted>> {
    let path = PathBuf::from(required(params.folder_path, "folder_path")?);
    submit(&state, Target::Local { path }, params.scan_name).await
}

pub async fn submit_object(
    State(state): State<AppState>,
    Params(params): Params<ObjectScanParams>,
) -> AppResult<Json<Accepted>> {
    let defaults = &state.config.object_store;
    let target = ObjectStoreTarget {
        bucket: required(params.bucket, "bucket")?,
        prefix: non_empty(params.prefix),
        region: non_empty(params.region).unwrap_or_else(|| defaults.region.clone()),
        endpoint: non_empty(params.endpoint).or_else(|| defaults.endpoint.clone()),
        key_id: required(params.key_id, "key_id")?,
        key_secret: required(params.key_secret, "key_secret")?,
    };
    submit(&state, Target::ObjectStore(target), params.scan_name).await
}

pub async fn submit_shared(
    State(state): State<AppState>,
    Params(params): Params<SharedScanParams>,
) -> AppResult<Json<Accepted>> {
    let target = Target::Share {
        path: PathBuf::from(required(params.share_path, "share_path")?),
        share_name: required(params.share_name, "share_name")?,
    };
    submit(&state, target, params.scan_name).await
}

pub async fn scan_status(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<StatusReport>> {
    let id = parse_id(&id)?;
    let report = state.scanner.status(&id).await?.ok_or_else(|| AppError::not_found(format!("scan not found: {id}")))?;
    Ok(Json(report))
}

async fn stop(state: &AppState, kind: BackendKind, id: &str) -> AppResult<Json<Value>> {
    let id = parse_id(id)?;
    let message = if state.scanner.stop(kind, &id).await? { "Stop requested" } else { "Scan already finished" };
    Ok(Json(json!({
        "success": true,
        "id": id.to_string(),
        "message": message,
    })))
}

pub async fn stop_local(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    stop(&state, BackendKind::Local, &id).await
}

pub async fn stop_object(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    stop(&state, BackendKind::ObjectStore, &id).await
}

pub async fn stop_shared(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    stop(&state, BackendKind::NetworkShare, &id).await
}

/// Most recent completed scans, newest first, optionally of one backend kind.
pub async fn recent_scans(
    State(state): State<AppState>,
    Params(params): Params<RecentParams>,
) -> AppResult<Json<Value>> {
    let listing = &state.config.listing;
    let limit = params.limit.unwrap_or(listing.recent_limit).clamp(1, listing.max_page_size);
    let scans = state.scanner.repository().list_recent(limit, params.kind).await?;
    Ok(Json(json!({
        "success": true,
        "count": scans.len(),
        "scans": scans,
    })))
}

/// A scan's record plus one page of the files it found.
///
/// Only an unknown scan is a 404; a scan that found nothing returns an empty
/// page.
pub async fn scan_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Params(page): Params<PageParams>,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id)?.to_string();
    let repo = state.scanner.repository();
    let Some(scan) = repo.get_scan(&id).await? else {
        return Err(AppError::not_found(format!("scan not found: {id}")));
    };
    let listing = &state.config.listing;
    let limit = page.limit.unwrap_or(listing.page_size).min(listing.max_page_size);
    let offset = page.offset.unwrap_or(0);
    let files = repo.get_files(&id, limit, offset).await?;
    let total_files = repo.count_files(&id).await?;
    Ok(Json(json!({
        "success": true,
        "id": id,
        "scan": scan,
        "total_files": total_files,
        "limit": limit,
        "offset": offset,
        "returned_count": files.len(),
        "files": files,
    })))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "tally is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
