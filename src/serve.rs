//! Purpose: Provide the HTTP/JSON document and asset store for vitrine.
//! Exports: `ServeConfig`, `AccessMode`, `serve`.
//! Role: Axum-based server implementing the remote store protocol v0.
//! Invariants: JSON envelopes match `api/remote.rs`; error kinds remain stable.
//! Invariants: Loopback-only unless explicitly allowed; writes are token-gated
//! off loopback.
//! Invariants: Assets are write-once per name; documents are whole-value
//! overwrites.

use axum::extract::{DefaultBodyLimit, Path as AxumPath, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use vitrine::api::{Error, ErrorKind};
use vitrine::site_paths::validate_site_name;

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub token: Option<String>,
    pub access_mode: AccessMode,
    pub allow_non_loopback: bool,
    pub token_file_used: bool,
    pub max_body_bytes: u64,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

impl AccessMode {
    fn allows_write(self) -> bool {
        matches!(self, AccessMode::ReadWrite)
    }
}

#[derive(Clone)]
struct AppState {
    store: SiteStore,
    token: Option<String>,
    access_mode: AccessMode,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let max_body_bytes: usize = config
        .max_body_bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;

    let state = Arc::new(AppState {
        store: SiteStore::new(config.data_dir),
        token: config.token,
        access_mode: config.access_mode,
    });

    let mut app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v0/sites", post(create_site))
        .route("/v0/sites/:site/document", get(get_document).put(put_document))
        .route("/v0/sites/:site/assets", get(list_assets))
        .route(
            "/v0/sites/:site/assets/:name",
            get(get_asset).post(put_asset),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if !config.cors_allowed_origins.is_empty() {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        app = app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );
    }

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    let is_loopback_bind = is_loopback(config.bind.ip());
    if !is_loopback_bind && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }

    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero")
            .with_hint("Use a positive value like 8388608."));
    }

    if !is_loopback_bind && config.access_mode.allows_write() && !config.token_file_used {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback write access requires --token-file")
            .with_hint("Use --token-file, or serve read-only with --access read-only."));
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

fn authorize_write(headers: &HeaderMap, state: &AppState) -> Result<(), Error> {
    if !state.access_mode.allows_write() {
        return Err(Error::new(ErrorKind::Permission)
            .with_message("forbidden: this server is read-only")
            .with_hint("Restart the server with --access read-write."));
    }
    let Some(token) = state.token.as_ref() else {
        return Ok(());
    };
    let Some(value) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Err(Error::new(ErrorKind::Permission).with_message("missing bearer token"));
    };
    let value = value.to_str().unwrap_or_default();
    let expected = format!("Bearer {token}");
    if value != expected {
        return Err(Error::new(ErrorKind::Permission).with_message("invalid bearer token"));
    }
    Ok(())
}

// --- on-disk site store ---

/// Directory-backed storage: `<data_dir>/sites/<site>/document.json` plus
/// `<data_dir>/sites/<site>/assets/<name>`. A site exists once provisioned.
#[derive(Clone)]
struct SiteStore {
    data_dir: PathBuf,
}

#[derive(Debug)]
struct StoredAsset {
    name: String,
    size: u64,
    sha256: String,
}

impl SiteStore {
    fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn site_dir(&self, site: &str) -> Result<PathBuf, Error> {
        validate_site_name(site).map_err(|_| {
            Error::new(ErrorKind::Usage)
                .with_message("site names must not contain path separators")
        })?;
        Ok(self.data_dir.join("sites").join(site))
    }

    fn require_site(&self, site: &str) -> Result<PathBuf, Error> {
        let dir = self.site_dir(site)?;
        if !dir.is_dir() {
            return Err(Error::new(ErrorKind::Unprovisioned)
                .with_message("site has never been provisioned")
                .with_site(site)
                .with_hint(format!("Provision it first: `vitrine site create {site}`.")));
        }
        Ok(dir)
    }

    fn provision(&self, site: &str) -> Result<(), Error> {
        let dir = self.site_dir(site)?;
        if dir.is_dir() {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message("site already exists")
                .with_site(site));
        }
        std::fs::create_dir_all(dir.join("assets")).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to provision site")
                .with_site(site)
                .with_source(err)
        })
    }

    fn read_document(&self, site: &str) -> Result<serde_json::Value, Error> {
        let dir = self.require_site(site)?;
        let path = dir.join("document.json");
        let payload = match std::fs::read_to_string(&path) {
            Ok(payload) => payload,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::new(ErrorKind::NotFound)
                    .with_message("no document has been saved for this site")
                    .with_site(site));
            }
            Err(err) => {
                return Err(Error::new(ErrorKind::Io)
                    .with_message("failed to read stored document")
                    .with_site(site)
                    .with_source(err));
            }
        };
        serde_json::from_str(&payload).map_err(|err| {
            Error::new(ErrorKind::Parse)
                .with_message("stored document is corrupt")
                .with_site(site)
                .with_source(err)
        })
    }

    fn write_document(&self, site: &str, document: &serde_json::Value) -> Result<u64, Error> {
        let dir = self.require_site(site)?;
        let payload = serde_json::to_string(document).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode document")
                .with_source(err)
        })?;
        std::fs::write(dir.join("document.json"), &payload).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write document")
                .with_site(site)
                .with_source(err)
        })?;
        Ok(payload.len() as u64)
    }

    fn write_asset(&self, site: &str, name: &str, bytes: &[u8]) -> Result<StoredAsset, Error> {
        validate_asset_name(name)?;
        let dir = self.require_site(site)?;
        let path = dir.join("assets").join(name);
        if path.exists() {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message("an asset with this name already exists")
                .with_site(site)
                .with_hint("Asset names are write-once; upload under a new name."));
        }
        std::fs::write(&path, bytes).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write asset")
                .with_site(site)
                .with_source(err)
        })?;
        Ok(StoredAsset {
            name: name.to_string(),
            size: bytes.len() as u64,
            sha256: sha256_hex(bytes),
        })
    }

    fn read_asset(&self, site: &str, name: &str) -> Result<Vec<u8>, Error> {
        validate_asset_name(name)?;
        let dir = self.require_site(site)?;
        match std::fs::read(dir.join("assets").join(name)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::new(ErrorKind::NotFound)
                    .with_message("asset not found")
                    .with_site(site))
            }
            Err(err) => Err(Error::new(ErrorKind::Io)
                .with_message("failed to read asset")
                .with_site(site)
                .with_source(err)),
        }
    }

    /// Enumerate assets in name order. Upload names start with a millisecond
    /// timestamp, so name order is chronological order.
    fn list_assets(&self, site: &str) -> Result<Vec<StoredAsset>, Error> {
        let dir = self.require_site(site)?;
        let mut names = Vec::new();
        let entries = std::fs::read_dir(dir.join("assets")).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read asset directory")
                .with_site(site)
                .with_source(err)
        })?;
        for entry in entries {
            let entry = entry.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read asset directory entry")
                    .with_site(site)
                    .with_source(err)
            })?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        let mut assets = Vec::new();
        for name in names {
            let bytes = self.read_asset(site, &name)?;
            assets.push(StoredAsset {
                name,
                size: bytes.len() as u64,
                sha256: sha256_hex(&bytes),
            });
        }
        Ok(assets)
    }
}

fn validate_asset_name(name: &str) -> Result<(), Error> {
    let acceptable = |c: char| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-';
    if name.is_empty() || name.starts_with('.') || !name.chars().all(acceptable) {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("invalid asset name")
            .with_hint("Asset names are alphanumeric plus `.`, `_`, and `-`."));
    }
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn asset_url(site: &str, name: &str) -> String {
    format!("/v0/sites/{site}/assets/{name}")
}

// --- handlers ---

#[derive(Debug, Deserialize)]
struct CreateSiteRequest {
    site: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    site: Option<String>,
}

async fn healthz() -> Response {
    json_response(json!({ "ok": true }))
}

async fn create_site(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateSiteRequest>,
) -> Response {
    if let Err(err) = authorize_write(&headers, &state) {
        return error_response(err);
    }
    match state.store.provision(&payload.site) {
        Ok(()) => json_response(json!({ "site": { "name": payload.site, "provisioned": true } })),
        Err(err) => error_response(err),
    }
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    AxumPath(site): AxumPath<String>,
) -> Response {
    match state.store.read_document(&site) {
        Ok(document) => json_response(json!({ "document": document })),
        Err(err) => error_response(err),
    }
}

async fn put_document(
    State(state): State<Arc<AppState>>,
    AxumPath(site): AxumPath<String>,
    headers: HeaderMap,
    Json(document): Json<serde_json::Value>,
) -> Response {
    if let Err(err) = authorize_write(&headers, &state) {
        return error_response(err);
    }
    match state.store.write_document(&site, &document) {
        Ok(bytes) => json_response(json!({
            "saved": { "site": site, "time": now_rfc3339(), "bytes": bytes }
        })),
        Err(err) => error_response(err),
    }
}

async fn put_asset(
    State(state): State<Arc<AppState>>,
    AxumPath((site, name)): AxumPath<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(err) = authorize_write(&headers, &state) {
        return error_response(err);
    }
    match state.store.write_asset(&site, &name, &body) {
        Ok(asset) => json_response(json!({
            "asset": {
                "name": asset.name,
                "url": asset_url(&site, &name),
                "size": asset.size,
                "sha256": asset.sha256,
            }
        })),
        Err(err) => error_response(err),
    }
}

async fn get_asset(
    State(state): State<Arc<AppState>>,
    AxumPath((site, name)): AxumPath<(String, String)>,
) -> Response {
    match state.store.read_asset(&site, &name) {
        Ok(bytes) => {
            let mut response = Response::new(axum::body::Body::from(bytes));
            response.headers_mut().insert(
                "content-type",
                HeaderValue::from_static("application/octet-stream"),
            );
            response
                .headers_mut()
                .insert("vitrine-version", HeaderValue::from_static("0"));
            response
        }
        Err(err) => error_response(err),
    }
}

async fn list_assets(
    State(state): State<Arc<AppState>>,
    AxumPath(site): AxumPath<String>,
) -> Response {
    match state.store.list_assets(&site) {
        Ok(assets) => {
            let out: Vec<_> = assets
                .iter()
                .map(|asset| {
                    json!({
                        "name": asset.name,
                        "url": asset_url(&site, &asset.name),
                        "size": asset.size,
                        "sha256": asset.sha256,
                    })
                })
                .collect();
            json_response(json!({ "assets": out }))
        }
        Err(err) => error_response(err),
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

fn json_response(payload: serde_json::Value) -> Response {
    let mut response = Json(payload).into_response();
    response
        .headers_mut()
        .insert("vitrine-version", HeaderValue::from_static("0"));
    response
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::Usage | ErrorKind::Parse | ErrorKind::NotConfigured => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound | ErrorKind::Unprovisioned => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::Permission => {
            if err.message().is_some_and(|m| m.starts_with("forbidden:")) {
                StatusCode::FORBIDDEN
            } else {
                StatusCode::UNAUTHORIZED
            }
        }
        ErrorKind::Io | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            hint: err.hint().map(str::to_string),
            site: err.site().map(str::to_string),
        },
    };
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert("vitrine-version", HeaderValue::from_static("0"));
    response
}

#[cfg(test)]
mod tests {
    use super::{
        sha256_hex, validate_asset_name, validate_config, AccessMode, ErrorKind, ServeConfig,
        SiteStore,
    };

    fn config(bind: &str) -> ServeConfig {
        ServeConfig {
            bind: bind.parse().expect("bind"),
            data_dir: std::env::temp_dir(),
            token: None,
            access_mode: AccessMode::ReadWrite,
            allow_non_loopback: false,
            token_file_used: false,
            max_body_bytes: 8 * 1024 * 1024,
            cors_allowed_origins: Vec::new(),
        }
    }

    #[test]
    fn non_loopback_requires_allow_flag() {
        let err = validate_config(&config("0.0.0.0:0")).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn non_loopback_write_requires_token_file() {
        let mut cfg = config("0.0.0.0:0");
        cfg.allow_non_loopback = true;
        let err = validate_config(&cfg).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);

        cfg.token_file_used = true;
        validate_config(&cfg).expect("config ok");
    }

    #[test]
    fn non_loopback_read_only_is_allowed_without_token() {
        let mut cfg = config("0.0.0.0:0");
        cfg.allow_non_loopback = true;
        cfg.access_mode = AccessMode::ReadOnly;
        validate_config(&cfg).expect("config ok");
    }

    #[test]
    fn zero_body_limit_is_rejected() {
        let mut cfg = config("127.0.0.1:0");
        cfg.max_body_bytes = 0;
        let err = validate_config(&cfg).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn unprovisioned_site_is_distinct_from_missing_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SiteStore::new(dir.path().to_path_buf());

        let err = store.read_document("demo").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Unprovisioned);

        store.provision("demo").expect("provision");
        let err = store.read_document("demo").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn document_write_then_read_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SiteStore::new(dir.path().to_path_buf());
        store.provision("demo").expect("provision");
        let doc = serde_json::json!({"name": "Avery", "portfolio": []});
        store.write_document("demo", &doc).expect("write");
        assert_eq!(store.read_document("demo").expect("read"), doc);
    }

    #[test]
    fn assets_are_write_once_and_listed_in_name_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SiteStore::new(dir.path().to_path_buf());
        store.provision("demo").expect("provision");

        store.write_asset("demo", "100_b.png", b"two").expect("write");
        store.write_asset("demo", "050_a.png", b"one").expect("write");
        let err = store
            .write_asset("demo", "100_b.png", b"again")
            .expect_err("err");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let listed = store.list_assets("demo").expect("list");
        let names: Vec<_> = listed.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["050_a.png", "100_b.png"]);
    }

    #[test]
    fn asset_names_are_validated() {
        assert!(validate_asset_name("1700_photo.png").is_ok());
        assert!(validate_asset_name("../escape").is_err());
        assert!(validate_asset_name(".hidden").is_err());
        assert!(validate_asset_name("").is_err());
        assert!(validate_asset_name("with space").is_err());
    }

    #[test]
    fn sha256_hex_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
