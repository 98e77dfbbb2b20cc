//! Purpose: HTTP client for the vitrine document/asset store protocol.
//! Exports: `RemoteClient`, `RemoteSite`, `AssetInfo`, `SaveReceipt`.
//! Role: Transport client mirroring the gateway's remote tier operations.
//! Invariants: Request/response envelopes align with `serve.rs`.
//! Invariants: Error envelopes carry the kind; HTTP status is a fallback.
//! Invariants: Asset URLs resolve against the client's base URL.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::core::error::{Error, ErrorKind};
use crate::site_paths::validate_site_name;

type ApiResult<T> = Result<T, Error>;

#[derive(Clone, Debug)]
pub struct RemoteClient {
    inner: Arc<RemoteClientInner>,
}

#[derive(Debug)]
struct RemoteClientInner {
    base_url: Url,
    token: Option<String>,
    agent: ureq::Agent,
}

/// A client bound to one site; all document and asset operations hang here.
#[derive(Clone, Debug)]
pub struct RemoteSite {
    client: RemoteClient,
    site: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssetInfo {
    pub name: String,
    pub url: String,
    pub size: u64,
    pub sha256: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SaveReceipt {
    pub site: String,
    pub time: String,
    pub bytes: u64,
}

#[derive(Deserialize)]
struct DocumentEnvelope {
    document: Value,
}

#[derive(Deserialize)]
struct SavedEnvelope {
    saved: RemoteSaved,
}

#[derive(Deserialize)]
struct RemoteSaved {
    site: String,
    time: String,
    bytes: u64,
}

#[derive(Deserialize)]
struct AssetEnvelope {
    asset: RemoteAsset,
}

#[derive(Deserialize)]
struct AssetsEnvelope {
    assets: Vec<RemoteAsset>,
}

#[derive(Deserialize)]
struct RemoteAsset {
    name: String,
    url: String,
    size: u64,
    #[serde(default)]
    sha256: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: RemoteError,
}

#[derive(Deserialize)]
struct RemoteError {
    kind: String,
    message: Option<String>,
    hint: Option<String>,
    site: Option<String>,
}

#[derive(Serialize)]
struct CreateSiteRequest<'a> {
    site: &'a str,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self {
            inner: Arc::new(RemoteClientInner {
                base_url,
                token: None,
                agent,
            }),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.token = Some(token.into());
        } else {
            self.inner = Arc::new(RemoteClientInner {
                base_url: self.inner.base_url.clone(),
                token: Some(token.into()),
                agent: self.inner.agent.clone(),
            });
        }
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn create_site(&self, site: &str) -> ApiResult<()> {
        ensure_site_name(site)?;
        let url = build_url(&self.inner.base_url, &["v0", "sites"])?;
        let payload = CreateSiteRequest { site };
        let _value: Value = self
            .request_json("POST", &url, &payload)
            .map_err(|err| err.with_site(site))?;
        Ok(())
    }

    pub fn site(&self, site: &str) -> ApiResult<RemoteSite> {
        ensure_site_name(site)?;
        Ok(RemoteSite {
            client: self.clone(),
            site: site.to_string(),
        })
    }

    fn request_json<T, R>(&self, method: &str, url: &Url, body: &T) -> ApiResult<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let request = self.request(method, url).set("Accept", "application/json");
        let response = if method == "GET" {
            request.call()
        } else {
            let payload = serde_json::to_string(body).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to encode request json")
                    .with_source(err)
            })?;
            request
                .set("Content-Type", "application/json")
                .send_string(&payload)
        };

        match response {
            Ok(resp) => read_json_response(resp),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
                .with_message("request failed")
                .with_source(err)),
        }
    }

    fn request(&self, method: &str, url: &Url) -> ureq::Request {
        let mut request = self.inner.agent.request(method, url.as_str());
        if let Some(token) = &self.inner.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        request
    }
}

impl RemoteSite {
    pub fn name(&self) -> &str {
        &self.site
    }

    /// Fetch the stored document as raw JSON; the gateway migrates it.
    /// `NotFound` means the site exists but nothing was saved yet;
    /// `Unprovisioned` means the site itself was never created.
    pub fn fetch_document(&self) -> ApiResult<Value> {
        let url = build_url(
            &self.client.inner.base_url,
            &["v0", "sites", &self.site, "document"],
        )?;
        let envelope: DocumentEnvelope = self
            .client
            .request_json::<(), _>("GET", &url, &())
            .map_err(|err| err.with_site(self.site.clone()))?;
        Ok(envelope.document)
    }

    /// Full-document overwrite; the store has no partial update.
    pub fn put_document(&self, document: &Value) -> ApiResult<SaveReceipt> {
        let url = build_url(
            &self.client.inner.base_url,
            &["v0", "sites", &self.site, "document"],
        )?;
        let envelope: SavedEnvelope = self
            .client
            .request_json("PUT", &url, document)
            .map_err(|err| err.with_site(self.site.clone()))?;
        Ok(SaveReceipt {
            site: envelope.saved.site,
            time: envelope.saved.time,
            bytes: envelope.saved.bytes,
        })
    }

    /// Store a blob under `name`. The store is write-once per name.
    pub fn upload_asset(&self, name: &str, bytes: &[u8]) -> ApiResult<AssetInfo> {
        let url = build_url(
            &self.client.inner.base_url,
            &["v0", "sites", &self.site, "assets", name],
        )?;
        let response = self
            .client
            .request("POST", &url)
            .set("Accept", "application/json")
            .set("Content-Type", "application/octet-stream")
            .send_bytes(bytes);

        match response {
            Ok(resp) => {
                let envelope: AssetEnvelope = read_json_response(resp)?;
                self.resolve_asset(envelope.asset)
            }
            Err(ureq::Error::Status(code, resp)) => {
                Err(parse_error_response(code, resp).with_site(self.site.clone()))
            }
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
                .with_message("request failed")
                .with_source(err)),
        }
    }

    /// Enumerate stored assets in the server's enumeration (name) order.
    pub fn list_assets(&self) -> ApiResult<Vec<AssetInfo>> {
        let url = build_url(
            &self.client.inner.base_url,
            &["v0", "sites", &self.site, "assets"],
        )?;
        let envelope: AssetsEnvelope = self
            .client
            .request_json::<(), _>("GET", &url, &())
            .map_err(|err| err.with_site(self.site.clone()))?;
        envelope
            .assets
            .into_iter()
            .map(|asset| self.resolve_asset(asset))
            .collect()
    }

    // Servers answer with host-relative asset paths; resolve them against
    // this client's base so callers always hold a full URL.
    fn resolve_asset(&self, asset: RemoteAsset) -> ApiResult<AssetInfo> {
        let url = self
            .client
            .inner
            .base_url
            .join(&asset.url)
            .map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("server returned an unresolvable asset url")
                    .with_source(err)
            })?;
        Ok(AssetInfo {
            name: asset.name,
            url: url.to_string(),
            size: asset.size,
            sha256: asset.sha256,
        })
    }
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid remote base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("remote base url must use http or https scheme"));
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(
            Error::new(ErrorKind::Usage).with_message("remote base url must not include a path")
        );
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn build_url(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage).with_message("remote base url cannot be a base")
        })?;
        path.clear();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn ensure_site_name(site: &str) -> ApiResult<()> {
    validate_site_name(site).map_err(|_| {
        Error::new(ErrorKind::Usage).with_message("site names must not contain path separators")
    })
}

fn read_json_response<R>(response: ureq::Response) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response json")
            .with_source(err)
    })
}

fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
        return error_from_remote(envelope.error);
    }
    let kind = error_kind_from_status(status);
    Error::new(kind).with_message(format!("remote error status {status}"))
}

fn error_from_remote(remote: RemoteError) -> Error {
    let kind = parse_error_kind(&remote.kind);
    let mut err = Error::new(kind);
    if let Some(message) = remote.message {
        err = err.with_message(message);
    }
    if let Some(hint) = remote.hint {
        err = err.with_hint(hint);
    }
    if let Some(site) = remote.site {
        err = err.with_site(site);
    }
    err
}

fn parse_error_kind(kind: &str) -> ErrorKind {
    match kind {
        "Internal" => ErrorKind::Internal,
        "Usage" => ErrorKind::Usage,
        "NotFound" => ErrorKind::NotFound,
        "AlreadyExists" => ErrorKind::AlreadyExists,
        "NotConfigured" => ErrorKind::NotConfigured,
        "Unprovisioned" => ErrorKind::Unprovisioned,
        "Permission" => ErrorKind::Permission,
        "Parse" => ErrorKind::Parse,
        "Io" => ErrorKind::Io,
        _ => ErrorKind::Internal,
    }
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 413 => ErrorKind::Usage,
        401 | 403 => ErrorKind::Permission,
        404 => ErrorKind::NotFound,
        409 => ErrorKind::AlreadyExists,
        500..=599 => ErrorKind::Internal,
        _ => ErrorKind::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        build_url, error_kind_from_status, normalize_base_url, parse_error_kind, RemoteClient,
    };
    use crate::core::error::ErrorKind;

    #[test]
    fn normalize_base_url_strips_path() {
        let url = normalize_base_url("http://localhost:9720".to_string()).expect("url");
        assert_eq!(url.as_str(), "http://localhost:9720/");
    }

    #[test]
    fn base_url_with_path_is_rejected() {
        let err = normalize_base_url("http://localhost:9720/extra".to_string()).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let err = normalize_base_url("ftp://localhost".to_string()).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn build_url_appends_segments() {
        let base = normalize_base_url("http://localhost:9720".to_string()).expect("url");
        let url = build_url(&base, &["v0", "sites", "demo", "document"]).expect("url");
        assert_eq!(url.as_str(), "http://localhost:9720/v0/sites/demo/document");
    }

    #[test]
    fn parse_error_kind_maps_known_values() {
        assert_eq!(parse_error_kind("Usage"), ErrorKind::Usage);
        assert_eq!(parse_error_kind("NotConfigured"), ErrorKind::NotConfigured);
        assert_eq!(parse_error_kind("Unprovisioned"), ErrorKind::Unprovisioned);
        assert_eq!(parse_error_kind("Permission"), ErrorKind::Permission);
        assert_eq!(parse_error_kind("Parse"), ErrorKind::Parse);
        assert_eq!(parse_error_kind("unknown"), ErrorKind::Internal);
    }

    #[test]
    fn status_fallback_covers_the_common_codes() {
        assert_eq!(error_kind_from_status(400), ErrorKind::Usage);
        assert_eq!(error_kind_from_status(401), ErrorKind::Permission);
        assert_eq!(error_kind_from_status(404), ErrorKind::NotFound);
        assert_eq!(error_kind_from_status(409), ErrorKind::AlreadyExists);
        assert_eq!(error_kind_from_status(500), ErrorKind::Internal);
    }

    #[test]
    fn site_names_with_separators_are_rejected() {
        let client = RemoteClient::new("http://localhost:9720").expect("client");
        let err = client.site("a/b").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
