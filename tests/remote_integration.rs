//! Purpose: End-to-end tests for the remote document/asset store.
//! Exports: None (integration test module).
//! Role: Validate load/save/upload flows and error propagation across TCP.
//! Invariants: Uses loopback-only servers with temp data directories.
//! Invariants: Bounded waits avoid test flakiness.
//! Invariants: Server processes are cleaned up on drop.

use std::io::Read;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::thread::sleep;
use std::time::{Duration, Instant};

use vitrine::api::{
    built_in_defaults, ErrorKind, Gateway, LoadSource, RemoteClient, RemoteTarget,
};

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

static SERVER_LOCK: Mutex<()> = Mutex::new(());

struct TestServer {
    child: Child,
    base_url: String,
    _server_guard: MutexGuard<'static, ()>,
}

impl TestServer {
    fn start(data_dir: &Path) -> TestResult<Self> {
        Self::start_with_options(data_dir, None, None)
    }

    fn start_with_token(data_dir: &Path, token: &str) -> TestResult<Self> {
        Self::start_with_options(data_dir, Some(token), None)
    }

    fn start_read_only(data_dir: &Path) -> TestResult<Self> {
        Self::start_with_options(data_dir, None, Some("read-only"))
    }

    fn start_with_options(
        data_dir: &Path,
        token: Option<&str>,
        access: Option<&str>,
    ) -> TestResult<Self> {
        let guard = SERVER_LOCK
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let mut last_err: Option<Box<dyn std::error::Error>> = None;
        for _attempt in 0..3 {
            let port = pick_port()?;
            let bind = format!("127.0.0.1:{port}");
            let base_url = format!("http://{bind}");

            let mut command = Command::new(env!("CARGO_BIN_EXE_vitrine"));
            command
                .arg("--state-dir")
                .arg(data_dir)
                .arg("serve")
                .arg("--bind")
                .arg(&bind)
                .arg("--data-dir")
                .arg(data_dir)
                .stdout(Stdio::null())
                .stderr(Stdio::null());
            if let Some(token) = token {
                command.arg("--serve-token").arg(token);
            }
            if let Some(access) = access {
                command.arg("--access").arg(access);
            }
            let mut child = command.spawn()?;

            match wait_for_server(&mut child, bind.parse()?) {
                Ok(()) => {
                    return Ok(Self {
                        child,
                        base_url,
                        _server_guard: guard,
                    });
                }
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    last_err = Some(err);
                    sleep(Duration::from_millis(30));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| "server failed to start".into()))
    }

    fn client(&self) -> TestResult<RemoteClient> {
        Ok(RemoteClient::new(self.base_url.clone())?)
    }

    fn target(&self, site: &str) -> RemoteTarget {
        RemoteTarget {
            base_url: self.base_url.clone(),
            site: site.to_string(),
            token: None,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn pick_port() -> TestResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

fn wait_for_server(child: &mut Child, addr: SocketAddr) -> TestResult<()> {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait()? {
            return Err(format!("server exited early: {status}").into());
        }
        if TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_ok() {
            return Ok(());
        }
        sleep(Duration::from_millis(30));
    }
    Err("server did not come up in time".into())
}

#[test]
fn unprovisioned_site_is_distinct_from_missing_document() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let server = TestServer::start(temp.path())?;
    let client = server.client()?;
    let site = client.site("demo")?;

    let err = site.fetch_document().expect_err("unprovisioned");
    assert_eq!(err.kind(), ErrorKind::Unprovisioned);

    client.create_site("demo")?;
    let err = site.fetch_document().expect_err("no document yet");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = client.create_site("demo").expect_err("duplicate");
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    Ok(())
}

#[test]
fn put_then_fetch_round_trips_the_document() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let server = TestServer::start(temp.path())?;
    let client = server.client()?;
    client.create_site("demo")?;
    let site = client.site("demo")?;

    let doc = serde_json::to_value(built_in_defaults())?;
    let receipt = site.put_document(&doc)?;
    assert_eq!(receipt.site, "demo");
    assert!(receipt.bytes > 0);

    let fetched = site.fetch_document()?;
    assert_eq!(fetched, doc);
    Ok(())
}

#[test]
fn gateway_load_prefers_remote_and_refreshes_the_cache() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let state_dir = tempfile::tempdir()?;
    let server = TestServer::start(temp.path())?;
    let client = server.client()?;
    client.create_site("demo")?;

    let mut remote_doc = built_in_defaults();
    remote_doc.name = "Remote Author".to_string();
    client
        .site("demo")?
        .put_document(&serde_json::to_value(&remote_doc)?)?;

    let gateway = Gateway::new(state_dir.path(), Some(server.target("demo")))?;
    let mut cache_doc = built_in_defaults();
    cache_doc.name = "Cache Author".to_string();
    gateway.cache().write(&cache_doc)?;

    let loaded = gateway.load();
    assert_eq!(loaded.source, LoadSource::Remote);
    assert_eq!(loaded.document.name, "Remote Author");

    // Remote success must refresh the cache copy.
    let cached = gateway.cache().read()?.expect("cached");
    assert_eq!(cached.name, "Remote Author");
    Ok(())
}

#[test]
fn gateway_save_writes_cache_then_remote() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let state_dir = tempfile::tempdir()?;
    let server = TestServer::start(temp.path())?;
    server.client()?.create_site("demo")?;

    let gateway = Gateway::new(state_dir.path(), Some(server.target("demo")))?;
    let mut doc = built_in_defaults();
    doc.name = "Synced".to_string();
    let outcome = gateway.save(&doc)?;
    assert!(outcome.cached);

    let fetched = server.client()?.site("demo")?.fetch_document()?;
    assert_eq!(fetched["name"], "Synced");
    Ok(())
}

#[test]
fn remote_save_failure_propagates_but_cache_reflects_the_attempt() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let state_dir = tempfile::tempdir()?;
    let server = TestServer::start_read_only(temp.path())?;

    let gateway = Gateway::new(state_dir.path(), Some(server.target("demo")))?;
    let mut doc = built_in_defaults();
    doc.name = "Attempted".to_string();

    let err = gateway.save(&doc).expect_err("read-only server");
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert!(err.hint().is_some());

    let cached = gateway.cache().read()?.expect("cached");
    assert_eq!(cached.name, "Attempted");
    Ok(())
}

#[test]
fn writes_are_token_gated() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let server = TestServer::start_with_token(temp.path(), "sesame")?;

    let anonymous = server.client()?;
    let err = anonymous.create_site("demo").expect_err("no token");
    assert_eq!(err.kind(), ErrorKind::Permission);

    let authed = server.client()?.with_token("sesame");
    authed.create_site("demo")?;

    // Reads stay public even when writes are token-gated.
    let err = anonymous.site("demo")?.fetch_document().expect_err("empty");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn assets_upload_and_list_newest_first() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let state_dir = tempfile::tempdir()?;
    let server = TestServer::start(temp.path())?;
    server.client()?.create_site("demo")?;

    let gateway = Gateway::new(state_dir.path(), Some(server.target("demo")))?;
    let first = gateway.upload_asset(b"image-one", "a.png")?;
    sleep(Duration::from_millis(5));
    let second = gateway.upload_asset(b"image-two", "b.png")?;

    assert!(first.name.ends_with("_a.png"));
    assert!(first.url.starts_with(&server.base_url));
    assert_eq!(first.size, 9);
    assert_eq!(first.sha256.len(), 64);

    let listed = gateway.list_assets()?;
    let names: Vec<_> = listed.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, [second.name.as_str(), first.name.as_str()]);
    Ok(())
}

#[test]
fn uploaded_assets_resolve_over_http() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let state_dir = tempfile::tempdir()?;
    let server = TestServer::start(temp.path())?;
    server.client()?.create_site("demo")?;

    let gateway = Gateway::new(state_dir.path(), Some(server.target("demo")))?;
    let asset = gateway.upload_asset(b"payload-bytes", "pic.png")?;

    let response = ureq::get(&asset.url).call()?;
    let mut body = Vec::new();
    response.into_reader().read_to_end(&mut body)?;
    assert_eq!(body, b"payload-bytes");
    Ok(())
}

#[test]
fn duplicate_asset_names_are_rejected() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let server = TestServer::start(temp.path())?;
    let client = server.client()?;
    client.create_site("demo")?;
    let site = client.site("demo")?;

    site.upload_asset("42_pic.png", b"one")?;
    let err = site.upload_asset("42_pic.png", b"two").expect_err("dup");
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    Ok(())
}
