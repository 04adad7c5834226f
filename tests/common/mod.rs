//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::task::JoinHandle;

use static_server::http::HttpServer;
use static_server::lifecycle::Shutdown;
use static_server::routing::LiveTable;
use static_server::source::{ConfigSource, FileSource};

pub const HEALTH_DOCUMENT: &str = r#"
endpoints:
  - path: /health
    methods:
      - method: GET
        statusCode: 200
        body: ok
        headers:
          Content-Type: text/plain
"#;

/// A server reading from a temporary endpoints file.
pub struct TestServer {
    pub addr: SocketAddr,
    pub live: LiveTable,
    shutdown: Shutdown,
    server: JoinHandle<std::io::Result<()>>,
    watch: JoinHandle<()>,
    path: PathBuf,
    _dir: TempDir,
}

impl TestServer {
    /// Write `document` to `endpoints.<extension>` and serve it on loopback.
    pub async fn start(file_name: &str, document: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name);
        std::fs::write(&path, document).unwrap();

        let live = LiveTable::new();
        let source = Arc::new(
            FileSource::new(path.clone()).with_intervals(Duration::from_millis(50), Duration::from_millis(250)),
        );
        source.sync(&live).await.unwrap();

        let shutdown = Shutdown::new();
        let watch = tokio::spawn(source.watch(live.clone(), shutdown.subscribe()));

        let server = HttpServer::new(live.clone(), "127.0.0.1:0".parse().unwrap(), Duration::from_secs(5))
            .with_grace_period(Duration::from_millis(100));
        let handle = server.handle();
        let server = tokio::spawn(server.run(shutdown.subscribe()));
        let addr = handle.listening().await.expect("server failed to bind");

        Self {
            addr,
            live,
            shutdown,
            server,
            watch,
            path,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the endpoints file contents.
    pub fn rewrite(&self, document: &str) {
        std::fs::write(&self.path, document).unwrap();
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.server)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), self.watch)
            .await
            .expect("watch loop did not stop")
            .unwrap();
    }
}

/// Poll `url` until it returns `status`, or panic after `deadline`.
pub async fn wait_for_status(client: &reqwest::Client, url: &str, status: u16, deadline: Duration) {
    let start = tokio::time::Instant::now();
    loop {
        if let Ok(response) = client.get(url).send().await {
            if response.status().as_u16() == status {
                return;
            }
        }
        assert!(start.elapsed() < deadline, "{url} never returned {status}");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
