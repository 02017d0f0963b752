use std::net::{Ipv4Addr, SocketAddr};

use tempfile::TempDir;
use tokio::net::TcpListener;

use storage::StorageConfig;
use studio::config::Config;

pub struct Server {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    token: Option<String>,
    _dir: TempDir,
}

pub fn config(dir: &TempDir) -> Config {
    let mut cfg = Config::default();
    cfg.database.url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("onair.db").to_string_lossy()
    );
    cfg.archive.storage = StorageConfig::Fs {
        root: dir.path().join("recordings").to_string_lossy().to_string(),
    };
    cfg
}

pub async fn start() -> Server {
    start_with(|_| {}).await
}

pub async fn start_with<F: FnOnce(&mut Config)>(f: F) -> Server {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir);
    f(&mut cfg);
    let token = cfg.auth.tokens.first().cloned();

    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(studio::serve(cfg, listener, std::future::pending()));

    let server = Server {
        addr,
        client: reqwest::Client::new(),
        token,
        _dir: dir,
    };
    server.wait_ready().await;
    server
}

impl Server {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn request(&self, method: http::Method, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(http::Method::GET, path)
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(http::Method::POST, path)
    }

    async fn wait_ready(&self) {
        for _ in 0..50 {
            if let Ok(res) = self.client.get(self.url(api::path::STATUS)).send().await {
                if res.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("server at {} did not come up", self.addr);
    }
}
