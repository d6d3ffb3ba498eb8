use axum::routing::{get, post};
use axum::Router;
use fsmapper::FsMapper;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};

use crate::config::DevServerConfig;
use crate::error::{ServerError, ServerResult};

pub mod assets;
pub mod error;
pub mod protocol;
pub mod socket;

pub struct Server {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    mapper: FsMapper,
}

impl Server {
    /// Explores the namespace, then binds and serves it.
    pub async fn start(config: DevServerConfig) -> ServerResult<Self> {
        let mapper = FsMapper::explore(config.mapper_config()).await?;
        Self::with_mapper(&config, mapper).await
    }

    pub async fn with_mapper(config: &DevServerConfig, mapper: FsMapper) -> ServerResult<Self> {
        let state = Arc::new(ServerState {
            mapper,
            etc_dir: config.etc_dir.clone(),
        });
        let app = router(state.clone());
        let listener = TcpListener::bind(config.addr).await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(error) = result {
                tracing::error!("server stopped: {error}");
            }
        });

        tracing::info!(
            %addr,
            mappings = state.mapper.namespace().mapping().len(),
            "dev server listening"
        );
        Ok(Server {
            addr,
            shutdown: Some(shutdown_tx),
            mapper: state.mapper.clone(),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(&mut self) -> ServerResult<()> {
        if let Some(sender) = self.shutdown.take() {
            sender
                .send(())
                .map_err(|_| ServerError::Internal("failed to send server shutdown signal".to_string()))
        } else {
            Ok(())
        }
    }

    pub fn mapper(&self) -> &FsMapper {
        &self.mapper
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/ws", get(socket::ws_handler))
        .route("/fs", post(protocol::query));
    if state.etc_dir.is_some() {
        app = app.route("/etc/*path", get(assets::serve_etc));
    }
    app.fallback(assets::serve).with_state(state).layer(cors)
}

async fn health() -> &'static str {
    "ok"
}

pub(crate) struct ServerState {
    pub(crate) mapper: FsMapper,
    pub(crate) etc_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write");
    }

    /// `<tmp>/dev` is the working directory with `www` -> `app` and a
    /// `libA` component; `<tmp>/env/etcui/local` is the etc directory.
    async fn start() -> (TempDir, Server) {
        let dir = tempdir().expect("tempdir");
        let root = dir.path();
        write(&root.join("dev/app/thoregon.html"), "<html>hello</html>");
        write(&root.join("dev/app/js/main.mjs"), "main");
        write(&root.join("libs/libA/index.mjs"), "plain");
        write(&root.join("libs/libA/index.reliant.mjs"), "reliant");
        write(&root.join("libs/libA/sub/a.mjs"), "a");
        write(&root.join("env/etcui/local/config.mjs"), "export default {}");
        write(&root.join("env/etcui/local/.secret"), "hidden");
        write(
            &root.join("dev/components.json"),
            &json!({ "www": "app", "libA": root.join("libs/libA") }).to_string(),
        );

        let args = crate::config::Args {
            www: None,
            port: 0,
            etc: Some("local".to_string()),
            components: "components.json".into(),
            thoregon_root: Some(root.join("dev")),
            bind: [127, 0, 0, 1].into(),
            default_document: "thoregon.html".to_string(),
            max_depth: 64,
        };
        let config = DevServerConfig::from_args(args, &root.join("dev"));
        let server = Server::start(config).await.expect("start");
        (dir, server)
    }

    fn url(server: &Server, path: &str) -> String {
        format!("http://{}{path}", server.addr())
    }

    #[tokio::test]
    async fn start_binds_random_port() {
        let (_dir, mut server) = start().await;
        assert_ne!(server.addr().port(), 0);
        assert!(server.mapper().namespace().get("libA").is_some());
        let body = reqwest::get(url(&server, "/health"))
            .await
            .expect("request")
            .text()
            .await
            .expect("body");
        assert_eq!(body, "ok");
        server.shutdown().expect("shutdown");
    }

    #[tokio::test]
    async fn fs_endpoint_answers_protocol_requests() {
        let (_dir, server) = start().await;
        let client = reqwest::Client::new();

        let value: Value = client
            .post(url(&server, "/fs"))
            .json(&json!({ "cmd": "get", "path": "/libA/index.mjs", "id": 7 }))
            .send()
            .await
            .expect("request")
            .json()
            .await
            .expect("json");
        assert_eq!(value["path"], "/libA/index.reliant.mjs");
        assert_eq!(value["content"], json!(b"reliant".to_vec()));
        assert_eq!(value["id"], 7);

        let response = client
            .post(url(&server, "/fs"))
            .json(&json!({ "cmd": "get", "path": "/nope" }))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let value: Value = response.json().await.expect("json");
        assert_eq!(value["error"], 404);
        assert_eq!(value["message"], "path '/nope' - error: not found: '/nope'");
    }

    #[tokio::test]
    async fn malformed_fs_body_is_a_protocol_error() {
        let (_dir, server) = start().await;
        let response = reqwest::Client::new()
            .post(url(&server, "/fs"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{ not json")
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let value: Value = response.json().await.expect("json");
        assert_eq!(value["error"], 400);
        assert!(value["message"]
            .as_str()
            .expect("message")
            .starts_with("malformed request: "));
    }

    #[tokio::test]
    async fn crawl_suffix_returns_json() {
        let (_dir, server) = start().await;
        let value: Value = reqwest::get(url(&server, "/libA!"))
            .await
            .expect("request")
            .json()
            .await
            .expect("json");
        assert_eq!(value["type"], "dir");
        assert_eq!(value["hasindex"], true);
        let sub = value["entries"]
            .as_array()
            .expect("entries")
            .iter()
            .find(|entry| entry["name"] == "sub")
            .expect("sub");
        assert_eq!(sub["entries"], json!(["a.mjs"]));
    }

    #[tokio::test]
    async fn static_files_are_served_from_the_namespace() {
        let (_dir, server) = start().await;

        let response = reqwest::get(url(&server, "/")).await.expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response.headers()[reqwest::header::CONTENT_TYPE],
            "text/html"
        );
        assert_eq!(response.text().await.expect("body"), "<html>hello</html>");

        let body = reqwest::get(url(&server, "/js/main.mjs"))
            .await
            .expect("request")
            .text()
            .await
            .expect("body");
        assert_eq!(body, "main");

        let body = reqwest::get(url(&server, "/libA/"))
            .await
            .expect("request")
            .text()
            .await
            .expect("body");
        assert_eq!(body, "reliant");

        let response = reqwest::get(url(&server, "/missing.mjs")).await.expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        let value: Value = response.json().await.expect("json");
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn etc_serves_environment_files_and_denies_dotfiles() {
        let (_dir, server) = start().await;

        let body = reqwest::get(url(&server, "/etc/config.mjs"))
            .await
            .expect("request")
            .text()
            .await
            .expect("body");
        assert_eq!(body, "export default {}");

        let response = reqwest::get(url(&server, "/etc/.secret")).await.expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    }
}
