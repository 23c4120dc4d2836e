//! Language-model backends.

use crate::prompt::SYSTEM_PROMPT;
use deck_core::{AiService, Error, PipelineConfig, Result};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use std::time::Duration;

/// Upper bound for one backend call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Sends a prompt to a model and returns the raw reply text.
pub trait CompletionBackend: Send + Sync {
    /// Backend identifier recorded in provenance.
    fn id(&self) -> &str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    fn send(&self, prompt: &str) -> Result<String>;
}

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| Error::TransportError(format!("cannot build HTTP client: {}", e)))
}

/// Turn a non-success response into [`Error::BackendError`].
fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(Error::BackendError {
        status: status.as_u16(),
        body,
    })
}

fn transport(url: &str, e: reqwest::Error) -> Error {
    Error::TransportError(format!("{}: {}", url, e))
}

/// Local generate endpoint (`POST {base_url}/api/generate`).
pub struct LocalBackend {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateReply {
    #[serde(default)]
    response: String,
}

impl LocalBackend {
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// List installed models to see whether the service answers.
    pub fn check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().map_err(|e| transport(&url, e))?;
        check_status(response).map(|_| ())
    }
}

impl CompletionBackend for LocalBackend {
    fn id(&self) -> &str {
        AiService::Local.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn send(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });

        log::debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| transport(&url, e))?;
        let text = check_status(response)?
            .text()
            .map_err(|e| transport(&url, e))?;

        let reply: GenerateReply = serde_json::from_str(&text)
            .map_err(|e| Error::ResponseParseError(format!("unexpected reply from {}: {}", url, e)))?;
        Ok(reply.response)
    }
}

/// Remote chat-completions endpoint (`POST {base_url}/chat/completions`).
pub struct RemoteBackend {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl RemoteBackend {
    pub fn new(base_url: &str, model: &str, api_key: &str, temperature: f32, max_tokens: u32) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            temperature,
            max_tokens,
        })
    }

    pub fn check(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::ConfigError("the remote service requires an api_key".to_string()));
        }
        Ok(())
    }
}

impl CompletionBackend for RemoteBackend {
    fn id(&self) -> &str {
        AiService::Remote.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn send(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens
        });

        log::debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .map_err(|e| transport(&url, e))?;
        let text = check_status(response)?
            .text()
            .map_err(|e| transport(&url, e))?;

        let completion: ChatCompletion = serde_json::from_str(&text)
            .map_err(|e| Error::ResponseParseError(format!("unexpected reply from {}: {}", url, e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| Error::ResponseParseError(format!("reply from {} has no choices", url)))
    }
}

/// The configured backend.
pub enum Backend {
    Local(LocalBackend),
    Remote(RemoteBackend),
}

impl Backend {
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(match config.ai_service {
            AiService::Local => Backend::Local(LocalBackend::new(config.base_url(), config.model())?),
            AiService::Remote => Backend::Remote(RemoteBackend::new(
                config.base_url(),
                config.model(),
                &config.api_key,
                config.temperature,
                config.max_tokens,
            )?),
        })
    }

    /// Best-effort reachability check; callers only log the outcome.
    pub fn check(&self) -> Result<()> {
        match self {
            Backend::Local(backend) => backend.check(),
            Backend::Remote(backend) => backend.check(),
        }
    }
}

impl CompletionBackend for Backend {
    fn id(&self) -> &str {
        match self {
            Backend::Local(backend) => backend.id(),
            Backend::Remote(backend) => backend.id(),
        }
    }

    fn model(&self) -> &str {
        match self {
            Backend::Local(backend) => backend.model(),
            Backend::Remote(backend) => backend.model(),
        }
    }

    fn send(&self, prompt: &str) -> Result<String> {
        match self {
            Backend::Local(backend) => backend.send(prompt),
            Backend::Remote(backend) => backend.send(prompt),
        }
    }
}

#[cfg(test)]
pub(crate) mod stub {
    //! Mock model server on the loopback interface.
    //!
    //! The server runs on its own tokio runtime in a helper thread so the
    //! blocking client under test can call it. It answers one request with a
    //! fixed status and body, then shuts down.

    use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
    use axum::Router;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// The request the server received.
    pub struct Captured {
        pub method: Method,
        pub path: String,
        pub authorization: Option<String>,
        pub body: String,
    }

    /// Handle on a running mock server.
    pub struct MockServer {
        requests: mpsc::Receiver<Captured>,
    }

    impl MockServer {
        /// The request that reached the server.
        pub fn captured(self) -> Captured {
            self.requests
                .recv_timeout(Duration::from_secs(10))
                .expect("no request reached the mock server")
        }
    }

    /// Start a server answering `status` with `reply`; returns its base URL.
    pub fn serve_once(status: u16, reply: &str) -> (String, MockServer) {
        let reply = reply.to_string();
        let (addr_tx, addr_rx) = mpsc::channel();
        let (request_tx, request_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                addr_tx.send(listener.local_addr().unwrap()).unwrap();

                let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel::<Captured>();
                let status = StatusCode::from_u16(status).unwrap();

                let app = Router::new().fallback(move |method: Method, uri: Uri, headers: HeaderMap, body: String| {
                    let seen_tx = seen_tx.clone();
                    let reply = reply.clone();
                    async move {
                        let authorization = headers
                            .get(header::AUTHORIZATION)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        let _ = seen_tx.send(Captured {
                            method,
                            path: uri.path().to_string(),
                            authorization,
                            body,
                        });
                        (status, [(header::CONTENT_TYPE, "application/json")], reply)
                    }
                });

                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        if let Some(captured) = seen_rx.recv().await {
                            let _ = request_tx.send(captured);
                        }
                    })
                    .await
                    .unwrap();
            });
        });

        let addr = addr_rx.recv().unwrap();
        (format!("http://{}", addr), MockServer { requests: request_rx })
    }

    /// A base URL nothing listens on.
    pub fn closed_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::stub::{closed_url, serve_once};
    use super::*;
    use axum::http::Method;
    use serde_json::Value;

    #[test]
    fn test_local_wire_contract() {
        let (url, server) = serve_once(200, r#"{"model":"llama2","response":"{\"summary\":\"ok\"}","done":true}"#);
        let backend = LocalBackend::new(&url, "llama2").unwrap();

        let reply = backend.send("Describe the slide").unwrap();
        assert_eq!(reply, r#"{"summary":"ok"}"#);

        let captured = server.captured();
        assert_eq!(captured.method, Method::POST);
        assert_eq!(captured.path, "/api/generate");
        let body: Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(body["model"], "llama2");
        assert_eq!(body["prompt"], "Describe the slide");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_remote_wire_contract() {
        let (url, server) = serve_once(
            200,
            r#"{"id":"c1","choices":[{"index":0,"message":{"role":"assistant","content":"hello"}}]}"#,
        );
        let backend = RemoteBackend::new(&format!("{}/", url), "gpt-3.5-turbo", "sk-test-123456", 0.3, 2000).unwrap();

        assert_eq!(backend.send("Describe the slide").unwrap(), "hello");

        let captured = server.captured();
        assert_eq!(captured.method, Method::POST);
        assert_eq!(captured.path, "/chat/completions");
        assert_eq!(captured.authorization.as_deref(), Some("Bearer sk-test-123456"));
        let body: Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Describe the slide");
        assert_eq!(body["max_tokens"], 2000);
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_non_success_status_is_backend_error() {
        let (url, server) = serve_once(500, "model exploded");
        let backend = LocalBackend::new(&url, "llama2").unwrap();

        match backend.send("x") {
            Err(Error::BackendError { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "model exploded");
            }
            other => panic!("expected BackendError, got {:?}", other),
        }
        server.captured();
    }

    #[test]
    fn test_empty_choices_is_an_error() {
        let (url, server) = serve_once(200, r#"{"choices":[]}"#);
        let backend = RemoteBackend::new(&url, "m", "sk-test-123456", 0.3, 10).unwrap();
        assert!(matches!(backend.send("x"), Err(Error::ResponseParseError(_))));
        server.captured();
    }

    #[test]
    fn test_unreachable_is_transport_error() {
        let backend = LocalBackend::new(&closed_url(), "llama2").unwrap();
        assert!(matches!(backend.send("x"), Err(Error::TransportError(_))));
        assert!(backend.check().is_err());
    }

    #[test]
    fn test_backend_from_config() {
        let backend = Backend::from_config(&PipelineConfig::default()).unwrap();
        assert_eq!(backend.id(), "local");
        assert_eq!(backend.model(), "llama2");

        let remote = Backend::from_config(&PipelineConfig {
            ai_service: AiService::Remote,
            ..PipelineConfig::default()
        })
        .unwrap();
        assert_eq!(remote.id(), "remote");
        assert_eq!(remote.model(), "gpt-3.5-turbo");
        assert!(matches!(remote.check(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_local_check_against_stub() {
        let (url, server) = serve_once(200, r#"{"models":[]}"#);
        let backend = Backend::Local(LocalBackend::new(&url, "llama2").unwrap());
        backend.check().unwrap();
        let captured = server.captured();
        assert_eq!(captured.method, Method::GET);
        assert_eq!(captured.path, "/api/tags");
    }
}
