//! Outbound HTTP for notifiers: client construction from an integration's
//! `http_config` and a JSON POST helper.

use std::fs;
use std::path::Path;

use herald_routing::schema::HttpClientConfig;
use reqwest::RequestBuilder;
use serde::Serialize;

use crate::traits::{NotifierSettings, NotifyError};
use crate::util::redact_url;

/// Status and raw body of a completed request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
enum Auth {
    #[default]
    None,
    Bearer(String),
    BearerFile(String),
    Basic {
        username: String,
        password: Option<String>,
        password_file: String,
    },
}

/// Shared HTTP client (connection pooling) plus per-request authentication.
#[derive(Debug, Clone)]
pub struct HttpSender {
    client: reqwest::Client,
    auth: Auth,
}

fn read_file(kind: &str, path: &str) -> Result<Vec<u8>, NotifyError> {
    fs::read(Path::new(path)).map_err(|e| NotifyError::Config(format!("unable to read {kind} {path}: {e}")))
}

impl HttpSender {
    pub fn from_config(
        http: Option<&HttpClientConfig>,
        settings: &NotifierSettings,
    ) -> Result<Self, NotifyError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout);
        let mut auth = Auth::None;

        if let Some(cfg) = http {
            cfg.validate().map_err(NotifyError::Config)?;

            if !cfg.follow_redirects {
                builder = builder.redirect(reqwest::redirect::Policy::none());
            }
            if let Some(proxy) = &cfg.proxy_url {
                let proxy = reqwest::Proxy::all(proxy.as_str())
                    .map_err(|e| NotifyError::Config(format!("invalid proxy_url: {}", e.without_url())))?;
                builder = builder.proxy(proxy);
            }

            let tls = &cfg.tls_config;
            if !tls.ca_file.is_empty() {
                let pem = read_file("CA file", &tls.ca_file)?;
                let cert = reqwest::Certificate::from_pem(&pem)
                    .map_err(|e| NotifyError::Config(format!("invalid CA file {}: {e}", tls.ca_file)))?;
                builder = builder.add_root_certificate(cert);
            }
            if !tls.cert_file.is_empty() && !tls.key_file.is_empty() {
                let mut pem = read_file("client certificate", &tls.cert_file)?;
                pem.extend(read_file("client key", &tls.key_file)?);
                let identity = reqwest::Identity::from_pem(&pem)
                    .map_err(|e| NotifyError::Config(format!("invalid client certificate: {e}")))?;
                builder = builder.identity(identity);
            }
            if !tls.server_name.is_empty() {
                tracing::warn!(server_name = %tls.server_name, "tls server_name override is not supported; using the URL host");
            }
            if tls.insecure_skip_verify {
                builder = builder.danger_accept_invalid_certs(true);
            }

            auth = if let Some(basic) = &cfg.basic_auth {
                Auth::Basic {
                    username: basic.username.clone(),
                    password: (!basic.password.is_empty()).then(|| basic.password.expose().to_string()),
                    password_file: basic.password_file.clone(),
                }
            } else if !cfg.bearer_token.is_empty() {
                Auth::Bearer(cfg.bearer_token.expose().to_string())
            } else if !cfg.bearer_token_file.is_empty() {
                Auth::BearerFile(cfg.bearer_token_file.clone())
            } else {
                Auth::None
            };
        }

        let client = builder
            .build()
            .map_err(|e| NotifyError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self { client, auth })
    }

    /// Credential files are re-read on every request so rotated secrets apply.
    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, NotifyError> {
        let read = |path: &str| {
            let path = path.to_string();
            async move {
                tokio::fs::read_to_string(&path)
                    .await
                    .map(|s| s.trim().to_string())
                    .map_err(|e| NotifyError::Config(format!("unable to read credentials file {path}: {e}")))
            }
        };
        Ok(match &self.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::BearerFile(path) => request.bearer_auth(read(path).await?),
            Auth::Basic { username, password, password_file } => {
                let password = match password {
                    Some(p) => Some(p.clone()),
                    None if !password_file.is_empty() => Some(read(password_file).await?),
                    None => None,
                };
                request.basic_auth(username, password)
            }
        })
    }

    /// POST `body` as JSON. Transport errors come back with the URL removed.
    pub async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<HttpResponse, NotifyError> {
        let request = self.authorize(self.client.post(url).json(body)).await?;
        let response = request.send().await.map_err(redact_url)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(redact_url)?;
        Ok(HttpResponse { status, body: body.to_vec() })
    }
}
