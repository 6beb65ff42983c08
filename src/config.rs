//! client configuration
//!
//! a [`ClientConfig`] names the cluster, the cdf project and the bearer token,
//! plus transport overrides. [`crate::Client::new`] validates it.

use crate::error::{Error, Result};
use crate::ids::DataModelId;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// env var holding the cluster url, e.g. `https://westeurope-1.cognitedata.com`
pub const ENV_BASE_URL: &str = "CDF_BASE_URL";
/// env var holding the project name
pub const ENV_PROJECT: &str = "CDF_PROJECT";
/// env var holding a bearer token
pub const ENV_TOKEN: &str = "CDF_TOKEN";

const DEFAULT_CLIENT_NAME: &str = "cognite-pygen";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

type BuilderHook = Arc<dyn Fn(reqwest::ClientBuilder) -> reqwest::ClientBuilder + Send + Sync>;

/// settings for one project on one cdf cluster
#[derive(Clone)]
pub struct ClientConfig {
    /// parsed cluster url, or the input that failed to parse
    cluster: std::result::Result<Url, String>,
    pub(crate) project: String,
    pub(crate) token: String,
    /// reported in `x-cdp-app`
    pub(crate) client_name: String,
    pub(crate) timeout: Duration,
    pub(crate) user_agent: String,
    pub(crate) verify_ssl: bool,
    pub(crate) extra_headers: HeaderMap,
    /// used as-is when set; auth and transport settings above are then ignored
    pub(crate) http_client: Option<reqwest::Client>,
    pub(crate) http_client_builder: Option<BuilderHook>,
}

impl ClientConfig {
    /// configuration for `project` on the cluster at `base_url`
    ///
    /// a missing scheme defaults to https and a trailing slash is dropped.
    ///
    /// ```
    /// use cognite_pygen::ClientConfig;
    ///
    /// let config = ClientConfig::new("westeurope-1.cognitedata.com", "windfarm", "token");
    /// assert_eq!(config.project(), "windfarm");
    /// ```
    pub fn new(
        base_url: impl AsRef<str>,
        project: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            cluster: parse_cluster(base_url.as_ref()),
            project: project.into(),
            token: token.into(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("cognite-pygen-rs/{} (Rust)", env!("CARGO_PKG_VERSION")),
            verify_ssl: true,
            extra_headers: HeaderMap::new(),
            http_client: None,
            http_client_builder: None,
        }
    }

    /// read cluster, project and token from `CDF_BASE_URL`, `CDF_PROJECT`, `CDF_TOKEN`
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| {
            std::env::var(name).map_err(|_| Error::Config(format!("{name} is not set")))
        };
        Ok(Self::new(read(ENV_BASE_URL)?, read(ENV_PROJECT)?, read(ENV_TOKEN)?))
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// cluster url, if the configured one parsed
    pub fn base_url(&self) -> Option<&Url> {
        self.cluster.as_ref().ok()
    }

    /// application name reported to the service (default `cognite-pygen`)
    pub fn with_client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    /// default: 60 seconds
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// turn tls certificate checks off, e.g. for a local proxy
    pub fn with_ssl_verification(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.extra_headers.insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.extra_headers.extend(headers);
        self
    }

    /// headers added to every request on top of auth and sdk identification
    pub fn extra_headers(&self) -> &HeaderMap {
        &self.extra_headers
    }

    /// send through a caller-owned client
    ///
    /// that client must carry its own auth, so the token may be empty.
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// adjust the reqwest builder after auth, headers, timeout and tls are set
    pub fn with_http_client_builder<F>(mut self, hook: F) -> Self
    where
        F: Fn(reqwest::ClientBuilder) -> reqwest::ClientBuilder + Send + Sync + 'static,
    {
        self.http_client_builder = Some(Arc::new(hook));
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let cluster = self
            .cluster
            .as_ref()
            .map_err(|raw| Error::Config(format!("cluster url does not parse: {raw}")))?;

        if !matches!(cluster.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "cluster url must use http or https, got {}",
                cluster.scheme()
            )));
        }

        if self.project.is_empty() || self.project.contains(['/', '?', '#']) {
            return Err(Error::Config(format!(
                "invalid project name: {:?}",
                self.project
            )));
        }

        if self.http_client.is_none() && self.token.is_empty() {
            return Err(Error::Config("a bearer token is required".to_string()));
        }

        Ok(())
    }

    fn project_url(&self, path: &str) -> Result<Url> {
        let cluster = self
            .cluster
            .as_ref()
            .map_err(|raw| Error::Config(format!("cluster url does not parse: {raw}")))?;
        let root = cluster.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!(
            "{root}/api/v1/projects/{}/{path}",
            self.project
        ))?)
    }

    /// `models/instances/{endpoint}`; the empty endpoint is apply
    pub(crate) fn instances_url(&self, endpoint: &str) -> Result<Url> {
        match endpoint {
            "" => self.project_url("models/instances"),
            endpoint => self.project_url(&format!("models/instances/{endpoint}")),
        }
    }

    pub(crate) fn graphql_url(&self, data_model: &DataModelId) -> Result<Url> {
        self.project_url(&format!(
            "userapis/spaces/{}/datamodels/{}/versions/{}/graphql",
            data_model.space, data_model.external_id, data_model.version
        ))
    }
}

fn parse_cluster(input: &str) -> std::result::Result<Url, String> {
    let trimmed = input.trim().trim_end_matches('/');
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    match Url::parse(&candidate) {
        Ok(url) if url.has_host() => Ok(url),
        _ => Err(input.to_string()),
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("cluster", &self.cluster)
            .field("project", &self.project)
            .field("client_name", &self.client_name)
            .field("token", &"***")
            .field("timeout", &self.timeout)
            .field("verify_ssl", &self.verify_ssl)
            .field("extra_headers", &self.extra_headers.keys().collect::<Vec<_>>())
            .field("prebuilt_http_client", &self.http_client.is_some())
            .finish_non_exhaustive()
    }
}
