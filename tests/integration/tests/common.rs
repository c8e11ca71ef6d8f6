//! Common test utilities and fixtures.

use fl_core::config::ProviderConfig;
use fl_core::Config;
use fl_protocol_saml::endpoints::SpState;
use fl_registry::RegistrySet;
use fl_server::{AppState, Server};
use reqwest::Client;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Token type served by the test provider.
pub const TOKEN_TYPE: &str = "urn:ferrolink:test";

/// A running server and a client for it.
pub struct TestEnv {
    /// Base URL of the running server.
    pub base_url: String,
    /// HTTP client that does not follow redirects.
    pub client: Client,
    /// Registries the server works against.
    pub registries: RegistrySet,
    /// SP endpoint state shared with the server.
    pub sp: SpState,
    _shutdown_tx: oneshot::Sender<()>,
}

impl TestEnv {
    /// Starts a server with the default test configuration.
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(test_config()).await
    }

    /// Starts a server with `config` over in-memory registries.
    pub async fn with_config(config: Config) -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("fl_server=debug,fl_sts=debug,fl_protocol_saml=debug")
            .with_test_writer()
            .try_init();

        let registries = RegistrySet::memory();
        let state = AppState::build(config, registries.clone())?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let sp = state.sp.clone();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = Server::with_state(state).serve(listener, shutdown).await {
                eprintln!("server error: {e}");
            }
        });

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            base_url,
            client,
            registries,
            sp,
            _shutdown_tx: shutdown_tx,
        })
    }

    /// Returns the absolute URL of `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Test configuration: one `saml2` provider for [`TOKEN_TYPE`].
pub fn test_config() -> Config {
    let mut config = Config::for_testing();
    config.sp.service_url = "http://sp.example.com/saml/sp".to_string();
    config.sts.providers.push(ProviderConfig {
        kind: "saml2".to_string(),
        token_type: Some(TOKEN_TYPE.to_string()),
        ..ProviderConfig::default()
    });
    config
}

/// Returns the `name=value` part of a `Set-Cookie` header.
pub fn cookie_of(response: &reqwest::Response) -> Option<String> {
    let header = response.headers().get(reqwest::header::SET_COOKIE)?.to_str().ok()?;
    header.split(';').next().map(str::to_string)
}
