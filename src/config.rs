//! Process configuration: listen port and static-asset location.
//!
//! Defaults can be overridden in code with the `with_*` builders, and the port
//! from the environment with [`Config::from_env`].

use std::env;
use std::path::PathBuf;

use tracing::warn;

/// Port used when neither code nor `PORT` sets one.
pub const DEFAULT_PORT: u16 = 800;

/// Server configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub port: u16,
    /// `None` disables the static-asset fallback.
    pub assets: Option<AssetsConfig>,
}

/// Where static assets live on disk and under which URL they are served.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetsConfig {
    pub folder: PathBuf,
    /// URL pattern, e.g. `"/assets/*"`. A route without the `/*` tail is
    /// treated as if it had one.
    pub route: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self { folder: PathBuf::from("./assets"), route: "/assets/*".to_owned() }
    }
}

impl AssetsConfig {
    /// The URL prefix requests must start with: the route minus its trailing
    /// `*`, always ending in `/` so `/static` never claims `/staticfoo`.
    pub fn prefix(&self) -> String {
        let base = self.route.strip_suffix('*').unwrap_or(&self.route);
        if base.ends_with('/') {
            base.to_owned()
        } else {
            format!("{base}/")
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { port: DEFAULT_PORT, assets: Some(AssetsConfig::default()) }
    }
}

impl Config {
    /// Defaults, with `PORT` applied if set.
    pub fn from_env() -> Self {
        Self::default().with_env_port(env::var("PORT").ok().as_deref())
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_assets(mut self, folder: impl Into<PathBuf>, route: impl Into<String>) -> Self {
        self.assets = Some(AssetsConfig { folder: folder.into(), route: route.into() });
        self
    }

    pub fn without_assets(mut self) -> Self {
        self.assets = None;
        self
    }

    fn with_env_port(self, raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => self,
            Some(raw) => match raw.parse() {
                Ok(port) => self.with_port(port),
                Err(e) => {
                    warn!(value = raw, "ignoring invalid PORT: {e}");
                    self
                }
            },
        }
    }
}
