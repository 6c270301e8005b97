use std::fmt;

use anyhow::{bail, ensure};
use rand::Rng;
use url::Url;

/// Base address of one backend gateway instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendEndpoint {
    base: Url,
}

impl BackendEndpoint {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let base = Url::parse(s.trim())?;
        match base.scheme() {
            "http" | "https" => {}
            scheme => bail!("unsupported scheme for backend {}: {}", s, scheme),
        }
        ensure!(base.host_str().is_some(), "backend {} has no host", s);
        Ok(BackendEndpoint { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Builds `{base}/webhdfs/v1{path}` keeping the context path of the base address.
    ///
    /// `path` must be absolute.
    pub fn url_for_path(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let context_path = self.base.path().trim_end_matches('/');
        url.set_path(&format!("{}/webhdfs/v1{}", context_path, path));
        url.set_query(None);
        url.set_fragment(None);
        url
    }
}

impl From<Url> for BackendEndpoint {
    fn from(base: Url) -> Self {
        BackendEndpoint { base }
    }
}

impl fmt::Display for BackendEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}

/// Stateless, best-effort load spreading over the configured backends.
///
/// Health is not taken into account: an unreachable backend stays eligible.
#[derive(Debug)]
pub struct BackendSelector {
    endpoints: Vec<BackendEndpoint>,
}

impl BackendSelector {
    pub fn new(endpoints: Vec<BackendEndpoint>) -> anyhow::Result<Self> {
        ensure!(!endpoints.is_empty(), "expected at least one backend");
        Ok(BackendSelector { endpoints })
    }

    pub fn endpoints(&self) -> &[BackendEndpoint] {
        &self.endpoints
    }

    pub fn pick(&self) -> &BackendEndpoint {
        if self.endpoints.len() < 2 {
            return &self.endpoints[0];
        }
        let i = rand::thread_rng().gen_range(0..self.endpoints.len());
        &self.endpoints[i]
    }
}
