//! Kubernetes client for the audit
//!
//! Resolves the cluster connection (in-cluster or kubeconfig) and exposes the
//! handful of read-only listings the audit needs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use k8s_openapi::api::core::v1::{Namespace, Node, PersistentVolumeClaim, Pod, Secret};
use k8s_openapi::apimachinery::pkg::version::Info;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{
    Client, Config,
    api::{Api, ListParams},
};

use crate::crd::{BackupAction, Profile};
use crate::error::KastenError;
use crate::helm::{self, HelmRelease};

/// How the cluster connection was configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Service account of the pod the audit runs in
    InCluster,
    /// Kubeconfig file (explicit path or default location)
    Kubeconfig,
}

/// Options controlling where the cluster config comes from
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Explicit kubeconfig path
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to use instead of the current one
    pub context: Option<String>,
    /// Read timeout applied to every API request
    pub timeout: Option<Duration>,
}

impl ConnectOptions {
    fn kubeconfig_options(&self) -> KubeConfigOptions {
        KubeConfigOptions {
            context: self.context.clone(),
            ..Default::default()
        }
    }
}

/// Parse a kubeconfig file
pub fn load_kubeconfig(path: &Path) -> Result<Kubeconfig, KastenError> {
    let yaml = std::fs::read_to_string(path).map_err(|source| KastenError::KubeconfigRead {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_yaml::from_str(&yaml)?)
}

/// Resolve the client config
///
/// An explicit kubeconfig or context always wins. Otherwise the in-cluster
/// service account is tried first and the default kubeconfig is the fallback.
pub async fn resolve_config(opts: &ConnectOptions) -> Result<(Config, ConfigSource), KastenError> {
    let (mut config, source) = if let Some(path) = &opts.kubeconfig {
        tracing::debug!("Loading kubeconfig from {}", path.display());
        let kubeconfig = load_kubeconfig(path)?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &opts.kubeconfig_options()).await?;
        (config, ConfigSource::Kubeconfig)
    } else if opts.context.is_some() {
        let config = Config::from_kubeconfig(&opts.kubeconfig_options()).await?;
        (config, ConfigSource::Kubeconfig)
    } else {
        match Config::incluster() {
            Ok(config) => (config, ConfigSource::InCluster),
            Err(e) => {
                tracing::debug!("In-cluster config unavailable: {}", e);
                let config = Config::from_kubeconfig(&opts.kubeconfig_options()).await?;
                (config, ConfigSource::Kubeconfig)
            }
        }
    };

    if let Some(timeout) = opts.timeout {
        config.read_timeout = Some(timeout);
    }

    Ok((config, source))
}

/// Read-only access to the resources the audit inspects
#[derive(Clone)]
pub struct KastenClient {
    client: Client,
}

impl KastenClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolve the config and build a client from it
    pub async fn connect(opts: &ConnectOptions) -> Result<(Self, ConfigSource), KastenError> {
        let (config, source) = resolve_config(opts).await?;
        tracing::debug!("Connecting to {} ({:?})", config.cluster_url, source);
        let client = Client::try_from(config)?;
        Ok((Self::new(client), source))
    }

    pub async fn server_version(&self) -> Result<Info, KastenError> {
        Ok(self.client.apiserver_version().await?)
    }

    pub async fn nodes(&self) -> Result<Vec<Node>, KastenError> {
        let api: Api<Node> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    pub async fn namespaces(&self) -> Result<Vec<Namespace>, KastenError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    /// Whether a namespace exists; any error other than not-found is returned
    pub async fn namespace_exists(&self, name: &str) -> Result<bool, KastenError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?.is_some())
    }

    pub async fn pods(&self, namespace: &str) -> Result<Vec<Pod>, KastenError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }

    /// PVCs across all namespaces
    pub async fn persistent_volume_claims(&self) -> Result<Vec<PersistentVolumeClaim>, KastenError> {
        let api: Api<PersistentVolumeClaim> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    pub async fn profiles(&self, namespace: &str) -> Result<Vec<Profile>, KastenError> {
        let api: Api<Profile> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }

    pub async fn backup_actions(&self, namespace: &str) -> Result<Vec<BackupAction>, KastenError> {
        let api: Api<BackupAction> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }

    /// Fetch and decode the current revision of a Helm release
    pub async fn helm_release(
        &self,
        namespace: &str,
        release: &str,
    ) -> Result<HelmRelease, KastenError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(&helm::release_selector(release));
        let secrets = api.list(&params).await?.items;
        tracing::debug!(
            "Found {} helm secrets for release {} in {}",
            secrets.len(),
            release,
            namespace
        );

        let secret = helm::latest_revision(&secrets).ok_or_else(|| KastenError::ReleaseNotFound {
            release: release.to_string(),
            namespace: namespace.to_string(),
        })?;
        helm::decode_release_secret(secret)
    }
}
