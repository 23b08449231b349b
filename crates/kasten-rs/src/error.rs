//! Error types for kasten-rs

use thiserror::Error;

/// Errors that can occur when talking to the cluster or decoding Kasten data
#[derive(Error, Debug)]
pub enum KastenError {
    /// Kubeconfig file could not be read
    #[error("Failed to read kubeconfig {path}: {source}")]
    KubeconfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse kubeconfig YAML
    #[error("Failed to parse kubeconfig: {0}")]
    KubeconfigParse(#[from] serde_yaml::Error),

    /// Kubeconfig was readable but could not be turned into a client config
    #[error("Invalid kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// Neither in-cluster nor kubeconfig configuration could be found
    #[error("Failed to infer cluster config: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    /// Kubernetes API or client construction error
    #[error("K8s API error: {0}")]
    Kube(#[from] kube::Error),

    /// No helm release secret matched the release name
    #[error("Helm release {release} not found in namespace {namespace}")]
    ReleaseNotFound { release: String, namespace: String },

    /// Helm release secret exists but its payload is unusable
    #[error("Failed to decode helm release: {0}")]
    ReleaseDecode(String),

    /// Base64 decoding error
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Release payload is not the JSON we expect
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
