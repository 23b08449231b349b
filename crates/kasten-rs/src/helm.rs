//! Helm release lookup
//!
//! Helm 3 keeps each release revision in a secret labelled
//! `owner=helm,name=<release>,version=<n>,status=<status>`. The `release` key
//! holds base64 text of a gzip compressed JSON document.

use std::io::Read;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::GzDecoder;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use serde::Deserialize;

use crate::error::KastenError;

const RELEASE_DATA_KEY: &str = "release";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Label selector matching every stored revision of a release
pub fn release_selector(release: &str) -> String {
    format!("owner=helm,name={}", release)
}

/// Decoded subset of a Helm release
#[derive(Debug, Clone, Deserialize)]
pub struct HelmRelease {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    pub version: i64,
    #[serde(default)]
    pub info: ReleaseInfo,
    pub chart: Chart,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseInfo {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chart {
    pub metadata: ChartMetadata,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub app_version: String,
}

impl HelmRelease {
    /// Application version declared by the chart
    pub fn app_version(&self) -> &str {
        &self.chart.metadata.app_version
    }
}

/// Pick the revision to report: the highest deployed one, or the highest of
/// any status when nothing is deployed.
pub fn latest_revision(secrets: &[Secret]) -> Option<&Secret> {
    let revision = |s: &Secret| -> i64 {
        s.labels()
            .get("version")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    };
    let is_deployed = |s: &Secret| s.labels().get("status").map(String::as_str) == Some("deployed");

    secrets
        .iter()
        .filter(|s| is_deployed(*s))
        .max_by_key(|s| revision(*s))
        .or_else(|| secrets.iter().max_by_key(|s| revision(*s)))
}

/// Decode the release stored in a helm secret
pub fn decode_release_secret(secret: &Secret) -> Result<HelmRelease, KastenError> {
    let payload = secret
        .data
        .as_ref()
        .and_then(|d| d.get(RELEASE_DATA_KEY))
        .ok_or_else(|| {
            KastenError::ReleaseDecode(format!(
                "secret {} has no {} key",
                secret.name_any(),
                RELEASE_DATA_KEY
            ))
        })?;

    decode_release(&payload.0)
}

/// Decode a release payload (base64 text, optionally gzip compressed JSON)
pub fn decode_release(payload: &[u8]) -> Result<HelmRelease, KastenError> {
    let text: Vec<u8> = payload
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let raw = STANDARD.decode(text)?;

    let json = if raw.starts_with(&GZIP_MAGIC) {
        let mut out = Vec::new();
        GzDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
        out
    } else {
        raw
    };

    Ok(serde_json::from_slice(&json)?)
}
