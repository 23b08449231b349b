//! Kasten `Profile` custom resource (`config.kio.kasten.io/v1alpha1`)

use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Profile type carried by location profiles
pub const LOCATION_PROFILE_TYPE: &str = "Location";
/// Location type of object store backed profiles
pub const OBJECT_STORE_LOCATION_TYPE: &str = "ObjectStore";
/// Validation status reported by K10 for a usable profile
pub const VALIDATION_SUCCESS: &str = "Success";

/// Backup location or infrastructure profile
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[kube(
    group = "config.kio.kasten.io",
    version = "v1alpha1",
    kind = "Profile",
    plural = "profiles",
    status = "ProfileStatus",
    schema = "disabled",
    derive = "PartialEq",
    namespaced
)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileSpec {
    /// Profile kind, e.g. "Location" or "Infra"
    #[serde(rename = "type")]
    pub type_: String,
    pub location_spec: LocationSpec,
    pub infra: Infra,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LocationSpec {
    pub credential: Credential,
    pub location: Location,
    pub infra_portable: bool,
}

/// Where backups are exported to
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Location {
    /// "ObjectStore", "FileStore" or "VBR"
    pub location_type: String,
    pub object_store: ObjectStore,
    pub file_store: FileStore,
    pub vbr: Vbr,
}

impl Location {
    /// The object store of this location, when it is one
    pub fn as_object_store(&self) -> Option<&ObjectStore> {
        (self.location_type == OBJECT_STORE_LOCATION_TYPE).then_some(&self.object_store)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectStore {
    pub object_store_type: String,
    pub endpoint: String,
    #[serde(rename = "skipSSLVerify")]
    pub skip_ssl_verify: bool,
    pub name: String,
    pub region: String,
    pub path: String,
    pub path_type: String,
    /// Object lock retention window; empty when the bucket is not immutable
    pub protection_period: String,
}

impl ObjectStore {
    pub fn is_immutable(&self) -> bool {
        !self.protection_period.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FileStore {
    pub claim_name: String,
    pub path: String,
}

/// Veeam Backup & Replication repository
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Vbr {
    pub server_address: String,
    pub server_port: String,
    pub repo_name: String,
    pub repo_id: String,
    #[serde(rename = "skipSSLVerify")]
    pub skip_ssl_verify: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Infra {
    #[serde(rename = "type")]
    pub type_: String,
    pub open_stack: OpenStack,
    pub azure: Azure,
    pub portworx: Portworx,
    pub vsphere: Vsphere,
    pub credential: Credential,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct OpenStack {
    pub keystone_endpoint: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Azure {
    #[serde(rename = "ADEndpoint")]
    pub ad_endpoint: String,
    #[serde(rename = "ADResource")]
    pub ad_resource: String,
    pub cloud_env: String,
    pub credential_type: String,
    pub resource_group: String,
    pub resource_manager_endpoint: String,
    #[serde(rename = "subscriptionID")]
    pub subscription_id: String,
    #[serde(rename = "useDefaultMSI")]
    pub use_default_msi: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Portworx {
    pub namespace: String,
    pub service_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Vsphere {
    pub server_address: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Credential {
    pub secret_type: String,
    pub secret: SecretReference,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SecretReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

/// Validation result written by K10
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileStatus {
    pub validation: String,
    pub hash: i64,
    pub error: Vec<String>,
}

impl Profile {
    pub fn is_location(&self) -> bool {
        self.spec.type_ == LOCATION_PROFILE_TYPE
    }

    /// Location profile exporting to an object store with a protection period
    pub fn is_immutable_location(&self) -> bool {
        self.is_location()
            && self
                .spec
                .location_spec
                .location
                .as_object_store()
                .is_some_and(ObjectStore::is_immutable)
    }

    /// Validation status string, empty when K10 has not reported one yet
    pub fn validation(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.validation.as_str())
            .unwrap_or("")
    }

    pub fn is_valid(&self) -> bool {
        self.validation() == VALIDATION_SUCCESS
    }
}
