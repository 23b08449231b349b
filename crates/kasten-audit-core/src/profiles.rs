//! Location profile compliance
//!
//! A cluster only has real backups when at least one location profile exists,
//! and it is only protected against ransomware when one of them exports to an
//! object store with a protection period (object lock).

use kasten_rs::crd::Profile;
use kube::ResourceExt;

/// Result of scanning the profile list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileAudit {
    /// Number of profiles scanned
    pub total: usize,
    pub found_location_profile: bool,
    pub found_immutable: bool,
    /// Profiles whose validation is not "Success", in input order
    pub invalid_profiles: Vec<String>,
}

/// Compliance finding derived from a [`ProfileAudit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileVerdict {
    /// No profile of any kind
    NoProfile,
    /// Profiles exist but none is a location profile
    NoLocationProfile,
    /// Location profiles exist, none immutable
    NotImmutable,
    /// At least one immutable location profile
    Protected,
}

impl ProfileAudit {
    pub fn verdict(&self) -> ProfileVerdict {
        if self.total == 0 {
            ProfileVerdict::NoProfile
        } else if !self.found_location_profile {
            ProfileVerdict::NoLocationProfile
        } else if !self.found_immutable {
            ProfileVerdict::NotImmutable
        } else {
            ProfileVerdict::Protected
        }
    }
}

/// Scan profiles in order
pub fn audit_profiles(profiles: &[Profile]) -> ProfileAudit {
    let mut audit = ProfileAudit {
        total: profiles.len(),
        ..Default::default()
    };

    for profile in profiles {
        if profile.is_location() {
            audit.found_location_profile = true;
            if profile.is_immutable_location() {
                audit.found_immutable = true;
            }
        }
        if !profile.is_valid() {
            audit.invalid_profiles.push(profile.name_any());
        }
    }

    audit
}
