use uuid::Uuid;

use crate::model::CompanyProfile;

/// Produces a fresh etag for `profile`.
///
/// The fingerprint covers the profile content plus a random nonce, so two
/// writes of identical content still yield different etags.
pub fn generate(profile: &CompanyProfile) -> String {
    let mut unstamped = profile.clone();
    unstamped.etag = None;

    let mut material = serde_json::to_vec(&unstamped).unwrap_or_default();
    material.extend_from_slice(Uuid::new_v4().as_bytes());
    Uuid::new_v5(&Uuid::NAMESPACE_OID, &material)
        .simple()
        .to_string()
}
