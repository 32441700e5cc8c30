//! Blocking client for the policy authority.
//!
//! `GET api/profile` (with the client identity as a JSON body) lists the
//! policy ids assigned to this machine; `GET api/policy/{id}` returns one
//! policy, or 404 when the authority no longer knows it. There is no retry.

use url::Url;

use gitpolicy_core::{Policy, Profile};

use crate::error::SyncError;
use crate::identity::ClientIdentity;

/// Source of profile and policy documents.
pub trait PolicyApi {
    fn profile(&self) -> Result<Profile, SyncError>;

    /// `Ok(None)` when the authority does not know `id`.
    fn policy(&self, id: &str) -> Result<Option<Policy>, SyncError>;
}

/// [`PolicyApi`] over HTTP(S) using `ureq`.
pub struct HttpPolicyApi {
    base: Url,
    agent: ureq::Agent,
    identity: ClientIdentity,
}

impl HttpPolicyApi {
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        Self::with_identity(base_url, ClientIdentity::create())
    }

    pub fn with_identity(base_url: &str, identity: ClientIdentity) -> Result<Self, SyncError> {
        Ok(Self {
            base: normalize_base(base_url)?,
            agent: ureq::AgentBuilder::new().build(),
            identity,
        })
    }

    fn profile_url(&self) -> Result<Url, SyncError> {
        self.base.join("api/profile").map_err(|source| SyncError::Url {
            url: self.base.to_string(),
            source,
        })
    }

    fn policy_url(&self, id: &str) -> Result<Url, SyncError> {
        let mut url = self.base.join("api/policy/").map_err(|source| SyncError::Url {
            url: self.base.to_string(),
            source,
        })?;
        // normalize_base rejects cannot-be-a-base URLs, so segments are available.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id);
        }
        Ok(url)
    }
}

impl PolicyApi for HttpPolicyApi {
    fn profile(&self) -> Result<Profile, SyncError> {
        let url = self.profile_url()?;
        tracing::debug!(url = %url, "fetching profile");

        let response = self
            .agent
            .get(url.as_str())
            .send_json(&self.identity)
            .map_err(|source| SyncError::Http {
                message: "failed to get profile information".to_string(),
                source: Box::new(source),
            })?;

        response
            .into_json::<Profile>()
            .map_err(|source| SyncError::Json {
                message: "failed to parse profile".to_string(),
                source,
            })
    }

    fn policy(&self, id: &str) -> Result<Option<Policy>, SyncError> {
        let url = self.policy_url(id)?;
        tracing::debug!(url = %url, policy = id, "fetching policy");

        match self.agent.get(url.as_str()).call() {
            Ok(response) => response
                .into_json::<Policy>()
                .map(Some)
                .map_err(|source| SyncError::Json {
                    message: format!("failed to parse policy '{id}'"),
                    source,
                }),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(source) => Err(SyncError::Http {
                message: format!("failed to get policy information for '{id}'"),
                source: Box::new(source),
            }),
        }
    }
}

/// Parse `base_url` and make sure relative joins extend its path instead of
/// replacing the last segment.
fn normalize_base(base_url: &str) -> Result<Url, SyncError> {
    let mut url = Url::parse(base_url).map_err(|source| SyncError::Url {
        url: base_url.to_string(),
        source,
    })?;
    if url.cannot_be_a_base() {
        return Err(SyncError::Url {
            url: base_url.to_string(),
            source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
        });
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
