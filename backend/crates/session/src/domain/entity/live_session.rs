//! Live-Session Descriptor Entity
//!
//! Short-lived, client-held claim that a container is serving the user's
//! session at a given set of endpoints. Travels as six cookies and is
//! worthless unless the signature checks out and the registry agrees.

use platform::cookie::CookieUpdate;
use platform::crypto::Signer;

use crate::domain::entity::container::ContainerRecord;
use crate::domain::value_object::{endpoint_markers::EndpointMarkers, session_name::SessionName};
use crate::error::{SessionError, SessionResult};

pub const SESSION_NAME_COOKIE: &str = "sessname";
pub const SHELL_COOKIE: &str = "hostshell";
pub const UPLOAD_COOKIE: &str = "hostupload";
pub const IPYNB_COOKIE: &str = "hostipnb";
pub const SIGNATURE_COOKIE: &str = "sign";
pub const LOADING_COOKIE: &str = "loading";

/// Every cookie that makes up a descriptor, in clearing order
pub const CONTAINER_COOKIES: [&str; 6] = [
    SESSION_NAME_COOKIE,
    SHELL_COOKIE,
    UPLOAD_COOKIE,
    IPYNB_COOKIE,
    SIGNATURE_COOKIE,
    LOADING_COOKIE,
];

/// Raw cookie values as read off a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorFields {
    pub sessname: Option<String>,
    pub hostshell: Option<String>,
    pub hostupload: Option<String>,
    pub hostipnb: Option<String>,
    pub sign: Option<String>,
    pub loading: Option<String>,
}

impl DescriptorFields {
    /// True when the request carries no descriptor at all
    pub fn is_empty(&self) -> bool {
        self.sessname.is_none()
            && self.hostshell.is_none()
            && self.hostupload.is_none()
            && self.hostipnb.is_none()
            && self.sign.is_none()
            && self.loading.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSessionDescriptor {
    session_name: SessionName,
    markers: EndpointMarkers,
    loading: bool,
    signature: String,
}

fn loading_flag(loading: bool) -> &'static str {
    if loading { "1" } else { "0" }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> SessionResult<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| SessionError::MalformedInput(format!("missing {name} cookie")))
}

impl LiveSessionDescriptor {
    /// Sign a descriptor for the given endpoints
    pub fn build(
        session_name: SessionName,
        markers: EndpointMarkers,
        loading: bool,
        signer: &Signer,
    ) -> Self {
        let signature = Self::sign(&session_name, &markers, loading, signer);
        Self {
            session_name,
            markers,
            loading,
            signature,
        }
    }

    /// Placeholder descriptor handed out while the container starts
    pub fn loading(session_name: SessionName, signer: &Signer) -> Self {
        Self::build(session_name, EndpointMarkers::loading(), true, signer)
    }

    /// Ready descriptor carrying the registry's endpoints
    pub fn ready_for(record: &ContainerRecord, signer: &Signer) -> Self {
        Self::build(record.name.clone(), record.markers.clone(), false, signer)
    }

    fn sign(
        session_name: &SessionName,
        markers: &EndpointMarkers,
        loading: bool,
        signer: &Signer,
    ) -> String {
        let [shell, upload, ipynb] = markers.as_array();
        signer.sign_parts(&[
            session_name.as_str(),
            shell,
            upload,
            ipynb,
            loading_flag(loading),
        ])
    }

    /// Reassemble a descriptor from request cookies.
    ///
    /// Any missing or ill-formed field makes the whole descriptor malformed.
    pub fn from_fields(fields: &DescriptorFields) -> SessionResult<Self> {
        let raw_name = required(&fields.sessname, SESSION_NAME_COOKIE)?;
        let session_name = SessionName::parse(raw_name)
            .ok_or_else(|| SessionError::MalformedInput("bad session name".into()))?;

        let markers = EndpointMarkers::new(
            required(&fields.hostshell, SHELL_COOKIE)?,
            required(&fields.hostupload, UPLOAD_COOKIE)?,
            required(&fields.hostipnb, IPYNB_COOKIE)?,
        );
        if !markers.as_array().iter().all(|m| EndpointMarkers::is_well_formed(m)) {
            return Err(SessionError::MalformedInput("bad endpoint marker".into()));
        }

        let loading = match required(&fields.loading, LOADING_COOKIE)? {
            "1" => true,
            "0" => false,
            other => {
                return Err(SessionError::MalformedInput(format!(
                    "bad loading flag {other:?}"
                )));
            }
        };

        let signature = required(&fields.sign, SIGNATURE_COOKIE)?.to_string();

        Ok(Self {
            session_name,
            markers,
            loading,
            signature,
        })
    }

    pub fn verify_signature(&self, signer: &Signer) -> SessionResult<()> {
        let [shell, upload, ipynb] = self.markers.as_array();
        let parts = [
            self.session_name.as_str(),
            shell,
            upload,
            ipynb,
            loading_flag(self.loading),
        ];
        if signer.verify_parts(&parts, &self.signature) {
            Ok(())
        } else {
            Err(SessionError::SignatureMismatch)
        }
    }

    /// Claimed endpoints equal what the registry holds
    pub fn matches_record(&self, record: &ContainerRecord) -> bool {
        record.name == self.session_name && record.markers == self.markers
    }

    /// Cookie writes that hand this descriptor to the client
    pub fn to_cookie_updates(&self, max_age_secs: i64) -> Vec<CookieUpdate> {
        let [shell, upload, ipynb] = self.markers.as_array();
        let max_age = Some(max_age_secs);
        vec![
            CookieUpdate::set(SESSION_NAME_COOKIE, self.session_name.as_str(), max_age),
            CookieUpdate::set(SHELL_COOKIE, shell, max_age),
            CookieUpdate::set(UPLOAD_COOKIE, upload, max_age),
            CookieUpdate::set(IPYNB_COOKIE, ipynb, max_age),
            CookieUpdate::set(LOADING_COOKIE, loading_flag(self.loading), max_age),
            CookieUpdate::set(SIGNATURE_COOKIE, &self.signature, max_age),
        ]
    }

    /// Cookie writes that drop any descriptor the client holds
    pub fn clear_cookie_updates() -> Vec<CookieUpdate> {
        CONTAINER_COOKIES.iter().map(|n| CookieUpdate::clear(*n)).collect()
    }

    pub fn session_name(&self) -> &SessionName {
        &self.session_name
    }

    pub fn markers(&self) -> &EndpointMarkers {
        &self.markers
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }
}
