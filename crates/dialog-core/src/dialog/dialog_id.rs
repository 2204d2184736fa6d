use std::fmt;

use serde::{Deserialize, Serialize};

use sipua_sip_core::Request;

use crate::errors::{DialogError, DialogResult};

/// Dialog identity as seen from this user agent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogId {
    pub call_id: String,
    pub local_tag: String,
    pub remote_tag: String,
}

impl DialogId {
    pub fn new(call_id: impl Into<String>, local_tag: impl Into<String>, remote_tag: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            local_tag: local_tag.into(),
            remote_tag: remote_tag.into(),
        }
    }

    /// Identity of the dialog an inbound request claims to belong to.
    ///
    /// `None` when the To header has no tag, i.e. the request initiates a
    /// dialog. A From header without tag yields an empty remote tag.
    pub fn from_request(request: &Request) -> DialogResult<Option<Self>> {
        let headers = &request.headers;
        let to = headers.address("to").ok_or(DialogError::MissingHeader("To"))?;
        let Some(local_tag) = to.tag() else {
            return Ok(None);
        };
        let call_id = headers.call_id().ok_or(DialogError::MissingHeader("Call-ID"))?;
        let from = headers.address("from").ok_or(DialogError::MissingHeader("From"))?;
        let remote_tag = from.tag().unwrap_or_default();
        Ok(Some(Self::new(call_id, local_tag, remote_tag)))
    }

    /// Key of the storage table holding this dialog.
    ///
    /// A JSON array of the three components, so distinct triples never
    /// collide whatever characters the tags contain.
    pub fn storage_key(&self) -> String {
        serde_json::json!([self.call_id, self.local_tag, self.remote_tag]).to_string()
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.call_id, self.local_tag, self.remote_tag)
    }
}
