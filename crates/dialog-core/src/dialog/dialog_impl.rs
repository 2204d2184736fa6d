//! Dialog implementation for RFC 3261 SIP dialogs
//!
//! A [`Dialog`] is created by the UAS side from a dialog-establishing
//! request and persisted as a flat field map (see [`Dialog::to_fields`]).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sipua_sip_core::{AddressHeader, CSeqHeader, HeaderValue, Method, Request, Uri, ViaHeader};
use sipua_sip_transport::Interface;

use super::dialog_id::DialogId;
use crate::errors::{DialogError, DialogResult, StorageError};

const DEFAULT_MAX_FORWARDS: u32 = 70;

pub(crate) const FIELD_CALL_ID: &str = "call_id";
pub(crate) const FIELD_LOCAL_TAG: &str = "local_tag";
pub(crate) const FIELD_REMOTE_TAG: &str = "remote_tag";
pub(crate) const FIELD_LOCAL_CSEQ: &str = "local_cseq";
pub(crate) const FIELD_REMOTE_CSEQ: &str = "remote_cseq";
pub(crate) const FIELD_LOCAL_URI: &str = "local_uri";
pub(crate) const FIELD_REMOTE_URI: &str = "remote_uri";
pub(crate) const FIELD_LOCAL_TARGET: &str = "local_target_uri";
pub(crate) const FIELD_REMOTE_TARGET: &str = "remote_target_uri";
pub(crate) const FIELD_ROUTE_SET: &str = "route_set";

/// A SIP dialog as defined in RFC 3261
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    pub id: DialogId,

    /// Sequence number of the last request sent in this dialog
    pub local_cseq: u32,

    /// Sequence number of the last request accepted from the peer
    pub remote_cseq: u32,

    pub local_uri: Uri,
    pub remote_uri: Uri,

    /// Where the peer sends its requests (our Contact)
    pub local_target: Uri,

    /// Where we send our requests (the peer's Contact)
    pub remote_target: Uri,

    /// Record-Route values in header order
    pub route_set: Vec<AddressHeader>,
}

impl Dialog {
    /// Creates the UAS side of a dialog from a dialog-establishing request.
    ///
    /// `local_tag` is the To tag this UA answers with. The request must
    /// carry a From tag and a Contact; otherwise the peer gets a 400.
    pub fn from_request(request: &Request, local_tag: &str, interface: &Interface) -> DialogResult<Self> {
        let headers = &request.headers;
        let call_id = headers.call_id().ok_or(DialogError::MissingHeader("Call-ID"))?;
        let to = headers.address("to").ok_or(DialogError::MissingHeader("To"))?;
        let from = headers.address("from").ok_or(DialogError::MissingHeader("From"))?;
        let cseq = headers.cseq().ok_or(DialogError::MissingHeader("CSeq"))?;

        let remote_tag = from
            .tag()
            .ok_or_else(|| DialogError::protocol(400, "Missing From tag"))?;
        let remote_target = headers
            .get_first("contact")
            .and_then(HeaderValue::as_address)
            .map(|contact| contact.uri.clone())
            .ok_or_else(|| DialogError::protocol(400, "Missing Contact"))?;

        let route_set = headers
            .get_all("record-route")
            .iter()
            .filter_map(HeaderValue::as_address)
            .cloned()
            .collect();

        let dialog = Dialog {
            id: DialogId::new(call_id, local_tag, remote_tag),
            local_cseq: 0,
            remote_cseq: cseq.number,
            local_uri: to.uri.clone(),
            remote_uri: from.uri.clone(),
            local_target: interface.sip_uri(),
            remote_target,
            route_set,
        };
        debug!("Created dialog {} from {} request", dialog.id, request.method);
        Ok(dialog)
    }

    /// Flat field map stored under [`DialogId::storage_key`]
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let route_set: Vec<String> = self.route_set.iter().map(ToString::to_string).collect();
        vec![
            (FIELD_CALL_ID.to_string(), self.id.call_id.clone()),
            (FIELD_LOCAL_TAG.to_string(), self.id.local_tag.clone()),
            (FIELD_REMOTE_TAG.to_string(), self.id.remote_tag.clone()),
            (FIELD_LOCAL_CSEQ.to_string(), self.local_cseq.to_string()),
            (FIELD_REMOTE_CSEQ.to_string(), self.remote_cseq.to_string()),
            (FIELD_LOCAL_URI.to_string(), self.local_uri.to_string()),
            (FIELD_REMOTE_URI.to_string(), self.remote_uri.to_string()),
            (FIELD_LOCAL_TARGET.to_string(), self.local_target.to_string()),
            (FIELD_REMOTE_TARGET.to_string(), self.remote_target.to_string()),
            (FIELD_ROUTE_SET.to_string(), serde_json::Value::from(route_set).to_string()),
        ]
    }

    /// Rebuilds a dialog from its stored field map
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, StorageError> {
        let field = |name: &str| {
            fields
                .get(name)
                .map(String::as_str)
                .ok_or_else(|| StorageError::NotFound(format!("dialog field '{}'", name)))
        };
        let invalid = |name: &str, reason: String| StorageError::InvalidValue {
            key: name.to_string(),
            reason,
        };
        let number = |name: &str| -> Result<u32, StorageError> {
            field(name)?.parse().map_err(|e| invalid(name, format!("{}", e)))
        };
        let uri = |name: &str| -> Result<Uri, StorageError> {
            field(name)?.parse().map_err(|e| invalid(name, format!("{}", e)))
        };

        let routes: Vec<String> = serde_json::from_str(field(FIELD_ROUTE_SET)?)
            .map_err(|e| invalid(FIELD_ROUTE_SET, e.to_string()))?;
        let route_set = routes
            .iter()
            .map(|route| route.parse::<AddressHeader>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| invalid(FIELD_ROUTE_SET, e.to_string()))?;

        Ok(Dialog {
            id: DialogId::new(field(FIELD_CALL_ID)?, field(FIELD_LOCAL_TAG)?, field(FIELD_REMOTE_TAG)?),
            local_cseq: number(FIELD_LOCAL_CSEQ)?,
            remote_cseq: number(FIELD_REMOTE_CSEQ)?,
            local_uri: uri(FIELD_LOCAL_URI)?,
            remote_uri: uri(FIELD_REMOTE_URI)?,
            local_target: uri(FIELD_LOCAL_TARGET)?,
            remote_target: uri(FIELD_REMOTE_TARGET)?,
            route_set,
        })
    }

    /// Builds an in-dialog request.
    ///
    /// The CSeq is `local_cseq + 1`; the user agent replaces it with the
    /// stored counter when the request is sent. The Via is left unfilled
    /// for the transport.
    pub fn create_request(&self, method: Method) -> Request {
        let mut request = Request::new(method.clone(), self.remote_target.clone());
        let headers = &mut request.headers;

        headers.append("via", ViaHeader::default());
        if !self.route_set.is_empty() {
            headers.insert_all("route", self.route_set.iter().cloned().map(HeaderValue::Address).collect());
        }
        headers.insert("max-forwards", DEFAULT_MAX_FORWARDS.to_string());
        headers.insert(
            "from",
            AddressHeader::new(self.local_uri.clone()).with_tag(self.id.local_tag.clone()),
        );
        let mut to = AddressHeader::new(self.remote_uri.clone());
        if !self.id.remote_tag.is_empty() {
            to.set_tag(self.id.remote_tag.clone());
        }
        headers.insert("to", to);
        headers.insert("call-id", self.id.call_id.clone());
        headers.insert("cseq", CSeqHeader::new(self.local_cseq.wrapping_add(1), method));
        headers.append("contact", AddressHeader::new(self.local_target.clone()));
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sipua_sip_core::Message;

    const INVITE: &str = "INVITE sip:bob@biloxi.com SIP/2.0\r\n\
        Via: SIP/2.0/UDP server10.biloxi.com;branch=z9hG4bK4b43c2ff8.1\r\n\
        Via: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bK776asdhds\r\n\
        Max-Forwards: 69\r\n\
        Record-Route: <sip:server10.biloxi.com;lr>, <sip:bigbox3.site3.atlanta.com;lr>\r\n\
        To: Bob <sip:bob@biloxi.com>\r\n\
        From: Alice <sip:alice@atlanta.com>;tag=1928301774\r\n\
        Call-ID: a84b4c76e66710@pc33.atlanta.com\r\n\
        CSeq: 314159 INVITE\r\n\
        Contact: <sip:alice@pc33.atlanta.com>\r\n\r\n";

    fn invite() -> Request {
        match Message::parse(INVITE.as_bytes()).unwrap() {
            Message::Request(request) => request,
            Message::Response(_) => panic!("expected a request"),
        }
    }

    fn interface() -> Interface {
        Interface::new("192.0.2.4", 5060, "UDP")
    }

    #[test]
    fn test_from_request() {
        let dialog = Dialog::from_request(&invite(), "a6c85cf", &interface()).unwrap();
        assert_eq!(dialog.id, DialogId::new("a84b4c76e66710@pc33.atlanta.com", "a6c85cf", "1928301774"));
        assert_eq!(dialog.local_cseq, 0);
        assert_eq!(dialog.remote_cseq, 314159);
        assert_eq!(dialog.local_uri.to_string(), "sip:bob@biloxi.com");
        assert_eq!(dialog.remote_uri.to_string(), "sip:alice@atlanta.com");
        assert_eq!(dialog.local_target.to_string(), "sip:192.0.2.4:5060;transport=UDP");
        assert_eq!(dialog.remote_target.to_string(), "sip:alice@pc33.atlanta.com");
        let routes: Vec<_> = dialog.route_set.iter().map(ToString::to_string).collect();
        assert_eq!(routes, vec!["<sip:server10.biloxi.com;lr>", "<sip:bigbox3.site3.atlanta.com;lr>"]);
    }

    #[test]
    fn test_from_request_requires_from_tag_and_contact() {
        let mut request = invite();
        request.headers.remove("contact");
        let err = Dialog::from_request(&request, "x", &interface()).unwrap_err();
        assert!(matches!(err, DialogError::Protocol { code: 400, .. }));

        let mut request = invite();
        request
            .headers
            .insert("from", "<sip:alice@atlanta.com>".parse::<AddressHeader>().unwrap());
        let err = Dialog::from_request(&request, "x", &interface()).unwrap_err();
        assert!(matches!(err, DialogError::Protocol { code: 400, .. }));
    }

    #[test]
    fn test_fields_round_trip() {
        let dialog = Dialog::from_request(&invite(), "a6c85cf", &interface()).unwrap();
        let fields: HashMap<_, _> = dialog.to_fields().into_iter().collect();
        assert_eq!(fields[FIELD_ROUTE_SET], r#"["<sip:server10.biloxi.com;lr>","<sip:bigbox3.site3.atlanta.com;lr>"]"#);
        assert_eq!(Dialog::from_fields(&fields).unwrap(), dialog);
    }

    #[test]
    fn test_from_fields_reports_bad_values() {
        let dialog = Dialog::from_request(&invite(), "a6c85cf", &interface()).unwrap();
        let mut fields: HashMap<_, _> = dialog.to_fields().into_iter().collect();
        fields.insert(FIELD_REMOTE_CSEQ.to_string(), "many".to_string());
        assert!(matches!(Dialog::from_fields(&fields), Err(StorageError::InvalidValue { .. })));
        fields.remove(FIELD_REMOTE_CSEQ);
        assert!(matches!(Dialog::from_fields(&fields), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_create_request() {
        let mut dialog = Dialog::from_request(&invite(), "a6c85cf", &interface()).unwrap();
        dialog.local_cseq = 7;
        let request = dialog.create_request(Method::Bye);

        assert_eq!(request.method, Method::Bye);
        assert_eq!(request.uri.to_string(), "sip:alice@pc33.atlanta.com");
        assert_eq!(request.headers.get_all("route").len(), 2);
        assert_eq!(request.headers.address("from").and_then(|f| f.tag()), Some("a6c85cf"));
        assert_eq!(request.headers.address("to").and_then(|t| t.tag()), Some("1928301774"));
        assert_eq!(request.headers.cseq(), Some(&CSeqHeader::new(8, Method::Bye)));
        assert_eq!(request.headers.max_forwards(), Some(70));
        assert!(!request.headers.top_via().unwrap().is_filled());
        assert!(request.validate().is_ok());
    }
}
