//! SIP requests, responses and whole-message framing
//!
//! A message is a start line, a header block, an empty line and an optional
//! body. `Content-Length` is always written on render from the body length.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::header::name::{REQUEST_MANDATORY_HEADERS, normalize};
use crate::header::via::DEFAULT_VERSION;
use crate::headers::Headers;
use crate::method::Method;
use crate::uri::Uri;

/// Headers a response copies from the request it answers, in order
const RESPONSE_COPIED_HEADERS: &[&str] = &["via", "from", "to", "call-id", "cseq"];

/// Default reason phrase for a status code
pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        100 => "Trying",
        180 => "Ringing",
        181 => "Call Is Being Forwarded",
        183 => "Session Progress",
        200 => "OK",
        202 => "Accepted",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        420 => "Bad Extension",
        481 => "Call/Transaction Does Not Exist",
        486 => "Busy Here",
        487 => "Request Terminated",
        488 => "Not Acceptable Here",
        500 => "Server Internal Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        600 => "Busy Everywhere",
        603 => "Decline",
        _ => "Unknown",
    }
}

/// A SIP request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub version: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Request {
            method,
            uri,
            version: DEFAULT_VERSION.to_string(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Checks the headers every request must carry.
    pub fn validate(&self) -> Result<()> {
        match REQUEST_MANDATORY_HEADERS
            .iter()
            .find(|name| !self.headers.contains(**name))
        {
            Some(missing) => Err(Error::MissingHeader(normalize(missing))),
            None => Ok(()),
        }
    }

    /// Builds a response copying Via, From, To, Call-ID and CSeq.
    pub fn create_response(&self, code: u16, reason: Option<&str>) -> Response {
        let mut response = Response::new(code, reason);
        for name in RESPONSE_COPIED_HEADERS {
            if let Some(entry) = self.headers.get(*name) {
                response.headers.insert_all(*name, entry.values().to_vec());
            }
        }
        response.headers.set_compact(self.headers.is_compact());
        response
    }
}

impl Request {
    /// Wire encoding of the request
    pub fn to_bytes(&self) -> Bytes {
        encode(
            format_args!("{} {} {}", self.method, self.uri, self.version),
            &self.headers,
            &self.body,
        )
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

/// A SIP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub version: String,
    pub code: u16,
    pub reason: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    /// Creates a response, using the default reason phrase when none is given
    pub fn new(code: u16, reason: Option<&str>) -> Self {
        Response {
            version: DEFAULT_VERSION.to_string(),
            code,
            reason: reason.unwrap_or_else(|| reason_phrase(code)).to_string(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    pub fn is_provisional(&self) -> bool {
        self.code < 200
    }

    pub fn is_final(&self) -> bool {
        self.code >= 200
    }
}

impl Response {
    /// Wire encoding of the response
    pub fn to_bytes(&self) -> Bytes {
        encode(
            format_args!("{} {} {}", self.version, self.code, self.reason),
            &self.headers,
            &self.body,
        )
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

/// Start line, headers with a fresh Content-Length, blank line, body
fn encode(start: fmt::Arguments<'_>, headers: &Headers, body: &Bytes) -> Bytes {
    let mut headers = headers.clone();
    headers.remove("content-length");
    headers.insert("content-length", body.len().to_string());
    let mut out = format!("{}\r\n{}\r\n\r\n", start, headers).into_bytes();
    out.extend_from_slice(body);
    Bytes::from(out)
}

/// A SIP message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    /// Parses a complete message.
    ///
    /// The body is cut to `Content-Length` when present; a declared length
    /// longer than the available data is an error.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (head, body) = split_head(data)?;
        let head = std::str::from_utf8(head)
            .map_err(|_| Error::InvalidMessage("header section is not UTF-8".to_string()))?;
        let head = head.trim_start_matches(['\r', '\n']);
        let (start_line, block) = head.split_once('\n').unwrap_or((head, ""));
        let start_line = start_line.trim_end_matches('\r');
        let headers = Headers::parse(block)?;

        let body = match headers.content_length() {
            Some(len) if len > body.len() => {
                return Err(Error::InvalidMessage(format!(
                    "Content-Length {} exceeds body of {} bytes",
                    len,
                    body.len()
                )));
            }
            Some(len) => Bytes::copy_from_slice(&body[..len]),
            None => Bytes::copy_from_slice(body),
        };

        if start_line.starts_with("SIP/") {
            let mut parts = start_line.splitn(3, ' ');
            let version = parts.next().unwrap_or_default();
            let code = parts
                .next()
                .and_then(|c| c.parse::<u16>().ok())
                .filter(|c| (100..700).contains(c))
                .ok_or_else(|| Error::InvalidMessage(format!("invalid status line {:?}", start_line)))?;
            let reason = parts.next().unwrap_or_default().trim();
            Ok(Message::Response(Response {
                version: version.to_string(),
                code,
                reason: reason.to_string(),
                headers,
                body,
            }))
        } else {
            let parts: Vec<&str> = start_line.split_whitespace().collect();
            let [method, uri, version] = parts.as_slice() else {
                return Err(Error::InvalidMessage(format!("invalid request line {:?}", start_line)));
            };
            if !version.starts_with("SIP/") {
                return Err(Error::InvalidMessage(format!("invalid request line {:?}", start_line)));
            }
            Ok(Message::Request(Request {
                method: method.parse()?,
                uri: uri.parse()?,
                version: version.to_string(),
                headers,
                body,
            }))
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Message::Response(_))
    }

    pub fn headers(&self) -> &Headers {
        match self {
            Message::Request(r) => &r.headers,
            Message::Response(r) => &r.headers,
        }
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        match self {
            Message::Request(r) => &mut r.headers,
            Message::Response(r) => &mut r.headers,
        }
    }

    pub fn body(&self) -> &Bytes {
        match self {
            Message::Request(r) => &r.body,
            Message::Response(r) => &r.body,
        }
    }

    /// Wire encoding of the message
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Message::Request(r) => r.to_bytes(),
            Message::Response(r) => r.to_bytes(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Request(r) => r.fmt(f),
            Message::Response(r) => r.fmt(f),
        }
    }
}

impl FromStr for Message {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Message::parse(s.as_bytes())
    }
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Message::Request(request)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Message::Response(response)
    }
}

fn split_head(data: &[u8]) -> Result<(&[u8], &[u8])> {
    if let Some(i) = find(data, b"\r\n\r\n") {
        return Ok((&data[..i], &data[i + 4..]));
    }
    if let Some(i) = find(data, b"\n\n") {
        return Ok((&data[..i], &data[i + 2..]));
    }
    // A message without body may arrive without the final empty line
    if data.is_empty() {
        return Err(Error::InvalidMessage("empty message".to_string()));
    }
    Ok((data, &[]))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVITE: &str = "INVITE sip:bob@biloxi.com SIP/2.0\r\n\
        Via: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bK776asdhds\r\n\
        Max-Forwards: 70\r\n\
        To: Bob <sip:bob@biloxi.com>\r\n\
        From: Alice <sip:alice@atlanta.com>;tag=1928301774\r\n\
        Call-ID: a84b4c76e66710@pc33.atlanta.com\r\n\
        CSeq: 314159 INVITE\r\n\
        Contact: <sip:alice@pc33.atlanta.com>\r\n\
        Content-Length: 4\r\n\
        \r\n\
        v=0\n";

    #[test]
    fn test_parse_request() {
        let message: Message = INVITE.parse().unwrap();
        let Message::Request(request) = message else {
            panic!("expected a request");
        };
        assert_eq!(request.method, Method::Invite);
        assert_eq!(request.uri.to_string(), "sip:bob@biloxi.com");
        assert_eq!(request.headers.cseq().map(|c| c.number), Some(314159));
        assert_eq!(&request.body[..], b"v=0\n");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_parse_response() {
        let message = Message::parse(b"SIP/2.0 180 Ringing\r\nCall-ID: x\r\n\r\n").unwrap();
        let Message::Response(response) = message else {
            panic!("expected a response");
        };
        assert_eq!(response.code, 180);
        assert_eq!(response.reason, "Ringing");
        assert!(response.is_provisional());
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_invalid_start_lines() {
        assert!(Message::parse(b"").is_err());
        assert!(Message::parse(b"SIP/2.0 99 Odd\r\n\r\n").is_err());
        assert!(Message::parse(b"INVITE sip:bob@biloxi.com\r\n\r\n").is_err());
        assert!(Message::parse(b"INVITE sip:bob@biloxi.com HTTP/1.1\r\n\r\n").is_err());
    }

    #[test]
    fn test_content_length_longer_than_body() {
        let err = Message::parse(b"SIP/2.0 200 OK\r\nContent-Length: 10\r\n\r\nabc").unwrap_err();
        assert!(matches!(err, Error::InvalidMessage(_)));
    }

    #[test]
    fn test_validate_reports_missing_header() {
        let mut request = Request::new(Method::Options, Uri::sip("example.com"));
        request.headers.insert("Call-ID", "abc");
        assert_eq!(request.validate(), Err(Error::MissingHeader("To".to_string())));
    }

    #[test]
    fn test_create_response_copies_dialog_headers() {
        let Message::Request(request) = INVITE.parse().unwrap() else {
            panic!("expected a request");
        };
        let response = request.create_response(200, None);
        assert_eq!(response.reason, "OK");
        let names: Vec<_> = response.headers.iter().map(|(n, _)| n.as_str().to_string()).collect();
        assert_eq!(names, vec!["via", "from", "to", "call-id", "cseq"]);
        assert_eq!(
            response.to_string(),
            "SIP/2.0 200 OK\r\n\
             Via: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bK776asdhds\r\n\
             From: Alice <sip:alice@atlanta.com>;tag=1928301774\r\n\
             To: Bob <sip:bob@biloxi.com>\r\n\
             Call-ID: a84b4c76e66710@pc33.atlanta.com\r\n\
             CSeq: 314159 INVITE\r\n\
             Content-Length: 0\r\n\r\n"
        );
    }

    #[test]
    fn test_to_bytes_matches_display() {
        let message: Message = INVITE.parse().unwrap();
        assert_eq!(message.to_bytes(), Bytes::from(message.to_string()));
        let reparsed = Message::parse(&message.to_bytes()).unwrap();
        assert_eq!(reparsed, message);
    }

    #[test]
    fn test_binary_body_is_kept_exactly() {
        let mut response = Response::new(200, None);
        response.body = Bytes::from_static(&[0x00, 0xff, 0xfe, b'a']);

        let bytes = response.to_bytes();
        assert!(bytes.ends_with(&[0x00, 0xff, 0xfe, b'a']));
        assert_eq!(Message::Response(response.clone()).to_bytes(), bytes);
        assert_eq!(response.to_string(), String::from_utf8_lossy(&bytes));
        assert!(response.to_string().contains("Content-Length: 4\r\n\r\n"));

        let Message::Response(reparsed) = Message::parse(&bytes).unwrap() else {
            panic!("expected a response");
        };
        assert_eq!(reparsed.body, response.body);
    }
}
