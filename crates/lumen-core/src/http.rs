//! HTTP request and response payloads that can be attached to a log call

use crate::error::ExtractionError;
use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, TryStreamExt};
use http::{Method, StatusCode, Uri, Version};
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

/// Ordered, case-preserving, multi-valued header collection.
///
/// Names are compared case-insensitively when grouping values but are
/// rendered exactly as first appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, grouping it with an existing header of the same name
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderList {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = HeaderList::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// Body of an outbound request or response
pub enum HttpContent {
    /// Body already held in memory
    Buffered(Bytes),
    /// Body still arriving from the transport
    Streaming(BoxStream<'static, io::Result<Bytes>>),
}

impl HttpContent {
    pub fn from_stream(stream: BoxStream<'static, io::Result<Bytes>>) -> Self {
        HttpContent::Streaming(stream)
    }

    /// Read the whole body as UTF-8 text.
    ///
    /// A streaming body is driven to completion on the calling thread and
    /// then kept buffered, so the body stays readable for other consumers.
    /// The stream must not depend on an async runtime's reactor.
    pub fn read_to_string(&mut self) -> Result<String, ExtractionError> {
        let bytes = match self {
            HttpContent::Buffered(bytes) => bytes.clone(),
            HttpContent::Streaming(stream) => futures::executor::block_on(stream.try_fold(
                BytesMut::new(),
                |mut acc, chunk| async move {
                    acc.extend_from_slice(&chunk);
                    Ok(acc)
                },
            ))?
            .freeze(),
        };
        *self = HttpContent::Buffered(bytes.clone());
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, HttpContent::Buffered(_))
    }
}

impl From<Bytes> for HttpContent {
    fn from(bytes: Bytes) -> Self {
        HttpContent::Buffered(bytes)
    }
}

impl From<String> for HttpContent {
    fn from(text: String) -> Self {
        HttpContent::Buffered(Bytes::from(text))
    }
}

impl From<&'static str> for HttpContent {
    fn from(text: &'static str) -> Self {
        HttpContent::Buffered(Bytes::from_static(text.as_bytes()))
    }
}

impl From<Vec<u8>> for HttpContent {
    fn from(bytes: Vec<u8>) -> Self {
        HttpContent::Buffered(Bytes::from(bytes))
    }
}

impl fmt::Debug for HttpContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpContent::Buffered(bytes) => f.debug_tuple("Buffered").field(&bytes.len()).finish(),
            HttpContent::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}

/// Request sent by the application to another service
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderList,
    pub content: Option<HttpContent>,
    /// Request-scoped metadata carried alongside the request
    pub properties: Vec<(String, Option<String>)>,
}

impl OutboundRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderList::new(),
            content: None,
            properties: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_content(mut self, content: impl Into<HttpContent>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.properties.push((name.into(), value));
        self
    }
}

/// Response received for an [`OutboundRequest`]
#[derive(Debug)]
pub struct OutboundResponse {
    pub status: StatusCode,
    pub reason: Option<String>,
    pub version: Version,
    pub headers: HeaderList,
    pub content: Option<HttpContent>,
    pub request: OutboundRequest,
}

impl OutboundResponse {
    pub fn new(status: StatusCode, request: OutboundRequest) -> Self {
        Self {
            status,
            reason: status.canonical_reason().map(str::to_string),
            version: request.version,
            headers: HeaderList::new(),
            content: None,
            request,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_content(mut self, content: impl Into<HttpContent>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Seekable request body as seen by a server
pub trait BodyStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> BodyStream for T {}

/// Request received by the application acting as a server
pub struct InboundRequest {
    pub method: Method,
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderList,
    pub content_length: Option<u64>,
    pub body: Option<Box<dyn BodyStream>>,
}

impl InboundRequest {
    pub fn new(method: Method, scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            method,
            scheme: scheme.into(),
            host: host.into(),
            path: String::new(),
            query: None,
            headers: HeaderList::new(),
            content_length: None,
            body: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Attach a body; the declared content length is taken from the caller
    pub fn with_body(mut self, body: impl BodyStream + 'static, content_length: u64) -> Self {
        self.body = Some(Box::new(body));
        self.content_length = Some(content_length);
        self
    }

    /// `scheme://host/path?query`
    pub fn display_uri(&self) -> String {
        let path = self.path.trim_start_matches('/');
        let query = match self.query.as_deref().map(|q| q.trim_start_matches('?')) {
            Some(q) if !q.is_empty() => format!("?{}", q),
            _ => String::new(),
        };
        format!("{}://{}/{}{}", self.scheme, self.host, path, query)
    }

    /// Read the body as UTF-8 text without disturbing other readers.
    ///
    /// The stream is rewound before reading and again afterwards. Exactly the
    /// declared content length is read; a shorter stream is an error. No
    /// declared length, a zero length or a missing body yield an empty string.
    pub fn read_body(&mut self) -> Result<String, ExtractionError> {
        let declared = self.content_length.unwrap_or(0);
        let Some(body) = self.body.as_mut() else {
            return Ok(String::new());
        };
        if declared == 0 {
            return Ok(String::new());
        }

        body.seek(SeekFrom::Start(0))?;
        let mut buffer = Vec::new();
        let read = Read::by_ref(body).take(declared).read_to_end(&mut buffer)? as u64;
        body.seek(SeekFrom::Start(0))?;

        if read != declared {
            return Err(ExtractionError::ContentLength { declared, read });
        }
        Ok(String::from_utf8(buffer)?)
    }
}

impl fmt::Debug for InboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundRequest")
            .field("method", &self.method)
            .field("uri", &self.display_uri())
            .field("headers", &self.headers)
            .field("content_length", &self.content_length)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Render a protocol version the way telemetry dashboards expect (`1.1`)
pub fn version_string(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_11 => "1.1",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "unknown",
    }
}

/// Status code name in PascalCase (`404` renders as `NotFound`).
///
/// Names follow the canonical reason phrase, except where telemetry
/// dashboards know a code by an older name. Codes without a name render as
/// their number.
pub fn status_name(status: StatusCode) -> String {
    let legacy = match status.as_u16() {
        413 => Some("RequestEntityTooLarge"),
        414 => Some("RequestUriTooLong"),
        416 => Some("RequestedRangeNotSatisfiable"),
        418 => None,
        505 => Some("HttpVersionNotSupported"),
        _ => status.canonical_reason(),
    };

    match legacy {
        Some(name) if !name.contains(' ') && !name.contains('-') => name.to_string(),
        Some(reason) => reason
            .split([' ', '-'])
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect(),
        None => status.as_u16().to_string(),
    }
}
