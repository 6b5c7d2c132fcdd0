//! The part shared by requests and responses
//!
//! `Message` holds protocol version, headers and body. It's embedded into
//! `Request` and `Response`, and the `HttpMessage` trait gives all three the
//! same set of accessors and copy-on-write mutators.
use once_cell::unsync::OnceCell;

use crate::body::Body;
use crate::error::Result;
use crate::headers::{normalize_values, HeaderTable};
use crate::version::Version;


/// Protocol version, headers and body
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub(crate) version: Version,
    pub(crate) headers: HeaderTable,
    pub(crate) body: OnceCell<Body>,
}

impl Message {
    pub fn new() -> Message {
        Message::default()
    }
    pub fn from_parts(version: Version, headers: HeaderTable,
        body: Option<Body>)
        -> Message
    {
        let cell = OnceCell::new();
        if let Some(body) = body {
            // cell is fresh, it can't be occupied
            let _ = cell.set(body);
        }
        Message {
            version,
            headers,
            body: cell,
        }
    }
}

/// Accessors and copy-on-write mutators of an HTTP message
///
/// Every `with_*`/`without_*` method consumes the message and returns the
/// changed one. When nothing would change the very same value is returned.
/// Body is shared between clones of the message, see `Body`.
pub trait HttpMessage: Sized {
    fn message(&self) -> &Message;
    fn message_mut(&mut self) -> &mut Message;

    fn protocol_version(&self) -> Version {
        self.message().version
    }
    fn with_protocol_version(mut self, version: Version) -> Self {
        if self.message().version != version {
            self.message_mut().version = version;
        }
        self
    }
    fn headers(&self) -> &HeaderTable {
        &self.message().headers
    }
    fn has_header(&self, name: &str) -> bool {
        self.message().headers.has(name)
    }
    /// Values of the header in any casing, empty if there is no header
    fn header(&self, name: &str) -> &[String] {
        self.message().headers.get(name)
    }
    /// Values of the header joined with a comma
    fn header_line(&self, name: &str) -> String {
        self.message().headers.get_line(name)
    }
    /// Replaces values of the header
    ///
    /// Values are trimmed of spaces and tabs. Fails if there are no values,
    /// the name isn't a valid token or some value contains a line break.
    fn with_header<I>(mut self, name: &str, values: I) -> Result<Self>
        where I: IntoIterator,
              I::Item: AsRef<str>,
    {
        let values = normalize_values(values)?;
        if self.message().headers.is_same(name, &values) {
            return Ok(self);
        }
        self.message_mut().headers.set(name, values)?;
        Ok(self)
    }
    /// Appends values to the header, keeping its current name
    fn with_added_header<I>(mut self, name: &str, values: I) -> Result<Self>
        where I: IntoIterator,
              I::Item: AsRef<str>,
    {
        self.message_mut().headers.add(name, values)?;
        Ok(self)
    }
    /// Removes the header, does nothing if it's absent
    fn without_header(mut self, name: &str) -> Self {
        if self.message().headers.has(name) {
            self.message_mut().headers.remove(name);
        }
        self
    }
    /// The body, an empty one is created on first access
    fn body(&self) -> &Body {
        self.message().body.get_or_init(Body::empty)
    }
    /// Replaces the body, does nothing if it's the same instance
    fn with_body<B: Into<Body>>(mut self, body: B) -> Self {
        let body = body.into();
        let same = self.message().body.get()
            .map(|old| old.ptr_eq(&body))
            .unwrap_or(false);
        if !same {
            self.message_mut().body = OnceCell::from(body);
        }
        self
    }
}

impl HttpMessage for Message {
    fn message(&self) -> &Message {
        self
    }
    fn message_mut(&mut self) -> &mut Message {
        self
    }
}
