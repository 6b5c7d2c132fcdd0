use std::fmt;
use std::str::FromStr;

use crate::body::Body;
use crate::error::{Error, Result};
use crate::headers::HeaderTable;
use crate::message::{HttpMessage, Message};
use crate::uri::Uri;
use crate::version::Version;


/// Request methods which are allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Options,
    Head,
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        use self::Method::*;
        match *self {
            Options => "OPTIONS",
            Head => "HEAD",
            Get => "GET",
            Post => "POST",
            Put => "PUT",
            Patch => "PATCH",
            Delete => "DELETE",
        }
    }
}

impl FromStr for Method {
    type Err = Error;
    /// Method name is matched ignoring case
    fn from_str(s: &str) -> Result<Method> {
        use self::Method::*;
        let method = match &s.to_ascii_uppercase()[..] {
            "OPTIONS" => Options,
            "HEAD" => Head,
            "GET" => Get,
            "POST" => Post,
            "PUT" => Put,
            "PATCH" => Patch,
            "DELETE" => Delete,
            "" => return Err(Error::invalid("request method is empty")),
            _ => return Err(Error::invalid(
                format!("unsupported request method {:?}", s))),
        };
        Ok(method)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request
///
/// The `Host` header follows the host of the URI: it's filled in on
/// creation if absent and updated by `with_uri` unless asked to preserve it.
#[derive(Debug, Clone)]
pub struct Request {
    message: Message,
    method: Method,
    uri: Uri,
    target: Option<String>,
}

impl Request {
    /// Creates an HTTP/1.1 request with no headers and an empty body
    pub fn new(method: &str, uri: Uri) -> Result<Request> {
        Request::from_parts(method, uri, HeaderTable::new(), None,
            Version::Http11)
    }
    pub fn from_parts(method: &str, uri: Uri, headers: HeaderTable,
        body: Option<Body>, version: Version)
        -> Result<Request>
    {
        let method = method.parse()?;
        let mut req = Request {
            message: Message::from_parts(version, headers, body),
            method,
            uri,
            target: None,
        };
        if !req.message.headers.has("host") {
            req.update_host()?;
        }
        Ok(req)
    }

    fn update_host(&mut self) -> Result<()> {
        let host = self.uri.host();
        if host.is_empty() {
            return Ok(());
        }
        let value = match self.uri.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        self.message.headers.set_first("Host", [value])
    }

    pub fn method(&self) -> Method {
        self.method
    }
    pub fn with_method(mut self, method: &str) -> Result<Request> {
        self.method = method.parse()?;
        Ok(self)
    }
    pub fn uri(&self) -> &Uri {
        &self.uri
    }
    /// Replaces the URI
    ///
    /// Unless `preserve_host` is set, the `Host` header is set from the new
    /// URI (if it has a host) and moved in front of other headers. With
    /// `preserve_host` the header is only filled in when it's absent.
    pub fn with_uri(mut self, uri: Uri, preserve_host: bool)
        -> Result<Request>
    {
        self.uri = uri;
        if !preserve_host || !self.message.headers.has("host") {
            self.update_host()?;
        }
        Ok(self)
    }
    /// The target as it appears in the request line
    ///
    /// Unless overriden by `with_request_target` it's the origin form:
    /// path (or `/`) and the query. The fragment is appended only when
    /// there is a query.
    pub fn request_target(&self) -> String {
        if let Some(ref target) = self.target {
            return target.clone();
        }
        let mut target = match self.uri.path() {
            "" => String::from("/"),
            path => path.to_string(),
        };
        if !self.uri.query().is_empty() {
            target.push('?');
            target.push_str(self.uri.query());
            if !self.uri.fragment().is_empty() {
                target.push('#');
                target.push_str(self.uri.fragment());
            }
        }
        target
    }
    /// Overrides the request target, e.g. with `*` or an absolute URI
    pub fn with_request_target(mut self, target: &str) -> Result<Request> {
        if target.is_empty() ||
            target.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(Error::invalid(
                format!("invalid request target {:?}", target)));
        }
        if self.target.as_deref() != Some(target) {
            self.target = Some(target.to_string());
        }
        Ok(self)
    }
}

impl HttpMessage for Request {
    fn message(&self) -> &Message {
        &self.message
    }
    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} HTTP/{}\r\n",
            self.method, self.request_target(), self.message.version.as_str())?;
        f.write_str(&self.message.headers.to_lines())?;
        f.write_str("\r\n")?;
        f.write_str(&self.body().contents())
    }
}
