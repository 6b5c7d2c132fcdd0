//! URI value object
//!
//! The string is split into components once, following the generic syntax
//! of RFC 3986: `scheme:[//[userinfo@]host[:port]]path[?query][#fragment]`.
//! Components are not percent-decoded and are not normalized except that
//! the scheme is lowercased.
use std::fmt;
use std::str::FromStr;

use once_cell::unsync::OnceCell;

use crate::error::{Error, Result};


/// Components of the URI as they appear in the source string
#[derive(Debug, Default, PartialEq, Eq)]
struct RawParts<'a> {
    scheme: Option<&'a str>,
    user: Option<&'a str>,
    password: Option<&'a str>,
    host: Option<&'a str>,
    port: Option<u16>,
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

fn is_scheme(s: &str) -> bool {
    let mut bytes = s.bytes();
    match bytes.next() {
        Some(ch) if ch.is_ascii_alphabetic() => {}
        _ => return false,
    }
    bytes.all(|ch| ch.is_ascii_alphanumeric() ||
                   ch == b'+' || ch == b'-' || ch == b'.')
}

fn parse_port(s: &str) -> Result<Option<u16>> {
    if s.is_empty() {
        return Ok(None);
    }
    if !s.bytes().all(|ch| ch.is_ascii_digit()) {
        return Err(Error::invalid(format!("invalid port {:?}", s)));
    }
    s.parse().map(Some)
        .map_err(|_| Error::invalid(format!("port {} is out of range", s)))
}

fn split_raw(input: &str) -> Result<RawParts> {
    let mut parts = RawParts::default();
    let mut rest = input;
    if let Some(pos) = rest.find('#') {
        parts.fragment = Some(&rest[pos+1..]);
        rest = &rest[..pos];
    }
    if let Some(pos) = rest.find('?') {
        parts.query = Some(&rest[pos+1..]);
        rest = &rest[..pos];
    }
    if let Some(colon) = rest.find(':') {
        if rest[..colon].find('/').is_none() {
            let scheme = &rest[..colon];
            if !is_scheme(scheme) {
                return Err(Error::invalid(
                    format!("malformed scheme in {:?}", input)));
            }
            parts.scheme = Some(scheme);
            rest = &rest[colon+1..];
        }
    }
    if let Some(after) = rest.strip_prefix("//") {
        let end = after.find('/').unwrap_or(after.len());
        split_authority(&after[..end], &mut parts)?;
        rest = &after[end..];
    }
    parts.path = rest;
    Ok(parts)
}

fn split_authority<'a>(authority: &'a str, parts: &mut RawParts<'a>)
    -> Result<()>
{
    let host_port = match authority.rfind('@') {
        Some(at) => {
            let userinfo = &authority[..at];
            match userinfo.find(':') {
                Some(colon) => {
                    parts.user = Some(&userinfo[..colon]);
                    parts.password = Some(&userinfo[colon+1..]);
                }
                None => parts.user = Some(userinfo),
            }
            &authority[at+1..]
        }
        None => authority,
    };
    let (host, port) = if host_port.starts_with('[') {
        let end = host_port.find(']').ok_or_else(|| Error::invalid(
            format!("unterminated IPv6 literal in {:?}", authority)))?;
        let port = match &host_port[end+1..] {
            "" => None,
            tail => match tail.strip_prefix(':') {
                Some(port) => parse_port(port)?,
                None => return Err(Error::invalid(
                    format!("garbage after IPv6 literal in {:?}", authority))),
            },
        };
        (&host_port[..end+1], port)
    } else {
        match host_port.rfind(':') {
            Some(colon) => (&host_port[..colon],
                            parse_port(&host_port[colon+1..])?),
            None => (host_port, None),
        }
    };
    if host.is_empty() && (parts.user.is_some() || port.is_some()) {
        return Err(Error::invalid(
            format!("authority {:?} has no host", authority)));
    }
    parts.host = Some(host);
    parts.port = port;
    Ok(())
}

/// An immutable URI
///
/// Mutators consume the value and return the changed one; if the new
/// component equals the current one the same value is returned as is.
#[derive(Clone, Default)]
pub struct Uri {
    scheme: String,
    user: String,
    password: Option<String>,
    host: String,
    port: Option<u16>,
    path: String,
    query: String,
    fragment: String,
    /// `[userinfo@]host[:port]`, reset whenever one of those changes
    authority: OnceCell<String>,
}

impl Uri {
    /// Parses the URI
    ///
    /// An empty string gives an empty URI. Fails on malformed scheme,
    /// non-numeric or out of range port, unterminated IPv6 literal and
    /// user info or port without a host.
    pub fn parse(input: &str) -> Result<Uri> {
        let raw = split_raw(input)?;
        Ok(Uri {
            scheme: raw.scheme.unwrap_or("").to_ascii_lowercase(),
            user: raw.user.unwrap_or("").to_string(),
            password: raw.password.map(String::from),
            host: raw.host.unwrap_or("").to_string(),
            port: raw.port,
            path: raw.path.to_string(),
            query: raw.query.unwrap_or("").to_string(),
            fragment: raw.fragment.unwrap_or("").to_string(),
            authority: OnceCell::new(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }
    /// `user[:password]`, empty when there is no user
    pub fn user_info(&self) -> String {
        match self.password {
            _ if self.user.is_empty() => String::new(),
            Some(ref password) => format!("{}:{}", self.user, password),
            None => self.user.clone(),
        }
    }
    /// `[userinfo@]host[:port]`, empty when there is no host
    pub fn authority(&self) -> &str {
        self.authority.get_or_init(|| {
            if self.host.is_empty() {
                return String::new();
            }
            let mut result = self.user_info();
            if !result.is_empty() {
                result.push('@');
            }
            result.push_str(&self.host);
            if let Some(port) = self.port {
                result.push(':');
                result.push_str(&port.to_string());
            }
            result
        })
    }
    pub fn host(&self) -> &str {
        &self.host
    }
    pub fn port(&self) -> Option<u16> {
        self.port
    }
    pub fn path(&self) -> &str {
        &self.path
    }
    /// Query string without leading `?`
    pub fn query(&self) -> &str {
        &self.query
    }
    /// Fragment without leading `#`
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Sets the scheme, it's lowercased
    ///
    /// Fails if the scheme is not empty and is not a valid scheme name.
    pub fn with_scheme(mut self, scheme: &str) -> Result<Uri> {
        if !scheme.is_empty() && !is_scheme(scheme) {
            return Err(Error::invalid(
                format!("invalid scheme {:?}", scheme)));
        }
        let scheme = scheme.to_ascii_lowercase();
        if self.scheme != scheme {
            self.scheme = scheme;
        }
        Ok(self)
    }
    /// Sets user and password, password is dropped if the user is empty
    pub fn with_user_info(mut self, user: &str, password: Option<&str>)
        -> Uri
    {
        let password = password.filter(|_| !user.is_empty());
        if self.user != user || self.password.as_deref() != password {
            self.user = user.to_string();
            self.password = password.map(String::from);
            self.authority = OnceCell::new();
        }
        self
    }
    pub fn with_host(mut self, host: &str) -> Uri {
        if self.host != host {
            self.host = host.to_string();
            self.authority = OnceCell::new();
        }
        self
    }
    pub fn with_port(mut self, port: Option<u16>) -> Uri {
        if self.port != port {
            self.port = port;
            self.authority = OnceCell::new();
        }
        self
    }
    pub fn with_path(mut self, path: &str) -> Uri {
        if self.path != path {
            self.path = path.to_string();
        }
        self
    }
    /// Sets the query, leading `?` is stripped
    pub fn with_query(mut self, query: &str) -> Uri {
        let query = query.strip_prefix('?').unwrap_or(query);
        if self.query != query {
            self.query = query.to_string();
        }
        self
    }
    /// Sets the fragment, leading `#` is stripped
    pub fn with_fragment(mut self, fragment: &str) -> Uri {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        if self.fragment != fragment {
            self.fragment = fragment.to_string();
        }
        self
    }
}

impl FromStr for Uri {
    type Err = Error;
    fn from_str(s: &str) -> Result<Uri> {
        Uri::parse(s)
    }
}

impl PartialEq for Uri {
    fn eq(&self, other: &Uri) -> bool {
        self.scheme == other.scheme &&
        self.user == other.user &&
        self.password == other.password &&
        self.host == other.host &&
        self.port == other.port &&
        self.path == other.path &&
        self.query == other.query &&
        self.fragment == other.fragment
    }
}

impl Eq for Uri {}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}:", self.scheme)?;
        }
        let authority = self.authority();
        let has_authority = !authority.is_empty() || self.scheme == "file";
        if has_authority {
            write!(f, "//{}", authority)?;
            if !self.path.is_empty() && !self.path.starts_with('/') {
                f.write_str("/")?;
            }
        }
        f.write_str(&self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        if !self.fragment.is_empty() {
            write!(f, "#{}", self.fragment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Uri({:?})", self.to_string())
    }
}
