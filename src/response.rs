use std::fmt;

use crate::body::Body;
use crate::context::{http_date, Context, DefaultContext};
use crate::cookie::Cookie;
use crate::error::{Error, HttpError, Result};
use crate::headers::HeaderTable;
use crate::message::{HttpMessage, Message};
use crate::status::{is_known, reason_phrase};
use crate::version::Version;


/// An HTTP response
///
/// Status code is always one of the codes known by `status::reason_phrase`
/// and the reason phrase is never empty.
#[derive(Debug, Clone)]
pub struct Response {
    message: Message,
    status: u16,
    reason: String,
    /// Cookie name -> formatted `Set-Cookie` value
    cookies: Vec<(String, String)>,
}

fn resolve_reason(code: u16, reason: &str) -> Result<String> {
    if !is_known(code) {
        return Err(Error::invalid(format!("unknown status code {}", code)));
    }
    if reason.bytes().any(|b| b == b'\r' || b == b'\n') {
        return Err(Error::invalid(
            format!("reason phrase {:?} contains a line break", reason)));
    }
    match reason {
        "" => Ok(reason_phrase(code).unwrap_or("").to_string()),
        _ => Ok(reason.to_string()),
    }
}

impl Response {
    /// Creates an HTTP/1.1 response with a standard reason phrase
    pub fn new(status: u16) -> Result<Response> {
        Response::from_parts(status, "", HeaderTable::new(), None,
            Version::Http11)
    }
    /// Creates a response, an empty `reason` means the standard phrase
    pub fn from_parts(status: u16, reason: &str, headers: HeaderTable,
        body: Option<Body>, version: Version)
        -> Result<Response>
    {
        Ok(Response {
            reason: resolve_reason(status, reason)?,
            status,
            message: Message::from_parts(version, headers, body),
            cookies: Vec::new(),
        })
    }
    /// Plain text error page for the error
    ///
    /// Codes which are not in the status table are replaced by 500.
    pub fn error_page<E: HttpError + ?Sized>(err: &E) -> Response {
        let (code, phrase) = match err.http_status() {
            (code, phrase) if is_known(code) => (code, phrase),
            _ => (500, "Internal Server Error"),
        };
        let mut headers = HeaderTable::new();
        headers.put("Content-Type", "text/plain".to_string());
        Response {
            message: Message::from_parts(Version::Http11, headers,
                Some(Body::from(format!("{} {}\r\n", code, phrase)))),
            status: code,
            reason: phrase.to_string(),
            cookies: Vec::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }
    pub fn reason_phrase(&self) -> &str {
        &self.reason
    }
    /// Changes the status, an empty `reason` means the standard phrase
    pub fn with_status(mut self, code: u16, reason: &str) -> Result<Response> {
        let reason = resolve_reason(code, reason)?;
        if self.status != code || self.reason != reason {
            self.status = code;
            self.reason = reason;
        }
        Ok(self)
    }

    /// Adds a cookie, replacing any cookie with the same name
    ///
    /// Expiration dates are computed with the system clock.
    pub fn with_cookie(self, cookie: Cookie) -> Result<Response> {
        self.with_cookie_in(cookie, &DefaultContext)
    }
    /// Same as `with_cookie` with the clock and defaults of the context
    pub fn with_cookie_in<C: Context + ?Sized>(mut self, cookie: Cookie,
        ctx: &C)
        -> Result<Response>
    {
        let line = cookie.format(ctx)?;
        match self.cookies.iter_mut().find(|(n, _)| n == cookie.name()) {
            Some(entry) => entry.1 = line,
            None => self.cookies.push((cookie.name().to_string(), line)),
        }
        Ok(self)
    }
    /// Formatted `Set-Cookie` value of the cookie
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.iter()
            .find(|(n, _)| n == name)
            .map(|(_, line)| &line[..])
    }
    /// All cookies in the order they were added
    pub fn cookies(&self) -> impl Iterator<Item=(&str, &str)> {
        self.cookies.iter().map(|(n, l)| (&n[..], &l[..]))
    }

    /// Full response as text
    ///
    /// `Date` (from the clock of the context) and `Content-Length` (size of
    /// the body) headers are set just before writing. Cookies go right after
    /// the status line.
    pub fn render<C: Context + ?Sized>(&self, ctx: &C) -> String {
        let mut headers = self.message.headers.clone();
        let length = self.body().size().unwrap_or(0);
        headers.put("Date", http_date(ctx.now()));
        headers.put("Content-Length", length.to_string());

        let mut out = format!("HTTP/{} {} {}\r\n",
            self.message.version.as_str(), self.status, self.reason);
        for (_, line) in &self.cookies {
            out.push_str("Set-Cookie: ");
            out.push_str(line);
            out.push_str("\r\n");
        }
        out.push_str(&headers.to_lines());
        out.push_str("\r\n");
        out.push_str(&self.body().contents());
        out
    }
}

impl HttpMessage for Response {
    fn message(&self) -> &Message {
        &self.message
    }
    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.render(&DefaultContext))
    }
}
