use std::fmt;
use std::str::FromStr;

use chrono::TimeDelta;

use crate::context::{http_date, Context, DELETED_COOKIE_MAX_AGE};
use crate::error::{Error, Result};


/// Value of the `SameSite` cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SameSite {
    Lax,
    Strict,
}

impl FromStr for SameSite {
    type Err = Error;
    fn from_str(s: &str) -> Result<SameSite> {
        if s.eq_ignore_ascii_case("lax") {
            Ok(SameSite::Lax)
        } else if s.eq_ignore_ascii_case("strict") {
            Ok(SameSite::Strict)
        } else {
            Err(Error::invalid(format!("invalid SameSite value {:?}", s)))
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
        })
    }
}

fn is_separator(ch: char) -> bool {
    matches!(ch, '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' |
                 '"' | '/' | '[' | ']' | '?' | '=' | '{' | '}' | ' ' | '\t')
}

/// A cookie to be sent with `Set-Cookie` header
///
/// Created with `Cookie::new` and tuned with builder methods. The header
/// value is produced by `format`, which also validates the cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    max_age: i64,
    path: Option<String>,
    domain: Option<String>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
    raw: bool,
}

impl Cookie {
    /// Cookie with the value, an empty value means the cookie is deleted
    pub fn new(name: &str, value: &str) -> Cookie {
        Cookie {
            name: name.to_string(),
            value: value.to_string(),
            max_age: 0,
            path: None,
            domain: None,
            secure: false,
            http_only: false,
            same_site: None,
            raw: false,
        }
    }
    /// Lifetime in seconds, zero or negative means a session cookie
    pub fn max_age(mut self, seconds: i64) -> Cookie {
        self.max_age = seconds;
        self
    }
    pub fn path(mut self, path: &str) -> Cookie {
        self.path = Some(path.to_string());
        self
    }
    pub fn domain(mut self, domain: &str) -> Cookie {
        self.domain = Some(domain.to_string());
        self
    }
    pub fn secure(mut self, secure: bool) -> Cookie {
        self.secure = secure;
        self
    }
    pub fn http_only(mut self, http_only: bool) -> Cookie {
        self.http_only = http_only;
        self
    }
    pub fn same_site(mut self, same_site: Option<SameSite>) -> Cookie {
        self.same_site = same_site;
        self
    }
    /// Don't percent-encode name and value
    pub fn raw(mut self, raw: bool) -> Cookie {
        self.raw = raw;
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Checks name (and value for raw cookies)
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid("cookie name must not be empty"));
        }
        if self.name.chars().any(|c| c.is_control() || is_separator(c)) {
            return Err(Error::invalid(
                format!("cookie name {:?} contains invalid characters",
                        self.name)));
        }
        if self.raw && self.value.chars()
            .any(|c| c.is_control() || matches!(c, ';' | ',' | ' ' | '\t'))
        {
            return Err(Error::invalid(
                format!("raw cookie value {:?} contains invalid characters",
                        self.value)));
        }
        Ok(())
    }

    fn encode<'a>(&self, text: &'a str) -> std::borrow::Cow<'a, str> {
        if self.raw {
            text.into()
        } else {
            urlencoding::encode(text)
        }
    }

    /// Value of the `Set-Cookie` header
    ///
    /// `Expires` attribute is computed from the clock of the context, the
    /// context also provides the path used when none is set.
    pub fn format<C: Context + ?Sized>(&self, ctx: &C) -> Result<String> {
        self.validate()?;
        let now = ctx.now();
        let expires = |seconds: i64| -> Result<String> {
            TimeDelta::try_seconds(seconds)
                .and_then(|delta| now.checked_add_signed(delta))
                .map(http_date)
                .ok_or_else(|| Error::invalid(
                    format!("cookie max-age {} is out of range", seconds)))
        };
        let name = self.encode(&self.name);
        let mut parts = Vec::new();
        if self.value.is_empty() {
            parts.push(format!("{}=deleted", name));
            parts.push(format!("Expires={}", expires(DELETED_COOKIE_MAX_AGE)?));
            parts.push(format!("Max-Age={}", DELETED_COOKIE_MAX_AGE));
        } else {
            parts.push(format!("{}={}", name, self.encode(&self.value)));
            if self.max_age > 0 {
                parts.push(format!("Expires={}", expires(self.max_age)?));
                parts.push(format!("Max-Age={}", self.max_age));
            }
        }
        let path = match self.path {
            Some(ref path) if !path.is_empty() => &path[..],
            _ => ctx.default_cookie_path(),
        };
        parts.push(format!("Path={}", path));
        if let Some(ref domain) = self.domain {
            if !domain.is_empty() {
                parts.push(format!("Domain={}", domain));
            }
        }
        if self.secure {
            parts.push("Secure".to_string());
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        if let Some(same_site) = self.same_site {
            parts.push(format!("SameSite={}", same_site));
        }
        let out = parts.join("; ");
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use chrono::{DateTime, TimeZone, Utc};

    use super::{Cookie, SameSite};
    use crate::context::Context;

    struct Fixed;

    impl Context for Fixed {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
        }
    }

    #[test]
    fn test_plain() {
        let cookie = Cookie::new("a", "b").max_age(0).path("/");
        assert_eq!(cookie.format(&Fixed).unwrap(), "a=b; Path=/");
    }

    #[test]
    fn test_deleted() {
        let line = Cookie::new("a", "").format(&Fixed).unwrap();
        assert_eq!(line, "a=deleted; Expires=Mon, 31 Dec 2018 23:59:59 GMT; \
                          Max-Age=-31536001; Path=/");
    }

    #[test]
    fn test_max_age() {
        let line = Cookie::new("sid", "x y").max_age(60).format(&Fixed)
            .unwrap();
        assert_eq!(line, "sid=x%20y; Expires=Wed, 01 Jan 2020 00:01:00 GMT; \
                          Max-Age=60; Path=/");
    }

    #[test]
    fn test_all_attributes() {
        let line = Cookie::new("id", "1")
            .path("/app")
            .domain("example.com")
            .secure(true)
            .http_only(true)
            .same_site(Some(SameSite::Strict))
            .format(&Fixed).unwrap();
        assert_eq!(line, "id=1; Path=/app; Domain=example.com; Secure; \
                          HttpOnly; SameSite=Strict");
    }

    #[test]
    fn test_raw() {
        let line = Cookie::new("n", "a%2Fb").raw(true).format(&Fixed).unwrap();
        assert_eq!(line, "n=a%2Fb; Path=/");
        assert!(Cookie::new("n", "a;b").raw(true).format(&Fixed).is_err());
    }

    #[test]
    fn test_invalid_name() {
        for name in &["", "a b", "a=b", "a;b", "a\u{7f}"] {
            assert!(Cookie::new(name, "v").format(&Fixed)
                    .unwrap_err().is_validation());
        }
    }

    #[test]
    fn test_same_site() {
        assert_eq!("lax".parse::<SameSite>().unwrap(), SameSite::Lax);
        assert_eq!("Strict".parse::<SameSite>().unwrap(), SameSite::Strict);
        assert!("none".parse::<SameSite>().unwrap_err().is_validation());
    }

    #[test]
    fn test_max_age_overflow() {
        assert!(Cookie::new("a", "b").max_age(i64::MAX).format(&Fixed)
                .unwrap_err().is_validation());
    }
}
