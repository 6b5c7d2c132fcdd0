use std::fmt::{self, Display};
use std::str::FromStr;

use crate::error::Error;

/// Version of the HTTP protocol of a message
///
/// HTTP/0.9 is only of historic importance. It is not supported and it
/// will never be supported. Most requests that appear to be HTTP/0.9 are
/// malformed HTTP/1.0 requests.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Version {
    /// HTTP/1.0 protocol version.
    Http10,
    /// HTTP/1.1 protocol version as described in RFC7230 and others.
    Http11,
    /// HTTP/2 protocol version as described in RFC7540.
    Http20,
}

impl Version {
    /// The bare version number as it's used in the start line
    /// (`1.0`, `1.1`, `2`)
    pub fn as_str(&self) -> &'static str {
        use self::Version::*;
        match *self {
            Http10 => "1.0",
            Http11 => "1.1",
            Http20 => "2",
        }
    }
}

impl Default for Version {
    fn default() -> Version {
        Version::Http11
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Version::*;
        f.write_str(match *self {
            Http10 => "HTTP/1.0",
            Http11 => "HTTP/1.1",
            Http20 => "HTTP/2",
        })
    }
}

impl FromStr for Version {
    type Err = Error;
    /// Accepts both the bare number (`1.1`) and the start-line form
    /// (`HTTP/1.1`)
    fn from_str(s: &str) -> Result<Version, Error> {
        use self::Version::*;
        let num = s.strip_prefix("HTTP/").unwrap_or(s);
        match num {
            "1.0" => Ok(Http10),
            "1.1" => Ok(Http11),
            "2" | "2.0" => Ok(Http20),
            _ => Err(Error::invalid(
                format!("unsupported protocol version {:?}", s))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Version;

    #[test]
    fn test_parse() {
        assert_eq!("1.1".parse::<Version>().unwrap(), Version::Http11);
        assert_eq!("HTTP/1.0".parse::<Version>().unwrap(), Version::Http10);
        assert_eq!("2.0".parse::<Version>().unwrap(), Version::Http20);
        assert!("0.9".parse::<Version>().unwrap_err().is_validation());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Version::default().to_string(), "HTTP/1.1");
        assert_eq!(Version::Http20.as_str(), "2");
    }
}
