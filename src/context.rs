use chrono::{DateTime, Utc};


/// `Max-Age` of the cookie emitted when a cookie value is empty
///
/// One year and a second in the past, so every client drops the cookie.
pub const DELETED_COOKIE_MAX_AGE: i64 = -31_536_001;

/// Size of the chunks used when a stream is copied somewhere else
pub const READ_CHUNK_SIZE: usize = 8192;

/// The format of `Date` header and cookie `Expires` attribute
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";


/// Settings used when values are created or rendered
///
/// All methods have defaults, so an empty impl block is enough to get the
/// standard behavior. Override `now` to get reproducible `Date` headers and
/// cookie expiration dates.
pub trait Context {
    /// Clock used for `Date` header and cookie `Expires`
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
    /// Cookie `Path` attribute used when none is set
    fn default_cookie_path(&self) -> &str {
        "/"
    }
}

/// Context with all the default settings and the system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContext;

impl Context for DefaultContext {}

pub(crate) fn http_date(date: DateTime<Utc>) -> String {
    date.format(HTTP_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use super::{http_date, Context, DefaultContext};

    #[test]
    fn test_http_date() {
        let date = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        assert_eq!(http_date(date), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_defaults() {
        let ctx = DefaultContext;
        assert_eq!(ctx.default_cookie_path(), "/");
    }
}
