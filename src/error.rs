use std::io;


quick_error!{
    /// Error type returned by every fallible operation of this crate
    ///
    /// Note, you should not make an exhaustive match over the enum. More
    /// errors may be added at will. Use `HttpError` trait to map an error
    /// to an HTTP status instead.
    #[derive(Debug)]
    pub enum Error {
        /// Caller supplied a structurally invalid argument
        ///
        /// Always detected before anything is changed.
        Validation(reason: String) {
            display("invalid argument: {}", reason)
        }
        /// The underlying byte resource failed an operation
        Io(context: &'static str, err: io::Error) {
            display("{}: {}", context, err)
            source(err)
        }
        /// The object is in a state where the operation is not allowed
        State(reason: &'static str) {
            display("invalid state: {}", reason)
        }
    }
}

/// Result of the operations of this crate
pub type Result<T> = ::std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid<S: Into<String>>(reason: S) -> Error {
        Error::Validation(reason.into())
    }
    pub(crate) fn unsupported(context: &'static str) -> Error {
        Error::Io(context,
            io::Error::new(io::ErrorKind::Unsupported, context))
    }
    /// Returns true for `Error::Validation`
    pub fn is_validation(&self) -> bool {
        matches!(*self, Error::Validation(..))
    }
    /// Returns true for `Error::Io`
    pub fn is_io(&self) -> bool {
        matches!(*self, Error::Io(..))
    }
    /// Returns true for `Error::State`
    pub fn is_state(&self) -> bool {
        matches!(*self, Error::State(..))
    }
}

/// A trait which represents an error which can be formatted as HTTP error page
pub trait HttpError {
    /// Return HTTP status code and status text
    ///
    /// The status text and code are also printed on the error page itself
    fn http_status(&self) -> (u16, &'static str);
}

impl HttpError for Error {
    fn http_status(&self) -> (u16, &'static str) {
        use self::Error::*;
        match *self {
            Validation(_) => (400, "Bad Request"),
            State(_) => (409, "Conflict"),
            Io(..) => (500, "Internal Server Error"),
        }
    }
}
