use std::error::Error as StdError;
use std::fmt;

/// A `Result` alias where the `Err` case is `reqwest_defaults::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// The Errors that may occur when composing defaults or invoking an `Instance`.
///
/// Errors raised by a handler or a transport are returned from
/// [`Instance::call`](crate::Instance::call) exactly as they were created.
pub struct Error {
    inner: Box<Inner>,
}

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
    key: Option<String>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
                key: None,
            }),
        }
    }

    /// Create an error to be returned from a handler.
    ///
    /// The error is passed through the handler chain untouched, so the
    /// caller of the instance can downcast the source again.
    pub fn handler<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Handler, Some(e))
    }

    /// Create an error to be returned from a `Transport`.
    pub fn transport<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Transport, Some(e))
    }

    /// Returns the options key related to this error, if any.
    pub fn key(&self) -> Option<&str> {
        self.inner.key.as_deref()
    }

    pub(crate) fn with_key(mut self, key: impl Into<String>) -> Self {
        self.inner.key = Some(key.into());
        self
    }

    /// Returns true if the error is from a type Builder.
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if the error is from writing to locked defaults.
    pub fn is_immutable(&self) -> bool {
        matches!(self.inner.kind, Kind::Immutable)
    }

    /// Returns true if the error was raised by a handler.
    pub fn is_handler(&self) -> bool {
        matches!(self.inner.kind, Kind::Handler)
    }

    /// Returns true if the error was raised by a transport.
    pub fn is_transport(&self) -> bool {
        matches!(self.inner.kind, Kind::Transport)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("reqwest_defaults::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref key) = self.inner.key {
            builder.field("key", key);
        }
        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.kind {
            Kind::Builder => f.write_str("builder error")?,
            Kind::Immutable => f.write_str("immutable defaults")?,
            Kind::Handler => f.write_str("handler error")?,
            Kind::Transport => f.write_str("transport error")?,
        }

        if let Some(key) = &self.inner.key {
            write!(f, " for key ({key})")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

#[derive(Debug)]
pub(crate) enum Kind {
    Builder,
    Immutable,
    Handler,
    Transport,
}

// constructors

pub(crate) fn builder<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Builder, Some(e))
}

pub(crate) fn immutable(key: &str) -> Error {
    Error::new(Kind::Immutable, None::<Error>).with_key(key)
}

pub(crate) fn url_no_host(url: url::Url) -> Error {
    builder(NoHost).with_key(url.as_str())
}

#[derive(Debug)]
pub(crate) struct NoHost;

impl fmt::Display for NoHost {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("base URL must be absolute with a host")
    }
}

impl StdError for NoHost {}

#[derive(Debug)]
pub(crate) struct NotAnObject;

impl fmt::Display for NotAnObject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("options document must be a JSON object")
    }
}

impl StdError for NotAnObject {}
