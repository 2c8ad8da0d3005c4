use url::Url;

/// A trait to try to convert some type into a base `Url`.
///
/// This trait is "sealed", such that only types within reqwest-defaults can
/// implement it.
pub trait IntoUrl: IntoUrlSealed {}

impl IntoUrl for Url {}
impl IntoUrl for String {}
impl<'a> IntoUrl for &'a str {}
impl<'a> IntoUrl for &'a String {}

pub trait IntoUrlSealed {
    // Besides parsing as a valid `Url`, the `Url` must have a host, in that
    // it makes sense to resolve request paths against it.
    fn into_url(self) -> crate::Result<Url>;
}

impl IntoUrlSealed for Url {
    fn into_url(self) -> crate::Result<Url> {
        if self.has_host() {
            Ok(self)
        } else {
            Err(crate::error::url_no_host(self))
        }
    }
}

impl<'a> IntoUrlSealed for &'a str {
    fn into_url(self) -> crate::Result<Url> {
        Url::parse(self)
            .map_err(|e| crate::error::builder(e).with_key(self))?
            .into_url()
    }
}

impl<'a> IntoUrlSealed for &'a String {
    fn into_url(self) -> crate::Result<Url> {
        (&**self).into_url()
    }
}

impl IntoUrlSealed for String {
    fn into_url(self) -> crate::Result<Url> {
        (&*self).into_url()
    }
}

/// Resolve `reference` against `base`, treating `base` as a directory.
///
/// Both the base and the result end with a `/`. Returns `None` when the
/// base cannot hold a path or the reference cannot be parsed.
pub(crate) fn resolve_base(base: &Url, reference: &str) -> Option<Url> {
    if base.cannot_be_a_base() {
        return None;
    }
    let mut base = base.clone();
    ensure_trailing_slash(&mut base);

    let mut joined = base.join(reference).ok()?;
    ensure_trailing_slash(&mut joined);
    Some(joined)
}

fn ensure_trailing_slash(url: &mut Url) {
    if url.cannot_be_a_base() || url.path().ends_with('/') {
        return;
    }
    let path = format!("{}/", url.path());
    url.set_path(&path);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn into_url_requires_host() {
        let err = "data:text/plain,hi".into_url().unwrap_err();
        assert!(err.is_builder());
        assert_eq!(err.to_string(), "builder error for key (data:text/plain,hi)");
    }

    #[test]
    fn into_url_rejects_relative() {
        let err = "/foo".into_url().unwrap_err();
        assert!(err.is_builder());
        assert_eq!(err.key(), Some("/foo"));
    }

    #[test]
    fn resolve_appends_trailing_slash() {
        let joined = resolve_base(&url("https://example.com"), "/foo").unwrap();
        assert_eq!(joined.as_str(), "https://example.com/foo/");
    }

    #[test]
    fn resolve_relative_segment_nests_under_base() {
        let joined = resolve_base(&url("https://example.com/api"), "v2").unwrap();
        assert_eq!(joined.as_str(), "https://example.com/api/v2/");
    }

    #[test]
    fn resolve_absolute_reference_wins() {
        let joined = resolve_base(&url("https://example.com/api/"), "http://other.test/x").unwrap();
        assert_eq!(joined.as_str(), "http://other.test/x/");
    }

    #[test]
    fn resolve_keeps_existing_trailing_slash() {
        let joined = resolve_base(&url("https://example.com/api/"), "v1/").unwrap();
        assert_eq!(joined.as_str(), "https://example.com/api/v1/");
    }

    #[test]
    fn resolve_cannot_be_a_base() {
        assert_eq!(resolve_base(&url("mailto:someone@example.com"), "x"), None);
    }
}
