//! The options tree
//!
//! An [`Options`] value is a mapping from string keys to [`Value`]s, nested
//! as deep as needed. The same shape is used for the stored defaults of an
//! [`Instance`](crate::Instance) and for the options passed to a single
//! call, so any key the transport understands may appear in either place.
//!
//! A tree can be *locked*. Every write to a locked mapping, at any depth,
//! fails with an error for which [`Error::is_immutable`](crate::Error::is_immutable)
//! returns true, and leaves the tree unchanged.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use log::debug;

use crate::hooks::{Hook, HookPhase};
use crate::into_url::IntoUrl;
use crate::Value;

/// Well-known keys of an options tree.
pub mod keys {
    /// Mapping of lowercase header names to header values.
    pub const HEADERS: &str = "headers";
    /// Base URL that request URLs and extending base URLs resolve against.
    pub const BASE_URL: &str = "base_url";
    /// Mapping of hook phase names to hook lists.
    pub const HOOKS: &str = "hooks";
    /// The HTTP method of a request.
    pub const METHOD: &str = "method";
    /// The URL of a request.
    pub const URL: &str = "url";
    /// Mutability policy, consumed when an instance is created or extended.
    pub const MUTABLE_DEFAULTS: &str = "mutable_defaults";
}

/// A configuration tree.
///
/// Cloning yields an unlocked copy. Only the defaults of an immutable
/// [`Instance`](crate::Instance) are ever locked.
#[derive(Default)]
pub struct Options {
    entries: BTreeMap<String, Value>,
    locked: bool,
}

/// A builder to construct an [`Options`] tree.
///
/// Errors from invalid headers or URLs are deferred until [`build`](OptionsBuilder::build).
#[must_use]
pub struct OptionsBuilder {
    inner: crate::Result<Options>,
}

/// Lock `options` and every mapping nested inside it.
pub fn lock(options: Options) -> Options {
    options.lock()
}

impl Options {
    /// Constructs an empty, unlocked tree.
    pub fn new() -> Options {
        Options::default()
    }

    /// Creates an `OptionsBuilder`.
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
    }

    /// Returns the number of keys at this level.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no keys at this level.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if this mapping rejects writes.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Returns true if `key` is present at this level.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Get the value of `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Get a mutable reference to the value of `key`.
    ///
    /// # Errors
    ///
    /// Fails if this mapping is locked.
    pub fn get_mut(&mut self, key: &str) -> crate::Result<Option<&mut Value>> {
        self.check_writable(key)?;
        Ok(self.entries.get_mut(key))
    }

    /// Get the nested mapping at `key`, if the value is one.
    pub fn get_map(&self, key: &str) -> Option<&Options> {
        self.get(key).and_then(Value::as_map)
    }

    /// Get the nested mapping at `key` for writing, inserting an empty one
    /// if the key is missing, `Unset` or `Null`.
    ///
    /// # Errors
    ///
    /// Fails if this mapping or the nested one is locked, or if the key
    /// holds a value that is not a mapping.
    pub fn map_mut(&mut self, key: &str) -> crate::Result<&mut Options> {
        self.check_writable(key)?;
        let slot = self.entries.entry(key.to_owned()).or_insert(Value::Unset);
        if slot.is_unset() || slot.is_null() {
            *slot = Value::Map(Options::new());
        }
        match slot {
            Value::Map(map) if map.locked => Err(crate::error::immutable(key)),
            Value::Map(map) => Ok(map),
            other => Err(crate::error::builder(format!(
                "expected a mapping, found {other:?}"
            ))
            .with_key(key)),
        }
    }

    /// Set `key` to `value`, returning the previous value.
    ///
    /// # Errors
    ///
    /// Fails if this mapping is locked.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> crate::Result<Option<Value>>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let key = key.into();
        self.check_writable(&key)?;
        Ok(self.entries.insert(key, value.into()))
    }

    /// Remove `key`, returning its value.
    ///
    /// # Errors
    ///
    /// Fails if this mapping is locked.
    pub fn remove(&mut self, key: &str) -> crate::Result<Option<Value>> {
        self.check_writable(key)?;
        Ok(self.entries.remove(key))
    }

    /// An iterator over the keys and values at this level, sorted by key.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    /// An iterator over the keys at this level, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The `headers` mapping, if present.
    pub fn headers(&self) -> Option<&Options> {
        self.get_map(keys::HEADERS)
    }

    /// Get a header value by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers()
            .and_then(|h| h.get(&name))
            .and_then(Value::as_str)
    }

    /// Set a header in the `headers` mapping.
    ///
    /// The name is validated and stored lowercase.
    ///
    /// # Errors
    ///
    /// Fails if the name or value is not a valid header, or if the tree is
    /// locked.
    pub fn set_header<K, V>(&mut self, key: K, value: V) -> crate::Result<()>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let name = HeaderName::try_from(key).map_err(|e| {
            let e: http::Error = e.into();
            crate::error::builder(e)
        })?;
        let value = HeaderValue::try_from(value).map_err(|e| {
            let e: http::Error = e.into();
            crate::error::builder(e).with_key(name.as_str())
        })?;
        self.put_header(&name, &value)
    }

    fn put_header(&mut self, name: &HeaderName, value: &HeaderValue) -> crate::Result<()> {
        let value = value
            .to_str()
            .map_err(|e| crate::error::builder(e).with_key(name.as_str()))?;
        self.map_mut(keys::HEADERS)?
            .insert(name.as_str(), value)
            .map(drop)
    }

    /// The base URL, if one is set.
    pub fn base_url(&self) -> Option<&url::Url> {
        self.get(keys::BASE_URL).and_then(Value::as_url)
    }

    /// The hooks registered for `phase`, in invocation order.
    pub fn hooks(&self, phase: HookPhase) -> &[Hook] {
        self.get_map(keys::HOOKS)
            .and_then(|hooks| hooks.get(phase.as_str()))
            .and_then(Value::as_hooks)
            .unwrap_or(&[])
    }

    /// Append a hook to the list of `phase`.
    ///
    /// # Errors
    ///
    /// Fails if the tree is locked, or if `hooks` is not a mapping.
    pub fn add_hook(&mut self, phase: HookPhase, hook: Hook) -> crate::Result<()> {
        let hooks = self.map_mut(keys::HOOKS)?;
        match hooks.get_mut(phase.as_str())? {
            Some(Value::Hooks(list)) => {
                list.push(hook);
                Ok(())
            }
            _ => hooks.insert(phase.as_str(), vec![hook]).map(drop),
        }
    }

    /// Run every hook of `phase` against these options, in order.
    ///
    /// The list is read once before the first hook runs; hooks added by a
    /// running hook take effect on the next run.
    ///
    /// # Errors
    ///
    /// Stops at the first failing hook and returns its error unchanged.
    pub fn run_hooks(&mut self, phase: HookPhase) -> crate::Result<()> {
        let hooks = self.hooks(phase).to_vec();
        if !hooks.is_empty() {
            log::trace!("running {} {} hook(s)", hooks.len(), phase);
        }
        for hook in hooks {
            hook.call(self)?;
        }
        Ok(())
    }

    /// Lock this mapping and every mapping nested inside it.
    pub fn lock(mut self) -> Options {
        self.lock_in_place();
        self
    }

    pub(crate) fn lock_in_place(&mut self) {
        self.locked = true;
        self.entries.values_mut().for_each(Value::lock_in_place);
    }

    /// A deep, unlocked copy with every `Unset` removed.
    pub(crate) fn fresh(&self) -> Options {
        Options {
            entries: self
                .entries
                .iter()
                .filter_map(|(k, v)| v.fresh().map(|v| (k.clone(), v)))
                .collect(),
            locked: false,
        }
    }

    /// Removes `mutable_defaults` from an unlocked tree, returning the policy
    /// it carried.
    pub(crate) fn take_mutable_defaults(&mut self) -> Option<bool> {
        if self.locked {
            return None;
        }
        match self.entries.remove(keys::MUTABLE_DEFAULTS) {
            Some(Value::Bool(mutable)) => Some(mutable),
            Some(Value::Unset) | None => None,
            Some(other) => {
                debug!("ignoring non-boolean {}: {:?}", keys::MUTABLE_DEFAULTS, other);
                None
            }
        }
    }

    fn check_writable(&self, key: &str) -> crate::Result<()> {
        if self.locked {
            debug!("rejected write to locked options key {key:?}");
            return Err(crate::error::immutable(key));
        }
        Ok(())
    }
}

impl Clone for Options {
    fn clone(&self) -> Options {
        Options {
            entries: self.entries.clone(),
            locked: false,
        }
    }
}

// `Unset` entries count as absent.
impl PartialEq for Options {
    fn eq(&self, other: &Options) -> bool {
        let set = |(_, v): &(&String, &Value)| !v.is_unset();
        self.entries.iter().filter(set).eq(other.entries.iter().filter(set))
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Options
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Options {
        Options {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            locked: false,
        }
    }
}

impl<'a> IntoIterator for &'a Options {
    type Item = (&'a str, &'a Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// An iterator over the entries of an [`Options`] mapping.
pub struct Iter<'a> {
    inner: btree_map::Iter<'a, String, Value>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

// ===== impl OptionsBuilder =====

impl OptionsBuilder {
    /// Constructs a new `OptionsBuilder`.
    pub fn new() -> OptionsBuilder {
        OptionsBuilder {
            inner: Ok(Options::new()),
        }
    }

    /// Returns the `Options` built by this builder.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded by a previous builder method.
    pub fn build(self) -> crate::Result<Options> {
        self.inner
    }

    /// Add a header.
    pub fn header<K, V>(self, key: K, value: V) -> OptionsBuilder
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.and_then(|opts| opts.set_header(key, value))
    }

    /// Add a set of headers, replacing any with the same name.
    ///
    /// A name appearing more than once in `headers` keeps its last value.
    pub fn headers(self, headers: HeaderMap) -> OptionsBuilder {
        self.and_then(|opts| {
            for (name, value) in headers.iter() {
                opts.put_header(name, value)?;
            }
            Ok(())
        })
    }

    /// Enable HTTP basic authentication.
    pub fn basic_auth<U, P>(self, username: U, password: Option<P>) -> OptionsBuilder
    where
        U: fmt::Display,
        P: fmt::Display,
    {
        let header_value = crate::util::basic_auth(username, password);
        self.header(AUTHORIZATION, header_value)
    }

    /// Set the base URL.
    ///
    /// # Errors
    ///
    /// `build` fails if the URL cannot be parsed or has no host.
    pub fn base_url<U: IntoUrl>(self, url: U) -> OptionsBuilder {
        self.and_then(|opts| {
            let url = url.into_url()?;
            opts.insert(keys::BASE_URL, url).map(drop)
        })
    }

    /// Append a hook for `phase`.
    pub fn hook(self, phase: HookPhase, hook: Hook) -> OptionsBuilder {
        self.and_then(|opts| opts.add_hook(phase, hook))
    }

    /// Set the mutability policy of the instance these options create or
    /// extend.
    pub fn mutable_defaults(self, mutable: bool) -> OptionsBuilder {
        self.set(keys::MUTABLE_DEFAULTS, mutable)
    }

    /// Set an arbitrary key.
    pub fn set<K, V>(self, key: K, value: V) -> OptionsBuilder
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.and_then(|opts| opts.insert(key, value).map(drop))
    }

    fn and_then<F>(mut self, func: F) -> OptionsBuilder
    where
        F: FnOnce(&mut Options) -> crate::Result<()>,
    {
        if let Ok(ref mut opts) = self.inner {
            if let Err(err) = func(opts) {
                self.inner = Err(err);
            }
        }
        self
    }
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OptionsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner {
            Ok(ref opts) => f.debug_tuple("OptionsBuilder").field(opts).finish(),
            Err(ref err) => f.debug_tuple("OptionsBuilder").field(err).finish(),
        }
    }
}

// ===== json =====

#[cfg(feature = "json")]
#[cfg_attr(docsrs, doc(cfg(feature = "json")))]
impl Options {
    /// Load a tree from a JSON document.
    ///
    /// Objects become mappings. A `base_url` string that parses as an
    /// absolute URL with a host is stored as a URL, so that it resolves when
    /// extended.
    ///
    /// # Errors
    ///
    /// Fails if the document is not a JSON object.
    pub fn from_json(json: serde_json::Value) -> crate::Result<Options> {
        match Value::from(json) {
            Value::Map(map) => Ok(map),
            _ => Err(crate::error::builder(crate::error::NotAnObject)),
        }
    }

    /// Render the JSON-representable part of this tree.
    ///
    /// Hooks, opaque handles and `Unset` are skipped. URLs become strings and
    /// non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .entries
            .iter()
            .filter_map(|(k, v)| value_to_json(v).map(|v| (k.clone(), v)))
            .collect();
        serde_json::Value::Object(map)
    }
}

#[cfg(feature = "json")]
fn value_to_json(value: &Value) -> Option<serde_json::Value> {
    use serde_json::Value as Json;

    Some(match value {
        Value::Unset | Value::Hooks(_) | Value::Opaque(_) => return None,
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(n) => Json::from(*n),
        Value::Float(n) => serde_json::Number::from_f64(*n)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.clone()),
        Value::Url(u) => Json::String(u.as_str().to_owned()),
        Value::Array(items) => Json::Array(items.iter().filter_map(value_to_json).collect()),
        Value::Map(map) => map.to_json(),
    })
}

#[cfg(feature = "json")]
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Value {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(n) => Value::Integer(n),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| {
                        let v = match v {
                            Json::String(s) if k == keys::BASE_URL => base_url_or_string(s),
                            v => Value::from(v),
                        };
                        (k, v)
                    })
                    .collect(),
            ),
        }
    }
}

#[cfg(feature = "json")]
fn base_url_or_string(s: String) -> Value {
    use crate::into_url::IntoUrlSealed;

    match s.as_str().into_url() {
        Ok(url) => Value::Url(url),
        Err(_) => Value::String(s),
    }
}
