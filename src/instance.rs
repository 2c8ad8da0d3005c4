use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use http::Method;
use log::{debug, trace};

use crate::handler::{Chain, Handler, Loopback, Transport};
use crate::hooks::HookPhase;
use crate::merge::merge_options;
use crate::options::keys;
use crate::{Options, Value};

/// An `Instance` to make requests with.
///
/// An instance is bound to one [`Defaults`] value: its options, its handler
/// chain and its mutability policy. Derived instances are created with
/// [`extend`](Instance::extend) and [`create`](Instance::create); they own a
/// copy of the options, so no instance can change the defaults of another.
///
/// Cloning an `Instance` is cheap and yields a handle to the same defaults.
///
/// # Examples
///
/// ```rust
/// # fn run() -> Result<(), reqwest_defaults::Error> {
/// use reqwest_defaults::{CreateSpec, Options};
///
/// let api = reqwest_defaults::create(
///     CreateSpec::new().options(
///         Options::builder()
///             .base_url("https://api.example.com")
///             .header("accept", "application/json")
///             .build()?,
///     ),
/// );
///
/// let v2 = api.extend(&Options::builder().set("base_url", "v2").build()?);
/// assert_eq!(
///     v2.defaults().options().base_url().unwrap().as_str(),
///     "https://api.example.com/v2/"
/// );
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
#[derive(Clone)]
pub struct Instance {
    inner: Arc<InstanceRef>,
}

struct InstanceRef {
    defaults: RwLock<Defaults>,
}

/// The stored options, handler chain and mutability policy of an `Instance`.
pub struct Defaults {
    options: Options,
    handler: Chain,
    mutable: bool,
}

/// A `CreateSpec` describes the `Defaults` of an instance to create.
///
/// Every part is optional: options default to an empty tree, the handler
/// chain to the transport alone, and the policy to immutable.
#[must_use]
#[derive(Default)]
pub struct CreateSpec {
    options: Option<Options>,
    handler: Option<Handler>,
    mutable: Option<bool>,
    transport: Option<Arc<dyn Transport>>,
}

/// Read access to the defaults of an instance.
pub struct DefaultsRef<'a> {
    guard: RwLockReadGuard<'a, Defaults>,
}

/// Write access to the defaults of an instance.
///
/// Writes only succeed if the instance was created with a mutable policy.
pub struct DefaultsMut<'a> {
    guard: RwLockWriteGuard<'a, Defaults>,
}

/// Create a new root `Instance`.
///
/// The handler of `spec`, if any, is installed in front of the transport of
/// `spec`, or in front of [`Loopback`] if none is given.
pub fn create(spec: CreateSpec) -> Instance {
    let transport = spec
        .transport
        .clone()
        .unwrap_or_else(|| Arc::new(Loopback) as Arc<dyn Transport>);
    let chain = Chain::from_transport(transport);
    Instance::from_spec(spec, chain)
}

/// Merge several instances into one.
///
/// The options of every instance are merged left to right, and their
/// handlers run in the same order, ahead of the transport of the first
/// instance. The merged instance is immutable. Returns `None` for an empty
/// slice.
pub fn merge_instances(instances: &[&Instance]) -> Option<Instance> {
    let (first, _) = instances.split_first()?;

    let mut options = Options::new();
    let mut chains = Vec::with_capacity(instances.len());
    for instance in instances {
        let defaults = instance.defaults();
        options = merge_options(&options, defaults.options());
        chains.push(defaults.handler().clone());
    }

    let transport = first.defaults().handler().transport().clone();
    let chain = Chain::concat(&chains, transport);
    debug!("merged {} instances into {} handler(s)", instances.len(), chain.depth());

    Some(Instance::new(Defaults::new(options, chain, false)))
}

// ===== impl Defaults =====

impl Defaults {
    fn new(options: Options, handler: Chain, mutable: bool) -> Defaults {
        let options = if mutable { options } else { options.lock() };
        Defaults {
            options,
            handler,
            mutable,
        }
    }

    /// The stored options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The handler chain.
    pub fn handler(&self) -> &Chain {
        &self.handler
    }

    /// Returns true if these defaults may be changed in place.
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }
}

impl fmt::Debug for Defaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defaults")
            .field("options", &self.options)
            .field("handler", &self.handler)
            .field("mutable", &self.mutable)
            .finish()
    }
}

impl Deref for DefaultsRef<'_> {
    type Target = Defaults;

    fn deref(&self) -> &Defaults {
        &self.guard
    }
}

impl Deref for DefaultsMut<'_> {
    type Target = Defaults;

    fn deref(&self) -> &Defaults {
        &self.guard
    }
}

impl DefaultsMut<'_> {
    /// Get the stored options for writing.
    ///
    /// # Errors
    ///
    /// Fails if the instance is not mutable.
    pub fn options_mut(&mut self) -> crate::Result<&mut Options> {
        if self.guard.options.is_locked() {
            debug!("rejected write to immutable defaults");
            return Err(crate::error::immutable("options"));
        }
        Ok(&mut self.guard.options)
    }

    /// Set `key` in the stored options, returning the previous value.
    ///
    /// # Errors
    ///
    /// Fails if the instance is not mutable.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> crate::Result<Option<Value>>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.guard.options.insert(key, value)
    }
}

// ===== impl CreateSpec =====

impl CreateSpec {
    /// Constructs an empty `CreateSpec`.
    pub fn new() -> CreateSpec {
        CreateSpec::default()
    }

    /// Set the options of the new instance.
    pub fn options(mut self, options: Options) -> CreateSpec {
        self.options = Some(options);
        self
    }

    /// Install a handler in front of the inherited chain.
    pub fn handler(mut self, handler: Handler) -> CreateSpec {
        self.handler = Some(handler);
        self
    }

    /// Set the mutability policy.
    ///
    /// This wins over a `mutable_defaults` key in the options.
    pub fn mutable(mut self, mutable: bool) -> CreateSpec {
        self.mutable = Some(mutable);
        self
    }

    /// Set the transport the handler chain ends in.
    ///
    /// On a derived [`Instance::create`], this starts a new chain instead of
    /// extending the parent's.
    pub fn transport<T>(mut self, transport: T) -> CreateSpec
    where
        T: Transport + 'static,
    {
        self.transport = Some(Arc::new(transport));
        self
    }
}

impl fmt::Debug for CreateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateSpec")
            .field("options", &self.options)
            .field("handler", &self.handler)
            .field("mutable", &self.mutable)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

// ===== impl Instance =====

impl Instance {
    fn new(defaults: Defaults) -> Instance {
        Instance {
            inner: Arc::new(InstanceRef {
                defaults: RwLock::new(defaults),
            }),
        }
    }

    fn from_spec(spec: CreateSpec, chain: Chain) -> Instance {
        let mut options = spec.options.as_ref().map(Options::fresh).unwrap_or_default();
        let from_options = options.take_mutable_defaults();
        let mutable = spec.mutable.or(from_options).unwrap_or(false);

        let chain = match spec.handler {
            Some(handler) => chain.with(handler),
            None => chain,
        };
        trace!("created instance with {} handler(s), mutable: {}", chain.depth(), mutable);
        Instance::new(Defaults::new(options, chain, mutable))
    }

    /// Create a new instance whose handler runs in front of this instance's
    /// handler chain.
    ///
    /// The options of `spec` are taken as they are, they are not merged with
    /// this instance's options. Use [`extend`](Instance::extend) for that.
    pub fn create(&self, spec: CreateSpec) -> Instance {
        let chain = match spec.transport {
            Some(ref transport) => Chain::from_transport(transport.clone()),
            None => self.defaults().handler().clone(),
        };
        Instance::from_spec(spec, chain)
    }

    /// Create a new instance with `overrides` merged into this instance's
    /// options.
    ///
    /// The handler chain is shared unchanged. A boolean `mutable_defaults` key
    /// in `overrides` sets the policy of the new instance, otherwise the
    /// policy of this instance is kept.
    pub fn extend(&self, overrides: &Options) -> Instance {
        let defaults = self.defaults();
        let mut options = merge_options(defaults.options(), overrides);
        let mutable = options
            .take_mutable_defaults()
            .unwrap_or_else(|| defaults.is_mutable());
        let chain = defaults.handler().clone();
        drop(defaults);

        trace!("extended instance, mutable: {mutable}");
        Instance::new(Defaults::new(options, chain, mutable))
    }

    /// Call this instance with `options` merged over its defaults.
    ///
    /// The merged options are never locked. `init` hooks run on them first,
    /// then the handler chain.
    ///
    /// # Errors
    ///
    /// Errors from hooks, handlers or the transport are returned unchanged.
    pub fn call(&self, options: &Options) -> crate::Result<Value> {
        let (mut options, chain) = {
            let defaults = self.defaults();
            (
                merge_options(defaults.options(), options),
                defaults.handler().clone(),
            )
        };
        options.run_hooks(HookPhase::Init)?;
        chain.dispatch(options)
    }

    /// Call this instance with the method and url of a request set.
    ///
    /// # Errors
    ///
    /// Errors from hooks, handlers or the transport are returned unchanged.
    pub fn request(&self, method: Method, url: &str, options: &Options) -> crate::Result<Value> {
        let overrides: Options = [
            (keys::METHOD, Value::from(method.as_str())),
            (keys::URL, Value::from(url)),
        ]
        .into_iter()
        .collect();
        self.call(&merge_options(options, &overrides))
    }

    /// Convenience method to make a `GET` request to a URL.
    pub fn get(&self, url: &str) -> crate::Result<Value> {
        self.request(Method::GET, url, &Options::new())
    }

    /// Convenience method to make a `POST` request to a URL.
    pub fn post(&self, url: &str) -> crate::Result<Value> {
        self.request(Method::POST, url, &Options::new())
    }

    /// Convenience method to make a `PUT` request to a URL.
    pub fn put(&self, url: &str) -> crate::Result<Value> {
        self.request(Method::PUT, url, &Options::new())
    }

    /// Convenience method to make a `PATCH` request to a URL.
    pub fn patch(&self, url: &str) -> crate::Result<Value> {
        self.request(Method::PATCH, url, &Options::new())
    }

    /// Convenience method to make a `DELETE` request to a URL.
    pub fn delete(&self, url: &str) -> crate::Result<Value> {
        self.request(Method::DELETE, url, &Options::new())
    }

    /// Convenience method to make a `HEAD` request to a URL.
    pub fn head(&self, url: &str) -> crate::Result<Value> {
        self.request(Method::HEAD, url, &Options::new())
    }

    /// Read the defaults of this instance.
    ///
    /// Holding the returned guard blocks writers of a mutable instance.
    pub fn defaults(&self) -> DefaultsRef<'_> {
        DefaultsRef {
            guard: self
                .inner
                .defaults
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Write to the defaults of this instance.
    ///
    /// Writes are visible to every later call through this instance. They
    /// fail unless the instance is mutable.
    pub fn defaults_mut(&self) -> DefaultsMut<'_> {
        DefaultsMut {
            guard: self
                .inner
                .defaults
                .write()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("defaults", &*self.defaults())
            .finish()
    }
}
