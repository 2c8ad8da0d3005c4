//! Hooks to intercept the options of a request at each lifecycle phase
//!
//! Hooks are stored in the `hooks` mapping of an [`Options`] tree, one
//! ordered list per [`HookPhase`]. Unlike every other list in the tree, hook
//! lists are concatenated when defaults are extended, so a derived instance
//! runs its parent's hooks first and then its own.

use std::fmt;
use std::sync::Arc;

use crate::Options;

/// The lifecycle phase a hook is registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// Called on the merged per-call options, before the handler chain runs.
    Init,
    /// Called by the transport right before sending the request.
    BeforeRequest,
    /// Called by the transport before following a redirect.
    BeforeRedirect,
    /// Called by the transport before retrying a request.
    BeforeRetry,
    /// Called by the transport before surfacing an error.
    BeforeError,
    /// Called by the transport once a response has been received.
    AfterResponse,
}

impl HookPhase {
    /// Every phase, in lifecycle order.
    pub const ALL: [HookPhase; 6] = [
        HookPhase::Init,
        HookPhase::BeforeRequest,
        HookPhase::BeforeRedirect,
        HookPhase::BeforeRetry,
        HookPhase::BeforeError,
        HookPhase::AfterResponse,
    ];

    /// The key of this phase inside the `hooks` mapping.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::Init => "init",
            HookPhase::BeforeRequest => "before_request",
            HookPhase::BeforeRedirect => "before_redirect",
            HookPhase::BeforeRetry => "before_retry",
            HookPhase::BeforeError => "before_error",
            HookPhase::AfterResponse => "after_response",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook that gets called with the options of a request
pub trait OptionsHook: Send + Sync {
    /// Intercept the options and change them in place
    fn intercept(&self, options: &mut Options) -> crate::Result<()>;
}

impl<H: OptionsHook + ?Sized> OptionsHook for Arc<H> {
    fn intercept(&self, options: &mut Options) -> crate::Result<()> {
        (**self).intercept(options)
    }
}

// A blanket impl for closures causes inference issues at the call site,
// so closures go through `HookFn` via `Hook::from_fn`.
struct HookFn<F>(F);

impl<F> OptionsHook for HookFn<F>
where
    F: Fn(&mut Options) -> crate::Result<()> + Send + Sync,
{
    fn intercept(&self, options: &mut Options) -> crate::Result<()> {
        (self.0)(options)
    }
}

/// A registered hook.
///
/// Cloning a `Hook` shares the underlying callback. Two hooks compare equal
/// only when they share the same callback.
#[derive(Clone)]
pub struct Hook {
    inner: Arc<dyn OptionsHook>,
}

impl Hook {
    /// Wrap an [`OptionsHook`] implementation.
    pub fn new<H>(hook: H) -> Hook
    where
        H: OptionsHook + 'static,
    {
        Hook {
            inner: Arc::new(hook),
        }
    }

    /// Create a hook from a closure.
    pub fn from_fn<F>(func: F) -> Hook
    where
        F: Fn(&mut Options) -> crate::Result<()> + Send + Sync + 'static,
    {
        Hook::new(HookFn(func))
    }

    /// Invoke the hook.
    pub fn call(&self, options: &mut Options) -> crate::Result<()> {
        self.inner.intercept(options)
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.inner) as *const ()
    }
}

impl PartialEq for Hook {
    fn eq(&self, other: &Hook) -> bool {
        self.addr() == other.addr()
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hook").field(&self.addr()).finish()
    }
}
