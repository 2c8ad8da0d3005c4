//! The handler chain
//!
//! Every [`Instance`](crate::Instance) owns a [`Chain`]: a singly-linked
//! list of [`Handler`]s, most recently installed first, that ends in a
//! [`Transport`]. Calling an instance dispatches the merged per-call options
//! to the head of the chain. Each handler gets a [`Next`] continuation bound
//! to the link below it, and decides whether to call it.
//!
//! ```
//! use reqwest_defaults::{Chain, Handler, Options};
//!
//! let chain = Chain::loopback().with(Handler::named("unicorn", |mut options, next| {
//!     options.set_header("unicorn", "rainbow")?;
//!     next.run(options)
//! }));
//!
//! assert_eq!(chain.names(), ["unicorn"]);
//!
//! let sent = chain.dispatch(Options::new()).unwrap();
//! assert_eq!(sent.as_map().unwrap().header("unicorn"), Some("rainbow"));
//! ```

use std::fmt;
use std::sync::Arc;

use log::trace;

use crate::{Options, Value};

/// The terminal link of a handler chain, executing the actual exchange.
///
/// Implementations own everything this crate leaves out: connections,
/// retries, body handling. The value they return, or the error they raise,
/// is passed back to the caller of the instance unchanged.
pub trait Transport: Send + Sync {
    /// Execute a request described by the fully merged `options`.
    fn execute(&self, options: Options) -> crate::Result<Value>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, options: Options) -> crate::Result<Value> {
        (**self).execute(options)
    }
}

/// A `Transport` that sends nothing, and returns the options it was given
/// as a `Value::Map`.
///
/// This is the transport of instances created without one.
#[derive(Clone, Copy, Debug, Default)]
pub struct Loopback;

impl Transport for Loopback {
    fn execute(&self, options: Options) -> crate::Result<Value> {
        Ok(Value::Map(options))
    }
}

type BoxHandlerFn = dyn Fn(Options, Next<'_>) -> crate::Result<Value> + Send + Sync;

/// A link of the handler chain.
///
/// A handler receives the options of the current call, which it may change
/// freely, and a [`Next`] to delegate to the rest of the chain. Not calling
/// `next` short-circuits the chain, and the handler's return value becomes
/// the result of the call.
#[derive(Clone)]
pub struct Handler {
    name: Option<&'static str>,
    func: Arc<BoxHandlerFn>,
}

impl Handler {
    /// Create a handler from a closure.
    pub fn new<F>(func: F) -> Handler
    where
        F: Fn(Options, Next<'_>) -> crate::Result<Value> + Send + Sync + 'static,
    {
        Handler {
            name: None,
            func: Arc::new(func),
        }
    }

    /// Create a handler with a name, shown by [`Chain::names`] and in logs.
    pub fn named<F>(name: &'static str, func: F) -> Handler
    where
        F: Fn(Options, Next<'_>) -> crate::Result<Value> + Send + Sync + 'static,
    {
        Handler {
            name: Some(name),
            ..Handler::new(func)
        }
    }

    /// The name of this handler, or `"<anonymous>"`.
    pub fn name(&self) -> &'static str {
        self.name.unwrap_or("<anonymous>")
    }

    fn call(&self, options: Options, next: Next<'_>) -> crate::Result<Value> {
        (self.func)(options, next)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.name()).finish()
    }
}

/// The continuation handed to a [`Handler`].
pub struct Next<'a> {
    node: &'a Node,
}

impl Next<'_> {
    /// Pass `options` to the rest of the chain.
    pub fn run(self, options: Options) -> crate::Result<Value> {
        self.node.dispatch(options)
    }

    /// The number of handlers left before the transport.
    pub fn remaining(&self) -> usize {
        self.node.depth()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.remaining())
            .finish()
    }
}

enum Node {
    Link { handler: Handler, next: Arc<Node> },
    Terminal(Arc<dyn Transport>),
}

impl Node {
    fn dispatch(&self, options: Options) -> crate::Result<Value> {
        match self {
            Node::Link { handler, next } => {
                trace!("dispatching to handler {}", handler.name());
                handler.call(options, Next { node: &**next })
            }
            Node::Terminal(transport) => {
                trace!("dispatching to transport");
                transport.execute(options)
            }
        }
    }

    fn depth(&self) -> usize {
        self.links().count()
    }

    fn links(&self) -> Links<'_> {
        Links { node: self }
    }

    fn transport(&self) -> &Arc<dyn Transport> {
        let mut node = self;
        loop {
            match node {
                Node::Link { next, .. } => node = &**next,
                Node::Terminal(transport) => return transport,
            }
        }
    }
}

struct Links<'a> {
    node: &'a Node,
}

impl<'a> Iterator for Links<'a> {
    type Item = &'a Handler;

    fn next(&mut self) -> Option<&'a Handler> {
        let node: &'a Node = self.node;
        match node {
            Node::Link { handler, next } => {
                self.node = &**next;
                Some(handler)
            }
            Node::Terminal(_) => None,
        }
    }
}

/// An ordered, immutable list of handlers ending in a [`Transport`].
///
/// Adding a handler returns a new chain that shares every existing link, so
/// chains of derived instances are cheap and never affect each other.
#[derive(Clone)]
pub struct Chain {
    head: Arc<Node>,
}

impl Chain {
    /// A chain with no handlers, dispatching straight to `transport`.
    pub fn new<T>(transport: T) -> Chain
    where
        T: Transport + 'static,
    {
        Chain::from_transport(Arc::new(transport))
    }

    /// A chain with no handlers over [`Loopback`].
    pub fn loopback() -> Chain {
        Chain::new(Loopback)
    }

    pub(crate) fn from_transport(transport: Arc<dyn Transport>) -> Chain {
        Chain {
            head: Arc::new(Node::Terminal(transport)),
        }
    }

    /// Returns a new chain with `handler` installed in front of this one.
    pub fn with(&self, handler: Handler) -> Chain {
        Chain {
            head: Arc::new(Node::Link {
                handler,
                next: self.head.clone(),
            }),
        }
    }

    /// The number of handlers in front of the transport.
    pub fn depth(&self) -> usize {
        self.head.depth()
    }

    /// The handlers of this chain, in dispatch order.
    pub fn handlers(&self) -> impl Iterator<Item = &Handler> {
        self.head.links()
    }

    /// The names of the handlers of this chain, in dispatch order.
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers().map(Handler::name).collect()
    }

    /// The transport this chain ends in.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        self.head.transport()
    }

    /// Run `options` through the chain.
    pub fn dispatch(&self, options: Options) -> crate::Result<Value> {
        self.head.dispatch(options)
    }

    /// Concatenate the handlers of `chains` in order, over `transport`.
    pub(crate) fn concat(chains: &[Chain], transport: Arc<dyn Transport>) -> Chain {
        let handlers: Vec<&Handler> = chains.iter().flat_map(Chain::handlers).collect();
        handlers
            .into_iter()
            .rev()
            .fold(Chain::from_transport(transport), |chain, handler| {
                chain.with(handler.clone())
            })
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("handlers", &self.names())
            .finish()
    }
}
