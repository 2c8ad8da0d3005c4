#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # reqwest-defaults
//!
//! The `reqwest-defaults` crate lets an HTTP client be specialized into
//! derived clients with layered, inheritable defaults.
//!
//! An [`Instance`] is bound to its [`Defaults`]: an options tree, a handler
//! chain and a mutability policy. Derived instances never share mutable
//! state with their parent or their siblings.
//!
//! - [`Instance::extend`] merges options into a copy of the parent's,
//! - [`Instance::create`] installs a handler in front of the parent's chain,
//! - [`Instance::call`] merges per-call options and runs the chain, which
//!   ends in a [`Transport`] that performs the actual exchange.
//!
//! ## Merging
//!
//! Options are merged key by key, see [`merge_options`]. Mappings such as
//! `headers` merge recursively, hook lists are concatenated, a `base_url`
//! resolves relative overrides against itself, and every other value is
//! replaced.
//!
//! ```rust
//! # fn run() -> Result<(), reqwest_defaults::Error> {
//! use reqwest_defaults::{CreateSpec, Options};
//!
//! let client = reqwest_defaults::create(
//!     CreateSpec::new().options(
//!         Options::builder()
//!             .base_url("https://example.com")
//!             .header("accept", "application/json")
//!             .build()?,
//!     ),
//! );
//!
//! let foo = client.extend(
//!     &Options::builder()
//!         .set("base_url", "/foo")
//!         .header("x-api-key", "secret")
//!         .build()?,
//! );
//!
//! let defaults = foo.defaults();
//! assert_eq!(defaults.options().base_url().unwrap().as_str(), "https://example.com/foo/");
//! assert_eq!(defaults.options().header("accept"), Some("application/json"));
//! assert_eq!(defaults.options().header("x-api-key"), Some("secret"));
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```
//!
//! ## Immutability
//!
//! Unless an instance is created with a mutable policy, its options are
//! locked, and writes fail:
//!
//! ```rust
//! let client = reqwest_defaults::create(Default::default());
//! let err = client.defaults_mut().insert("timeout", 10).unwrap_err();
//! assert!(err.is_immutable());
//! ```
//!
//! ## Optional Features
//!
//! The following are a list of [Cargo features][cargo-features] that can be
//! enabled or disabled:
//!
//! - **json** *(enabled by default)*: Provides loading options from, and
//!   rendering them to, JSON.
//!
//! [cargo-features]: https://doc.rust-lang.org/stable/cargo/reference/manifest.html#the-features-section

use once_cell::sync::Lazy;

pub use http::Method;
pub use url::Url;

pub use self::error::{Error, Result};
pub use self::handler::{Chain, Handler, Loopback, Next, Transport};
pub use self::hooks::{Hook, HookPhase, OptionsHook};
pub use self::instance::{
    create, merge_instances, CreateSpec, Defaults, DefaultsMut, DefaultsRef, Instance,
};
pub use self::into_url::IntoUrl;
pub use self::merge::{merge_all, merge_options};
pub use self::options::{keys, lock, Options, OptionsBuilder};
pub use self::value::{Opaque, Value};

mod error;
mod handler;
pub mod hooks;
mod instance;
mod into_url;
mod merge;
mod options;
mod util;
mod value;

static DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

static ROOT: Lazy<Instance> = Lazy::new(|| create(CreateSpec::new().options(root_options())));

fn root_options() -> Options {
    let headers: Options = [("user-agent", DEFAULT_USER_AGENT)].into_iter().collect();
    let hooks: Options = HookPhase::ALL
        .iter()
        .map(|phase| (phase.as_str(), Value::Hooks(Vec::new())))
        .collect();

    [(keys::HEADERS, Value::Map(headers)), (keys::HOOKS, Value::Map(hooks))]
        .into_iter()
        .collect()
}

/// The root `Instance`.
///
/// It is created on first use and never replaced. Its options carry a
/// `user-agent` header and an empty hook list for every phase, its chain
/// ends in [`Loopback`], and it is immutable.
pub fn root() -> &'static Instance {
    &ROOT
}

/// Shortcut to extend the root `Instance`.
///
/// ```rust
/// use reqwest_defaults::Options;
///
/// let client = reqwest_defaults::extend(&Options::new());
/// assert!(client.defaults().options().header("user-agent").is_some());
/// ```
pub fn extend(overrides: &Options) -> Instance {
    root().extend(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_created_once() {
        assert!(std::ptr::eq(root(), root()));
        assert!(!root().defaults().is_mutable());
        assert_eq!(root().defaults().handler().depth(), 0);
    }

    #[test]
    fn root_has_user_agent_and_empty_hooks() {
        let defaults = root().defaults();
        assert_eq!(defaults.options().header("user-agent"), Some(DEFAULT_USER_AGENT));
        for phase in HookPhase::ALL {
            assert!(defaults.options().hooks(phase).is_empty());
            assert!(defaults
                .options()
                .get_map(keys::HOOKS)
                .unwrap()
                .contains_key(phase.as_str()));
        }
    }

    #[test]
    fn extend_never_touches_root() {
        let before = root().defaults().options().clone();
        let _child = extend(&[("user", "a")].into_iter().collect());
        assert_eq!(*root().defaults().options(), before);
    }
}
