#![allow(dead_code)]

pub mod error;
pub mod transport;

use reqwest_defaults::{Options, Value};

pub static DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build an options tree from key/value pairs.
pub fn opts<const N: usize>(entries: [(&str, Value); N]) -> Options {
    entries.into_iter().collect()
}

/// Unwrap the options a `Loopback` transport returned.
pub fn sent(value: Value) -> Options {
    match value {
        Value::Map(options) => options,
        other => panic!("expected options back from the transport, got {other:?}"),
    }
}
