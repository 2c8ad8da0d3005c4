//! A recording transport for the integration tests.

use std::sync::{Arc, Mutex};

use reqwest_defaults::{Options, Transport, Value};

/// Remembers every options tree it executes, and answers with a fixed value.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Options>>>,
}

impl Recorder {
    pub fn new() -> Recorder {
        Recorder::default()
    }

    pub fn calls(&self) -> Vec<Options> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last(&self) -> Options {
        self.calls()
            .pop()
            .expect("transport should have been called")
    }
}

impl Transport for Recorder {
    fn execute(&self, options: Options) -> reqwest_defaults::Result<Value> {
        self.calls.lock().unwrap().push(options);
        Ok(Value::from("sent"))
    }
}

/// Always fails with an io error.
pub struct Refused;

impl Transport for Refused {
    fn execute(&self, _: Options) -> reqwest_defaults::Result<Value> {
        Err(reqwest_defaults::Error::transport(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }
}
