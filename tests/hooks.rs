mod support;

use std::sync::{Arc, Mutex};

use support::transport::Recorder;
use support::*;

use reqwest_defaults::{CreateSpec, Hook, HookPhase, Options, OptionsHook, Transport, Value};

#[derive(Default)]
struct MyHook {
    pub visited: Arc<Mutex<Vec<String>>>,
}

impl OptionsHook for MyHook {
    fn intercept(&self, options: &mut Options) -> reqwest_defaults::Result<()> {
        let phase = options
            .get("phase")
            .and_then(Value::as_str)
            .unwrap_or("init")
            .to_owned();
        self.visited.lock().unwrap().push(phase);
        Ok(())
    }
}

/// Runs the transport-side phases around a loopback exchange.
struct Hooked;

impl Transport for Hooked {
    fn execute(&self, mut options: Options) -> reqwest_defaults::Result<Value> {
        options.insert("phase", "before_request")?;
        options.run_hooks(HookPhase::BeforeRequest)?;
        options.insert("phase", "after_response")?;
        options.run_hooks(HookPhase::AfterResponse)?;
        Ok(Value::Map(options))
    }
}

fn recording(order: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Hook {
    let order = order.clone();
    Hook::from_fn(move |_| {
        order.lock().unwrap().push(name);
        Ok(())
    })
}

#[test]
fn full_hook_chain() {
    let _ = env_logger::try_init();

    let hook = Arc::new(MyHook::default());

    let options = Options::builder()
        .hook(HookPhase::Init, Hook::new(hook.clone()))
        .hook(HookPhase::BeforeRequest, Hook::new(hook.clone()))
        .hook(HookPhase::AfterResponse, Hook::new(hook.clone()))
        .build()
        .unwrap();

    let client = reqwest_defaults::create(CreateSpec::new().transport(Hooked).options(options));
    let res = sent(client.call(&Options::new()).unwrap());

    assert_eq!(res.get("phase"), Some(&Value::from("after_response")));
    assert_eq!(
        *hook.visited.lock().unwrap(),
        ["init", "before_request", "after_response"]
    );
}

#[test]
fn extended_hooks_run_after_parent_hooks() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let h1 = recording(&order, "h1");
    let h2 = recording(&order, "h2");

    let parent = reqwest_defaults::create(CreateSpec::new().options(
        Options::builder().hook(HookPhase::Init, h1.clone()).build().unwrap(),
    ));
    let child = parent.extend(&Options::builder().hook(HookPhase::Init, h2.clone()).build().unwrap());

    assert_eq!(child.defaults().options().hooks(HookPhase::Init), [h1.clone(), h2]);
    assert_eq!(parent.defaults().options().hooks(HookPhase::Init), [h1]);

    child.call(&Options::new()).unwrap();
    assert_eq!(*order.lock().unwrap(), ["h1", "h2"]);
}

#[test]
fn per_call_hooks_run_after_defaults() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let client = reqwest_defaults::create(CreateSpec::new().options(
        Options::builder()
            .hook(HookPhase::Init, recording(&order, "default"))
            .build()
            .unwrap(),
    ));

    let per_call = Options::builder()
        .hook(HookPhase::Init, recording(&order, "call"))
        .build()
        .unwrap();
    client.call(&per_call).unwrap();
    client.call(&Options::new()).unwrap();

    assert_eq!(*order.lock().unwrap(), ["default", "call", "default"]);
    assert_eq!(client.defaults().options().hooks(HookPhase::Init).len(), 1);
}

#[test]
fn init_hook_changes_reach_transport() {
    let recorder = Recorder::new();
    let client = reqwest_defaults::create(
        CreateSpec::new().transport(recorder.clone()).options(
            Options::builder()
                .hook(
                    HookPhase::Init,
                    Hook::from_fn(|options| options.set_header("x-init", "1")),
                )
                .build()
                .unwrap(),
        ),
    );

    client.get("/").unwrap();
    assert_eq!(recorder.last().header("x-init"), Some("1"));
    assert_eq!(client.defaults().options().header("x-init"), None);
}

#[test]
fn failing_init_hook_stops_the_call() {
    let recorder = Recorder::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    let client = reqwest_defaults::create(
        CreateSpec::new().transport(recorder.clone()).options(
            Options::builder()
                .hook(
                    HookPhase::Init,
                    Hook::from_fn(|_| {
                        Err(reqwest_defaults::Error::handler(std::io::Error::new(
                            std::io::ErrorKind::Other,
                            "denied",
                        )))
                    }),
                )
                .hook(HookPhase::Init, recording(&order, "after"))
                .build()
                .unwrap(),
        ),
    );

    let err = client.call(&Options::new()).unwrap_err();
    assert!(err.is_handler());
    assert_eq!(error::inspect(err), ["handler error", "denied"]);
    assert!(order.lock().unwrap().is_empty());
    assert!(recorder.calls().is_empty());
}

#[test]
fn replacing_hooks_with_non_list_drops_them() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let parent = reqwest_defaults::create(CreateSpec::new().options(
        Options::builder()
            .hook(HookPhase::Init, recording(&order, "parent"))
            .build()
            .unwrap(),
    ));

    let child = parent.extend(&opts([(
        "hooks",
        Value::Map(opts([("init", Value::Null)])),
    )]));
    assert!(child.defaults().options().hooks(HookPhase::Init).is_empty());

    child.call(&Options::new()).unwrap();
    assert!(order.lock().unwrap().is_empty());
}
