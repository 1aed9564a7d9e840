use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use tokio_test::{assert_err, assert_ok};

use tern_framework::{
    BoxError, Capability, Client, PluginDescriptor, PluginError, PluginState, RegistrationError,
};

fn noop(name: &str) -> PluginDescriptor {
    PluginDescriptor::new(name, |_| async { Ok(None) })
}

fn client() -> Client {
    Client::builder().build()
}

#[tokio::test]
async fn test_duplicate_name_leaves_registry_unchanged() {
    let client = client();
    assert_ok!(client.use_plugin(noop("a")));
    assert_ok!(client.use_plugin(noop("b")));

    let err = client.use_plugin(noop("a")).unwrap_err();
    assert_eq!(err, RegistrationError::DuplicateName("a".into()));
    assert_eq!(client.plugins().queued(), vec!["a", "b"]);
    assert!(!client.plugins().is_installed("a"));
}

#[tokio::test]
async fn test_duplicate_of_installed_plugin() {
    let client = client();
    assert_ok!(client.use_plugin(noop("a")));
    assert_ok!(client.commit_plugins(&HashMap::new()).await);

    let err = client.use_plugin(noop("a")).unwrap_err();
    assert_eq!(err, RegistrationError::DuplicateName("a".into()));
    assert!(client.plugins().queued().is_empty());
}

#[tokio::test]
async fn test_unusable_names() {
    let client = client();
    assert_eq!(
        client.use_plugin(noop("")).unwrap_err(),
        RegistrationError::EmptyName
    );
    assert_eq!(
        client.use_plugin(noop("session")).unwrap_err(),
        RegistrationError::ReservedName("session".into())
    );
}

#[tokio::test]
async fn test_requirement_must_be_queued_or_installed() {
    let client = client();
    let err = client
        .use_plugin(noop("auth").requires(["x"]))
        .unwrap_err();
    assert_eq!(
        err,
        RegistrationError::MissingDependency {
            plugin: "auth".into(),
            dependency: "x".into()
        }
    );
    assert!(client.plugins().queued().is_empty());

    assert_ok!(client.use_plugin(noop("x")));
    assert_ok!(client.use_plugin(noop("auth").requires(["x"])));
    assert_eq!(client.plugins().queued(), vec!["x", "auth"]);
}

#[tokio::test]
async fn test_setup_after_splices_before_target() {
    let client = client();
    assert_ok!(client.use_plugin(noop("p")));
    assert_ok!(client.use_plugin(noop("x")));
    assert_ok!(client.use_plugin(noop("q")));

    assert_ok!(client.use_plugin(noop("n").setup_after("x")));
    assert_eq!(client.plugins().queued(), vec!["p", "n", "x", "q"]);

    // An absent target appends.
    assert_ok!(client.use_plugin(noop("m").setup_after("missing")));
    assert_eq!(client.plugins().queued(), vec!["p", "n", "x", "q", "m"]);
}

#[tokio::test]
async fn test_commit_enables_and_exposes_capabilities() {
    struct Greeter(String);

    let client = client();
    assert_ok!(client.use_plugin(PluginDescriptor::new("greeter", |ctx| async move {
        let greeting = ctx
            .options()
            .get("greeting")
            .and_then(Value::as_str)
            .unwrap_or("hi")
            .to_string();
        Ok(Some(Arc::new(Greeter(greeting)) as Capability))
    })));
    assert_eq!(client.plugins().state("greeter"), Some(PluginState::Queued));

    assert_ok!(client.commit_plugins(&HashMap::new()).await);

    assert!(client.plugins().queued().is_empty());
    assert!(client.plugins().is_installed("greeter"));
    assert_eq!(client.plugins().state("greeter"), Some(PluginState::Enabled));
    let greeter = client.capability::<Greeter>("greeter").unwrap();
    assert_eq!(greeter.0, "hi");
    assert!(client.capability::<String>("greeter").is_none());
}

#[tokio::test]
async fn test_options_merge_order() {
    let seen: Arc<Mutex<Option<Map<String, Value>>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);

    let client = client();
    let descriptor = PluginDescriptor::new("limits", move |ctx| {
        let sink = Arc::clone(&sink);
        async move {
            *sink.lock() = Some(ctx.options().clone());
            Ok(None)
        }
    })
    .defaults(json!({"a": "default", "b": "default", "c": "default"}));

    assert_ok!(client.register_plugin(descriptor, json!({"b": "registered", "c": "registered"}), true));

    let overrides = HashMap::from([("limits".to_string(), json!({"c": "override"}))]);
    assert_ok!(client.commit_plugins(&overrides).await);

    assert_eq!(
        Value::Object(seen.lock().clone().unwrap()),
        json!({"a": "default", "b": "registered", "c": "override"})
    );
}

#[tokio::test]
async fn test_immediate_install_is_awaited_by_commit() {
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let rx = Arc::new(Mutex::new(Some(rx)));

    let client = client();
    let descriptor = PluginDescriptor::new("slow", move |_| {
        let rx = rx.lock().take();
        async move {
            if let Some(rx) = rx {
                let _ = rx.await;
            }
            Ok(None)
        }
    });
    assert_ok!(client.register_plugin(descriptor, Value::Null, false));

    assert!(client.plugins().is_installed("slow"));
    assert!(client.plugins().queued().is_empty());
    // Requirements may point at an immediately installed plugin.
    assert_ok!(client.use_plugin(noop("after").requires(["slow"])));

    let commit = tokio::spawn({
        let client = client.clone();
        async move { client.commit_plugins(&HashMap::new()).await }
    });
    tx.send(()).unwrap();
    assert_ok!(commit.await.unwrap());
    assert_eq!(client.plugins().state("slow"), Some(PluginState::Enabled));
    assert_eq!(client.plugins().state("after"), Some(PluginState::Enabled));
}

#[test]
fn test_immediate_install_without_runtime_runs_on_commit() {
    let enabled = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&enabled);
    let descriptor = PluginDescriptor::new("offline", move |_| {
        let flag = Arc::clone(&flag);
        async move {
            *flag.lock() = true;
            Ok(None)
        }
    });

    let client = client();
    assert_ok!(client.register_plugin(descriptor, Value::Null, false));
    assert!(client.plugins().is_installed("offline"));
    assert_eq!(client.plugins().state("offline"), Some(PluginState::Enabling));
    assert!(!*enabled.lock());

    assert_ok!(futures::executor::block_on(
        client.commit_plugins(&HashMap::new())
    ));
    assert!(*enabled.lock());
    assert_eq!(client.plugins().state("offline"), Some(PluginState::Enabled));
}

#[tokio::test]
async fn test_commit_runs_queued_enables_concurrently() {
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let rx = Arc::new(Mutex::new(Some(rx)));
    let tx = Arc::new(Mutex::new(Some(tx)));

    let client = client();
    // "waiter" is dispatched first and only finishes once "signaller" runs.
    assert_ok!(client.use_plugin(PluginDescriptor::new("waiter", move |_| {
        let rx = rx.lock().take();
        async move {
            if let Some(rx) = rx {
                rx.await.map_err(|err| Box::new(err) as BoxError)?;
            }
            Ok(None)
        }
    })));
    assert_ok!(client.use_plugin(PluginDescriptor::new("signaller", move |_| {
        let tx = tx.lock().take();
        async move {
            if let Some(tx) = tx {
                let _ = tx.send(());
            }
            Ok(None)
        }
    })));

    let commit = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        client.commit_plugins(&HashMap::new()),
    )
    .await;
    assert_ok!(assert_ok!(commit));
    assert_eq!(client.plugins().state("waiter"), Some(PluginState::Enabled));
    assert_eq!(client.plugins().state("signaller"), Some(PluginState::Enabled));
}

#[tokio::test]
async fn test_failed_enable_fails_commit_without_rollback() {
    let client = client();
    assert_ok!(client.use_plugin(noop("healthy")));
    assert_ok!(client.use_plugin(PluginDescriptor::new("broken", |_| async {
        Err::<Option<Capability>, BoxError>("no credentials".into())
    })));

    let err = assert_err!(client.commit_plugins(&HashMap::new()).await);
    match err {
        PluginError::EnableFailed { plugin, source } => {
            assert_eq!(plugin, "broken");
            assert_eq!(source.to_string(), "no credentials");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(client.plugins().is_installed("healthy"));
    assert!(client.plugins().is_installed("broken"));
    assert_eq!(client.plugins().state("broken"), Some(PluginState::Failed));
    assert!(matches!(
        client.use_plugin(noop("broken")),
        Err(RegistrationError::DuplicateName(_))
    ));
}

#[tokio::test]
async fn test_contradictory_ordering_is_reported_at_commit() {
    let client = client();
    assert_ok!(client.use_plugin(noop("a")));
    // Spliced in front of "a" while also requiring it.
    assert_ok!(client.use_plugin(noop("b").requires(["a"]).setup_after("a")));
    assert_eq!(client.plugins().queued(), vec!["b", "a"]);

    let err = assert_err!(client.commit_plugins(&HashMap::new()).await);
    assert!(matches!(
        err,
        PluginError::Registration(RegistrationError::DependencyCycle(ref names))
            if names == &vec!["b".to_string(), "a".to_string()]
    ));
    assert_eq!(client.plugins().queued(), vec!["b", "a"]);
    assert!(!client.plugins().is_installed("a"));
}

#[tokio::test]
async fn test_plugin_extends_client_through_context() {
    use tern_core::{Category, Recovery, exception_handler, middleware};
    use tern_framework::REQUEST_COMPOSER;

    let client = client();
    assert_ok!(client.use_plugin(PluginDescriptor::new("stub", |ctx| async move {
        ctx.client().append(
            REQUEST_COMPOSER,
            middleware(|mut call: tern_core::CallContext, next| async move {
                call.state.insert("stubbed".into(), Value::Bool(true));
                next.run(call).await
            }),
        );
        ctx.client().handle(
            Category::Any,
            exception_handler(|_, _| async { Recovery::Resolve(json!("recovered")) }),
        );
        Ok(None)
    })));
    assert_ok!(client.commit_plugins(&HashMap::new()).await);

    assert_eq!(client.composers().len(REQUEST_COMPOSER), Some(1));
    // No transport is configured, so the call fails at the transport and is
    // not offered to handlers.
    assert!(matches!(
        client.call("users.get", Value::Null).await,
        Err(tern_core::ApiError::Transport(_))
    ));
}
