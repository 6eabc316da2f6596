use bindery::config::Config;
use bindery::engine::method::MethodDeclaration;
use bindery::engine_core::constants::trigger;
use bindery::engine_core::models::{LogLevel, Metadata};
use bindery::engine_core::outcome::Outcome;
use bindery::engine_core::traits::LogSink;
use bindery::engine_core::value::Map;
use bindery::kernel::Kernel;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Lines(Mutex<Vec<(LogLevel, String)>>);

impl LogSink for Lines {
    fn log(&self, level: LogLevel, message: &str) {
        self.0.lock().push((level, message.to_string()));
    }
}

#[tokio::test]
async fn test_start_fans_out_and_stop_waits() {
    let kernel = Kernel::new(Config::default()).unwrap();
    let sink = Arc::new(Lines::default());
    kernel.attach_log_sink(sink.clone());

    let started = Arc::new(AtomicUsize::new(0));
    for _ in 0..4 {
        let started = Arc::clone(&started);
        kernel.trigger(
            trigger::START,
            MethodDeclaration::new(move |_| {
                started.fetch_add(1, Ordering::SeqCst);
            }),
        );
    }
    let stopped = Arc::new(Mutex::new(Vec::new()));
    for name in ["cache", "db"] {
        let stopped = Arc::clone(&stopped);
        kernel.trigger(
            trigger::STOP,
            MethodDeclaration::new(move |_| stopped.lock().push(name)),
        );
    }

    let handles = kernel.launch();
    assert_eq!(handles.len(), 4);
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(started.load(Ordering::SeqCst), 4);

    let outcomes = kernel.terminate().await;
    assert!(outcomes.iter().all(Outcome::is_ok));
    assert_eq!(*stopped.lock(), vec!["cache", "db"]);

    let lines = sink.0.lock();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|(level, _)| *level == LogLevel::Info));
}

#[tokio::test]
async fn test_temp_resources_end_with_the_call() {
    let kernel = Kernel::new(Config::default()).unwrap();
    let paths = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&paths);
    kernel.define(
        "report.render",
        MethodDeclaration::new(move |call| {
            let file = call.context.temp_file("report-").map_err(|e| e.to_string());
            let dir = call.context.temp_dir("assets-").map_err(|e| e.to_string());
            match (file, dir) {
                (Ok(file), Ok(dir)) => {
                    assert!(file.exists() && dir.is_dir());
                    seen.lock().extend([file, dir]);
                    Outcome::OK
                }
                _ => Outcome::FAIL,
            }
        }),
    );
    kernel.define(
        "report.broken",
        MethodDeclaration::new(move |call| {
            let _ = call.context.temp_file("broken-");
            Outcome::FAIL
        }),
    );

    let (_, outcome, _) = kernel.call("report.render", Map::new()).await;
    assert!(outcome.is_ok());
    let (_, outcome, _) = kernel.call("report.broken", Map::new()).await;
    assert!(outcome.is_fail());

    let paths = paths.lock();
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| !p.exists()));
}

#[tokio::test]
async fn test_context_from_metadata_carries_identity() {
    let kernel = Kernel::new(Config::default()).unwrap();
    kernel.define(
        "whoami",
        MethodDeclaration::new(|call| {
            let mut out = Map::new();
            let id = call.context.id().unwrap_or_default().to_string();
            out.insert("id".into(), id.into());
            out.insert("locale".into(), call.context.locale().into());
            out
        })
        .authed(),
    );

    let (token, text) = kernel.tokens().issue(true, Map::new(), None, "").unwrap();
    let metadata = Metadata {
        name: "whoami".into(),
        locale: "en-US".into(),
        token: text,
        ..Default::default()
    };
    let mut ctx = bindery::engine::context::CallContext::from_metadata(Arc::clone(kernel.engine()), metadata);
    let engine = Arc::clone(kernel.engine());
    let (data, outcome, _) = engine.call(&mut ctx, "whoami", Map::new(), None).await;
    assert!(outcome.is_ok());
    assert_eq!(data["id"].as_str(), Some(token.header.id.as_str()));
    assert_eq!(data["locale"].as_str(), Some("en-US"));
}
