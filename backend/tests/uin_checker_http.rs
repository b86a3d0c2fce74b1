//! The debounced checker talking to a live server through the HTTP lookup
//! adapter.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::HttpServer;
use actix_web::dev::ServerHandle;
use async_trait::async_trait;
use inspectorate::domain::ports::{UinLookup, UinLookupError};
use inspectorate::domain::{DebouncedUinChecker, ReportFields, ReportPath, UinAvailability, UserId};
use inspectorate::outbound::uin_http::HttpUinLookup;
use inspectorate::test_support::backend::TestBackend;
use inspectorate::test_support::http::test_app;
use rstest::rstest;
use url::Url;

const WINDOW: Duration = Duration::from_millis(50);

/// Records each lookup before forwarding it to the server.
struct RecordingLookup {
    inner: HttpUinLookup,
    calls: Mutex<Vec<String>>,
}

impl RecordingLookup {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl UinLookup for RecordingLookup {
    async fn exists(&self, uin: &str) -> Result<bool, UinLookupError> {
        self.calls.lock().expect("calls lock").push(uin.to_owned());
        self.inner.exists(uin).await
    }
}

fn start_server(backend: &TestBackend) -> (SocketAddr, ServerHandle) {
    let state = backend.state(backend.privileged());
    let server = HttpServer::new(move || test_app(state.clone()))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind test server");
    let addr = *server.addrs().first().expect("bound address");
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    (addr, handle)
}

fn recording_lookup(addr: SocketAddr) -> Arc<RecordingLookup> {
    let base = Url::parse(&format!("http://{addr}/")).expect("base URL");
    Arc::new(RecordingLookup {
        inner: HttpUinLookup::new(&base, Duration::from_secs(5)).expect("lookup"),
        calls: Mutex::new(Vec::new()),
    })
}

async fn settled(checker: &DebouncedUinChecker) -> UinAvailability {
    let mut states = checker.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let state = states.borrow_and_update().clone();
            if !matches!(state, UinAvailability::Checking { .. }) {
                return state;
            }
            states.changed().await.expect("checker alive");
        }
    })
    .await
    .expect("lookup settled")
}

#[rstest]
#[actix_web::test]
async fn typing_a_taken_uin_issues_one_lookup() {
    let backend = TestBackend::new();
    backend.store.seed_report(
        ReportPath::new(UserId::new("inspector-1").expect("uid"), "auto-1"),
        ReportFields {
            uin: Some("ABC".to_owned()),
            ..ReportFields::default()
        },
    );
    let (addr, handle) = start_server(&backend);
    let lookup = recording_lookup(addr);
    let checker = DebouncedUinChecker::new(lookup.clone(), WINDOW);

    for input in ["A", "AB", "ABC"] {
        checker.submit(input);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let state = settled(&checker).await;

    assert_eq!(state, UinAvailability::Taken { uin: "ABC".to_owned() });
    assert!(!state.allows_submission());
    assert_eq!(lookup.calls(), vec!["ABC".to_owned()]);
    handle.stop(false).await;
}

#[rstest]
#[actix_web::test]
async fn unknown_uins_are_available() {
    let backend = TestBackend::new();
    let (addr, handle) = start_server(&backend);
    let checker = DebouncedUinChecker::new(recording_lookup(addr), WINDOW);

    checker.submit("  REI-BNU-2025-0012 ");
    let state = settled(&checker).await;

    assert_eq!(
        state,
        UinAvailability::Available {
            uin: "REI-BNU-2025-0012".to_owned()
        }
    );
    handle.stop(false).await;
}

#[rstest]
#[actix_web::test]
async fn unreachable_servers_fail_open() {
    let backend = TestBackend::new();
    let (addr, handle) = start_server(&backend);
    handle.stop(false).await;
    let checker = DebouncedUinChecker::new(recording_lookup(addr), WINDOW);

    checker.submit("REI-1");
    let state = settled(&checker).await;

    assert!(matches!(state, UinAvailability::Unverified { ref uin, .. } if uin == "REI-1"));
    assert!(state.allows_submission());
}
