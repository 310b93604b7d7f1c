//! Resolver behavior against a mock FROST server
//!
//! Uses wiremock for the server side and a scoped tracing subscriber to
//! capture the warnings the resolver emits.

use frost_link::{LinkResolver, ResolveError, ResolverConfig};
use serde_json::json;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

fn resolver() -> LinkResolver {
    LinkResolver::new(&ResolverConfig::from_timeout_ms(5_000)).unwrap()
}

async fn serve(server: &MockServer, at: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn collection_resolves_in_server_order() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/Things(1)/Locations",
        ResponseTemplate::new(200).set_body_json(json!({
            "@iot.count": 2,
            "value": [
                {"@iot.id": 7, "name": "roof"},
                {"@iot.id": 9, "name": "cellar"}
            ]
        })),
    )
    .await;

    let link = format!("{}/Things(1)/Locations", server.uri());
    let ids = resolver().resolve_identifiers(Some(&link)).await.unwrap();

    assert_eq!(ids.as_slice(), ["7", "9"]);
    assert_eq!(ids.joined(), "7,9");
}

#[tokio::test]
async fn single_entity_resolves_to_one_id() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/Things(1)",
        ResponseTemplate::new(200).set_body_json(json!({"@iot.id": 1, "name": "station"})),
    )
    .await;

    let link = format!("{}/Things(1)", server.uri());
    assert_eq!(resolver().resolve_iot_ids(Some(&link)).await, Some("1".to_string()));

    let shared = LinkResolver::with_client(reqwest::Client::new());
    assert_eq!(shared.resolve_iot_ids(Some(&link)).await, Some("1".to_string()));
}

#[tokio::test]
async fn numeric_and_string_ids_render_alike() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/Datastreams(42)",
        ResponseTemplate::new(200).set_body_json(json!({"@iot.id": 42})),
    )
    .await;
    serve(
        &server,
        "/Sensors(42)",
        ResponseTemplate::new(200).set_body_json(json!({"@iot.id": "42"})),
    )
    .await;

    let resolver = resolver();
    let numeric = resolver
        .resolve_iot_ids(Some(&format!("{}/Datastreams(42)", server.uri())))
        .await;
    let text = resolver
        .resolve_iot_ids(Some(&format!("{}/Sensors(42)", server.uri())))
        .await;

    assert_eq!(numeric.as_deref(), Some("42"));
    assert_eq!(text.as_deref(), Some("42"));
}

#[tokio::test]
async fn absent_link_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"@iot.id": 1})))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = resolver();
    assert_eq!(resolver.resolve_identifiers(None).await, None);
    assert_eq!(resolver.resolve_identifiers(Some("")).await, None);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn non_200_status_is_absent_and_logged() {
    let (logs, _guard) = capture_logs();
    let server = MockServer::start().await;
    serve(&server, "/Things(404)", ResponseTemplate::new(404)).await;
    serve(
        &server,
        "/Things(201)",
        ResponseTemplate::new(201).set_body_json(json!({"@iot.id": 201})),
    )
    .await;

    let resolver = resolver();
    let missing = format!("{}/Things(404)", server.uri());
    let created = format!("{}/Things(201)", server.uri());

    assert_eq!(resolver.resolve_identifiers(Some(&missing)).await, None);
    assert_eq!(resolver.resolve_identifiers(Some(&created)).await, None);

    let output = logs.contents();
    assert!(output.contains("unexpected HTTP status"));
    assert!(output.contains(&missing));
    assert!(output.contains("404"));
}

#[tokio::test]
async fn unparseable_body_is_absent_and_logged() {
    let (logs, _guard) = capture_logs();
    let server = MockServer::start().await;
    serve(
        &server,
        "/Things(1)",
        ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
    )
    .await;

    let link = format!("{}/Things(1)", server.uri());
    assert_eq!(resolver().resolve_identifiers(Some(&link)).await, None);

    let output = logs.contents();
    assert!(output.contains("WARN"));
    assert!(output.contains("could not parse response as JSON object"));
    assert!(output.contains(&link));
}

#[tokio::test]
async fn json_array_body_is_absent() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/Things",
        ResponseTemplate::new(200).set_body_json(json!([{"@iot.id": 1}])),
    )
    .await;

    let link = format!("{}/Things", server.uri());
    assert_eq!(resolver().resolve_identifiers(Some(&link)).await, None);
}

#[tokio::test]
async fn unknown_shape_is_absent_without_warning() {
    let (logs, _guard) = capture_logs();
    let server = MockServer::start().await;
    serve(
        &server,
        "/Things(1)/properties",
        ResponseTemplate::new(200).set_body_json(json!({"properties": {"owner": "lab"}})),
    )
    .await;

    let link = format!("{}/Things(1)/properties", server.uri());
    assert_eq!(resolver().resolve_identifiers(Some(&link)).await, None);
    assert!(logs.contents().is_empty());
}

#[tokio::test]
async fn malformed_link_is_absent_and_logged() {
    let (logs, _guard) = capture_logs();

    assert_eq!(resolver().resolve_identifiers(Some("Things(1)")).await, None);

    let output = logs.contents();
    assert!(output.contains("invalid @iot.navigationLink"));
    assert!(output.contains("Things(1)"));
}

#[tokio::test]
async fn unreachable_server_is_absent_and_logged() {
    let (logs, _guard) = capture_logs();

    // Nothing listens on port 1.
    let link = "http://127.0.0.1:1/Things(1)";
    assert_eq!(resolver().resolve_identifiers(Some(link)).await, None);

    let output = logs.contents();
    assert!(output.contains("could not establish connection"));
    assert!(output.contains(link));
}

#[tokio::test]
async fn slow_server_hits_configured_timeout() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/Things(1)",
        ResponseTemplate::new(200)
            .set_body_json(json!({"@iot.id": 1}))
            .set_delay(std::time::Duration::from_secs(2)),
    )
    .await;

    let resolver = LinkResolver::new(&ResolverConfig::from_timeout_ms(200)).unwrap();
    let link = format!("{}/Things(1)", server.uri());
    assert_eq!(resolver.resolve_identifiers(Some(&link)).await, None);
}

#[tokio::test]
#[allow(deprecated)]
async fn strict_single_fails_on_collection() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/Things(1)/Datastreams",
        ResponseTemplate::new(200).set_body_json(json!({"value": [{"@iot.id": 3}]})),
    )
    .await;

    let link = format!("{}/Things(1)/Datastreams", server.uri());
    let err = resolver().single_iot_id(Some(&link)).await.unwrap_err();

    assert!(matches!(err, ResolveError::MissingField { field: "@iot.id", .. }));
    assert_eq!(err.link(), link);
}

#[tokio::test]
#[allow(deprecated)]
async fn strict_multiple_fails_on_single_entity() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/Datastreams(3)/Thing",
        ResponseTemplate::new(200).set_body_json(json!({"@iot.id": 1})),
    )
    .await;

    let link = format!("{}/Datastreams(3)/Thing", server.uri());
    let err = resolver().multiple_iot_ids(Some(&link)).await.unwrap_err();

    assert!(matches!(err, ResolveError::MissingField { field: "value", .. }));
}

#[tokio::test]
#[allow(deprecated)]
async fn strict_variants_resolve_matching_shapes() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/Things(1)",
        ResponseTemplate::new(200).set_body_json(json!({"@iot.id": 1})),
    )
    .await;
    serve(
        &server,
        "/Things(1)/Locations",
        ResponseTemplate::new(200).set_body_json(json!({"value": [{"@iot.id": 7}, {"@iot.id": 9}]})),
    )
    .await;

    let resolver = resolver();
    let single = resolver
        .single_iot_id(Some(&format!("{}/Things(1)", server.uri())))
        .await
        .unwrap();
    let multiple = resolver
        .multiple_iot_ids(Some(&format!("{}/Things(1)/Locations", server.uri())))
        .await
        .unwrap();

    assert_eq!(single.as_deref(), Some("1"));
    assert_eq!(multiple.as_deref(), Some("7,9"));
}

#[tokio::test]
#[allow(deprecated)]
async fn strict_variant_surfaces_status() {
    let server = MockServer::start().await;
    serve(&server, "/Things(1)", ResponseTemplate::new(500)).await;

    let link = format!("{}/Things(1)", server.uri());
    let err = resolver().single_iot_id(Some(&link)).await.unwrap_err();

    match err {
        ResolveError::Status { status, .. } => assert_eq!(status.as_u16(), 500),
        other => panic!("expected status error, got {other}"),
    }
}

#[tokio::test]
async fn unsupported_scheme_is_logged_as_invalid_link() {
    let (logs, _guard) = capture_logs();

    let link = "ftp://frost.example/v1.1/Things(1)";
    assert_eq!(resolver().resolve_identifiers(Some(link)).await, None);

    let output = logs.contents();
    assert!(output.contains("invalid @iot.navigationLink"));
    assert!(!output.contains("could not establish connection"));
    assert!(output.contains(link));
}

#[tokio::test]
#[allow(deprecated)]
async fn strict_variant_rejects_unsupported_scheme() {
    let err = resolver()
        .multiple_iot_ids(Some("file:///tmp/Things(1)"))
        .await
        .unwrap_err();

    match err {
        ResolveError::UnsupportedScheme { scheme, .. } => assert_eq!(scheme, "file"),
        other => panic!("expected unsupported scheme, got {other}"),
    }
}

#[tokio::test]
#[allow(deprecated)]
async fn strict_shape_mismatch_is_logged() {
    let (logs, _guard) = capture_logs();
    let server = MockServer::start().await;
    serve(
        &server,
        "/Things(1)/Locations",
        ResponseTemplate::new(200).set_body_json(json!({"value": [{"@iot.id": 7}]})),
    )
    .await;

    let link = format!("{}/Things(1)/Locations", server.uri());
    assert!(resolver().single_iot_id(Some(&link)).await.is_err());

    let output = logs.contents();
    assert!(output.contains("unexpected response shape"));
    assert!(output.contains(&link));
}

#[tokio::test]
async fn error_status_body_is_drained_before_next_request() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/Things(9)",
        ResponseTemplate::new(404).set_body_string("x".repeat(64 * 1024)),
    )
    .await;
    serve(
        &server,
        "/Things(1)",
        ResponseTemplate::new(200).set_body_json(json!({"@iot.id": 1})),
    )
    .await;

    let resolver = resolver();
    let missing = format!("{}/Things(9)", server.uri());
    let present = format!("{}/Things(1)", server.uri());

    for _ in 0..3 {
        assert_eq!(resolver.resolve_iot_ids(Some(&missing)).await, None);
        assert_eq!(resolver.resolve_iot_ids(Some(&present)).await.as_deref(), Some("1"));
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 6);
}
