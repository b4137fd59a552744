//! HTTP behavior against a wiremock server.

use super::*;
use integrations_device_rest::http::{MAX_REDIRECTS, TIMEOUT_REASON};
use integrations_device_rest::{ResponseBody, TransportErrorKind};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::net::TcpListener;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::ResponseTemplate;

#[test]
fn test_get_json() {
    let device = MockDevice::start();
    device.mount(
        Mock::given(method("GET"))
            .and(path("/api/v1/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true}))),
    );

    let mut client = device.client();
    client.set_base_path("/api/");
    client.append_path("/v1");
    client.append_path("status");
    let response = client.get().unwrap();

    assert_eq!(response.http_status_code(), 200);
    assert!(!response.is_error());
    assert_eq!(response.json(), Some(&json!({"ok": true})));
    assert_eq!(response.header("content-type"), Some("application/json"));
}

#[test]
fn test_delete_no_content() {
    let device = MockDevice::start();
    device.mount(
        Mock::given(method("DELETE"))
            .and(path("/api/lights/1"))
            .respond_with(ResponseTemplate::new(204)),
    );

    let mut client = device.client();
    client.set_path("lights/1");
    let response = client.delete().unwrap();

    assert_eq!(response.http_status_code(), 204);
    assert!(!response.is_error());
    assert_eq!(response.body(), Some(&ResponseBody::Empty));
}

#[test]
fn test_put_json_body() {
    let device = MockDevice::start();
    device.mount(
        Mock::given(method("PUT"))
            .and(path("/api/state"))
            .and(body_json(json!({"on": true, "bri": 255})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"success": true}]))),
    );

    let mut client = device.client();
    client.set_path("state");
    let response = client.put_json(&json!({"on": true, "bri": 255})).unwrap();

    assert!(!response.is_error(), "{}", response.error_reason());
    assert_eq!(response.json(), Some(&json!([{"success": true}])));
}

#[test]
fn test_malformed_json_is_an_error() {
    let device = MockDevice::start();
    device.mount(
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not-json")),
    );

    let response = device.client().get().unwrap();

    assert_eq!(response.http_status_code(), 200);
    assert!(response.is_error());
    assert!(response.body().is_none());
    assert!(!response.error_reason().is_empty());
}

#[test]
fn test_unauthorized_advisory() {
    let device = MockDevice::start();
    device.mount(Mock::given(method("GET")).respond_with(ResponseTemplate::new(401)));

    let response = device.client().get().unwrap();

    assert_eq!(response.http_status_code(), 401);
    assert!(response.is_error());
    assert_eq!(response.transport_error(), TransportErrorKind::AuthenticationRequired);
    assert!(response
        .error_reason()
        .contains("Check Authorization Token (API Key)"));
}

#[test]
fn test_rate_limited_retry_after() {
    let device = MockDevice::start();
    device.mount(
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30")),
    );

    let response = device.client().post_text("{}").unwrap();

    assert_eq!(response.http_status_code(), 429);
    assert_eq!(
        response.error_reason(),
        "[429 Too Many Requests] - Retry-After: 30"
    );
}

#[test]
fn test_timeout() {
    let device = MockDevice::start();
    device.mount(
        Mock::given(method("GET")).respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"late": true}))
                .set_delay(Duration::from_millis(1500)),
        ),
    );

    let mut client = device.client();
    client.set_timeout(Duration::from_millis(200)).unwrap();
    let response = client.get().unwrap();

    assert!(response.is_error());
    assert_eq!(response.http_status_code(), 0);
    assert_eq!(response.error_reason(), TIMEOUT_REASON);
    assert_eq!(response.transport_error(), TransportErrorKind::RequestTimeout);
}

#[test]
fn test_connection_refused() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = RestConfig::builder()
        .host("127.0.0.1")
        .port(port)
        .build()
        .unwrap();
    let client = RestClient::new(config).unwrap();

    let response = client.get().unwrap();

    assert!(response.is_error());
    assert_eq!(response.http_status_code(), 0);
    assert_eq!(response.transport_error(), TransportErrorKind::ConnectionRefused);
    assert!(!response.error_reason().is_empty());
}

#[test]
fn test_merged_headers_are_sent() {
    let device = MockDevice::start();
    device.mount(Mock::given(method("GET")).respond_with(ResponseTemplate::new(204)));

    let mut client = device.client();
    client.set_header("Accept", "application/json").unwrap();
    client.set_header("Accept", "text/plain").unwrap();
    client.set_header("Accept", "text/plain").unwrap();
    client.set_raw_header("X-Token", "first").unwrap();
    client.set_raw_header("X-Token", "second").unwrap();
    client.get().unwrap();

    let requests = device.received_requests();
    assert_eq!(requests.len(), 1);
    let headers = &requests[0].headers;
    assert_eq!(
        headers.get("accept").unwrap().to_str().unwrap(),
        "application/json,text/plain"
    );
    assert_eq!(headers.get("x-token").unwrap().to_str().unwrap(), "second");
}

#[test]
fn test_query_and_explicit_url() {
    let device = MockDevice::start();
    device.mount(Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)));

    let mut client = device.client();
    client.set_path("search");
    client.set_query([("name", "living room"), ("on", "1")]);
    client.get().unwrap();

    let other = format!("{}/other/path", device.server.uri());
    client.get_url(other.parse().unwrap());

    let requests = device.received_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url.path(), "/api/search");
    assert_eq!(requests[0].url.query(), Some("name=living+room&on=1"));
    assert_eq!(requests[1].url.path(), "/other/path");
}

#[test]
fn test_same_scheme_redirect_is_followed() {
    let device = MockDevice::start();
    device.mount(
        Mock::given(method("GET"))
            .and(path("/api/old"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/api/new")),
    );
    device.mount(
        Mock::given(method("GET"))
            .and(path("/api/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"moved": true}))),
    );

    let mut client = device.client();
    client.set_path("old");
    let response = client.get().unwrap();

    assert!(!response.is_error(), "{}", response.error_reason());
    assert_eq!(response.http_status_code(), 200);
    assert_eq!(response.json(), Some(&json!({"moved": true})));
    assert_eq!(device.received_requests().len(), 2);
}

#[test]
fn test_redirect_loop_stops_at_limit() {
    let device = MockDevice::start();
    device.mount(
        Mock::given(method("GET"))
            .and(path("/api/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/api/loop")),
    );

    let mut client = device.client();
    client.set_path("loop");
    let response = client.get().unwrap();

    assert!(response.is_error());
    assert_eq!(response.http_status_code(), 0);
    assert_eq!(response.transport_error(), TransportErrorKind::TooManyRedirects);
    assert_eq!(device.received_requests().len(), MAX_REDIRECTS + 1);
}
