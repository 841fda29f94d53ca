use kura_http::{Auth, HttpClient, HttpError, RequestOpts};
use serde_json::{json, Value};
use std::borrow::Cow;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn header_auth_and_body_reach_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/m:generateContent"))
        .and(header("x-goog-api-key", "abc123"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "hello": "world" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&format!("{}/v1beta", server.uri())).unwrap();
    let opts = RequestOpts {
        auth: Some(Auth::Header {
            name: "x-goog-api-key",
            value: Cow::Borrowed(" abc123 "),
        }),
        ..Default::default()
    };

    let got: Value = client
        .post_json_opts("models/m:generateContent", &json!({ "hello": "world" }), opts)
        .await
        .expect("request succeeds");
    assert_eq!(got, json!({ "ok": true }));
}

#[tokio::test]
async fn leading_slash_extends_the_base_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&format!("{}/v1beta", server.uri())).unwrap();
    let got: Vec<u32> = client
        .post_json_opts("/items", &json!({}), RequestOpts::default())
        .await
        .unwrap();
    assert_eq!(got, vec![1, 2, 3]);
}

#[tokio::test]
async fn blank_credential_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let opts = RequestOpts {
        auth: Some(Auth::Header {
            name: "x-goog-api-key",
            value: Cow::Borrowed("  \"\" "),
        }),
        ..Default::default()
    };
    let err = client
        .post_json_opts::<_, Value>("items", &json!({}), opts)
        .await
        .unwrap_err();
    assert!(matches!(err, HttpError::Build(_)), "got {err:?}");
}

#[tokio::test]
async fn server_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": { "code": 503, "message": "overloaded", "status": "UNAVAILABLE" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .post_json_opts::<_, Value>("flaky", &json!({}), RequestOpts::default())
        .await
        .unwrap_err();

    match err {
        HttpError::Api {
            status, message, ..
        } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(message, "overloaded (UNAVAILABLE)");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_success_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .post_json_opts::<_, Value>("garbled", &json!({}), RequestOpts::default())
        .await
        .unwrap_err();
    assert!(err.is_decode(), "got {err:?}");
}

#[tokio::test]
async fn slow_server_hits_the_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri())
        .unwrap()
        .with_timeout(Duration::from_millis(50));
    let err = client
        .post_json_opts::<_, Value>("slow", &json!({}), RequestOpts::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HttpError::Network(_)), "got {err:?}");
}

#[test]
fn invalid_base_url_is_rejected() {
    assert!(matches!(HttpClient::new("not a url"), Err(HttpError::Url(_))));
}
