use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use prcov_core::{PrcovError, StashConfig};
use prcov_difflens::model::SegmentKind;
use prcov_stash::StashClient;

/// Serve one canned HTTP response and hand back the raw request head.
fn serve_once(status: &'static str, body: &'static str, delay: Duration) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => head.extend_from_slice(&buf[..n]),
            }
        }
        let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
        thread::sleep(delay);
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(response.as_bytes());
    });

    (format!("http://{addr}/rest/api/1.0"), rx)
}

const DIFF_BODY: &str = r#"{"diffs":[{"destination":{"toString":"src/app.py"},"hunks":[{"segments":[
    {"type":"CONTEXT","lines":[{"source":1,"destination":1}]},
    {"type":"ADDED","lines":[{"source":2,"destination":2}]}
]}]}]}"#;

#[tokio::test]
async fn fetches_and_decodes_diff() {
    let (base, requests) = serve_once("200 OK", DIFF_BODY, Duration::ZERO);
    let client = StashClient::new(&base, "user", "pw", &StashConfig::default()).unwrap();

    let diff = client.fetch_diff("SHOP", "web", 42).await.unwrap();
    assert_eq!(diff.diffs.len(), 1);
    assert_eq!(diff.diffs[0].destination_path(), Some("src/app.py"));
    assert_eq!(diff.diffs[0].hunks[0].segments[1].kind, SegmentKind::Added);

    let head = requests.recv().unwrap();
    assert!(head.starts_with(
        "GET /rest/api/1.0/projects/SHOP/repos/web/pull-requests/42/diff?contextLines=0&whitespace=ignore-all&withComments=false "
    ));
    // base64("user:pw")
    assert!(head.to_lowercase().contains("authorization: basic dxnlcjpwdw=="));
}

#[tokio::test]
async fn non_success_status_is_transport_error() {
    let (base, _requests) = serve_once(
        "401 Unauthorized",
        r#"{"errors":[{"message":"Authentication failed"}]}"#,
        Duration::ZERO,
    );
    let client = StashClient::new(&base, "user", "wrong", &StashConfig::default()).unwrap();

    let err = client.fetch_diff("SHOP", "web", 42).await.unwrap_err();
    assert!(matches!(err, PrcovError::Transport(_)));
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn unexpected_body_is_serialization_error() {
    let (base, _requests) = serve_once("200 OK", "<html>maintenance</html>", Duration::ZERO);
    let client = StashClient::new(&base, "user", "pw", &StashConfig::default()).unwrap();

    let err = client.fetch_diff("SHOP", "web", 42).await.unwrap_err();
    assert!(matches!(err, PrcovError::Serialization(_)));
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client =
        StashClient::new(&format!("http://{addr}"), "user", "pw", &StashConfig::default()).unwrap();

    let err = client.fetch_diff("SHOP", "web", 42).await.unwrap_err();
    assert!(matches!(err, PrcovError::Transport(_)));
}

#[tokio::test]
async fn slow_server_times_out() {
    let (base, _requests) = serve_once("200 OK", DIFF_BODY, Duration::from_secs(3));
    let config = StashConfig {
        timeout_secs: 1,
        ..StashConfig::default()
    };
    let client = StashClient::new(&base, "user", "pw", &config).unwrap();

    let err = client.fetch_diff("SHOP", "web", 42).await.unwrap_err();
    assert!(matches!(err, PrcovError::Transport(_)));
    assert!(err.to_string().contains("timed out"));
}
