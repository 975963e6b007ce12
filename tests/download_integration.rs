//! Integration tests for spooled transfers against mock HTTP servers.

use std::time::Duration;

use relay_core::download::{NoProgress, TransferClient, TransferError, TransferRequest};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn read_all(buffer: &mut relay_core::SpooledBuffer) -> Vec<u8> {
    let mut out = Vec::new();
    buffer.read_to_end(&mut out).await.expect("buffer read");
    out
}

/// Serves one chunked response with no Content-Length header.
async fn serve_chunked_once(chunks: usize, chunk_len: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n")
            .await;
        let chunk = vec![b'z'; chunk_len];
        for _ in 0..chunks {
            let frame = [format!("{chunk_len:x}\r\n").into_bytes(), chunk.clone(), b"\r\n".to_vec()].concat();
            if socket.write_all(&frame).await.is_err() {
                return;
            }
        }
        let _ = socket.write_all(b"0\r\n\r\n").await;
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}/stream.bin")
}

#[tokio::test]
async fn test_large_transfer_spills_and_reads_twice() {
    let server = MockServer::start().await;
    let body = payload(700_000);
    Mock::given(method("GET"))
        .and(path("/big.mkv"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let client = TransferClient::new().expect("client");
    let request = TransferRequest::new(format!("{}/big.mkv", server.uri())).with_spool_limit(100_000);
    let mut result = client.transfer(&request, &NoProgress).await.expect("transfer");

    assert!(result.buffer.is_spilled(), "content past the spool limit must be on disk");
    assert_eq!(result.total_bytes, body.len() as u64);
    assert_eq!(result.filename_hint, "big.mkv");

    let first = read_all(&mut result.buffer).await;
    result.buffer.rewind().await.expect("rewind");
    let second = read_all(&mut result.buffer).await;
    assert_eq!(first, body);
    assert_eq!(second, body);
}

#[tokio::test]
async fn test_filename_hint_follows_redirect_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/share/abc"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{}/files/report.pdf", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
        .mount(&server)
        .await;

    let client = TransferClient::new().expect("client");
    let request = TransferRequest::new(format!("{}/share/abc", server.uri()));
    let result = client.transfer(&request, &NoProgress).await.expect("transfer");

    assert_eq!(result.filename_hint, "report.pdf");
    assert_eq!(result.total_bytes, 8);
}

#[tokio::test]
async fn test_per_request_timeout_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = TransferClient::new().expect("client");
    let request = TransferRequest::new(format!("{}/slow.bin", server.uri()))
        .with_timeout(Some(Duration::from_millis(200)));
    let error = client.transfer(&request, &NoProgress).await.unwrap_err();

    assert!(matches!(error, TransferError::Timeout { .. }), "got {error:?}");
}

#[tokio::test]
async fn test_limit_trips_on_streamed_body_without_length() {
    let url = serve_chunked_once(10, 1000).await;

    let client = TransferClient::new().expect("client");
    let request = TransferRequest::new(url).with_max_size(2500);
    let error = client.transfer(&request, &NoProgress).await.unwrap_err();

    match error {
        TransferError::TooLarge { limit, actual } => {
            assert_eq!(limit, 2500);
            assert!(actual > 2500, "tripped at {actual}");
        }
        other => panic!("expected TooLarge, got {other:?}"),
    }
}

#[tokio::test]
async fn test_streamed_body_within_limit_succeeds() {
    let url = serve_chunked_once(3, 1000).await;

    let client = TransferClient::new().expect("client");
    let request = TransferRequest::new(url).with_max_size(5000);
    let mut result = client.transfer(&request, &NoProgress).await.expect("transfer");

    assert_eq!(result.total_bytes, 3000);
    assert_eq!(read_all(&mut result.buffer).await, vec![b'z'; 3000]);
}
