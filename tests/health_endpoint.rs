use media_relay_bot::health::{self, LIVENESS_BODY};
use tokio_util::sync::CancellationToken;

async fn start_server() -> (String, CancellationToken, tokio::task::JoinHandle<std::io::Result<()>>) {
    let listener = health::bind(0).await.expect("bind health listener");
    let port = listener.local_addr().expect("local addr").port();
    let shutdown = CancellationToken::new();
    let server = tokio::spawn(health::serve(listener, shutdown.clone()));
    (format!("http://127.0.0.1:{port}"), shutdown, server)
}

#[tokio::test]
async fn any_get_path_reports_alive() {
    let (base, shutdown, server) = start_server().await;
    let client = reqwest::Client::new();

    for path in ["/", "/healthz", "/any/nested/path"] {
        let response = client
            .get(format!("{base}{path}"))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::OK, "path {path}");
        assert_eq!(response.text().await.expect("body"), LIVENESS_BODY);
    }

    shutdown.cancel();
    server
        .await
        .expect("server task")
        .expect("server shut down cleanly");
}

#[tokio::test]
async fn non_get_methods_are_rejected() {
    let (base, shutdown, server) = start_server().await;

    let response = reqwest::Client::new()
        .post(format!("{base}/"))
        .body("ping")
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);

    shutdown.cancel();
    server
        .await
        .expect("server task")
        .expect("server shut down cleanly");
}
