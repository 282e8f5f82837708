mod common;

use common::TestApp;

#[tokio::test]
async fn liveness_and_readiness() {
    let app = TestApp::spawn().await;

    let res = app.get("/healthz").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "ok");

    let res = app.get("/readyz").await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["checks"]["sqlite"]["ok"], true);
    assert_eq!(res.body["checks"]["media_dir"]["ok"], true);
}

#[tokio::test]
async fn media_paths_are_validated() {
    let app = TestApp::spawn().await;

    let res = app.get("/media/ab/cd/missing.mp4").await;
    assert_eq!(res.status, 404);
    assert_eq!(res.message(), "Media not found");

    let res = app.get("/media/ab%5Ccd").await;
    assert_eq!(res.status, 400);
    assert_eq!(res.message(), "Invalid media path");
}
