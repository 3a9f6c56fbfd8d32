
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use wiremock::MockServer;

use crate::config::{GITEA_HOST_SECRET, GITEA_TOKEN_SECRET, MAX_PAGES, WEBHOOK_SECRET};
use crate::secrets::StaticSecretProvider;
use crate::tests::event::{default_pull_request_payload, PullRequestPayloadBuilder};
use crate::tests::mocks::{GiteaMockServer, TEST_GITEA_TOKEN};
use crate::tests::webhook::{create_webhook_request, TEST_WEBHOOK_SECRET};
use crate::{create_app, ServerState};

fn secrets_for(host: &str) -> StaticSecretProvider {
    StaticSecretProvider::new()
        .with(WEBHOOK_SECRET, TEST_WEBHOOK_SECRET)
        .with(GITEA_HOST_SECRET, host)
        .with(GITEA_TOKEN_SECRET, TEST_GITEA_TOKEN)
}

async fn send(secrets: StaticSecretProvider, request: Request<Body>) -> StatusCode {
    let app = create_app(ServerState::new(Arc::new(secrets)));
    app.oneshot(request).await.unwrap().status()
}

async fn send_pr_event(gitea: &GiteaMockServer) -> StatusCode {
    send(
        secrets_for(&gitea.uri()),
        create_webhook_request("pull_request_approved", default_pull_request_payload()),
    )
    .await
}

#[tokio::test]
async fn replace_stale_label_after_approvals() {
    let gitea = GiteaMockServer::start().await;
    gitea.pull_request(&["lgtm/need 2", "bug"]).await;
    gitea.reviews(&["APPROVED", "COMMENT", "APPROVED"]).await;
    gitea.default_repo_labels().await;
    gitea.expect_remove_label("lgtm/need 2", 1, 204).await;
    gitea.expect_add_label("lgtm/done", 1).await;

    assert_eq!(send_pr_event(&gitea).await, StatusCode::OK);
    gitea.verify().await;
}

#[tokio::test]
async fn correct_label_already_present() {
    let gitea = GiteaMockServer::start().await;
    gitea.pull_request(&["lgtm/done"]).await;
    gitea.reviews(&["APPROVED", "APPROVED"]).await;
    gitea.expect_no_label_changes().await;

    assert_eq!(send_pr_event(&gitea).await, StatusCode::OK);
    gitea.verify().await;
}

#[tokio::test]
async fn add_label_to_new_pr() {
    let gitea = GiteaMockServer::start().await;
    gitea.pull_request(&[]).await;
    gitea.reviews(&[]).await;
    gitea.default_repo_labels().await;
    gitea.expect_add_label("lgtm/need 2", 1).await;

    assert_eq!(send_pr_event(&gitea).await, StatusCode::OK);
    gitea.verify().await;
}

#[tokio::test]
async fn reviews_are_read_from_all_pages() {
    let gitea = GiteaMockServer::start().await;
    gitea.pull_request(&["lgtm/need 1"]).await;
    gitea.reviews_page(1, &["APPROVED", "REQUEST_CHANGES"]).await;
    gitea.reviews_page(2, &["APPROVED"]).await;
    gitea.default_repo_labels().await;
    gitea.expect_remove_label("lgtm/need 1", 1, 204).await;
    gitea.expect_add_label("lgtm/done", 1).await;

    assert_eq!(send_pr_event(&gitea).await, StatusCode::OK);
    gitea.verify().await;
}

#[tokio::test]
async fn status_label_found_on_later_labels_page() {
    let gitea = GiteaMockServer::start().await;
    gitea.pull_request(&["lgtm/need 1"]).await;
    gitea.reviews(&["APPROVED", "APPROVED"]).await;
    gitea
        .repo_labels_page(1, &[(1, "bug"), (10, "lgtm/need 2"), (11, "lgtm/need 1")])
        .await;
    gitea.repo_labels_page(2, &[(12, "lgtm/done")]).await;
    gitea.expect_remove_label("lgtm/need 1", 1, 204).await;
    gitea.expect_add_label("lgtm/done", 1).await;

    assert_eq!(send_pr_event(&gitea).await, StatusCode::OK);
    gitea.verify().await;
}

#[tokio::test]
async fn paging_stops_at_total_count() {
    let gitea = GiteaMockServer::start().await;
    gitea.pull_request(&[]).await;
    gitea
        .reviews_ignoring_pages(&["APPROVED", "APPROVED"], Some(2))
        .await;
    gitea.default_repo_labels().await;
    gitea.expect_add_label("lgtm/done", 1).await;

    assert_eq!(send_pr_event(&gitea).await, StatusCode::OK);
    assert_eq!(gitea.review_request_count().await, 1);
    gitea.verify().await;
}

#[tokio::test]
async fn server_ignoring_pagination() {
    let gitea = GiteaMockServer::start().await;
    gitea.pull_request(&[]).await;
    gitea.reviews_ignoring_pages(&["APPROVED"], None).await;
    gitea.expect_no_label_changes().await;

    assert_eq!(
        send_pr_event(&gitea).await,
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(gitea.review_request_count().await, MAX_PAGES as usize);
    gitea.verify().await;
}

#[tokio::test]
async fn missing_repository_label() {
    let gitea = GiteaMockServer::start().await;
    gitea.pull_request(&[]).await;
    gitea.reviews(&["APPROVED"]).await;
    gitea
        .repo_labels(&[(10, "lgtm/need 2"), (12, "lgtm/done")])
        .await;
    gitea.expect_no_label_changes().await;

    assert_eq!(
        send_pr_event(&gitea).await,
        StatusCode::INTERNAL_SERVER_ERROR
    );
    gitea.verify().await;
}

#[tokio::test]
async fn failed_removal_still_adds_label() {
    let gitea = GiteaMockServer::start().await;
    gitea.pull_request(&["lgtm/need 2"]).await;
    gitea.reviews(&["APPROVED"]).await;
    gitea.default_repo_labels().await;
    gitea.expect_remove_label("lgtm/need 2", 1, 500).await;
    gitea.expect_add_label("lgtm/need 1", 1).await;

    assert_eq!(send_pr_event(&gitea).await, StatusCode::OK);
    gitea.verify().await;
}

#[tokio::test]
async fn fetch_error() {
    let gitea = GiteaMockServer::start().await;
    gitea.pull_request_error(500).await;
    gitea.expect_no_label_changes().await;

    assert_eq!(
        send_pr_event(&gitea).await,
        StatusCode::INTERNAL_SERVER_ERROR
    );
    gitea.verify().await;
}

#[tokio::test]
async fn unsupported_event() {
    let gitea = GiteaMockServer::start().await;
    let status = send(
        secrets_for(&gitea.uri()),
        create_webhook_request("push", serde_json::json!({"ref": "refs/heads/main"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(gitea.request_count().await, 0);
}

#[tokio::test]
async fn pull_request_number_zero() {
    let gitea = GiteaMockServer::start().await;
    let payload = PullRequestPayloadBuilder::default().number(0).create();
    let status = send(
        secrets_for(&gitea.uri()),
        create_webhook_request("pull_request", payload),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(gitea.request_count().await, 0);
}

#[tokio::test]
async fn invalid_signature() {
    let gitea = GiteaMockServer::start().await;
    let mut request = create_webhook_request("pull_request", default_pull_request_payload());
    request
        .headers_mut()
        .insert("x-gitea-signature", "00ff".parse().unwrap());

    let status = send(secrets_for(&gitea.uri()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(gitea.request_count().await, 0);
}

#[tokio::test]
async fn missing_host_secret() {
    let gitea = GiteaMockServer::start().await;
    let secrets = StaticSecretProvider::new()
        .with(WEBHOOK_SECRET, TEST_WEBHOOK_SECRET)
        .with(GITEA_TOKEN_SECRET, TEST_GITEA_TOKEN);
    let status = send(
        secrets,
        create_webhook_request("pull_request", default_pull_request_payload()),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(gitea.request_count().await, 0);
}

#[tokio::test]
async fn missing_token_secret() {
    let gitea = GiteaMockServer::start().await;
    let secrets = StaticSecretProvider::new()
        .with(WEBHOOK_SECRET, TEST_WEBHOOK_SECRET)
        .with(GITEA_HOST_SECRET, &gitea.uri());
    let status = send(
        secrets,
        create_webhook_request("pull_request", default_pull_request_payload()),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(gitea.request_count().await, 0);
}

#[tokio::test]
async fn invalid_gitea_host() {
    let status = send(
        secrets_for("not a url"),
        create_webhook_request("pull_request", default_pull_request_payload()),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unreachable_gitea_api() {
    // Nothing is mounted, so the version check fails.
    let mock_server = MockServer::start().await;
    let status = send(
        secrets_for(&mock_server.uri()),
        create_webhook_request("pull_request", default_pull_request_payload()),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/api/v1/version");
}

#[tokio::test]
async fn health() {
    let request = Request::get("/health").body(Body::empty()).unwrap();
    assert_eq!(
        send(StaticSecretProvider::new(), request).await,
        StatusCode::OK
    );
}
