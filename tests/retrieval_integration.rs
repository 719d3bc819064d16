//! Integration tests for the retrieval pipeline against a mock mirror.

use std::time::Duration;

use article_fetch::{ArticleRequest, MirrorConfig, RetrievalErrorKind, RetrievalOutcome, Retriever};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

const DOI: &str = "10.1080/09500340.2010.500105";
const LANDING_PATH: &str = "/mirror/10.1080/09500340.2010.500105";
const RESOURCE_PATH: &str = "/files/abc/jiang2010.pdf";
const CAPTCHA_ID: &str = "5a566b72e229c";
const IMAGE_BYTES: &[u8] = b"\xff\xd8\xff\xe0captcha-jpeg";
const PDF_BYTES: &[u8] = b"%PDF-1.4\n%mock document\n";

fn retriever_for(server: &MockServer) -> Retriever {
    let config = MirrorConfig::new(format!("{}/mirror/", server.uri()))
        .unwrap()
        .with_timeouts(Duration::from_secs(2), Duration::from_secs(2))
        .unwrap();
    Retriever::new(config).unwrap()
}

fn resource_url(server: &MockServer) -> String {
    format!("{}{RESOURCE_PATH}", server.uri())
}

fn landing_page(server: &MockServer) -> String {
    format!(
        r#"<html><head><title>mirror</title></head><body>
<div id="menu"><a href="http://elsewhere.example/">home</a></div>
<div id="main_content">
  <iframe src="{}#view=FitH" id="pdf"></iframe>
</div></body></html>"#,
        resource_url(server)
    )
}

fn challenge_page(server: &MockServer) -> String {
    format!(
        r#"<html><body>
<iframe id="pdf" src="{}/frame/jiang2010.pdf"></iframe>
<form method="post">
  <img id="captcha" src="/img/{CAPTCHA_ID}.jpg">
  <input type="hidden" name="id" value="{CAPTCHA_ID}">
  <input type="text" name="answer">
</form></body></html>"#,
        server.uri()
    )
}

async fn mount_landing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(LANDING_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(landing_page(server), "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

async fn mount_pdf(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(RESOURCE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BYTES, "application/pdf"))
        .mount(server)
        .await;
}

async fn mount_challenge_once(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(RESOURCE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(challenge_page(server), "Text/HTML; charset=UTF-8"),
        )
        .up_to_n_times(1)
        .mount(server)
        .await;
}

async fn mount_image(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/img/{CAPTCHA_ID}.jpg")))
        .respond_with(ResponseTemplate::new(200).set_body_raw(IMAGE_BYTES, "image/jpeg"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_retrieve_serves_document_directly() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_landing(&server).await;
    mount_pdf(&server).await;

    let outcome = retriever_for(&server)
        .retrieve(&ArticleRequest::new(DOI))
        .await
        .unwrap();

    let RetrievalOutcome::Document(article) = outcome else {
        panic!("expected document, got {outcome:?}");
    };
    assert_eq!(article.bytes, PDF_BYTES);
    assert_eq!(article.file_name, "jiang2010.pdf");
}

#[tokio::test]
async fn test_retrieve_accepts_resolver_url_input() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_landing(&server).await;
    mount_pdf(&server).await;

    let outcome = retriever_for(&server)
        .retrieve(&ArticleRequest::new(format!(" https://doi.org/{DOI} ")))
        .await
        .unwrap();
    assert!(matches!(outcome, RetrievalOutcome::Document(_)));
}

#[tokio::test]
async fn test_retrieve_issues_challenge_from_frame_origin() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_landing(&server).await;
    mount_challenge_once(&server).await;
    mount_image(&server).await;

    let outcome = retriever_for(&server)
        .retrieve(&ArticleRequest::new(DOI))
        .await
        .unwrap();

    let RetrievalOutcome::Challenge(challenge) = outcome else {
        panic!("expected challenge, got {outcome:?}");
    };
    assert_eq!(challenge.id, CAPTCHA_ID);
    assert_eq!(
        challenge.image_url,
        format!("{}/img/{CAPTCHA_ID}.jpg", server.uri())
    );
    assert_eq!(challenge.image_bytes().unwrap(), IMAGE_BYTES);
    assert_eq!(challenge.resource_url, resource_url(&server));
    assert_eq!(challenge.doi, DOI);
}

#[tokio::test]
async fn test_challenge_without_frame_uses_resource_origin() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_landing(&server).await;
    Mock::given(method("GET"))
        .and(path(RESOURCE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(r#"<p>Please solve</p><img id="captcha" src="/img/{CAPTCHA_ID}.jpg">"#),
            "text/html",
        ))
        .mount(&server)
        .await;
    mount_image(&server).await;

    let outcome = retriever_for(&server)
        .retrieve(&ArticleRequest::new(DOI))
        .await
        .unwrap();
    let RetrievalOutcome::Challenge(challenge) = outcome else {
        panic!("expected challenge, got {outcome:?}");
    };
    assert_eq!(challenge.image_bytes().unwrap(), IMAGE_BYTES);
}

#[tokio::test]
async fn test_submit_answer_posts_form_then_refetches_document() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_landing(&server).await;
    mount_challenge_once(&server).await;
    mount_image(&server).await;
    mount_pdf(&server).await;
    Mock::given(method("POST"))
        .and(path(RESOURCE_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("answer=x7k2p"))
        .and(body_string_contains(format!("id={CAPTCHA_ID}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let retriever = retriever_for(&server);
    let outcome = retriever
        .retrieve(&ArticleRequest::new(DOI))
        .await
        .unwrap();
    let RetrievalOutcome::Challenge(challenge) = outcome else {
        panic!("expected challenge, got {outcome:?}");
    };

    let outcome = retriever.submit_answer(challenge, "x7k2p").await.unwrap();
    let RetrievalOutcome::Document(article) = outcome else {
        panic!("expected document after answering, got {outcome:?}");
    };
    assert_eq!(article.bytes, PDF_BYTES);
    assert_eq!(article.file_name, "jiang2010.pdf");
}

#[tokio::test]
async fn test_submit_answer_non_success_post_still_refetches() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_landing(&server).await;
    mount_challenge_once(&server).await;
    mount_image(&server).await;
    mount_pdf(&server).await;
    Mock::given(method("POST"))
        .and(path(RESOURCE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let retriever = retriever_for(&server);
    let RetrievalOutcome::Challenge(challenge) = retriever
        .retrieve(&ArticleRequest::new(DOI))
        .await
        .unwrap()
    else {
        panic!("expected challenge");
    };

    let outcome = retriever.submit_answer(challenge, "wrong").await.unwrap();
    assert!(matches!(outcome, RetrievalOutcome::Document(_)));
}

#[tokio::test]
async fn test_submit_answer_wrong_answer_issues_new_challenge() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_landing(&server).await;
    Mock::given(method("GET"))
        .and(path(RESOURCE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(challenge_page(&server), "text/html"))
        .mount(&server)
        .await;
    mount_image(&server).await;
    Mock::given(method("POST"))
        .and(path(RESOURCE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let retriever = retriever_for(&server);
    let RetrievalOutcome::Challenge(first) = retriever
        .retrieve(&ArticleRequest::new(DOI))
        .await
        .unwrap()
    else {
        panic!("expected challenge");
    };

    let outcome = retriever.submit_answer(first, "wrong").await.unwrap();
    let RetrievalOutcome::Challenge(second) = outcome else {
        panic!("expected a fresh challenge, got {outcome:?}");
    };
    assert_eq!(second.doi, DOI);
    assert_eq!(second.resource_url, resource_url(&server));
}

#[tokio::test]
async fn test_resource_502_is_overloaded() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_landing(&server).await;
    Mock::given(method("GET"))
        .and(path(RESOURCE_PATH))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = retriever_for(&server)
        .retrieve(&ArticleRequest::new(DOI))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RetrievalErrorKind::UpstreamOverloaded);
    assert_eq!(
        err.user_message(),
        "Servers are over capacity, try again later"
    );
}

#[tokio::test]
async fn test_resource_500_is_unavailable() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_landing(&server).await;
    Mock::given(method("GET"))
        .and(path(RESOURCE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = retriever_for(&server)
        .retrieve(&ArticleRequest::new(DOI))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RetrievalErrorKind::UpstreamUnavailable);
}

#[tokio::test]
async fn test_landing_404_is_unavailable() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path(LANDING_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = retriever_for(&server)
        .retrieve(&ArticleRequest::new(DOI))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RetrievalErrorKind::UpstreamUnavailable);
    assert_eq!(
        err.user_message(),
        "Servers are not available, try again later"
    );
}

#[tokio::test]
async fn test_landing_without_marker_is_article_not_found() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path(LANDING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><body><p>nothing here: http://host/a.pdf</p></body></html>",
            "text/html",
        ))
        .mount(&server)
        .await;

    let err = retriever_for(&server)
        .retrieve(&ArticleRequest::new(DOI))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RetrievalErrorKind::ArticleNotFound);
    assert_eq!(err.user_message(), "Article with this doi does not exist");
}

#[tokio::test]
async fn test_unrecognised_challenge_page_is_captcha_parse_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_landing(&server).await;
    Mock::given(method("GET"))
        .and(path(RESOURCE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>Access denied</body></html>", "text/html"),
        )
        .mount(&server)
        .await;

    let err = retriever_for(&server)
        .retrieve(&ArticleRequest::new(DOI))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RetrievalErrorKind::CaptchaParseFailure);
    assert_eq!(
        err.user_message(),
        "Internal application error, try again later"
    );
}

#[tokio::test]
async fn test_missing_captcha_image_is_unavailable() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_landing(&server).await;
    mount_challenge_once(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/img/{CAPTCHA_ID}.jpg")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = retriever_for(&server)
        .retrieve(&ArticleRequest::new(DOI))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RetrievalErrorKind::UpstreamUnavailable);
}

#[tokio::test]
async fn test_slow_landing_page_times_out_as_unavailable() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path(LANDING_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(landing_page(&server), "text/html")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = MirrorConfig::new(format!("{}/mirror/", server.uri()))
        .unwrap()
        .with_timeouts(Duration::from_secs(1), Duration::from_secs(1))
        .unwrap();
    let err = Retriever::new(config)
        .unwrap()
        .retrieve(&ArticleRequest::new(DOI))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RetrievalErrorKind::UpstreamUnavailable);
}

#[tokio::test]
async fn test_invalid_doi_makes_no_request() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = retriever_for(&server)
        .retrieve(&ArticleRequest::new("http://no-resolver-here/10.1/x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RetrievalErrorKind::InvalidDoi);
    assert_eq!(err.user_message(), "Please check if doi string is correct");
}
