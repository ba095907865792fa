use std::time::Duration;

use portal_downloader::browser::{BrowserLauncher, ChromiumLauncher, LaunchOptions};
use portal_downloader::config::Config;
use portal_downloader::models::{RunStatistics, WorkflowPhase};
use portal_downloader::services::file_store::write_document;
use portal_downloader::services::{
    detect_authenticated, sanitize_filename, validate_pdf, DocumentFetcher, HttpFetcher,
    LocatorCatalog,
};
use portal_downloader::workflow::{next_stage, Stage};
use portal_downloader::App;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pdf_body(size: usize) -> Vec<u8> {
    let mut body = b"%PDF-1.5\n".to_vec();
    body.resize(size, b'0');
    body
}

#[test]
fn test_login_detection_by_url() {
    assert!(!detect_authenticated("https://x/signin", ""));
    assert!(detect_authenticated("https://x/dashboard/home", ""));
}

#[test]
fn test_sanitized_names_are_safe_and_stable() {
    for name in ["Dr. Ana María López", "../../etc/passwd", "   ", "名前"] {
        let safe = sanitize_filename(name);
        assert!(!safe.is_empty() && safe.len() <= 50);
        assert!(!safe.contains('/'));
        assert_eq!(sanitize_filename(&safe), safe);
    }
}

#[test]
fn test_setup_failure_routes_to_cleanup() {
    assert_eq!(
        next_stage(Stage::SetupBrowser, WorkflowPhase::Error),
        Some(Stage::Cleanup)
    );
    assert_eq!(next_stage(Stage::Cleanup, WorkflowPhase::Error), None);
}

#[test]
fn test_success_rate() {
    let stats = RunStatistics {
        total_records: 8,
        successful_downloads: 6,
        failed_downloads: 2,
        ..RunStatistics::default()
    };
    assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
    assert_eq!(RunStatistics::default().success_rate(), 0.0);
}

#[test]
fn test_selector_override_file() {
    let catalog = LocatorCatalog::from_toml_str(
        r#"
        [next_page]
        name = "next_page"
        probe_timeout_ms = 500
        locators = [
            { selector = "li.next > a", predicate = { kind = "visible" } },
        ]
        "#,
    )
    .unwrap();
    assert_eq!(catalog.next_page.locators[0].selector, "li.next > a");
    assert_eq!(catalog.next_page.probe_timeout_ms, 500);
    assert_eq!(catalog.username, LocatorCatalog::default().username);
}

#[test]
fn test_config_validation() {
    let config = Config {
        username: "jdoe".into(),
        password: "secret".into(),
        login_url: "https://portal.example.com/signin".into(),
        ..Config::default()
    };
    assert_ok!(config.validate());
    assert_err!(Config::default().validate());
}

#[tokio::test]
async fn test_fetched_document_is_written_and_validated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/cv.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_body(2048)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/login.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>".repeat(400)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();

    let good = fetcher
        .fetch(&format!("{}/files/cv.pdf", server.uri()))
        .await
        .unwrap();
    let good_path = write_document(dir.path(), "Jane_Doe", &good.body).await.unwrap();
    assert!(validate_pdf(&good_path).await);

    let bad = fetcher
        .fetch(&format!("{}/files/login.html", server.uri()))
        .await
        .unwrap();
    let bad_path = write_document(dir.path(), "Jane_Doe", &bad.body).await.unwrap();
    assert_eq!(bad_path.file_name().unwrap(), "Jane_Doe_1.pdf");
    assert!(!validate_pdf(&bad_path).await);
}

#[tokio::test]
#[ignore] // 默认忽略，需要本机安装 Chrome：cargo test -- --ignored
async fn test_browser_launch_and_teardown() {
    let config = Config {
        headless: true,
        ..Config::default()
    };
    let launcher = ChromiumLauncher::new(LaunchOptions::from_config(&config));

    let mut browser = launcher.launch().await.expect("启动浏览器失败");
    let page = browser.open_page().await.expect("打开页面失败");
    page.goto("about:blank").await.expect("导航失败");

    page.close().await.expect("关闭页面失败");
    browser.close_browser().await.expect("关闭浏览器失败");
    browser.shutdown_engine().await.expect("停止事件循环失败");
}

#[tokio::test]
#[ignore] // 需要 .env 中的真实门户账号
async fn test_full_run_against_portal() {
    let config = Config::from_env();
    let state = App::initialize(config)
        .await
        .expect("初始化失败")
        .run()
        .await;

    assert!(matches!(
        state.phase(),
        WorkflowPhase::Completed | WorkflowPhase::Error
    ));
}
