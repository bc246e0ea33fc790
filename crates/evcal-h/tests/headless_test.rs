use evcal_engine::config::schema::BrowserConfig;
use evcal_engine::descriptor::{AttributeCandidates, Descriptor};
use evcal_engine::resolution::{AdaptiveResolver, TextRoleQuery};
use evcal_engine::session::PageSession;
use evcal_h::ChromiumSession;
use serial_test::serial;
use std::time::Duration;

const LOGIN_FORM: &str = "<html><head><title>Login</title></head><body>\
<main><form onsubmit='return false'>\
<input name='text' autocomplete='username' />\
<div role='button' onclick=\"document.title = 'Next:' + document.querySelector('input').value\">\
<span>Next</span></div>\
<input type='hidden' name='password' />\
</form></main></body></html>";

async fn launch() -> Option<ChromiumSession> {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    match ChromiumSession::launch(&BrowserConfig::default()).await {
        Ok(session) => Some(session),
        Err(e) => {
            eprintln!("Failed to launch browser (is Chromium installed?): {}", e);
            None
        }
    }
}

#[tokio::test]
#[serial]
async fn resolves_fills_and_clicks_on_a_real_page() {
    let Some(mut session) = launch().await else {
        return;
    };

    let url = format!("data:text/html,{}", LOGIN_FORM);
    let nav = session.navigate(&url).await.expect("navigation failed");
    assert_eq!(nav.title, "Login");

    let candidates = AttributeCandidates::new()
        .with("autocomplete", ["username"])
        .with("name", ["text"]);
    let input = AdaptiveResolver::new(&mut session)
        .resolve_by_attributes(&candidates, Duration::from_secs(5))
        .await
        .expect("username input should resolve");
    session.fill(&input, "eventbot").await.expect("fill failed");

    let next = AdaptiveResolver::new(&mut session)
        .resolve_by_text_or_role(
            &TextRoleQuery::new().texts(["Next"]).role("button"),
            Duration::from_secs(5),
        )
        .await
        .expect("button should resolve");
    session.click(&next).await.expect("click failed");

    let title = session.evaluate("document.title").await.unwrap();
    assert_eq!(title, "Next:eventbot");

    // Hidden inputs exist but never become visible.
    let hidden = Descriptor::input_attribute("name", "password");
    assert_eq!(session.count(&hidden).await.unwrap(), 1);
    let err = session
        .wait_for_visible(&hidden, Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    let html = session.content().await.unwrap();
    assert!(html.contains("autocomplete"));
    let png = session.screenshot().await.unwrap();
    assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));

    session.close().await.expect("close failed");
    assert!(!session.is_open().await);
}
