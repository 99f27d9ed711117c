//! Admin area: login, schedule control, notification and reset.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use brunch_integration_tests::{TestApp, TestOptions, at, location};
use reqwest::StatusCode;

#[tokio::test]
async fn test_admin_requires_login() {
    let app = TestApp::spawn().await;
    app.sign_up("Alice", None, false).await;

    let response = app.get("/admin").await;
    assert_eq!(location(&response), "/admin/login");

    for path in ["/admin/reset", "/admin/cancel-next", "/admin/notify"] {
        let response = app.post_form(path, &[("cancelled", "true")]).await;
        assert_eq!(location(&response), "/admin/login", "POST {path}");
    }
    assert_eq!(app.roster_names().await, vec!["Alice"]);
}

#[tokio::test]
async fn test_bad_login_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form("/admin/login", &[("username", "erik"), ("password", "wrong")])
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response.text().await.unwrap();
    assert!(body.contains("Benutzername oder Passwort ist falsch."));

    let response = app.get("/admin").await;
    assert_eq!(location(&response), "/admin/login");
}

#[tokio::test]
async fn test_login_session_and_logout() {
    let app = TestApp::spawn().await;
    app.sign_up("Alice", Some("Käse"), false).await;
    app.login().await;

    let body = app.page("/admin").await;
    assert!(body.contains("Angemeldet als erik"));
    assert!(body.contains("<td>Alice</td>"));
    assert!(body.contains("<td>Käse</td>"));
    assert!(body.contains("mailto:brunch%40example.org?subject=Brunch%20am%2016.06.2024"));

    // Logged-in admins skip the login form
    let response = app.get("/admin/login").await;
    assert_eq!(location(&response), "/admin");

    let response = app.post_form("/admin/logout", &[]).await;
    assert_eq!(location(&response), "/admin/login?success=logged_out");
    let response = app.get("/admin").await;
    assert_eq!(location(&response), "/admin/login");
}

#[tokio::test]
async fn test_session_cookie_is_hardened() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/admin/login",
            &[("username", "erik"), ("password", "brunch")],
        )
        .await;
    let cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();

    assert!(cookie.starts_with("brunch_admin_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
}

#[tokio::test]
async fn test_override_date() {
    let app = TestApp::spawn().await;
    app.login().await;

    // Monday
    let response = app
        .post_form("/admin/override-date", &[("date", "2024-06-17")])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().contains("ist kein Sonntag"));

    let response = app
        .post_form("/admin/override-date", &[("date", "kommenden Sonntag")])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_form("/admin/override-date", &[("date", "2024-06-09")])
        .await;
    assert_eq!(location(&response), "/admin?success=override_set");
    let body = app.page("/").await;
    assert!(body.contains("Sonntag, 09.06.2024"));
    assert!(body.contains("(verschoben)"));

    let response = app
        .post_form("/admin/override-date", &[("date", "")])
        .await;
    assert_eq!(location(&response), "/admin?success=override_cleared");
    assert!(app.page("/").await.contains("Sonntag, 16.06.2024"));
}

#[tokio::test]
async fn test_override_expires_after_event() {
    let app = TestApp::spawn().await;
    app.login().await;
    app.post_form("/admin/override-date", &[("date", "2024-06-09")])
        .await;

    app.clock.set(at("2024-06-10 08:00"));
    assert!(app.page("/").await.contains("Sonntag, 16.06.2024"));
}

#[tokio::test]
async fn test_cancel_and_reinstate() {
    let app = TestApp::spawn().await;
    app.login().await;

    let response = app
        .post_form("/admin/cancel-next", &[("cancelled", "true")])
        .await;
    assert_eq!(location(&response), "/admin?success=cancelled");
    assert!(app
        .page("/")
        .await
        .contains("Der Brunch am Sonntag, 16.06.2024 fällt leider aus."));

    let response = app
        .post_form("/admin/cancel-next", &[("cancelled", "false")])
        .await;
    assert_eq!(location(&response), "/admin?success=reinstated");
    assert!(!app.page("/").await.contains("fällt leider aus"));
}

#[tokio::test]
async fn test_notify_without_pager_warns() {
    let app = TestApp::spawn().await;
    app.sign_up("Alice", None, false).await;
    app.login().await;

    let response = app.post_form("/admin/notify", &[]).await;
    assert_eq!(location(&response), "/admin?warning=paging_disabled");
    assert!(app
        .page("/admin?warning=paging_disabled")
        .await
        .contains("Der Pager ist nicht eingerichtet"));
    assert_eq!(app.roster_names().await, vec!["Alice"]);
}

#[tokio::test]
async fn test_failed_page_leaves_roster_untouched() {
    let app = TestApp::spawn_with(TestOptions {
        unreachable_pager: true,
        ..TestOptions::default()
    })
    .await;
    app.sign_up("Alice", None, false).await;
    app.sign_up("Bob", None, true).await;
    app.login().await;

    let response = app.post_form("/admin/notify", &[]).await;
    assert_eq!(location(&response), "/admin?warning=paging_failed");
    assert_eq!(app.roster_names().await, vec!["Alice", "Bob"]);
}

#[tokio::test]
async fn test_manual_reset() {
    let app = TestApp::spawn().await;
    app.sign_up("Alice", None, false).await;
    app.sign_up("Bob", None, false).await;
    app.login().await;

    let response = app.post_form("/admin/reset", &[]).await;
    assert_eq!(location(&response), "/admin?success=reset");
    assert!(app.roster_names().await.is_empty());

    // Resetting an empty roster is fine
    let response = app.post_form("/admin/reset", &[]).await;
    assert_eq!(location(&response), "/admin?success=reset");
}
