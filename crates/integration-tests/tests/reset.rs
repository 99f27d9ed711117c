//! Scheduled roster reset against the running app.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use brunch_integration_tests::{TestApp, at, date};
use brunch_server::services::TickOutcome;

#[tokio::test]
async fn test_roster_cleared_after_brunch() {
    let app = TestApp::spawn().await;
    app.sign_up("Alice", None, false).await;
    let scheduler = app.state.reset_scheduler();

    app.clock.set(at("2024-06-16 14:00"));
    assert!(matches!(
        scheduler.tick().await.unwrap(),
        TickOutcome::Waiting { .. }
    ));
    assert_eq!(app.roster_names().await, vec!["Alice"]);

    app.clock.set(at("2024-06-16 15:00"));
    assert_eq!(
        scheduler.tick().await.unwrap(),
        TickOutcome::Cleared {
            cycle: date("2024-06-16"),
            removed: 1
        }
    );

    let body = app.page("/").await;
    assert!(body.contains("Anzahl der Teilnehmer: <strong>0</strong>"));

    // Signups after the reset belong to July
    app.sign_up("Bob", None, false).await;
    app.clock.set(at("2024-06-17 09:00"));
    scheduler.tick().await.unwrap();
    assert_eq!(app.roster_names().await, vec!["Bob"]);
    assert!(app.page("/").await.contains("Sonntag, 21.07.2024"));
}
