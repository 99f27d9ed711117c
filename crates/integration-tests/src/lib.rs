//! Integration test harness for the brunch signup server.
//!
//! Each [`TestApp`] runs the full router (sessions, security headers, rate
//! limiting) on an ephemeral port with a private in-memory database, a
//! manual clock and fixed admin credentials. Tests talk to it over HTTP
//! with a cookie-keeping `reqwest` client that does not follow redirects.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p brunch-integration-tests
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use brunch_core::{CredentialStore, PagingCredentials};
use brunch_server::config::ServerConfig;
use brunch_server::db;
use brunch_server::middleware::create_session_layer;
use brunch_server::routes;
use brunch_server::services::ManualClock;
use brunch_server::state::AppState;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, Response, StatusCode, redirect};
use secrecy::SecretString;
use tokio::task::JoinHandle;

/// Admin login accepted by every test app.
pub const ADMIN_USER: &str = "erik";
/// Password of [`ADMIN_USER`].
pub const ADMIN_PASSWORD: &str = "brunch";

/// Credential store with a single fixed admin.
#[derive(Debug)]
pub struct StaticCredentials;

impl CredentialStore for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        username == ADMIN_USER && password == ADMIN_PASSWORD
    }
}

/// Local date and time as `YYYY-MM-DD HH:MM`.
///
/// # Panics
///
/// Panics on malformed input.
#[must_use]
pub fn at(datetime: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(datetime, "%Y-%m-%d %H:%M").expect("valid test datetime")
}

/// Date as `YYYY-MM-DD`.
///
/// # Panics
///
/// Panics on malformed input.
#[must_use]
pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid test date")
}

/// How to set up a test app.
#[derive(Debug, Clone)]
pub struct TestOptions {
    /// Initial clock value.
    pub now: NaiveDateTime,
    /// Configure a DAPNET account pointing at an unreachable endpoint.
    pub unreachable_pager: bool,
}

impl Default for TestOptions {
    /// Saturday 2024-06-01 10:00; the next brunch is Sunday 2024-06-16.
    fn default() -> Self {
        Self {
            now: at("2024-06-01 10:00"),
            unreachable_pager: false,
        }
    }
}

/// A running server plus handles into its state.
pub struct TestApp {
    /// `http://127.0.0.1:<port>`
    pub base_url: String,
    /// Cookie-keeping client; redirects are not followed.
    pub client: Client,
    /// Shared state of the running server.
    pub state: AppState,
    /// The server's clock.
    pub clock: Arc<ManualClock>,
    server: JoinHandle<()>,
}

impl TestApp {
    /// Start an app with default options.
    ///
    /// # Panics
    ///
    /// Panics if the app cannot be started.
    pub async fn spawn() -> Self {
        Self::spawn_with(TestOptions::default()).await
    }

    /// Start an app.
    ///
    /// # Panics
    ///
    /// Panics if the app cannot be started.
    pub async fn spawn_with(options: TestOptions) -> Self {
        let pager_url = if options.unreachable_pager {
            Some("http://127.0.0.1:9/api")
        } else {
            None
        };
        let config = ServerConfig::from_vars(|key| match key {
            "DAPNET_URL" => pager_url.map(String::from),
            "DAPNET_CALLSIGNS" => Some("do1ffe".to_string()),
            "BRUNCH_MAIL_RECIPIENTS" => Some("brunch@example.org".to_string()),
            _ => None,
        })
        .expect("valid test configuration");

        let paging = options.unreachable_pager.then(|| PagingCredentials {
            user: "do1ffe".to_string(),
            password: SecretString::from("pager"),
        });

        let pool = db::create_memory_pool()
            .await
            .expect("in-memory database");
        let clock = Arc::new(ManualClock::new(options.now));
        let state = AppState::new(
            config.clone(),
            pool,
            Arc::new(StaticCredentials),
            paging,
            clock.clone(),
        )
        .await
        .expect("application state");

        let session_layer = create_session_layer(state.pool(), &config)
            .await
            .expect("session store");
        let app = routes::app(state.clone(), session_layer);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let server = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("test server");
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            client,
            state,
            clock,
            server,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET `path`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request")
    }

    /// GET `path` and return the body of a 200 response.
    ///
    /// # Panics
    ///
    /// Panics if the status is not 200.
    pub async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        response.text().await.expect("response body")
    }

    /// POST a urlencoded form to `path`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request")
    }

    /// Sign up a participant through the form.
    ///
    /// # Panics
    ///
    /// Panics if the signup is not accepted.
    pub async fn sign_up(&self, name: &str, item: Option<&str>, coffee_only: bool) {
        let mut form = vec![("name", name), ("custom_item", item.unwrap_or(""))];
        if coffee_only {
            form.push(("coffee_only", "on"));
        }
        let response = self.post_form("/signup", &form).await;
        assert_eq!(location(&response), "/?success=signed_up", "signup of {name}");
    }

    /// Log in as [`ADMIN_USER`].
    ///
    /// # Panics
    ///
    /// Panics if the login fails.
    pub async fn login(&self) {
        let response = self
            .post_form(
                "/admin/login",
                &[("username", ADMIN_USER), ("password", ADMIN_PASSWORD)],
            )
            .await;
        assert_eq!(location(&response), "/admin", "admin login");
    }

    /// Names on the current roster.
    ///
    /// # Panics
    ///
    /// Panics if the roster cannot be read.
    pub async fn roster_names(&self) -> Vec<String> {
        self.state
            .roster()
            .list_signups()
            .await
            .expect("roster")
            .into_iter()
            .map(|signup| signup.name.into_inner())
            .collect()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// `Location` of a 303 response.
///
/// # Panics
///
/// Panics if the response is not a 303 redirect.
#[must_use]
pub fn location(response: &Response) -> String {
    assert_eq!(
        response.status(),
        StatusCode::SEE_OTHER,
        "expected redirect from {}",
        response.url()
    );
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("Location header")
        .to_string()
}
