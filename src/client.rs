use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{instrument, Level};

use crate::config::{ClientConfig, Credentials, LandingPage};
use crate::error::{Error, Result};
use crate::fetch::Session;
use crate::menu::{date_iter, range_end, MenuEntry, MenuResult};
use crate::parse::{self, AuthContext, DayResponse};

static LOGIN_PATH: &str = "login";
static HOME_PATH: &str = "home";
static DAY_PATH: &str = "api/cal/getDay";
const MAX_PREALLOCATED_DAYS: u32 = 366;

/// A session together with the identifiers scraped through it. They are only valid as a pair.
#[derive(Debug)]
struct AuthenticatedSession {
    session: Session,
    context: AuthContext,
}

#[derive(Serialize)]
struct LoginForm<'a> {
    username: &'a str,
    password: &'a str,
    csrftk: &'a str,
}

#[derive(Serialize)]
struct DayForm<'a> {
    api_token: &'a str,
    sid: i64,
    pid: i64,
    cur_mcid: i64,
    cy: i32,
    cm: u32,
    cday: u32,
}

impl<'a> DayForm<'a> {
    fn new(context: &'a AuthContext, date: NaiveDate) -> Self {
        Self {
            api_token: &context.api_token,
            sid: context.session_id,
            pid: context.person_id,
            cur_mcid: context.menu_cycle_id,
            cy: date.year(),
            cm: date.month(),
            cday: date.day(),
        }
    }
}

/// Client for one customer's menu calendar.
///
/// Call [`MenuClient::login`] once before fetching menus. Each value owns its own session, so
/// separate customers need separate clients.
#[derive(Debug, Default)]
pub struct MenuClient {
    config: ClientConfig,
    auth: Option<AuthenticatedSession>,
}

impl MenuClient {
    pub const fn new(config: ClientConfig) -> Self {
        Self { config, auth: None }
    }

    pub const fn is_logged_in(&self) -> bool {
        self.auth.is_some()
    }

    pub fn auth_context(&self) -> Option<&AuthContext> {
        self.auth.as_ref().map(|auth| &auth.context)
    }

    /// Logs in and scrapes the identifiers needed by the menu API. Does nothing if already logged in.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<()> {
        if self.is_logged_in() {
            log::warn!("Already logged in");
            return Ok(());
        }
        let session = Session::for_customer(&credentials.customer_id, &self.config)?;
        self.login_with(session, credentials).await
    }

    #[instrument(skip_all, fields(base = %session.base_url()), level = Level::DEBUG)]
    async fn login_with(&mut self, session: Session, credentials: &Credentials) -> Result<()> {
        if self.is_logged_in() {
            log::warn!("Already logged in");
            return Ok(());
        }

        log::debug!("Login GET {LOGIN_PATH}");
        let login_page = match session.get(LOGIN_PATH).await {
            Err(Error::Request(e)) if e.is_connect() || e.is_timeout() => {
                log::warn!("Got error logging in: {e}");
                return Err(Error::login_error(format!(
                    "Cannot connect to {}. Customer ID invalid?",
                    session.base_url()
                )));
            }
            res => res?,
        };
        let token = parse::extract_csrf_token(&login_page)?;
        log::debug!("Token: {token}");

        log::debug!("Login POST {LOGIN_PATH}");
        let form = LoginForm {
            username: &credentials.username,
            password: &credentials.password,
            csrftk: &token,
        };
        let login_response = session.post_form(LOGIN_PATH, &form).await?;

        let landing = match self.config.landing_page {
            LandingPage::Home => session.get(HOME_PATH).await?,
            LandingPage::LoginResponse => login_response,
        };
        let context = parse::extract_auth_context(&landing, self.config.cycle_policy)?;
        log::debug!("API Data: {context:?}");

        self.auth = Some(AuthenticatedSession { session, context });
        Ok(())
    }

    /// The menu for `date`.
    #[instrument(skip(self), level = Level::DEBUG)]
    pub async fn get_day(&self, date: NaiveDate) -> Result<MenuResult> {
        let auth = self.auth.as_ref().ok_or(Error::NotLoggedIn)?;
        let text = auth
            .session
            .post_form(DAY_PATH, &DayForm::new(&auth.context, date))
            .await?;
        let response = DayResponse::from_json(&text)?;
        parse::extract_menu(&response, self.config.menu_text_policy)
    }

    /// Menus for `count` consecutive days from `start`, fetched one at a time and in order.
    ///
    /// The first failing day fails the whole range.
    pub async fn get_range(&self, start: NaiveDate, count: u32) -> Result<Vec<MenuEntry>> {
        if !self.is_logged_in() {
            return Err(Error::NotLoggedIn);
        }
        if range_end(start, count).is_none() {
            return Err(Error::range_error(format!(
                "{count} days from {start} runs past the last supported date"
            )));
        }
        let mut entries = Vec::with_capacity(count.min(MAX_PREALLOCATED_DAYS) as usize);
        for date in date_iter(start, count) {
            let menu = self.get_day(date).await?;
            entries.push(MenuEntry { date, menu });
        }
        Ok(entries)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{fs, num::NonZeroU32};

    use httpmock::prelude::*;
    use url::Url;

    use super::*;

    const HOME_TOKEN: &str = "7C8C2555-FD5F-4AA1-BD4F-43C48B44E425";
    const CSRF_TOKEN: &str = "245EFF7C-BC24-463D-B6B1-CD34B1002DC5";

    pub(crate) fn fixture(path: &str) -> String {
        fs::read_to_string(format!("./src/parse/html_examples/{path}")).unwrap()
    }

    fn credentials() -> Credentials {
        Credentials {
            customer_id: "myschool".into(),
            username: "parent".into(),
            password: "hunter2".into(),
        }
    }

    fn session_for(server: &MockServer) -> Session {
        let base: Url = server.base_url().parse().unwrap();
        Session::new(base, NonZeroU32::new(1000).unwrap()).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Mocks the login page, the login POST and the home page.
    pub(crate) async fn mock_portal(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/login");
                then.status(200)
                    .header("Set-Cookie", "PHPSESSID=abc123; Path=/")
                    .body(fixture("login/login.html"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/login")
                    .header_exists("cookie")
                    .body_contains("username=parent")
                    .body_contains("password=hunter2")
                    .body_contains(format!("csrftk={CSRF_TOKEN}"));
                then.status(200).body("<html><body>Welcome</body></html>");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/home").header_exists("cookie");
                then.status(200).body(fixture("home/home.html"));
            })
            .await;
    }

    async fn logged_in_client(server: &MockServer) -> MenuClient {
        mock_portal(server).await;
        let mut client = MenuClient::default();
        client
            .login_with(session_for(server), &credentials())
            .await
            .expect("login against the mock portal should succeed");
        client
    }

    #[tokio::test]
    async fn test_login_scrapes_context() {
        let server = MockServer::start_async().await;
        let client = logged_in_client(&server).await;
        assert_eq!(
            client.auth_context(),
            Some(&AuthContext {
                api_token: HOME_TOKEN.into(),
                session_id: 1,
                person_id: 100001,
                menu_cycle_id: 6,
            })
        );
    }

    #[tokio::test]
    async fn test_login_twice_keeps_context() {
        let server = MockServer::start_async().await;
        let mut client = logged_in_client(&server).await;
        let before = client.auth_context().cloned();

        let other = MockServer::start_async().await;
        client
            .login_with(session_for(&other), &credentials())
            .await
            .unwrap();
        client.login(&credentials()).await.unwrap();

        assert_eq!(client.auth_context().cloned(), before);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/login");
                then.status(200).body(fixture("login/login.html"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/login");
                then.status(200).body(fixture("login/invalid_username.html"));
            })
            .await;
        let mut client = MenuClient::new(ClientConfig {
            landing_page: LandingPage::LoginResponse,
            ..ClientConfig::default()
        });
        let res = client
            .login_with(session_for(&server), &credentials())
            .await;
        assert!(matches!(res, Err(Error::Login(_))));
        assert!(!client.is_logged_in());
    }

    #[tokio::test]
    async fn test_login_missing_csrf_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/login");
                then.status(200).body(fixture("login/login_no_token.html"));
            })
            .await;
        let mut client = MenuClient::default();
        let res = client
            .login_with(session_for(&server), &credentials())
            .await;
        assert!(matches!(res, Err(Error::Parse(_))));
    }

    #[tokio::test]
    async fn test_login_unreachable_portal() {
        // nothing listens on port 1
        let session = Session::new(
            "http://127.0.0.1:1/".parse().unwrap(),
            NonZeroU32::new(1000).unwrap(),
        )
        .unwrap();
        let mut client = MenuClient::default();
        let res = client.login_with(session, &credentials()).await;
        assert!(matches!(res, Err(Error::Login(_))));
    }

    #[tokio::test]
    async fn test_get_day_requires_login() {
        let client = MenuClient::default();
        assert!(matches!(
            client.get_day(ymd(2024, 4, 8)).await,
            Err(Error::NotLoggedIn)
        ));
        assert!(matches!(
            client.get_range(ymd(2024, 4, 8), 3).await,
            Err(Error::NotLoggedIn)
        ));
    }

    #[tokio::test]
    async fn test_get_range_huge_count_requires_login() {
        let client = MenuClient::default();
        assert!(matches!(
            client.get_range(ymd(2024, 1, 1), u32::MAX).await,
            Err(Error::NotLoggedIn)
        ));
    }

    #[tokio::test]
    async fn test_get_range_past_max_date() {
        let server = MockServer::start_async().await;
        let client = logged_in_client(&server).await;
        let day = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/cal/getDay");
                then.status(200).body(fixture("day/day_no_menu.json"));
            })
            .await;

        assert!(matches!(
            client.get_range(NaiveDate::MAX, 2).await,
            Err(Error::Range(_))
        ));
        assert!(matches!(
            client.get_range(ymd(2024, 1, 1), u32::MAX).await,
            Err(Error::Range(_))
        ));
        day.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_get_day_sends_context() {
        let server = MockServer::start_async().await;
        let client = logged_in_client(&server).await;
        let day = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/cal/getDay")
                    .header_exists("cookie")
                    .body_contains(format!("api_token={HOME_TOKEN}"))
                    .body_contains("sid=1")
                    .body_contains("pid=100001")
                    .body_contains("cur_mcid=6")
                    .body_contains("cy=2024")
                    .body_contains("cm=4")
                    .body_contains("cday=8");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .body(fixture("day/day_menu_1.json"));
            })
            .await;

        let menu = client.get_day(ymd(2024, 4, 8)).await.unwrap();
        day.assert_async().await;
        assert_eq!(
            menu,
            MenuResult::Text("Macaroni and Cheese w/ Sliced Cucumbers (on the side)".into())
        );
    }

    #[tokio::test]
    async fn test_get_day_unauthenticated() {
        let server = MockServer::start_async().await;
        let client = logged_in_client(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/cal/getDay");
                then.status(200).body(fixture("day/day_unauth.json"));
            })
            .await;
        assert!(matches!(
            client.get_day(ymd(2024, 4, 8)).await,
            Err(Error::Login(_))
        ));
    }

    #[tokio::test]
    async fn test_get_range() {
        let server = MockServer::start_async().await;
        let client = logged_in_client(&server).await;
        let day = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/cal/getDay");
                then.status(200).body(fixture("day/day_no_menu_alert.json"));
            })
            .await;

        let start = ymd(2024, 2, 27);
        let entries = client.get_range(start, 5).await.unwrap();
        day.assert_hits_async(5).await;
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].date, start);
        for pair in entries.windows(2) {
            assert_eq!(pair[1].date, pair[0].date.succ_opt().unwrap());
        }
        assert!(entries
            .iter()
            .all(|e| e.menu == MenuResult::Alert("School is closed!".into())));
    }

    #[tokio::test]
    async fn test_get_range_aborts_on_error() {
        let server = MockServer::start_async().await;
        let client = logged_in_client(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/cal/getDay")
                    .body_contains("cday=28");
                then.status(200).body(fixture("day/day_server_error.json"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/cal/getDay")
                    .body_contains("cday=27");
                then.status(200).body(fixture("day/day_menu_1.json"));
            })
            .await;

        let res = client.get_range(ymd(2024, 2, 27), 4).await;
        assert!(matches!(res, Err(Error::Api(_))));
    }
}
