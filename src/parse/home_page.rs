use scraper::Html;

use super::field::{attr_of, attr_of_first, parse_int};
use crate::error::{Error, Result};
use crate::lazy_selector;

/// The vendor renders this on the login page instead of the home page after a bad login.
pub const INVALID_CREDENTIALS: &str = "Invalid username/password";

/// Identifiers scraped from the landing page that every day lookup has to send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub api_token: String,
    pub session_id: i64,
    pub person_id: i64,
    pub menu_cycle_id: i64,
}

/// Which `mcycle_button` to use when the page lists more than one.
///
/// Cycles for the same month can overlap (an old and a new one). Nothing in the markup says
/// which is current; the newest has so far been listed last.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CyclePolicy {
    #[default]
    Last,
    First,
}

pub fn extract_auth_context(html: &str, policy: CyclePolicy) -> Result<AuthContext> {
    // a failed login has none of the fields below, so check this first
    if html.contains(INVALID_CREDENTIALS) {
        return Err(Error::login_error("Wrong username/password"));
    }

    let document = Html::parse_document(html);
    Ok(AuthContext {
        api_token: api_token(&document)?,
        session_id: session_id(&document)?,
        person_id: person_id(&document)?,
        menu_cycle_id: menu_cycle_id(&document, policy)?,
    })
}

fn api_token(document: &Html) -> Result<String> {
    lazy_selector!(API_TOKEN_SELECTOR <- "input#lxbat");
    attr_of_first(document, &API_TOKEN_SELECTOR, "value", "API token").map(str::to_owned)
}

fn session_id(document: &Html) -> Result<i64> {
    lazy_selector!(SID_SELECTOR <- r#"input[name="sid"]"#);
    parse_int(attr_of_first(document, &SID_SELECTOR, "value", "SID")?, "SID")
}

fn person_id(document: &Html) -> Result<i64> {
    lazy_selector!(PID_SELECTOR <- r#"input[name="pid"]"#);
    parse_int(attr_of_first(document, &PID_SELECTOR, "value", "PID")?, "PID")
}

fn menu_cycle_id(document: &Html, policy: CyclePolicy) -> Result<i64> {
    lazy_selector!(CYCLE_SELECTOR <- "a.mcycle_button");
    let mut buttons = document.select(&CYCLE_SELECTOR);
    let button = match policy {
        CyclePolicy::Last => buttons.last(),
        CyclePolicy::First => buttons.next(),
    }
    .ok_or_else(|| Error::parse_error("Couldn't find value for MCID"))?;

    log::debug!(
        "Selecting for {}",
        button.text().collect::<String>().trim()
    );
    parse_int(attr_of(button, "id", "MCID")?, "MCID")
}
