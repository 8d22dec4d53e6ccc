use scraper::{ElementRef, Html, Node};
use serde::Deserialize;

use super::whitespace::tidy_text;
use crate::error::{Error, Result};
use crate::lazy_selector;
use crate::menu::MenuResult;

/// Reply from `api/cal/getDay`.
#[derive(Debug, Default, Deserialize)]
pub struct DayResponse {
    #[serde(default)]
    pub alert_msg: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl DayResponse {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(From::from)
    }
}

/// Where the menu text sits inside `.menu-name`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MenuTextPolicy {
    /// The node after the leading `item_preface` span (e.g. "02-Pasta"), trimmed and otherwise
    /// kept as the vendor wrote it.
    #[default]
    SkipPreface,
    /// Every text node of the element, with whitespace runs from the markup folded into one space.
    FullText,
}

pub fn extract_menu(response: &DayResponse, policy: MenuTextPolicy) -> Result<MenuResult> {
    let alert = non_empty(response.alert_msg.as_deref());
    if let Some(alert) = alert {
        log::info!("Got alert message: {alert}");
    }
    if let Some(error) = non_empty(response.error.as_deref()) {
        if error == "unauthenticated" {
            return Err(Error::login_error("Unauthenticated"));
        }
        return Err(Error::api_error(error));
    }

    let body = response
        .body
        .as_deref()
        .ok_or_else(|| Error::parse_error("Day response has neither an error nor a body"))?;
    let fragment = Html::parse_fragment(body);

    lazy_selector!(MENU_SELECTOR <- ".menu-name");
    let Some(menu) = fragment.select(&MENU_SELECTOR).next() else {
        log::debug!("Missing menu tag in API response: {response:?}");
        return Ok(alert.map_or(MenuResult::Empty, |a| MenuResult::Alert(a.to_owned())));
    };

    let text = match policy {
        MenuTextPolicy::SkipPreface => preface_sibling_text(menu)?.trim().to_owned(),
        MenuTextPolicy::FullText => tidy_text(&menu.text().collect::<String>()).into_owned(),
    };
    Ok(MenuResult::from_text(text))
}

fn preface_sibling_text(menu: ElementRef<'_>) -> Result<String> {
    let node = menu.children().nth(1).ok_or_else(|| {
        Error::parse_error("The menu-name element has nothing after its preface")
    })?;
    Ok(match node.value() {
        Node::Text(text) => (**text).to_owned(),
        Node::Element(_) => ElementRef::wrap(node)
            .map(|element| element.text().collect())
            .unwrap_or_default(),
        _ => String::new(),
    })
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
