use std::num::NonZeroU32;

use url::Url;

use crate::parse::{CyclePolicy, MenuTextPolicy};

pub const VENDOR_DOMAIN: &str = "boonli.com";
/// Used for the calendar's PRODID and organizer address.
pub const FEED_DOMAIN: &str = "beaufour.dk";

/// Where the authenticated identifiers are read from after posting the login form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LandingPage {
    /// GET `home` with the fresh session cookie.
    #[default]
    Home,
    /// The page returned by the login POST itself.
    LoginResponse,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub vendor_domain: String,
    pub cycle_policy: CyclePolicy,
    pub menu_text_policy: MenuTextPolicy,
    pub landing_page: LandingPage,
    pub requests_per_second: NonZeroU32,
    /// Talk to this portal instead of `https://{customer_id}.{vendor_domain}/`.
    pub portal_url: Option<Url>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            vendor_domain: VENDOR_DOMAIN.to_owned(),
            cycle_policy: CyclePolicy::default(),
            menu_text_policy: MenuTextPolicy::default(),
            landing_page: LandingPage::default(),
            requests_per_second: NonZeroU32::new(5).unwrap_or(NonZeroU32::MIN),
            portal_url: None,
        }
    }
}

/// Login details for one customer portal.
#[derive(Clone)]
pub struct Credentials {
    pub customer_id: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("customer_id", &self.customer_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
