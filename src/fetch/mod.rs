use std::{fmt, num::NonZeroU32, time::Duration};

use governor::{
    clock::{QuantaClock, QuantaInstant},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Jitter, Quota, RateLimiter,
};
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Client,
};
use serde::Serialize;
use tracing::{instrument, Level};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

static USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.16; rv:86.0) Gecko/20100101 Firefox/86.0";
static DELAY_JITTER: Duration = Duration::from_millis(500);

type Limiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock, NoOpMiddleware<QuantaInstant>>;

/// A cookie-carrying HTTP client bound to one customer's portal.
pub struct Session {
    client: Client,
    base_url: Url,
    limiter: Limiter,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Session for `https://{customer_id}.{vendor_domain}/`, or for `portal_url` when one is
    /// configured. Makes no request.
    pub fn for_customer(customer_id: &str, config: &ClientConfig) -> Result<Self> {
        let valid = !customer_id.is_empty()
            && customer_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(Error::login_error(format!(
                "Invalid customer id {customer_id:?}"
            )));
        }
        if let Some(portal_url) = &config.portal_url {
            return Self::new(portal_url.clone(), config.requests_per_second);
        }
        let base_url = Url::parse(&format!("https://{customer_id}.{}/", config.vendor_domain))
            .map_err(|e| Error::login_error(format!("Invalid customer id {customer_id:?}: {e}")))?;
        Self::new(base_url, config.requests_per_second)
    }

    pub fn new(base_url: Url, requests_per_second: NonZeroU32) -> Result<Self> {
        let client = Client::builder()
            .default_headers(default_headers(&base_url)?)
            .cookie_store(true)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            base_url,
            limiter: RateLimiter::direct(Quota::per_second(requests_per_second)),
        })
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[instrument(skip(self), fields(base = %self.base_url), level = Level::DEBUG)]
    pub async fn get(&self, path: &str) -> Result<String> {
        let url = self.url(path)?;
        self.throttle().await;
        let response = self.client.get(url).send().await?;
        log::trace!("GET {path}: {}", response.status());
        Ok(response.text().await?)
    }

    /// Posts `form` url-encoded. The form is kept out of the span since the login form holds a password.
    #[instrument(skip(self, form), fields(base = %self.base_url), level = Level::DEBUG)]
    pub async fn post_form<T: Serialize + ?Sized>(&self, path: &str, form: &T) -> Result<String> {
        let url = self.url(path)?;
        self.throttle().await;
        let response = self.client.post(url).form(form).send().await?;
        log::trace!("POST {path}: {}", response.status());
        Ok(response.text().await?)
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::parse_error(format!("Bad request path {path:?}: {e}")))
    }

    async fn throttle(&self) {
        self.limiter
            .until_ready_with_jitter(Jitter::up_to(DELAY_JITTER))
            .await;
    }
}

fn default_headers(base_url: &Url) -> Result<HeaderMap> {
    let origin = HeaderValue::from_str(base_url.as_str())
        .map_err(|_| Error::login_error(format!("{base_url} is not a valid origin")))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"),
    );
    headers.insert(header::ORIGIN, origin);
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    Ok(headers)
}
