use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine as _,
};
use chrono::Local;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};

use crate::calendar::menus_to_ical;
use crate::client::MenuClient;
use crate::config::{ClientConfig, Credentials};
use crate::error::Error;
use crate::menu::feed_window;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub client: ClientConfig,
    pub feed_domain: String,
}

/// Credentials either as plain parameters or packed into `q` as base64 of `customer_id=..&username=..&password=..`.
///
/// The base64 form only keeps the password out of casual view; it is not encryption.
#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    customer_id: Option<String>,
    username: Option<String>,
    password: Option<String>,
    q: Option<String>,
}

#[derive(Debug)]
pub enum RequestError {
    MissingParameters(Vec<&'static str>),
    BadBlob(String),
    Upstream(Error),
}

impl From<Error> for RequestError {
    fn from(e: Error) -> Self {
        Self::Upstream(e)
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingParameters(_) | Self::BadBlob(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(Error::Login(_)) => StatusCode::UNAUTHORIZED,
            Self::Upstream(Error::Api(_) | Error::Parse(_)) => StatusCode::BAD_GATEWAY,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match self {
            Self::MissingParameters(names) => {
                format!("Missing required parameter(s): {}", names.join(", "))
            }
            Self::BadBlob(msg) => format!("Could not decode parameter q: {msg}"),
            Self::Upstream(e) => e.to_string(),
        };
        log::warn!("Calendar request failed ({status}): {message}");
        (status, message).into_response()
    }
}

impl CalendarQuery {
    pub fn into_credentials(self) -> Result<Credentials, RequestError> {
        let params = match self.q.as_deref() {
            Some(blob) => decode_blob(blob)?,
            None => self,
        };

        let mut missing = Vec::new();
        let mut take = |value: Option<String>, name: &'static str| {
            let value = value.filter(|v| !v.is_empty());
            if value.is_none() {
                missing.push(name);
            }
            value.unwrap_or_default()
        };
        let customer_id = take(params.customer_id, "customer_id");
        let username = take(params.username, "username");
        let password = take(params.password, "password");

        if missing.is_empty() {
            Ok(Credentials {
                customer_id,
                username,
                password,
            })
        } else {
            Err(RequestError::MissingParameters(missing))
        }
    }
}

fn decode_blob(blob: &str) -> Result<CalendarQuery, RequestError> {
    // an un-escaped '+' arrives as a space after query decoding
    let blob = blob.trim().replace(' ', "+");
    let bytes = STANDARD
        .decode(&blob)
        .or_else(|_| URL_SAFE.decode(&blob))
        .map_err(|e| RequestError::BadBlob(e.to_string()))?;

    let mut query = CalendarQuery::default();
    for (key, value) in url::form_urlencoded::parse(&bytes) {
        let slot = match &*key {
            "customer_id" => &mut query.customer_id,
            "username" => &mut query.username,
            "password" => &mut query.password,
            _ => continue,
        };
        *slot = Some(value.into_owned());
    }
    Ok(query)
}

/// Logs in with the caller's credentials and returns last, this and next week's menus as iCalendar.
async fn calendar(
    State(config): State<Arc<ServerConfig>>,
    Query(query): Query<CalendarQuery>,
) -> Result<Response, RequestError> {
    let credentials = query.into_credentials()?;
    let mut client = MenuClient::new(config.client.clone());
    client.login(&credentials).await?;

    let (start, days) = feed_window(Local::now().date_naive());
    let menus = client.get_range(start, days).await?;
    log::info!(
        "Serving {} days for {} from {start}",
        menus.len(),
        credentials.customer_id
    );
    let ics = menus_to_ical(&menus, &config.feed_domain, 0);
    Ok(([(header::CONTENT_TYPE, "text/calendar")], ics).into_response())
}

pub fn router(config: ServerConfig) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);
    let compression_layer = CompressionLayer::new().gzip(true).br(true);

    Router::new()
        .route("/calendar", get(calendar))
        .with_state(Arc::new(config))
        .layer(cors_layer)
        .layer(compression_layer)
}

pub async fn serve(addr: SocketAddr, config: ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("listening on http://{addr}");
    axum::serve(listener, router(config))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Could not listen for ctrl-c: {e}");
    }
    log::info!("shutting down");
}
