#![warn(unused_crate_dependencies)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

mod calendar;
mod client;
mod config;
mod error;
mod fetch;
mod menu;
mod parse;
mod server;

use std::{
    env,
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
};

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use url::Url;

use crate::{
    calendar::menus_to_ical,
    client::MenuClient,
    config::{ClientConfig, Credentials, LandingPage, FEED_DOMAIN, VENDOR_DOMAIN},
    menu::{feed_window, week_start, MenuEntry},
    parse::{CyclePolicy, MenuTextPolicy},
    server::ServerConfig,
};

#[cfg(all(target_env = "musl", target_pointer_width = "64"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// School lunch menus from a Boonli portal, as text or as an iCalendar feed.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Turns on verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the menus for a range of days (this week by default)
    Week {
        #[command(flatten)]
        login: LoginArgs,
        #[command(flatten)]
        range: RangeArgs,
        /// Print the menus as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print an iCalendar feed (last, this and next week by default)
    Ical {
        #[command(flatten)]
        login: LoginArgs,
        #[command(flatten)]
        range: RangeArgs,
        /// Domain used in the PRODID and organizer address
        #[arg(long, default_value = FEED_DOMAIN)]
        domain: String,
        /// iCalendar SEQUENCE for every event, left out when 0
        #[arg(long, default_value_t = 0)]
        sequence: u32,
    },
    /// Serve feeds at /calendar?customer_id=..&username=..&password=.. (or ?q=<base64>)
    Serve {
        #[arg(long, env = "HOST", default_value = "127.0.0.1")]
        host: IpAddr,
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
        #[arg(long, default_value = FEED_DOMAIN)]
        domain: String,
        #[command(flatten)]
        policy: PolicyArgs,
    },
}

#[derive(Debug, Args)]
struct LoginArgs {
    /// Boonli customer id, ie the first part of the domain name you log in on
    #[arg(short, long, env = "BOONLI_CUSTOMER_ID")]
    customer_id: String,
    /// Boonli username
    #[arg(short, long, env = "BOONLI_USERNAME")]
    username: String,
    /// Boonli password
    #[arg(short, long, env = "BOONLI_PASSWORD", hide_env_values = true)]
    password: String,
    #[command(flatten)]
    policy: PolicyArgs,
}

impl LoginArgs {
    fn credentials(&self) -> Credentials {
        Credentials {
            customer_id: self.customer_id.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Args)]
struct RangeArgs {
    /// First day to fetch (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Number of days to fetch
    #[arg(long)]
    days: Option<u32>,
}

#[derive(Debug, Args)]
struct PolicyArgs {
    /// Which menu cycle to use when the portal lists several
    #[arg(long, value_enum, default_value_t)]
    cycle_policy: CyclePolicy,
    /// How to pull the text out of a menu entry
    #[arg(long, value_enum, default_value_t)]
    menu_text: MenuTextPolicy,
    /// Page to read the session identifiers from after logging in
    #[arg(long, value_enum, default_value_t)]
    landing: LandingPage,
    /// Upper bound on requests per second to the portal
    #[arg(long, default_value = "5")]
    requests_per_second: NonZeroU32,
    #[arg(long, env = "BOONLI_DOMAIN", default_value = VENDOR_DOMAIN, hide = true)]
    vendor_domain: String,
    /// Portal to use instead of the customer's own Boonli site
    #[arg(long, env = "BOONLI_PORTAL_URL", hide = true)]
    portal_url: Option<Url>,
}

impl PolicyArgs {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            vendor_domain: self.vendor_domain.clone(),
            cycle_policy: self.cycle_policy,
            menu_text_policy: self.menu_text,
            landing_page: self.landing,
            requests_per_second: self.requests_per_second,
            portal_url: self.portal_url.clone(),
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(LevelFilter::Warn);
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

async fn fetch_menus(
    login: &LoginArgs,
    start: NaiveDate,
    days: u32,
) -> error::Result<Vec<MenuEntry>> {
    let mut client = MenuClient::new(login.policy.client_config());
    client.login(&login.credentials()).await?;
    if let Some(context) = client.auth_context() {
        log::info!("Using menu cycle {}", context.menu_cycle_id);
    }
    client.get_range(start, days).await
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> core::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Week { login, range, json } => {
            let start = range.start.unwrap_or_else(|| week_start(today()));
            let menus = fetch_menus(&login, start, range.days.unwrap_or(7)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&menus)?);
            } else {
                for entry in &menus {
                    println!("{}: {}", entry.date.format("%a %Y-%m-%d"), entry.menu);
                }
            }
        }
        Command::Ical {
            login,
            range,
            domain,
            sequence,
        } => {
            let (feed_start, feed_days) = feed_window(today());
            let start = range.start.unwrap_or(feed_start);
            let menus = fetch_menus(&login, start, range.days.unwrap_or(feed_days)).await?;
            print!("{}", menus_to_ical(&menus, &domain, sequence));
        }
        Command::Serve {
            host,
            port,
            domain,
            policy,
        } => {
            let config = ServerConfig {
                client: policy.client_config(),
                feed_domain: domain,
            };
            server::serve(SocketAddr::new(host, port), config).await?;
        }
    }
    Ok(())
}
