//! Command line and environment configuration.
//!
//! Every flag can also be set through a `GZ_*` environment variable.
//! Durations are given in whole seconds.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::time::Duration;

use clap::Parser;

use crate::clients::{NeosClientConfig, NextRevalidatorConfig};
use crate::controller::ControllerConfig;
use crate::retry::RetryConfig;
use crate::schedule::{RevalidateSchedule, TriggerConfig};

#[derive(Debug, Parser)]
#[command(name = "grazer", version)]
#[command(about = "Revalidates Next.js pages when documents change in Neos")]
pub struct Cli {
    /// Address the HTTP server listens on.
    #[arg(long, env = "GZ_ADDRESS", default_value = "0.0.0.0:3100")]
    pub address: SocketAddr,

    /// Shared secret expected from Neos and sent to Next.js.
    #[arg(
        long,
        env = "GZ_REVALIDATE_TOKEN",
        hide_env_values = true,
        value_parser = non_empty
    )]
    pub revalidate_token: String,

    /// Revalidation endpoint of the Next.js app.
    #[arg(long, env = "GZ_NEXT_REVALIDATE_URL")]
    pub next_revalidate_url: String,

    /// Maximum number of route paths per revalidation request.
    #[arg(long, env = "GZ_REVALIDATE_BATCH_SIZE", default_value_t = NonZeroUsize::MIN)]
    pub revalidate_batch_size: NonZeroUsize,

    /// Timeout of a revalidation request, in seconds.
    #[arg(long, env = "GZ_REVALIDATE_TIMEOUT_SECS", default_value_t = 15)]
    pub revalidate_timeout_secs: u64,

    /// Internal base URL of the Neos instance.
    #[arg(long, env = "GZ_NEOS_BASE_URL")]
    pub neos_base_url: String,

    /// Public URL of the site, forwarded to Neos for multi-site setups.
    #[arg(long, env = "GZ_PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,

    /// Timeout of the document inventory request, in seconds.
    #[arg(long, env = "GZ_FETCH_TIMEOUT_SECS", default_value_t = 15)]
    pub fetch_timeout_secs: u64,

    /// Delay before the initial full revalidation, in seconds. 0 disables it.
    #[arg(long, env = "GZ_INITIAL_REVALIDATE_DELAY_SECS", default_value_t = 15)]
    pub initial_revalidate_delay_secs: u64,

    /// Cron expression for a periodic full revalidation. Repeatable; the
    /// environment variable takes a `;`-separated list.
    #[arg(
        long = "revalidate-schedule",
        env = "GZ_REVALIDATE_SCHEDULE",
        value_delimiter = ';'
    )]
    pub revalidate_schedules: Vec<RevalidateSchedule>,

    /// Enable debug logging.
    #[arg(short, long, env = "GZ_VERBOSE")]
    pub verbose: bool,
}

fn non_empty(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err("must not be empty".to_string());
    }
    Ok(value.to_string())
}

impl Cli {
    /// Default tracing filter when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "grazer=debug"
        } else {
            "grazer=info"
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            batch_size: self.revalidate_batch_size,
        }
    }

    pub fn neos_config(&self) -> NeosClientConfig {
        NeosClientConfig {
            base_url: self.neos_base_url.clone(),
            public_base_url: self.public_base_url.clone().filter(|url| !url.is_empty()),
            timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }

    pub fn next_config(&self) -> NextRevalidatorConfig {
        NextRevalidatorConfig {
            url: self.next_revalidate_url.clone(),
            token: self.revalidate_token.clone(),
            timeout: Duration::from_secs(self.revalidate_timeout_secs),
        }
    }

    pub fn trigger_config(&self) -> TriggerConfig {
        let initial_delay = match self.initial_revalidate_delay_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        TriggerConfig {
            initial_delay,
            schedules: self.revalidate_schedules.clone(),
            retry: RetryConfig::DEFAULT,
        }
    }
}
