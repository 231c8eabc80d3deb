use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address the metrics and health endpoints listen on
    #[arg(long = "metrics-addr", env = "METRICS_ADDR", default_value = "0.0.0.0:9000")]
    pub metrics_addr: String,
    /// Seconds to wait before retrying a failed or waiting reconciliation
    #[arg(long = "short-wait", env = "SHORT_WAIT", default_value_t = 30)]
    pub short_wait: u64,
    /// Seconds to wait before reconciling a ready object again
    #[arg(long = "long-wait", env = "LONG_WAIT", default_value_t = 60)]
    pub long_wait: u64,
    /// Seconds a reconciliation may run before it is abandoned
    #[arg(long = "reconcile-timeout", env = "RECONCILE_TIMEOUT", default_value_t = 60)]
    pub reconcile_timeout: u64,
    /// Log as json lines
    #[arg(long = "log-json", env = "LOG_JSON")]
    pub log_json: bool,
    /// Name events are reported under
    #[arg(long = "reporter", env = "REPORTER", default_value = "oam-kubernetes-remote")]
    pub reporter: String,
}

impl Config {
    #[must_use]
    pub fn timing(&self) -> Timing {
        Timing {
            short_wait: Duration::from_secs(self.short_wait),
            long_wait: Duration::from_secs(self.long_wait),
            timeout: Duration::from_secs(self.reconcile_timeout),
        }
    }
}

/// Fixed delays of the reconcilers, there is no backoff
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    pub short_wait: Duration,
    pub long_wait: Duration,
    pub timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            short_wait: Duration::from_secs(30),
            long_wait: Duration::from_secs(60),
            timeout: Duration::from_secs(60),
        }
    }
}
