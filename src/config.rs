use std::time::Duration;

use clap::Parser;

use crate::util;

// ------------------------------------------------------------
// Command line
// ------------------------------------------------------------
//
// Every flag except `--once` / `--poll-sleep` falls back to an
// environment variable, so the worker can run from a plain
// container env without arguments.
//

/// Collector worker: pulls collection runs from the CMS queue and
/// forwards provider listings to the destination site.
#[derive(Parser, Debug, Clone)]
#[command(name = "vod-collector", version, about)]
pub struct Cli {
    /// CMS API base url (e.g. http://localhost:3000)
    #[arg(long, env = "CMS_API_BASE", default_value = "http://localhost:3000")]
    pub api_base: String,

    /// Collector worker token (same as API env COLLECTOR_WORKER_TOKEN)
    #[arg(long, env = "COLLECTOR_WORKER_TOKEN", default_value = "", hide_env_values = true)]
    pub token: String,

    /// Worker id reported to the queue (defaults to the host name)
    #[arg(long, env = "COLLECTOR_WORKER_ID")]
    pub worker_id: Option<String>,

    /// Run one task then exit (or exit if the queue is empty)
    #[arg(long)]
    pub once: bool,

    /// Sleep when the queue is empty or unreachable (e.g. 500ms, 5s, 1m)
    #[arg(long, default_value = "5s", value_parser = util::parse_duration)]
    pub poll_sleep: Duration,

    /// Seconds between runtime metric log lines (0 disables)
    #[arg(long, env = "COLLECTOR_METRICS_INTERVAL", default_value_t = 60)]
    pub metrics_interval: u64,
}

// ------------------------------------------------------------
// Resolved worker configuration
// ------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base url without trailing slash
    pub api_base: String,

    /// Bearer token for the queue
    pub token: String,

    pub worker_id: String,
    pub once: bool,
    pub poll_sleep: Duration,

    /// `None` when metric logging is disabled
    pub metrics_interval: Option<Duration>,
}

impl WorkerConfig {
    /// Resolves defaults.
    ///
    /// Returns `None` when the token is missing or blank.
    pub fn from_cli(cli: Cli) -> Option<Self> {
        let token = cli.token.trim().to_string();
        if token.is_empty() {
            return None;
        }

        let worker_id = cli
            .worker_id
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .unwrap_or_else(util::hostname);

        Some(Self {
            api_base: util::trim_base(&cli.api_base).to_string(),
            token,
            worker_id,
            once: cli.once,
            poll_sleep: cli.poll_sleep,
            metrics_interval: (cli.metrics_interval > 0)
                .then(|| Duration::from_secs(cli.metrics_interval)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["vod-collector"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn flags_resolve() {
        let cli = parse(&[
            "--api-base",
            "http://cms:3000/",
            "--token",
            " tok ",
            "--worker-id",
            "w1",
            "--once",
            "--poll-sleep",
            "250ms",
            "--metrics-interval",
            "0",
        ]);
        let cfg = WorkerConfig::from_cli(cli).unwrap();

        assert_eq!(cfg.api_base, "http://cms:3000");
        assert_eq!(cfg.token, "tok");
        assert_eq!(cfg.worker_id, "w1");
        assert!(cfg.once);
        assert_eq!(cfg.poll_sleep, Duration::from_millis(250));
        assert!(cfg.metrics_interval.is_none());
    }

    #[test]
    fn blank_token_is_rejected() {
        let cli = parse(&["--token", "   "]);
        assert!(WorkerConfig::from_cli(cli).is_none());
    }

    #[test]
    fn bad_poll_sleep_is_a_parse_error() {
        let res = Cli::try_parse_from(["vod-collector", "--poll-sleep", "soon"]);
        assert!(res.is_err());
    }
}
