use clap::Parser;
use std::time::Duration;

use crate::error::ProbeError;
use crate::network::DHCP_SERVER_PORT;
use crate::v4::MacAddr;

pub const TRIES_MIN: u64 = 1;
pub const TRIES_MAX: u64 = 32;
pub const TRIES_DEFAULT: u32 = 3;

pub const INTERVAL_MIN: u64 = 1;
pub const INTERVAL_MAX: u64 = 10;
pub const INTERVAL_DEFAULT: u64 = 2;

pub const WAIT_MIN: u64 = 3;
pub const WAIT_MAX: u64 = 60;
pub const WAIT_DEFAULT: u64 = 8;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Hardware (MAC) address to probe with, e.g. '00:11:22:33:44:55'
    #[arg(short, long)]
    pub mac: String,

    /// Address or hostname of the DHCP server to probe
    #[arg(short, long)]
    pub server: String,

    /// Local address to bind (defaults to the wildcard address)
    #[arg(short, long)]
    pub local: Option<String>,

    /// Seconds between retransmissions (1-10)
    #[arg(short, long, default_value_t = INTERVAL_DEFAULT)]
    pub interval: u64,

    /// Number of discovery packets to send (1-32)
    #[arg(short, long, default_value_t = TRIES_DEFAULT)]
    pub tries: u32,

    /// Maximum seconds to wait for any reply (3-60)
    #[arg(short, long, default_value_t = WAIT_DEFAULT)]
    pub wait: u64,

    /// Warn when the wait deadline expires without a reply
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated probe parameters; everything the session needs to run.
///
/// The ports are not part of the command-line surface. They default to the
/// DHCP server port on both ends, the relay convention, and exist as fields
/// so the whole machine can be exercised over unprivileged ports.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub mac: MacAddr,
    pub server: String,
    pub local: Option<String>,
    pub local_port: u16,
    pub server_port: u16,
    pub interval: Duration,
    pub tries: u32,
    pub maxwait: Duration,
    pub verbose: bool,
}

impl ProbeConfig {
    pub fn new(mac: MacAddr, server: String) -> Self {
        Self {
            mac,
            server,
            local: None,
            local_port: DHCP_SERVER_PORT,
            server_port: DHCP_SERVER_PORT,
            interval: Duration::from_secs(INTERVAL_DEFAULT),
            tries: TRIES_DEFAULT,
            maxwait: Duration::from_secs(WAIT_DEFAULT),
            verbose: false,
        }
    }
}

impl TryFrom<Args> for ProbeConfig {
    type Error = ProbeError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let mac = args.mac.parse::<MacAddr>()?;

        check_range("interval", args.interval, INTERVAL_MIN, INTERVAL_MAX)?;
        check_range("tries", u64::from(args.tries), TRIES_MIN, TRIES_MAX)?;
        check_range("wait", args.wait, WAIT_MIN, WAIT_MAX)?;

        // The whole retry schedule has to fit inside the overall wait.
        if u64::from(args.tries) * args.interval > args.wait {
            return Err(ProbeError::RetryBudget {
                tries: args.tries,
                interval: args.interval,
                wait: args.wait,
            });
        }

        Ok(Self {
            mac,
            server: args.server,
            local: args.local,
            local_port: DHCP_SERVER_PORT,
            server_port: DHCP_SERVER_PORT,
            interval: Duration::from_secs(args.interval),
            tries: args.tries,
            maxwait: Duration::from_secs(args.wait),
            verbose: args.verbose,
        })
    }
}

fn check_range(name: &'static str, value: u64, min: u64, max: u64) -> Result<(), ProbeError> {
    if value < min || value > max {
        return Err(ProbeError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(interval: u64, tries: u32, wait: u64) -> Args {
        Args {
            mac: "00:11:22:33:44:55".to_string(),
            server: "203.0.113.5".to_string(),
            local: None,
            interval,
            tries,
            wait,
            verbose: false,
        }
    }

    #[test]
    fn accepts_defaults() {
        let config =
            ProbeConfig::try_from(args(INTERVAL_DEFAULT, TRIES_DEFAULT, WAIT_DEFAULT)).unwrap();
        assert_eq!(config.interval, Duration::from_secs(2));
        assert_eq!(config.tries, 3);
        assert_eq!(config.maxwait, Duration::from_secs(8));
        assert_eq!(config.local_port, DHCP_SERVER_PORT);
        assert_eq!(config.server_port, DHCP_SERVER_PORT);
    }

    #[test]
    fn rejects_schedule_exceeding_wait() {
        let err = ProbeConfig::try_from(args(2, 5, 8)).unwrap_err();
        assert!(matches!(err, ProbeError::RetryBudget { .. }));
    }

    #[test]
    fn accepts_schedule_equal_to_wait() {
        assert!(ProbeConfig::try_from(args(2, 4, 8)).is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            ProbeConfig::try_from(args(11, 1, 60)).unwrap_err(),
            ProbeError::OutOfRange { name: "interval", .. }
        ));
        assert!(matches!(
            ProbeConfig::try_from(args(1, 0, 60)).unwrap_err(),
            ProbeError::OutOfRange { name: "tries", .. }
        ));
        assert!(matches!(
            ProbeConfig::try_from(args(1, 1, 61)).unwrap_err(),
            ProbeError::OutOfRange { name: "wait", .. }
        ));
    }

    #[test]
    fn rejects_invalid_mac() {
        let mut bad = args(2, 3, 8);
        bad.mac = "00:11:22:33:44".to_string();
        assert!(matches!(
            ProbeConfig::try_from(bad).unwrap_err(),
            ProbeError::Mac(_)
        ));
    }

    #[test]
    fn parses_minimal_command_line() {
        let args = Args::try_parse_from([
            "dhcprobe",
            "--mac",
            "00:11:22:33:44:55",
            "--server",
            "192.0.2.1",
        ])
        .unwrap();
        assert_eq!(args.interval, INTERVAL_DEFAULT);
        assert_eq!(args.tries, TRIES_DEFAULT);
        assert_eq!(args.wait, WAIT_DEFAULT);
        assert!(args.local.is_none());
        assert!(!args.verbose);
    }
}
