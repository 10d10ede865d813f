//! # Dhcprobe - A DHCP Server Liveness Probe
//!
//! Dhcprobe checks whether a DHCP server is alive by posing as a relay
//! agent: it sends a DHCPDISCOVER with `giaddr` set to its own bound
//! address and treats *any* reply datagram as proof of life, including a
//! NAK. The probe never takes a lease and never forwards anything; it is
//! meant to be driven by health-check infrastructure that reads nothing
//! but the exit status.
//!
//! ## Features
//!
//! - Relay-style DHCPDISCOVER construction
//! - Connected, non-blocking UDP transport with candidate-address fallback
//! - Bounded retransmission racing an overall deadline on a
//!   single-threaded Tokio reactor
//!
//! ## Example
//!
//! ```rust,no_run
//! use dhcprobe::{MacAddr, Probe, ProbeConfig, ProbeOutcome};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mac: MacAddr = "00:11:22:33:44:55".parse()?;
//!     let config = ProbeConfig::new(mac, "203.0.113.5".to_string());
//!     let probe = Probe::new(config).await?;
//!     match probe.run().await? {
//!         ProbeOutcome::Reply => println!("server is alive"),
//!         ProbeOutcome::Timeout => println!("no reply before the deadline"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod network;
pub mod probe;
pub mod v4;

pub use config::{Args, ProbeConfig};
pub use error::ProbeError;
pub use network::Transport;
pub use probe::{Probe, ProbeOutcome};
pub use v4::MacAddr;
