use std::{io, net::SocketAddr};
use thiserror::Error;

use crate::network::SocketError;
use crate::v4::ParseMacError;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Socket operation failed")]
    Socket(#[from] SocketError),

    #[error(transparent)]
    Mac(#[from] ParseMacError),

    #[error("Failed to encode the discovery packet")]
    Encode(#[from] dhcproto::error::EncodeError),

    #[error("{name} {value} is out of range {min}-{max}")]
    OutOfRange {
        name: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("tries {tries} by interval {interval} s exceeds wait {wait} s")]
    RetryBudget { tries: u32, interval: u64, wait: u64 },

    #[error("relay agent address must be IPv4, socket is bound to {0}")]
    RelayAddressNotIpv4(SocketAddr),

    #[error("Failed to transmit the discovery packet")]
    Transmit(#[source] io::Error),

    #[error("Failed to read a reply")]
    Receive(#[source] io::Error),
}
