//! The probe state machine
//!
//! One session owns one packet and one transport and races three concerns
//! on the reactor: the retransmission timer, the overall deadline, and
//! socket readability. The first terminal condition wins; the session
//! reports it as a [`ProbeOutcome`] (or an error) and leaves the choice of
//! exit code to the caller.

use std::future;
use std::io;
use std::net::IpAddr;
use std::time::Duration;

use tokio::time::{self, Instant};

use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::network::Transport;
use crate::v4::message;

const REPLY_BUFFER_LEN: usize = 1500;

/// Terminal result of a probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A datagram arrived on the probe socket before the deadline. Content
    /// is deliberately not inspected; even a NAK proves the server's stack
    /// is alive.
    Reply,
    /// The maximum wait elapsed with no reply at all.
    Timeout,
}

/// Retransmission bookkeeping: how many sends remain, how far apart they
/// are, and the elapsed-seconds value the next send will carry.
#[derive(Debug)]
struct Schedule {
    interval: Duration,
    remaining: u32,
    elapsed_secs: u16,
}

impl Schedule {
    /// Value for the packet's secs field on the upcoming transmission.
    /// Grows by `interval` per retransmission, approximating wall-clock
    /// time since the first send.
    fn secs(&self) -> u16 {
        self.elapsed_secs
    }

    /// Consumes one try and returns the instant of the next retransmission,
    /// or `None` once the budget is exhausted.
    fn advance(&mut self, now: Instant) -> Option<Instant> {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            return None;
        }

        self.elapsed_secs = self
            .elapsed_secs
            .saturating_add(self.interval.as_secs() as u16);
        Some(now + self.interval)
    }
}

/// One probe session: the fully built discovery packet, the connected
/// transport, and the timers' parameters.
pub struct Probe {
    packet: Vec<u8>,
    transport: Transport,
    schedule: Schedule,
    maxwait: Duration,
    verbose: bool,
}

impl Probe {
    /// Opens the transport and builds the discovery packet from the
    /// address the socket actually bound to.
    pub async fn new(config: ProbeConfig) -> Result<Self, ProbeError> {
        let transport = Transport::connect(
            config.local.as_deref(),
            config.local_port,
            &config.server,
            config.server_port,
        )
        .await?;

        let local_addr = transport.local_addr();
        let giaddr = match local_addr.ip() {
            IpAddr::V4(addr) => addr,
            IpAddr::V6(_) => return Err(ProbeError::RelayAddressNotIpv4(local_addr)),
        };

        let packet = message::build_discover(&config.mac, giaddr, std::process::id())?;

        Ok(Self {
            packet,
            transport,
            schedule: Schedule {
                interval: config.interval,
                remaining: config.tries,
                elapsed_secs: 0,
            },
            maxwait: config.maxwait,
            verbose: config.verbose,
        })
    }

    /// Drives the session to a terminal state.
    ///
    /// The deadline is armed once, before the first send, and fires
    /// unconditionally; exhausting the retry budget only silences the
    /// retry arm while the receive arm keeps listening.
    pub async fn run(mut self) -> Result<ProbeOutcome, ProbeError> {
        let deadline = time::sleep(self.maxwait);
        tokio::pin!(deadline);

        let mut reply = [0u8; REPLY_BUFFER_LEN];
        let mut retry_at =
            retransmit(&self.transport, &mut self.packet, &mut self.schedule).await?;

        loop {
            tokio::select! {
                () = &mut deadline => {
                    if self.verbose {
                        tracing::warn!("timeout waiting for reply");
                    }
                    return Ok(ProbeOutcome::Timeout);
                }

                () = wait_until(retry_at), if retry_at.is_some() => {
                    retry_at =
                        retransmit(&self.transport, &mut self.packet, &mut self.schedule).await?;
                }

                received = self.transport.recv(&mut reply) => match received {
                    Ok(len) => {
                        tracing::debug!(bytes = len, "reply received");
                        return Ok(ProbeOutcome::Reply);
                    }
                    Err(err) if is_transient(&err) => {}
                    Err(err) => return Err(ProbeError::Receive(err)),
                },
            }
        }
    }
}

/// Stamps the current secs value into the packet, sends it, and advances
/// the schedule.
async fn retransmit(
    transport: &Transport,
    packet: &mut [u8],
    schedule: &mut Schedule,
) -> Result<Option<Instant>, ProbeError> {
    message::set_secs(packet, schedule.secs());
    transmit(transport, packet).await?;
    Ok(schedule.advance(Instant::now()))
}

/// Sends the whole packet. An interrupted send is retried on the spot; a
/// would-block suspends inside the transport until the socket is writable.
/// Neither consumes retry budget.
async fn transmit(transport: &Transport, packet: &[u8]) -> Result<(), ProbeError> {
    loop {
        match transport.send(packet).await {
            Ok(len) => {
                tracing::debug!(bytes = len, "discovery transmitted");
                return Ok(());
            }
            Err(err) if is_transient(&err) => continue,
            Err(err) => return Err(ProbeError::Transmit(err)),
        }
    }
}

async fn wait_until(at: Option<Instant>) {
    match at {
        Some(at) => time::sleep_until(at).await,
        None => future::pending().await,
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
