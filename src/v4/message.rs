use std::net::Ipv4Addr;

use dhcproto::{
    error::EncodeError,
    v4::{self, OptionCode},
    Encodable as _, Encoder,
};

use super::mac::MacAddr;

/// Minimum BOOTP message length; the discovery packet is zero-padded up to
/// this size and keeps it for every retransmission.
pub const BOOTP_MIN_LEN: usize = 300;

/// Byte offset of the big-endian `secs` field in the BOOTP header.
pub(crate) const SECS_OFFSET: usize = 8;

// What the server is invited to answer with. The probe accepts any reply
// at all, so this list only shapes the server's side of the exchange.
const REQUESTED_PARAMS: [OptionCode; 11] = [
    OptionCode::SubnetMask,
    OptionCode::BroadcastAddr,
    OptionCode::TimeOffset,
    OptionCode::ClasslessStaticRoute,
    OptionCode::Router,
    OptionCode::DomainName,
    OptionCode::DomainSearch,
    OptionCode::DomainNameServer,
    OptionCode::Hostname,
    OptionCode::BootfileName,
    OptionCode::TFTPServerName,
];

/// Constructs the relay-style DHCPDISCOVER.
///
/// `hops` is set to 1 and `giaddr` to the probe's own bound address, which
/// is what makes the server treat the sender as a relay agent and answer it
/// directly over unicast.
pub fn build_discover(mac: &MacAddr, giaddr: Ipv4Addr, xid: u32) -> Result<Vec<u8>, EncodeError> {
    let mut msg = v4::Message::default();
    msg.set_opcode(v4::Opcode::BootRequest)
        .set_htype(v4::HType::Eth)
        .set_hops(1)
        .set_xid(xid)
        .set_secs(0)
        .set_flags(v4::Flags::default())
        .set_giaddr(giaddr)
        .set_chaddr(mac.as_bytes());

    msg.opts_mut()
        .insert(v4::DhcpOption::MessageType(v4::MessageType::Discover));
    msg.opts_mut()
        .insert(v4::DhcpOption::ParameterRequestList(
            REQUESTED_PARAMS.to_vec(),
        ));

    let mut buffer = Vec::new();
    let mut encoder = Encoder::new(&mut buffer);
    msg.encode(&mut encoder)?;

    if buffer.len() < BOOTP_MIN_LEN {
        buffer.resize(BOOTP_MIN_LEN, 0);
    }

    Ok(buffer)
}

/// Rewrites the elapsed-seconds field in place. Every other byte of the
/// packet stays untouched between retransmissions.
pub(crate) fn set_secs(packet: &mut [u8], secs: u16) {
    packet[SECS_OFFSET..SECS_OFFSET + 2].copy_from_slice(&secs.to_be_bytes());
}
