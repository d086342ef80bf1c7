// ── Address matching ──
//
// Pure, total functions: every input classifies (anything that is not an
// IP literal or CIDR network is a domain) and normalizes.

use std::collections::HashSet;
use std::net::{Ipv4Addr, Ipv6Addr};

use ipnet::IpNet;

use crate::model::{AddressKind, GroupType};

/// Separators accepted between addresses in a raw batch string.
const SEPARATORS: &[char] = &[',', '\u{ff0c}', ';', '\n', '\r', ' ', '\t'];

/// Classify an address: IPv4 host, then IPv6 host, then CIDR network,
/// else domain.
pub fn classify(addr: &str) -> AddressKind {
    let addr = addr.trim();
    if addr.parse::<Ipv4Addr>().is_ok() {
        AddressKind::Ipv4
    } else if addr.parse::<Ipv6Addr>().is_ok() {
        AddressKind::Ipv6
    } else if addr.parse::<IpNet>().is_ok() {
        AddressKind::Network
    } else {
        AddressKind::Domain
    }
}

/// Canonical form: bare IPv4 host gets `/32`, bare IPv6 host `/128`,
/// networks and domains are kept as written.
pub fn normalize(addr: &str) -> String {
    let addr = addr.trim();
    match classify(addr) {
        AddressKind::Ipv4 => format!("{addr}/32"),
        AddressKind::Ipv6 => format!("{addr}/128"),
        AddressKind::Network | AddressKind::Domain => addr.to_owned(),
    }
}

/// `true` iff both addresses normalize to the same string.
pub fn equivalent(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Which address-book type an address belongs to, or `None` for IPv6
/// hosts and networks (never sent to the firewall).
pub fn group_type_of(addr: &str) -> Option<GroupType> {
    let addr = addr.trim();
    match classify(addr) {
        AddressKind::Ipv4 => Some(GroupType::Ip),
        AddressKind::Ipv6 => None,
        AddressKind::Network => match addr.parse::<IpNet>() {
            Ok(IpNet::V4(_)) => Some(GroupType::Ip),
            _ => None,
        },
        AddressKind::Domain => Some(GroupType::Domain),
    }
}

/// Split a raw batch string into normalized addresses, dropping empty
/// tokens and keeping the first occurrence of each address.
pub fn parse_address_list(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(SEPARATORS)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(normalize)
        .filter(|addr| seen.insert(addr.clone()))
        .collect()
}
