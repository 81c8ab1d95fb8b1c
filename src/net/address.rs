//! IP address classification for the SSRF guard
//!
//! Pure functions, no state. Every hostname the fetcher is about to connect
//! to is resolved and each resolved address is classified here first.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Classification of an IP address for fetch-policy purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    /// Globally routable
    Public,
    /// RFC 1918 / unique-local
    Private,
    /// 127.0.0.0/8 or ::1
    Loopback,
    /// 169.254.0.0/16 or fe80::/10
    LinkLocal,
    /// Unspecified, broadcast, documentation, CGNAT, and other
    /// non-routable special ranges
    Reserved,
}

/// Classifies an IP address
///
/// IPv4-mapped IPv6 addresses are classified as their embedded IPv4 address,
/// so `::ffff:127.0.0.1` is still loopback.
pub fn classify_address(ip: IpAddr) -> AddressClass {
    match ip {
        IpAddr::V4(v4) => classify_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                classify_v4(mapped)
            } else {
                classify_v6(v6)
            }
        }
    }
}

/// Whether an address of the given class may be connected to under the
/// current policy
pub fn is_fetchable(class: AddressClass, allow_private_networks: bool) -> bool {
    match class {
        AddressClass::Public => true,
        AddressClass::Private | AddressClass::Loopback | AddressClass::LinkLocal => {
            allow_private_networks
        }
        // Never routable, not even with the private-network opt-in
        AddressClass::Reserved => false,
    }
}

fn classify_v4(ip: Ipv4Addr) -> AddressClass {
    let octets = ip.octets();

    if ip.is_loopback() {
        return AddressClass::Loopback;
    }
    if ip.is_link_local() {
        return AddressClass::LinkLocal;
    }
    if ip.is_private() {
        return AddressClass::Private;
    }
    // CGNAT 100.64.0.0/10 is not public even though is_private() is false
    if octets[0] == 100 && (octets[1] & 0xc0) == 64 {
        return AddressClass::Private;
    }
    if ip.is_unspecified() || ip.is_broadcast() || ip.is_documentation() {
        return AddressClass::Reserved;
    }
    // 240.0.0.0/4 reserved for future use
    if octets[0] >= 240 {
        return AddressClass::Reserved;
    }

    AddressClass::Public
}

fn classify_v6(ip: Ipv6Addr) -> AddressClass {
    if ip.is_loopback() {
        return AddressClass::Loopback;
    }
    if ip.is_unspecified() {
        return AddressClass::Reserved;
    }

    let segments = ip.segments();
    // fc00::/7 unique-local
    if (segments[0] & 0xfe00) == 0xfc00 {
        return AddressClass::Private;
    }
    // fe80::/10 link-local
    if (segments[0] & 0xffc0) == 0xfe80 {
        return AddressClass::LinkLocal;
    }
    // 2001:db8::/32 documentation
    if segments[0] == 0x2001 && segments[1] == 0x0db8 {
        return AddressClass::Reserved;
    }

    AddressClass::Public
}
