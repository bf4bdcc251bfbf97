use std::net::TcpListener;

/// Whether `port` can currently be bound on the wildcard address.
///
/// Purely advisory: the port can still be taken between this probe and a
/// later bind. That race is owned by the caller's retry loop (see
/// [`crate::ServerInstance::start`]), not by the prober.
pub fn is_port_free(port: u16) -> bool {
    TcpListener::bind(("0.0.0.0", port)).is_ok()
}

/// Lowest free port in `[start, end]`, scanning ascending. `None` when the
/// whole window is occupied (or empty).
pub fn find_free_port((start, end): (u16, u16)) -> Option<u16> {
    (start.max(1)..=end).find(|&port| is_port_free(port))
}
