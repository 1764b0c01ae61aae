/// Observer of connection lifecycle edges.
///
/// Notified only when the connection is established or lost, not on every
/// internal phase transition. Both methods default to no-ops so an
/// implementation can watch just one edge.
pub trait ConnectionListener: Send + Sync {
    fn on_connection_established(&self) {}
    fn on_connection_lost(&self) {}
}
