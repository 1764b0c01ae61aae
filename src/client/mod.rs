mod core;
mod engine;
mod listener;

pub use self::core::PushClient;
pub use engine::ConnectionPhase;
pub use listener::ConnectionListener;
