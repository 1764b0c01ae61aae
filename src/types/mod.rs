pub mod constants;
pub mod error;
pub mod message;

pub use error::{PushError, Result};
pub use message::TopicMessage;
