//! Built-in action services.

mod message;

pub use message::MessageService;
