pub mod message;
pub mod receiver;
pub mod sender;
pub mod wrap32;

// -- Re-export structs for more concise usage

pub use message::{TcpReceiverMessage, TcpSenderMessage};
pub use receiver::TcpReceiver;
pub use sender::{TcpSender, MAX_PAYLOAD_SIZE};
pub use wrap32::Wrap32;
