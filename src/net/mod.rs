pub mod arp;
pub mod errors;
pub mod ethernet;
pub mod interface;
pub mod ip;

// -- Re-export structs for more concise usage

pub use arp::ArpMessage;
pub use errors::HeaderError;
pub use ethernet::{EthernetAddress, EthernetFrame, EthernetHeader, ETHERNET_BROADCAST};
pub use interface::{NetworkInterface, OutputPort};
pub use ip::{IpHeader, Ipv4Datagram};
