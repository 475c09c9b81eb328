use crate::net::arp::ArpMessage;
use crate::net::ethernet::{format_mac, EthernetAddress, EthernetFrame, EthernetHeader, ETHERNET_BROADCAST};
use crate::net::ip::Ipv4Datagram;
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use tracing::{debug, trace};

/// Abstraction of the physical output port a `NetworkInterface` sends
/// Ethernet frames through. Tests inject a recording sink.
pub trait OutputPort {
    fn transmit(&mut self, frame: EthernetFrame);
}

#[derive(Debug)]
struct ArpEntry {
    ethernet_address: EthernetAddress,
    age_ms: u64,
}

/// The IP-over-Ethernet adapter: resolves next hops via ARP, queues
/// datagrams while a resolution is in flight, forwards inbound IPv4 payloads
/// upward, and ages its cache on `tick`.
pub struct NetworkInterface {
    name: String, // Human-readable, diagnostics only
    port: Box<dyn OutputPort>,
    ethernet_address: EthernetAddress,
    ip_address: Ipv4Addr,

    datagrams_received: VecDeque<Ipv4Datagram>,
    arp_cache: HashMap<u32, ArpEntry>,
    pending_datagrams: HashMap<u32, Vec<Ipv4Datagram>>,
    // One timer per unresolved next hop; its presence suppresses re-requests.
    // Key set mirrors `pending_datagrams`.
    pending_timers: HashMap<u32, u64>,
}

impl NetworkInterface {
    pub const ARP_ENTRY_TTL_MS: u64 = 30_000;
    pub const ARP_REQUEST_PERIOD_MS: u64 = 5_000;

    pub fn new(
        name: impl Into<String>,
        port: Box<dyn OutputPort>,
        ethernet_address: EthernetAddress,
        ip_address: Ipv4Addr,
    ) -> Self {
        let name = name.into();
        debug!(
            name = %name,
            mac = %format_mac(&ethernet_address),
            ip = %ip_address,
            "network interface up"
        );
        NetworkInterface {
            name,
            port,
            ethernet_address,
            ip_address,
            datagrams_received: VecDeque::new(),
            arp_cache: HashMap::new(),
            pending_datagrams: HashMap::new(),
            pending_timers: HashMap::new(),
        }
    }

    /// Send an IPv4 datagram toward `next_hop`, resolving its Ethernet
    /// address first if the cache has no entry. Unresolved datagrams queue
    /// until the ARP reply arrives or the request times out.
    pub fn send_datagram(&mut self, dgram: Ipv4Datagram, next_hop: Ipv4Addr) {
        let next_hop_ip = u32::from(next_hop);

        if let Some(entry) = self.arp_cache.get(&next_hop_ip) {
            let dst = entry.ethernet_address;
            self.transmit_ipv4(dst, &dgram);
            return;
        }

        self.pending_datagrams.entry(next_hop_ip).or_default().push(dgram);

        // A request for this hop is already in flight
        if self.pending_timers.contains_key(&next_hop_ip) {
            return;
        }
        self.pending_timers.insert(next_hop_ip, 0);

        let request = ArpMessage {
            opcode: ArpMessage::OPCODE_REQUEST,
            sender_ethernet_address: self.ethernet_address,
            sender_ip_address: u32::from(self.ip_address),
            target_ethernet_address: [0; 6],
            target_ip_address: next_hop_ip,
        };
        debug!(name = %self.name, next_hop = %next_hop, "broadcasting arp request");
        self.port.transmit(EthernetFrame {
            header: EthernetHeader {
                dst: ETHERNET_BROADCAST,
                src: self.ethernet_address,
                ethertype: EthernetHeader::TYPE_ARP,
            },
            payload: request.to_bytes(),
        });
    }

    /// Process one inbound Ethernet frame: IPv4 payloads go to the received
    /// queue, ARP messages update the cache (and get a reply when the
    /// request targets this interface). Malformed payloads are dropped.
    pub fn recv_frame(&mut self, frame: EthernetFrame) {
        if frame.header.dst != self.ethernet_address && frame.header.dst != ETHERNET_BROADCAST {
            return;
        }

        match frame.header.ethertype {
            EthernetHeader::TYPE_IPV4 => {
                if let Ok(dgram) = Ipv4Datagram::from_bytes(&frame.payload) {
                    self.datagrams_received.push_back(dgram);
                }
            }
            EthernetHeader::TYPE_ARP => {
                let Ok(msg) = ArpMessage::from_bytes(&frame.payload) else {
                    return;
                };

                let sender_ip = msg.sender_ip_address;
                let sender_eth = msg.sender_ethernet_address;

                // Learn the sender mapping regardless of opcode
                self.arp_cache.insert(
                    sender_ip,
                    ArpEntry {
                        ethernet_address: sender_eth,
                        age_ms: 0,
                    },
                );

                if msg.opcode == ArpMessage::OPCODE_REQUEST
                    && msg.target_ip_address == u32::from(self.ip_address)
                {
                    let reply = ArpMessage {
                        opcode: ArpMessage::OPCODE_REPLY,
                        sender_ethernet_address: self.ethernet_address,
                        sender_ip_address: u32::from(self.ip_address),
                        target_ethernet_address: sender_eth,
                        target_ip_address: sender_ip,
                    };
                    self.port.transmit(EthernetFrame {
                        header: EthernetHeader {
                            dst: sender_eth,
                            src: self.ethernet_address,
                            ethertype: EthernetHeader::TYPE_ARP,
                        },
                        payload: reply.to_bytes(),
                    });
                }

                // The new mapping may unblock queued datagrams
                if let Some(queued) = self.pending_datagrams.remove(&sender_ip) {
                    for dgram in queued {
                        self.transmit_ipv4(sender_eth, &dgram);
                    }
                    self.pending_timers.remove(&sender_ip);
                }
            }
            _ => {}
        }
    }

    /// Advance the ARP cache and pending-request timers
    pub fn tick(&mut self, ms_since_last_tick: u64) {
        self.arp_cache.retain(|ip, entry| {
            entry.age_ms += ms_since_last_tick;
            let keep = entry.age_ms < Self::ARP_ENTRY_TTL_MS;
            if !keep {
                trace!(ip = %Ipv4Addr::from(*ip), "arp cache entry expired");
            }
            keep
        });

        let mut expired = Vec::new();
        self.pending_timers.retain(|&ip, age_ms| {
            *age_ms += ms_since_last_tick;
            if *age_ms >= Self::ARP_REQUEST_PERIOD_MS {
                expired.push(ip);
                false
            } else {
                true
            }
        });
        for ip in expired {
            if let Some(dropped) = self.pending_datagrams.remove(&ip) {
                trace!(
                    ip = %Ipv4Addr::from(ip),
                    count = dropped.len(),
                    "arp request timed out; dropping queued datagrams"
                );
            }
        }
    }

    /// Datagrams delivered by inbound IPv4 frames, oldest first
    pub fn datagrams_received(&mut self) -> &mut VecDeque<Ipv4Datagram> {
        &mut self.datagrams_received
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn transmit_ipv4(&mut self, dst: EthernetAddress, dgram: &Ipv4Datagram) {
        self.port.transmit(EthernetFrame {
            header: EthernetHeader {
                dst,
                src: self.ethernet_address,
                ethertype: EthernetHeader::TYPE_IPV4,
            },
            payload: dgram.to_bytes(),
        });
    }
}

// -- Unit tests --
