pub mod udp;

pub use udp::{Client, ClientHandle, Outbound};
