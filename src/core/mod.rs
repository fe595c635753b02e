//! # Core Packet Components
//!
//! Bit-level packing and datagram framing.
//!
//! ## Components
//! - **BitReader / BitWriter**: LSB-first bit buffers with little-endian integers
//! - **DatagramCodec**: tokio codec mapping one datagram to one message
//!
//! ## Wire Format
//! ```text
//! connectionless: [Marker(4) = -1] [Type(1)] [Payload(N)]
//! connected:      [NetMessageType(6 bits)] [Payload(N bits)]
//! ```

pub mod bitbuf;
pub mod codec;
