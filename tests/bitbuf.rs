//! Property-based tests for the bit buffers and handshake messages
//!
//! These validate packing invariants across randomly generated field layouts.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use source_connector::core::bitbuf::{BitReader, BitWriter};
use source_connector::protocol::Message;

#[derive(Debug, Clone)]
enum Field {
    Bits(u32, u32),
    Byte(u8),
    Int(i32),
    Str(Vec<u8>),
}

fn field() -> impl Strategy<Value = Field> {
    prop_oneof![
        (1u32..=32).prop_flat_map(|n| {
            let max = if n == 32 { u32::MAX } else { (1u32 << n) - 1 };
            (0..=max).prop_map(move |v| Field::Bits(v, n))
        }),
        any::<u8>().prop_map(Field::Byte),
        any::<i32>().prop_map(Field::Int),
        prop::collection::vec(1u8..=255, 0..40).prop_map(Field::Str),
    ]
}

// Property: any sequence of mixed-width fields reads back in order
proptest! {
    #[test]
    fn prop_mixed_fields_read_back(fields in prop::collection::vec(field(), 1..40)) {
        let mut w = BitWriter::with_capacity(4096);
        for f in &fields {
            match f {
                Field::Bits(v, n) => w.write_bits(*v, *n).unwrap(),
                Field::Byte(b) => w.write_u8(*b).unwrap(),
                Field::Int(i) => w.write_i32(*i).unwrap(),
                Field::Str(s) => w.write_cstring(s).unwrap(),
            }
        }
        let written = w.bits_written();
        let bytes = w.into_bytes();
        prop_assert_eq!(bytes.len(), written.div_ceil(8));

        let mut r = BitReader::new(&bytes);
        for f in &fields {
            match f {
                Field::Bits(v, n) => prop_assert_eq!(r.read_bits(*n).unwrap(), *v),
                Field::Byte(b) => prop_assert_eq!(r.read_u8().unwrap(), *b),
                Field::Int(i) => prop_assert_eq!(r.read_i32().unwrap(), *i),
                Field::Str(s) => {
                    let expected = String::from_utf8_lossy(s).into_owned();
                    prop_assert_eq!(r.read_cstring(1024).unwrap(), expected);
                }
            }
        }
        prop_assert_eq!(r.bits_read(), written);
    }
}

// Property: the writer never grows past its capacity
proptest! {
    #[test]
    fn prop_writer_respects_capacity(capacity in 1usize..64, len in 0usize..128) {
        let mut w = BitWriter::with_capacity(capacity);
        let res = w.write_bytes(&vec![0x5A; len]);
        prop_assert_eq!(res.is_ok(), len <= capacity);
        prop_assert!(w.into_bytes().len() <= capacity);
    }
}

// Property: reading arbitrary bytes never panics
proptest! {
    #[test]
    fn prop_reader_total_on_arbitrary_input(data in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut r = BitReader::new(&data);
        let _ = r.read_i32();
        let _ = r.read_u8();
        let _ = r.read_cstring(1024);
        let _ = r.read_u64();
        prop_assert!(r.bits_read() <= data.len() * 8);
    }
}

// Property: the initial query decodes to the challenge it was built from
proptest! {
    #[test]
    fn prop_query_carries_challenge(challenge in any::<i32>()) {
        let msg = Message::connectionless_query(challenge);
        prop_assert!(msg.connectionless());

        let mut r = BitReader::new(msg.data());
        prop_assert_eq!(r.read_i32().unwrap(), -1);
        prop_assert_eq!(r.read_u8().unwrap(), b'q');
        prop_assert_eq!(r.read_i32().unwrap(), challenge);
        prop_assert_eq!(r.bits_remaining(), 0);
    }
}
