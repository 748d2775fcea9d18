//! Property tests for the codec, frame buffer and counter ordering

use core::cmp::Ordering;

use proptest::prelude::*;
use robotling_protocol::link::counter_order;
use robotling_protocol::{
    decode, encode, from_wire, to_wire, Direction, FrameBuffer, Message, ParameterSet,
    ProtocolError, Token, MAX_PARAM_SETS, MAX_VALUES,
};

fn arb_token() -> impl Strategy<Value = Token> {
    (0u16..=Token::LAST.code()).prop_map(Token::from_code)
}

fn arb_set() -> impl Strategy<Value = ParameterSet> {
    (
        (0x21u8..=0x7E).prop_map(char::from),
        prop::collection::vec(any::<i16>(), 0..=MAX_VALUES),
    )
        .prop_map(|(key, values)| ParameterSet::new(key, &values).unwrap())
}

fn arb_message() -> impl Strategy<Value = Message> {
    (
        arb_token(),
        any::<u16>(),
        prop::collection::vec(arb_set(), 0..=MAX_PARAM_SETS),
    )
        .prop_map(|(token, counter, sets)| {
            let mut msg = Message::new(token).with_counter(counter);
            for set in sets {
                msg.push_set(set).unwrap();
            }
            msg
        })
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Request), Just(Direction::Reply)]
}

proptest! {
    #[test]
    fn prop_payload_roundtrip(msg in arb_message()) {
        let payload = encode(&msg).unwrap();
        prop_assert_eq!(decode(&payload).unwrap(), msg);
    }

    #[test]
    fn prop_wire_roundtrip(msg in arb_message(), dir in arb_direction()) {
        let frame = to_wire(&msg, dir).unwrap();
        prop_assert_eq!(from_wire(&frame).unwrap(), msg);
    }

    #[test]
    fn prop_wire_payload_has_no_delimiters(msg in arb_message(), dir in arb_direction()) {
        let frame = to_wire(&msg, dir).unwrap();
        let inner = &frame[1..frame.len() - 1];
        prop_assert!(!inner.iter().any(|&b| b == b';' || b == b'<' || b == b'>'));
    }

    #[test]
    fn prop_counter_order(expected in any::<u16>(), delta in 1u16..0x8000) {
        prop_assert_eq!(counter_order(expected, expected), Ordering::Equal);
        prop_assert_eq!(counter_order(expected.wrapping_sub(delta), expected), Ordering::Less);
        prop_assert_eq!(counter_order(expected.wrapping_add(delta), expected), Ordering::Greater);
    }

    #[test]
    fn prop_arbitrary_chunking(msg in arb_message(), chunk in 1usize..40) {
        let frame = to_wire(&msg, Direction::Reply).unwrap();
        let mut buf = FrameBuffer::new(Direction::Reply);
        let mut extracted = Vec::new();
        for piece in frame.chunks(chunk) {
            prop_assert!(extracted.is_empty());
            buf.feed(piece).unwrap();
            while let Some(m) = buf.next_message().unwrap() {
                extracted.push(m);
            }
        }
        prop_assert_eq!(extracted, vec![msg]);
    }

    #[test]
    fn prop_garbage_then_frame(
        garbage in prop::collection::vec(any::<u8>().prop_filter("no start marker", |b| *b != b'<'), 0..200),
        msg in arb_message(),
    ) {
        let frame = to_wire(&msg, Direction::Reply).unwrap();
        let mut buf = FrameBuffer::new(Direction::Reply);
        buf.feed(&garbage).unwrap();
        buf.feed(&frame).unwrap();
        prop_assert_eq!(buf.next_message().unwrap(), Some(msg));
    }
}

#[test]
fn test_corrupt_frame_then_valid_frame() {
    let msg = Message::new(Token::STATUS).with_data('S', &[1, 2, 3]).unwrap();
    let good = to_wire(&msg, Direction::Reply).unwrap();
    let mut bad = good.clone();
    bad[3] = b'x';

    let mut buf = FrameBuffer::new(Direction::Reply);
    buf.feed(&bad).unwrap();
    buf.feed(&good).unwrap();
    assert_eq!(buf.next_message(), Err(ProtocolError::CorruptFrame));
    assert_eq!(buf.next_message(), Ok(Some(msg)));
    assert_eq!(buf.next_message(), Ok(None));
}

#[test]
fn test_size_limits() {
    assert_eq!(
        ParameterSet::new('V', &[0; MAX_VALUES + 1]),
        Err(ProtocolError::InvalidParameterSet)
    );

    let mut msg = Message::new(Token::GAIT_PARAMS);
    for key in ['A', 'B', 'C', 'D'] {
        msg.add_data(key, &[1]).unwrap();
    }
    let before = encode(&msg).unwrap();
    assert_eq!(
        msg.add_data('E', &[1]),
        Err(ProtocolError::InvalidParameterSet)
    );
    assert_eq!(encode(&msg).unwrap(), before);
}
