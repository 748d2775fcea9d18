//! Message serialization and wire framing
//!
//! Payload layout, every cell a little-endian `i16`:
//!
//! ```text
//! ┌───────┬─────────┬────────┬─────────┬──────┬───────┬──────────┬─────┐
//! │ TOKEN │ COUNTER │ LENGTH │ NUMSETS │ KEY  │ NVALS │ VALUES…  │ …   │
//! │ 2B    │ 2B      │ 2B     │ 2B      │ 2B   │ 2B    │ 2B each  │     │
//! └───────┴─────────┴────────┴─────────┴──────┴───────┴──────────┴─────┘
//! ```
//!
//! LENGTH counts every cell including the four header cells. On the wire
//! the payload is hex-encoded and wrapped as `DIR hex(payload) ;`, so the
//! delimiters can never appear inside a frame.

use heapless::Vec;

use crate::error::ProtocolError;
use crate::message::{Message, ParameterSet, MAX_PARAM_SETS, MAX_VALUES};
use crate::token::Token;

/// Header cells: token, counter, length, set count
pub const HEADER_CELLS: usize = 4;

/// Cells in the largest possible layout
pub const MAX_CELLS: usize = HEADER_CELLS + MAX_PARAM_SETS * (2 + MAX_VALUES);

/// Bytes in the largest encoded payload
pub const MAX_PAYLOAD_LEN: usize = MAX_CELLS * 2;

/// Bytes in the largest wire frame (marker + hex + terminator)
pub const MAX_FRAME_LEN: usize = 1 + MAX_PAYLOAD_LEN * 2 + 1;

/// Bytes in the smallest possible wire frame: a bare header
pub const MIN_FRAME_LEN: usize = 1 + HEADER_CELLS * 2 * 2 + 1;

/// Frame terminator
pub const END_MARKER: u8 = b';';

/// Marker opening a request frame (client → server)
pub const REQUEST_MARKER: u8 = b'>';

/// Marker opening a reply or event frame (server → client)
pub const REPLY_MARKER: u8 = b'<';

/// Encoded payload
pub type Payload = Vec<u8, MAX_PAYLOAD_LEN>;

/// Encoded wire frame
pub type WireFrame = Vec<u8, MAX_FRAME_LEN>;

/// Direction a frame travels in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Client → server
    Request,
    /// Server → client
    Reply,
}

impl Direction {
    /// Start marker byte for this direction
    pub fn marker(self) -> u8 {
        match self {
            Direction::Request => REQUEST_MARKER,
            Direction::Reply => REPLY_MARKER,
        }
    }

    /// Parse a start marker byte
    pub fn from_marker(byte: u8) -> Option<Self> {
        match byte {
            REQUEST_MARKER => Some(Direction::Request),
            REPLY_MARKER => Some(Direction::Reply),
            _ => None,
        }
    }
}

struct CellWriter {
    buf: Payload,
}

impl CellWriter {
    fn push(&mut self, cell: i16) -> Result<(), ProtocolError> {
        self.buf
            .extend_from_slice(&cell.to_le_bytes())
            .map_err(|_| ProtocolError::InvalidParameterSet)
    }
}

struct CellReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> CellReader<'a> {
    fn cells_read(&self) -> usize {
        self.pos / 2
    }

    /// Reads past the declared length are a layout inconsistency
    fn next(&mut self) -> Result<i16, ProtocolError> {
        match self.bytes.get(self.pos..self.pos + 2) {
            Some(&[lo, hi]) => {
                self.pos += 2;
                Ok(i16::from_le_bytes([lo, hi]))
            }
            _ => Err(ProtocolError::CorruptFrame),
        }
    }
}

/// Number of cells `message` occupies when encoded
pub fn cell_count(message: &Message) -> usize {
    HEADER_CELLS + message.sets().iter().map(|s| 2 + s.len()).sum::<usize>()
}

/// Serialize a message into its payload bytes
pub fn encode(message: &Message) -> Result<Payload, ProtocolError> {
    let token = message.token().validate()?;
    let sets = message.sets();
    if sets.len() > MAX_PARAM_SETS || sets.iter().any(|s| s.len() > MAX_VALUES) {
        return Err(ProtocolError::InvalidParameterSet);
    }

    let mut w = CellWriter { buf: Vec::new() };
    w.push(token.code() as i16)?;
    w.push(message.counter() as i16)?;
    w.push(cell_count(message) as i16)?;
    w.push(sets.len() as i16)?;
    for set in sets {
        w.push(set.key_byte() as i16)?;
        w.push(set.len() as i16)?;
        for &v in set.values() {
            w.push(v)?;
        }
    }
    Ok(w.buf)
}

/// Deserialize payload bytes into a message
pub fn decode(bytes: &[u8]) -> Result<Message, ProtocolError> {
    if bytes.len() < HEADER_CELLS * 2 {
        return Err(ProtocolError::Truncated);
    }

    let mut header = CellReader { bytes, pos: 0 };
    let token = header.next()? as u16;
    let counter = header.next()? as u16;
    let length = header.next()? as u16 as usize;
    let num_sets = header.next()?;

    if !(HEADER_CELLS..=MAX_CELLS).contains(&length) {
        return Err(ProtocolError::CorruptFrame);
    }
    if bytes.len() < length * 2 {
        return Err(ProtocolError::Truncated);
    }
    if bytes.len() > length * 2 {
        return Err(ProtocolError::CorruptFrame);
    }
    let token = Token::from_code(token).validate()?;
    if num_sets < 0 || num_sets as usize > MAX_PARAM_SETS {
        return Err(ProtocolError::InvalidParameterSet);
    }

    let mut r = CellReader {
        bytes: &bytes[..length * 2],
        pos: header.pos,
    };
    let mut sets = Vec::<ParameterSet, MAX_PARAM_SETS>::new();
    for _ in 0..num_sets {
        let key = r.next()?;
        let num_vals = r.next()?;
        if num_vals < 0 || num_vals as usize > MAX_VALUES {
            return Err(ProtocolError::InvalidParameterSet);
        }
        let mut values = [0i16; MAX_VALUES];
        for v in values.iter_mut().take(num_vals as usize) {
            *v = r.next()?;
        }
        let key = u8::try_from(key).map_err(|_| ProtocolError::CorruptFrame)?;
        let set = ParameterSet::from_raw(key, &values[..num_vals as usize])
            .map_err(|_| ProtocolError::CorruptFrame)?;
        sets
            .push(set)
            .map_err(|_| ProtocolError::InvalidParameterSet)?;
    }

    if r.cells_read() != length {
        return Err(ProtocolError::CorruptFrame);
    }
    Ok(Message::from_parts(token, counter, sets))
}

/// Encode, hex-encode and wrap a message for the wire
pub fn to_wire(message: &Message, direction: Direction) -> Result<WireFrame, ProtocolError> {
    let payload = encode(message)?;
    let mut hex_buf = [0u8; MAX_PAYLOAD_LEN * 2];
    let hex_len = payload.len() * 2;
    hex::encode_to_slice(&payload, &mut hex_buf[..hex_len])
        .map_err(|_| ProtocolError::CorruptFrame)?;

    let mut frame = WireFrame::new();
    frame
        .push(direction.marker())
        .map_err(|_| ProtocolError::InvalidParameterSet)?;
    frame
        .extend_from_slice(&hex_buf[..hex_len])
        .map_err(|_| ProtocolError::InvalidParameterSet)?;
    frame
        .push(END_MARKER)
        .map_err(|_| ProtocolError::InvalidParameterSet)?;
    Ok(frame)
}

/// Strip markers, hex-decode and decode a wire frame
///
/// Returns the direction the frame was sent in along with the message.
pub fn parse_wire(frame: &[u8]) -> Result<(Direction, Message), ProtocolError> {
    let (&first, rest) = frame.split_first().ok_or(ProtocolError::Truncated)?;
    let direction = Direction::from_marker(first).ok_or(ProtocolError::CorruptFrame)?;
    let hex_digits = match rest.split_last() {
        Some((&END_MARKER, digits)) => digits,
        _ => return Err(ProtocolError::CorruptFrame),
    };
    if hex_digits.len() % 2 != 0 || hex_digits.len() > MAX_PAYLOAD_LEN * 2 {
        return Err(ProtocolError::CorruptFrame);
    }

    let mut payload = [0u8; MAX_PAYLOAD_LEN];
    let len = hex_digits.len() / 2;
    hex::decode_to_slice(hex_digits, &mut payload[..len])
        .map_err(|_| ProtocolError::CorruptFrame)?;
    let message = decode(&payload[..len])?;
    Ok((direction, message))
}

/// Strip markers, hex-decode and decode a wire frame
pub fn from_wire(frame: &[u8]) -> Result<Message, ProtocolError> {
    parse_wire(frame).map(|(_, message)| message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_reply() -> Message {
        Message::new(Token::STATUS)
            .with_data('S', &[1, 2, 3])
            .unwrap()
            .with_counter(7)
    }

    #[test]
    fn test_encode_header_layout() {
        let payload = encode(&status_reply()).unwrap();
        // 4 header cells + key + count + 3 values
        assert_eq!(payload.len(), 9 * 2);
        assert_eq!(&payload[0..2], &[4, 0]); // token
        assert_eq!(&payload[2..4], &[7, 0]); // counter
        assert_eq!(&payload[4..6], &[9, 0]); // length
        assert_eq!(&payload[6..8], &[1, 0]); // set count
        assert_eq!(&payload[8..10], &[b'S', 0]);
        assert_eq!(&payload[10..12], &[3, 0]);
        assert_eq!(&payload[16..18], &[3, 0]);
    }

    #[test]
    fn test_encode_negative_values_little_endian() {
        let msg = Message::new(Token::GAIT_PARAMS).with_data('B', &[-2]).unwrap();
        let payload = encode(&msg).unwrap();
        assert_eq!(&payload[12..14], &[0xFE, 0xFF]);
    }

    #[test]
    fn test_encode_unknown_token() {
        let msg = Message::new(Token::from_code(11));
        assert_eq!(encode(&msg), Err(ProtocolError::UnknownToken(11)));
    }

    #[test]
    fn test_decode_roundtrip() {
        let msg = status_reply();
        let payload = encode(&msg).unwrap();
        assert_eq!(decode(&payload).unwrap(), msg);
    }

    #[test]
    fn test_decode_counter_above_i16() {
        let msg = Message::new(Token::ACK).with_counter(0xFFFE);
        let payload = encode(&msg).unwrap();
        assert_eq!(decode(&payload).unwrap().counter(), 0xFFFE);
    }

    #[test]
    fn test_decode_truncated() {
        let payload = encode(&status_reply()).unwrap();
        assert_eq!(decode(&payload[..6]), Err(ProtocolError::Truncated));
        assert_eq!(
            decode(&payload[..payload.len() - 2]),
            Err(ProtocolError::Truncated)
        );
    }

    #[test]
    fn test_decode_unknown_token() {
        let mut payload = encode(&status_reply()).unwrap();
        payload[0] = 200;
        assert_eq!(decode(&payload), Err(ProtocolError::UnknownToken(200)));
    }

    #[test]
    fn test_decode_too_many_sets() {
        let mut payload = encode(&Message::new(Token::STATUS)).unwrap();
        payload[6] = 5;
        assert_eq!(decode(&payload), Err(ProtocolError::InvalidParameterSet));
    }

    #[test]
    fn test_decode_too_many_values() {
        let mut payload = encode(&status_reply()).unwrap();
        payload[10] = (MAX_VALUES + 1) as u8;
        assert_eq!(decode(&payload), Err(ProtocolError::InvalidParameterSet));
    }

    #[test]
    fn test_decode_length_mismatch() {
        // Declares one set but the length leaves no room for it
        let mut payload = encode(&status_reply()).unwrap();
        payload[10] = 5;
        assert_eq!(decode(&payload), Err(ProtocolError::CorruptFrame));

        // Length smaller than the header
        let mut payload = encode(&Message::new(Token::VERSION)).unwrap();
        payload[4] = 2;
        assert_eq!(decode(&payload), Err(ProtocolError::CorruptFrame));
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let payload = encode(&status_reply()).unwrap();
        let mut longer = [0u8; 20];
        longer[..18].copy_from_slice(&payload);
        assert_eq!(decode(&longer), Err(ProtocolError::CorruptFrame));
    }

    #[test]
    fn test_decode_unprintable_key() {
        let mut payload = encode(&status_reply()).unwrap();
        payload[8] = 0x07;
        assert_eq!(decode(&payload), Err(ProtocolError::CorruptFrame));
    }

    #[test]
    fn test_wire_format() {
        let msg = Message::new(Token::VERSION).with_counter(0x0102);
        let frame = to_wire(&msg, Direction::Request).unwrap();
        assert_eq!(&frame[..], b">0100020104000000;");
        assert_eq!(frame.len(), MIN_FRAME_LEN);
    }

    #[test]
    fn test_wire_roundtrip_with_direction() {
        let msg = status_reply();
        let frame = to_wire(&msg, Direction::Reply).unwrap();
        assert_eq!(frame[0], REPLY_MARKER);
        assert_eq!(*frame.last().unwrap(), END_MARKER);
        assert_eq!(parse_wire(&frame).unwrap(), (Direction::Reply, msg));
    }

    #[test]
    fn test_from_wire_hex_case_and_parity() {
        // odd digit count
        let frame = b">01000200040000000;";
        assert_eq!(from_wire(frame), Err(ProtocolError::CorruptFrame));
        let frame = b">0A00020004000000;";
        assert_eq!(from_wire(frame).unwrap().token(), Token::GAIT_QUICK);
    }

    #[test]
    fn test_from_wire_rejects_bad_markers() {
        assert_eq!(from_wire(b""), Err(ProtocolError::Truncated));
        assert_eq!(
            from_wire(b"#0100020004000000;"),
            Err(ProtocolError::CorruptFrame)
        );
        assert_eq!(
            from_wire(b">01000200040000000"),
            Err(ProtocolError::CorruptFrame)
        );
        assert_eq!(
            from_wire(b">zz00020004000000;"),
            Err(ProtocolError::CorruptFrame)
        );
    }

    #[test]
    fn test_from_wire_short_payload_is_truncated() {
        assert_eq!(from_wire(b">0400;"), Err(ProtocolError::Truncated));
    }

    #[test]
    fn test_max_frame_fits() {
        let values = [i16::MIN; MAX_VALUES];
        let mut msg = Message::new(Token::GAIT_PARAMS);
        for key in ['A', 'B', 'C', 'D'] {
            msg.add_data(key, &values).unwrap();
        }
        let frame = to_wire(&msg, Direction::Request).unwrap();
        assert_eq!(frame.len(), MAX_FRAME_LEN);
        assert_eq!(from_wire(&frame).unwrap(), msg);
    }
}
