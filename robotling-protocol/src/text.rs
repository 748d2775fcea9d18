//! Human-readable text notation
//!
//! The notation the boards used before the binary framing, still handy for
//! logs and bench consoles:
//!
//! ```text
//! >STA;
//! <STA S=1,2,3 L=4;
//! ```

use core::fmt::{self, Write};

use heapless::Vec;

use crate::codec::{Direction, END_MARKER};
use crate::error::ProtocolError;
use crate::message::{Message, MAX_VALUES};
use crate::token::Token;

const VALUE_SEPARATOR: char = ',';

/// Render `message` as `DIR TOK K=v,v…;`
pub fn write_text<W: Write>(
    message: &Message,
    direction: Direction,
    out: &mut W,
) -> fmt::Result {
    out.write_char(direction.marker() as char)?;
    write!(out, "{}", message)?;
    out.write_char(END_MARKER as char)
}

/// Parse the text notation
///
/// Trailing whitespace (a serial console's line ending) is ignored. The
/// counter of the returned message is zero; the text form has none.
pub fn parse_text(text: &str) -> Result<(Direction, Message), ProtocolError> {
    let text = text.trim_end();
    let direction = text
        .as_bytes()
        .first()
        .and_then(|&b| Direction::from_marker(b))
        .ok_or(ProtocolError::CorruptFrame)?;
    let body = text[1..]
        .strip_suffix(END_MARKER as char)
        .ok_or(ProtocolError::CorruptFrame)?;

    let mut words = body.split_whitespace();
    let name = words.next().ok_or(ProtocolError::CorruptFrame)?;
    let token =
        Token::from_mnemonic(name).ok_or(ProtocolError::UnknownToken(Token::NONE.code()))?;

    let mut message = Message::new(token);
    for word in words {
        let (key, values) = parse_group(word)?;
        message.add_data(key, &values)?;
    }
    Ok((direction, message))
}

/// Parse one `K=v0,v1,…` group
fn parse_group(word: &str) -> Result<(char, Vec<i16, MAX_VALUES>), ProtocolError> {
    let mut chars = word.chars();
    let key = chars.next().ok_or(ProtocolError::InvalidParameterSet)?;
    let list = chars
        .as_str()
        .strip_prefix('=')
        .ok_or(ProtocolError::InvalidParameterSet)?;

    let mut values = Vec::new();
    if list.is_empty() {
        return Ok((key, values));
    }
    for item in list.split(VALUE_SEPARATOR) {
        let v = item
            .parse::<i16>()
            .map_err(|_| ProtocolError::InvalidParameterSet)?;
        values
            .push(v)
            .map_err(|_| ProtocolError::InvalidParameterSet)?;
    }
    Ok((key, values))
}
