//! Structured messages
//!
//! A message is a token, a counter and up to [`MAX_PARAM_SETS`] named
//! groups of signed 16-bit values. Capacities are fixed so a message never
//! allocates.

use core::fmt;

use heapless::Vec;

use crate::error::ProtocolError;
use crate::token::{ErrorCode, Token};

/// Maximum parameter sets per message
pub const MAX_PARAM_SETS: usize = 4;

/// Maximum values per parameter set
pub const MAX_VALUES: usize = 32;

/// A key plus an ordered list of values
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParameterSet {
    key: u8,
    values: Vec<i16, MAX_VALUES>,
}

impl ParameterSet {
    /// Create a parameter set
    ///
    /// The key must be a printable ASCII character other than space, and
    /// at most [`MAX_VALUES`] values are accepted.
    pub fn new(key: char, values: &[i16]) -> Result<Self, ProtocolError> {
        if !key.is_ascii_graphic() {
            return Err(ProtocolError::InvalidParameterSet);
        }
        Self::from_raw(key as u8, values)
    }

    pub(crate) fn from_raw(key: u8, values: &[i16]) -> Result<Self, ProtocolError> {
        if !key.is_ascii_graphic() {
            return Err(ProtocolError::InvalidParameterSet);
        }
        let values = Vec::from_slice(values).map_err(|_| ProtocolError::InvalidParameterSet)?;
        Ok(Self { key, values })
    }

    /// Parameter key
    pub fn key(&self) -> char {
        self.key as char
    }

    pub(crate) fn key_byte(&self) -> u8 {
        self.key
    }

    /// Values in order
    pub fn values(&self) -> &[i16] {
        &self.values
    }

    /// Value at `index`, if present
    pub fn get(&self, index: usize) -> Option<i16> {
        self.values.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A command, reply or event exchanged between boards
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    token: Token,
    counter: u16,
    sets: Vec<ParameterSet, MAX_PARAM_SETS>,
}

impl Message {
    /// Create a message without parameters
    ///
    /// The counter starts at zero; the link engine assigns the real one
    /// when the message is sent.
    pub fn new(token: Token) -> Self {
        Self {
            token,
            counter: 0,
            sets: Vec::new(),
        }
    }

    /// Builder form of [`Message::add_data`]
    pub fn with_data(mut self, key: char, values: &[i16]) -> Result<Self, ProtocolError> {
        self.add_data(key, values)?;
        Ok(self)
    }

    /// Builder form of setting the counter
    pub fn with_counter(mut self, counter: u16) -> Self {
        self.counter = counter;
        self
    }

    /// Append a parameter set with the given key and values
    pub fn add_data(&mut self, key: char, values: &[i16]) -> Result<(), ProtocolError> {
        if self.sets.is_full() {
            return Err(ProtocolError::InvalidParameterSet);
        }
        let set = ParameterSet::new(key, values)?;
        self.push_set(set)
    }

    /// Append an existing parameter set
    ///
    /// Fails without modifying the message if it already holds
    /// [`MAX_PARAM_SETS`] sets.
    pub fn push_set(&mut self, set: ParameterSet) -> Result<(), ProtocolError> {
        self.sets
            .push(set)
            .map_err(|_| ProtocolError::InvalidParameterSet)
    }

    /// Acknowledgement of `command`: `ACK C=<command>`
    pub fn ack(command: Token) -> Self {
        let mut msg = Message::new(Token::ACK);
        msg.push_code_set(b'C', &[command.code() as i16]);
        msg
    }

    /// Error report for `command`: `ERR C=<command> E=<code>,<value>`
    pub fn error_reply(command: Token, code: ErrorCode, value: i16) -> Self {
        let mut msg = Message::new(Token::ERROR);
        msg.push_code_set(b'C', &[command.code() as i16]);
        msg.push_code_set(b'E', &[code.code(), value]);
        msg
    }

    // Only used with short, fixed sets on an empty message
    fn push_code_set(&mut self, key: u8, values: &[i16]) {
        if let Ok(set) = ParameterSet::from_raw(key, values) {
            let _ = self.sets.push(set);
        }
    }

    pub(crate) fn from_parts(
        token: Token,
        counter: u16,
        sets: Vec<ParameterSet, MAX_PARAM_SETS>,
    ) -> Self {
        Self {
            token,
            counter,
            sets,
        }
    }

    pub(crate) fn set_counter(&mut self, counter: u16) {
        self.counter = counter;
    }

    pub fn token(&self) -> Token {
        self.token
    }

    /// Sequence counter used to pair requests with replies
    pub fn counter(&self) -> u16 {
        self.counter
    }

    /// Parameter sets in order
    pub fn sets(&self) -> &[ParameterSet] {
        &self.sets
    }

    /// First parameter set with the given key
    pub fn set(&self, key: char) -> Option<&ParameterSet> {
        self.sets.iter().find(|s| s.key() == key)
    }

    /// Value `index` of the set with the given key
    pub fn value(&self, key: char, index: usize) -> Option<i16> {
        self.set(key).and_then(|s| s.get(index))
    }

    /// For an `ERR` reply, the reported error code
    pub fn error_code(&self) -> Option<ErrorCode> {
        if self.token != Token::ERROR {
            return None;
        }
        self.value('E', 0).and_then(ErrorCode::from_code)
    }
}

impl fmt::Display for Message {
    /// Text notation without direction marker or terminator, e.g. `STA S=1,2,3`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token)?;
        for set in &self.sets {
            write!(f, " {}=", set.key())?;
            for (i, v) in set.values().iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", v)?;
            }
        }
        Ok(())
    }
}
