//! Command and reply identifiers
//!
//! Every message carries a token. The registered set is fixed; any other
//! code is carried as-is so the link can report it as
//! [`ProtocolError::UnknownToken`] instead of guessing.

use core::fmt;

use crate::error::ProtocolError;

/// Command/reply identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Token(u16);

impl Token {
    /// Remark, a free text note
    pub const REMARK: Token = Token(0);
    /// Software version and free memory: `<VER V=100 M=1234`
    pub const VERSION: Token = Token(1);
    /// Error regarding the last command: `<ERR C=cmd E=code,value`
    pub const ERROR: Token = Token(2);
    /// Command executed, no specific reply defined: `ACK C=cmd`
    pub const ACK: Token = Token(3);
    /// Status request and status reply
    pub const STATUS: Token = Token(4);
    /// Move all servos to their default positions
    pub const DEFAULT_POSITION: Token = Token(5);
    /// Prepare the gait generator: `>GG0 M=a,m G=g`
    pub const GAIT_PREPARE: Token = Token(6);
    /// Emergency stop
    pub const EMERGENCY_STOP: Token = Token(7);
    /// Gait generator body/travel parameters
    pub const GAIT_PARAMS: Token = Token(8);
    /// Gait generator timing
    pub const GAIT_TIMING: Token = Token(9);
    /// Quick walk parameter update that replies with a status
    pub const GAIT_QUICK: Token = Token(10);

    /// Highest registered token
    pub const LAST: Token = Token::GAIT_QUICK;

    /// Placeholder for "no token"; never registered
    pub const NONE: Token = Token(255);

    const MNEMONICS: [&'static str; 11] = [
        "REM", "VER", "ERR", "ACK", "STA", "XP0", "GG0", "GGE", "GGP", "GGT", "GGQ",
    ];

    /// Wrap a raw wire code; the code is not checked
    pub const fn from_code(code: u16) -> Self {
        Token(code)
    }

    /// Raw wire code
    pub const fn code(self) -> u16 {
        self.0
    }

    /// Returns true if this is one of the registered tokens
    pub const fn is_registered(self) -> bool {
        self.0 <= Self::LAST.0
    }

    /// Returns the token if registered, otherwise `UnknownToken`
    pub fn validate(self) -> Result<Self, ProtocolError> {
        if self.is_registered() {
            Ok(self)
        } else {
            Err(ProtocolError::UnknownToken(self.0))
        }
    }

    /// Three-letter name used in the text notation
    pub fn mnemonic(self) -> Option<&'static str> {
        Self::MNEMONICS.get(self.0 as usize).copied()
    }

    /// Look up a token by its mnemonic, ignoring case
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::MNEMONICS
            .iter()
            .position(|m| m.eq_ignore_ascii_case(name))
            .map(|i| Token(i as u16))
    }

    /// All registered tokens in code order
    pub fn all() -> impl Iterator<Item = Token> {
        (0..=Self::LAST.0).map(Token)
    }
}

impl From<u16> for Token {
    fn from(code: u16) -> Self {
        Token(code)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(name) => f.write_str(name),
            None => write!(f, "#{}", self.0),
        }
    }
}

/// Application error codes carried in an `ERR` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    Ok,
    CmdNotRecognized,
    AtLeastOneInvalidParam,
    InvalidOrTooFewParams,
    CmdNotImplemented,
    DeviceNotReady,
    TooManyParamsOrData,
    CmdStrIncomplete,
    Unknown,
}

// Wire values; 2 is unassigned
const ERR_OK: i16 = 0;
const ERR_CMD_NOT_RECOGNIZED: i16 = 1;
const ERR_AT_LEAST_ONE_INVALID_PARAM: i16 = 3;
const ERR_INVALID_OR_TOO_FEW_PARAMS: i16 = 4;
const ERR_CMD_NOT_IMPLEMENTED: i16 = 5;
const ERR_DEVICE_NOT_READY: i16 = 6;
const ERR_TOO_MANY_PARAMS_OR_DATA: i16 = 7;
const ERR_CMD_STR_INCOMPLETE: i16 = 8;
const ERR_UNKNOWN: i16 = 9;

impl ErrorCode {
    /// Parse an error code from its wire value
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            ERR_OK => Some(ErrorCode::Ok),
            ERR_CMD_NOT_RECOGNIZED => Some(ErrorCode::CmdNotRecognized),
            ERR_AT_LEAST_ONE_INVALID_PARAM => Some(ErrorCode::AtLeastOneInvalidParam),
            ERR_INVALID_OR_TOO_FEW_PARAMS => Some(ErrorCode::InvalidOrTooFewParams),
            ERR_CMD_NOT_IMPLEMENTED => Some(ErrorCode::CmdNotImplemented),
            ERR_DEVICE_NOT_READY => Some(ErrorCode::DeviceNotReady),
            ERR_TOO_MANY_PARAMS_OR_DATA => Some(ErrorCode::TooManyParamsOrData),
            ERR_CMD_STR_INCOMPLETE => Some(ErrorCode::CmdStrIncomplete),
            ERR_UNKNOWN => Some(ErrorCode::Unknown),
            _ => None,
        }
    }

    /// Convert to wire value
    pub fn code(self) -> i16 {
        match self {
            ErrorCode::Ok => ERR_OK,
            ErrorCode::CmdNotRecognized => ERR_CMD_NOT_RECOGNIZED,
            ErrorCode::AtLeastOneInvalidParam => ERR_AT_LEAST_ONE_INVALID_PARAM,
            ErrorCode::InvalidOrTooFewParams => ERR_INVALID_OR_TOO_FEW_PARAMS,
            ErrorCode::CmdNotImplemented => ERR_CMD_NOT_IMPLEMENTED,
            ErrorCode::DeviceNotReady => ERR_DEVICE_NOT_READY,
            ErrorCode::TooManyParamsOrData => ERR_TOO_MANY_PARAMS_OR_DATA,
            ErrorCode::CmdStrIncomplete => ERR_CMD_STR_INCOMPLETE,
            ErrorCode::Unknown => ERR_UNKNOWN,
        }
    }
}

impl From<ProtocolError> for ErrorCode {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnknownToken(_) => ErrorCode::CmdNotRecognized,
            ProtocolError::InvalidParameterSet => ErrorCode::TooManyParamsOrData,
            ProtocolError::Truncated => ErrorCode::CmdStrIncomplete,
            ProtocolError::CorruptFrame => ErrorCode::AtLeastOneInvalidParam,
            ProtocolError::BufferOverrun | ProtocolError::StaleReply => ErrorCode::Unknown,
        }
    }
}
