//! The FastCGI wire protocol, responder side
//!
//! Records are decoded by `parser`, encoded by `serializer`, and assembled
//! into whole requests by `driver`.

pub mod driver;
pub mod parser;
pub mod request;
pub mod serializer;

/// The only protocol version in existence
pub const VERSION_1: u8 = 1;

/// Size of a record header on the wire
pub const HEADER_LEN: usize = 8;

/// The largest content a single record can carry
pub const MAX_CONTENT_LENGTH: usize = u16::MAX as usize;

/// The largest name or value length the four-byte encoding can express
pub const MAX_NAME_VALUE_LENGTH: u32 = 0x7fff_ffff;

/// Request id reserved for management records
pub const MANAGEMENT_ID: u16 = 0;

/// A record header
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Header {
    pub version: u8,
    pub kind: u8,
    pub request_id: u16,
    pub content_length: u16,
    pub padding_length: u8
}

impl Header {
    #[inline]
    pub fn content_len(&self) -> usize {
        self.content_length as usize
    }

    #[inline]
    pub fn is_management(&self) -> bool {
        self.request_id == MANAGEMENT_ID
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NameValuePair {
    pub name: Vec<u8>,
    pub value: Vec<u8>
}

impl NameValuePair {
    pub fn new<N: Into<Vec<u8>>, V: Into<Vec<u8>>>(name: N, value: V)
                                                  -> NameValuePair {
        NameValuePair { name: name.into(), value: value.into() }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct BeginRequest {
    pub role: Role,
    pub flags: u8
}

impl BeginRequest {
    /// Whether the front end wants the connection kept open afterwards
    #[inline]
    pub fn keep_conn(&self) -> bool {
        self.flags & flags::KEEP_CONN != 0
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct EndRequest {
    pub app_status: u32,
    pub protocol_status: u8
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Role {
    Responder,
    Authorizer,
    Filter
}

impl Role {
    /// Returns the protocol's number for this role
    pub fn to_protocol_number(self) -> u16 {
        match self {
            Role::Responder => 1,
            Role::Authorizer => 2,
            Role::Filter => 3
        }
    }

    pub fn from_protocol_number(number: u16) -> Option<Role> {
        match number {
            1 => Some(Role::Responder),
            2 => Some(Role::Authorizer),
            3 => Some(Role::Filter),
            _ => None
        }
    }
}

pub mod flags {
    pub const KEEP_CONN: u8 = 1;
}

pub mod record_kind {
    pub const BEGIN_REQUEST: u8 = 1;
    pub const ABORT_REQUEST: u8 = 2;
    pub const END_REQUEST: u8 = 3;
    pub const PARAMS: u8 = 4;
    pub const STDIN: u8 = 5;
    pub const STDOUT: u8 = 6;
    pub const STDERR: u8 = 7;
    pub const DATA: u8 = 8;
    pub const GET_VALUES: u8 = 9;
    pub const GET_VALUES_RESULT: u8 = 10;
    pub const UNKNOWN_TYPE: u8 = 11;
}

pub mod protocol_status {
    pub const REQUEST_COMPLETE: u8 = 0;
    pub const CANT_MPX_CONN: u8 = 1;
    pub const OVERLOADED: u8 = 2;
    pub const UNKNOWN_ROLE: u8 = 3;
}

pub mod management_records {
    pub const MAX_CONNS: &'static [u8] = b"FCGI_MAX_CONNS";
    pub const MAX_REQS: &'static [u8] = b"FCGI_MAX_REQS";
    pub const MPXS_CONNS: &'static [u8] = b"FCGI_MPXS_CONNS";
}
