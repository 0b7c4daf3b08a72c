//! Decoding of FastCGI record layouts
//!
//! Parsers here work on byte slices and never touch a socket; the driver
//! reads exactly as many bytes as a layout needs and hands them over.

use super::*;
use crate::errors::ProtocolError;

use nom::bytes::streaming::take;
use nom::combinator::map;
use nom::number::streaming::{be_u16, be_u32, be_u8};
use nom::sequence::tuple;
use nom::{Err, IResult, Needed};

pub fn header(input: &[u8]) -> IResult<&[u8], Header> {
    map(
        tuple((be_u8, be_u8, be_u16, be_u16, be_u8, take(1usize))),
        |(version, kind, request_id, content_length, padding_length, _)| {
            Header {
                version: version,
                kind: kind,
                request_id: request_id,
                content_length: content_length,
                padding_length: padding_length
            }
        }
    )(input)
}

/// Decodes a header, rejecting versions other than 1
pub fn decode_header(input: &[u8]) -> Result<Header, ProtocolError> {
    match header(input) {
        Ok((_, h)) if h.version != VERSION_1 =>
            Err(ProtocolError::UnsupportedVersion(h.version)),
        Ok((_, h)) => Ok(h),
        Err(_) => Err(ProtocolError::Truncated)
    }
}

/// The role number, flags, and five reserved bytes
pub fn begin_request_body(input: &[u8]) -> IResult<&[u8], (u16, u8)> {
    map(tuple((be_u16, be_u8, take(5usize))),
        |(role, flags, _)| (role, flags))(input)
}

pub fn decode_begin_request_body(input: &[u8])
                                 -> Result<BeginRequest, ProtocolError> {
    let (role, flags) = match begin_request_body(input) {
        Ok((_, body)) => body,
        Err(_) => return Err(ProtocolError::Truncated)
    };

    match Role::from_protocol_number(role) {
        Some(role) => Ok(BeginRequest { role: role, flags: flags }),
        None => Err(ProtocolError::UnknownRole(role))
    }
}

pub fn end_request_body(input: &[u8]) -> IResult<&[u8], EndRequest> {
    map(tuple((be_u32, be_u8, take(3usize))),
        |(app_status, protocol_status, _)| EndRequest {
            app_status: app_status,
            protocol_status: protocol_status
        })(input)
}

/// The type byte and seven reserved bytes of an `UNKNOWN_TYPE` body
pub fn unknown_type_body(input: &[u8]) -> IResult<&[u8], u8> {
    map(tuple((be_u8, take(7usize))), |(kind, _)| kind)(input)
}

/// One half of a name-value pair's length prefix
///
/// A clear high bit means the byte is the whole length. Otherwise it is the
/// first of four big-endian bytes, with the high bit masked off.
pub fn name_value_length(input: &[u8]) -> IResult<&[u8], u32> {
    match input.first() {
        None => Err(Err::Incomplete(Needed::new(1))),
        Some(&b) if b >> 7 == 0 => Ok((&input[1..], b as u32)),
        Some(_) => map(be_u32, |length| length & MAX_NAME_VALUE_LENGTH)(input)
    }
}

/// Decodes one length, returning it with the number of bytes it occupied
///
/// `None` means the input stops partway through the length.
pub fn decode_name_value_length(input: &[u8]) -> Option<(u32, usize)> {
    match name_value_length(input) {
        Ok((rest, length)) => Some((length, input.len() - rest.len())),
        Err(_) => None
    }
}

fn bytes(input: &[u8], count: u32) -> IResult<&[u8], &[u8]> {
    take(count as usize)(input)
}

pub fn name_value_pair(input: &[u8]) -> IResult<&[u8], NameValuePair> {
    let (in1, (name_length, value_length)) =
        tuple((name_value_length, name_value_length))(input)?;
    let (in2, name) = bytes(in1, name_length)?;
    let (in3, value) = bytes(in2, value_length)?;

    Ok((in3, NameValuePair {
        name: Vec::from(name),
        value: Vec::from(value)
    }))
}

/// Decodes every complete pair at the front of `input`
///
/// Returns the pairs along with how many bytes they used. A pair cut off at
/// the end of the input is left for the caller to complete later.
pub fn name_value_pairs(input: &[u8]) -> (Vec<NameValuePair>, usize) {
    let mut pairs = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        match name_value_pair(rest) {
            Ok((remaining, pair)) => {
                pairs.push(pair);
                rest = remaining;
            },
            Err(_) => break
        }
    }

    (pairs, input.len() - rest.len())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn begin_request() {
        let input = [01, 01, 00, 01, 00, 08, 00, 00, 00, 01, 00, 00, 00, 00,
                     00, 00];

        let h = decode_header(&input[.. 8]).unwrap();
        assert_eq!(h, Header {
            version: 1,
            kind: record_kind::BEGIN_REQUEST,
            request_id: 1,
            content_length: 8,
            padding_length: 0
        });

        assert_eq!(decode_begin_request_body(&input[8 ..]).unwrap(),
                   BeginRequest { role: Role::Responder, flags: 0 });
    }

    #[test]
    fn header_with_padding_and_large_id() {
        let input = [1, 5, 0x12, 0x34, 0x01, 0x02, 6, 0];

        let h = decode_header(&input).unwrap();
        assert_eq!(h.request_id, 0x1234);
        assert_eq!(h.content_length, 0x0102);
        assert_eq!(h.padding_length, 6);
        assert!(!h.is_management());
    }

    #[test]
    fn header_truncated() {
        assert_eq!(decode_header(&[1, 1, 0]), Err(ProtocolError::Truncated));
    }

    #[test]
    fn header_wrong_version() {
        assert_eq!(decode_header(&[2, 1, 0, 1, 0, 8, 0, 0]),
                   Err(ProtocolError::UnsupportedVersion(2)));
    }

    #[test]
    fn begin_request_keep_conn() {
        let body = decode_begin_request_body(&[0, 3, 1, 0, 0, 0, 0, 0])
            .unwrap();
        assert_eq!(body.role, Role::Filter);
        assert!(body.keep_conn());
    }

    #[test]
    fn begin_request_unknown_role() {
        assert_eq!(decode_begin_request_body(&[0, 9, 0, 0, 0, 0, 0, 0]),
                   Err(ProtocolError::UnknownRole(9)));
    }

    #[test]
    fn begin_request_short_body() {
        assert_eq!(decode_begin_request_body(&[0, 1, 0]),
                   Err(ProtocolError::Truncated));
    }

    #[test]
    fn end_request() {
        let input = [0, 0, 1, 2, 3, 0, 0, 0];

        let (_, body) = end_request_body(&input[..]).unwrap();
        assert_eq!(body, EndRequest {
            app_status: 258,
            protocol_status: protocol_status::UNKNOWN_ROLE
        });
    }

    #[test]
    fn short_length() {
        assert_eq!(decode_name_value_length(&[127, 9]), Some((127, 1)));
        assert_eq!(decode_name_value_length(&[0]), Some((0, 1)));
    }

    #[test]
    fn long_length_masks_high_bit() {
        assert_eq!(decode_name_value_length(&[0x80, 0, 0, 128]),
                   Some((128, 4)));
        assert_eq!(decode_name_value_length(&[0xff, 0xff, 0xff, 0xff]),
                   Some((0x7fff_ffff, 4)));
    }

    #[test]
    fn long_length_incomplete() {
        assert_eq!(decode_name_value_length(&[0x80, 0]), None);
        assert_eq!(decode_name_value_length(&[]), None);
    }

    #[test]
    fn params() {
        let input = [1, 1, b'A', b'1', 2, 2, b'B', b'B', b'2', b'2'];

        let (pairs, consumed) = name_value_pairs(&input[..]);
        assert_eq!(consumed, input.len());
        assert_eq!(pairs, vec![NameValuePair::new("A", "1"),
                               NameValuePair::new("BB", "22")]);
    }

    #[test]
    fn params_long_value() {
        let mut input = vec![11, 0x80, 0, 0, 200];
        input.extend_from_slice(b"SCRIPT_NAME");
        input.extend(vec![b'x'; 200]);

        let (pairs, consumed) = name_value_pairs(&input[..]);
        assert_eq!(consumed, input.len());
        assert_eq!(pairs.len(), 1);
        assert_eq!(&pairs[0].name[..], b"SCRIPT_NAME");
        assert_eq!(pairs[0].value.len(), 200);
    }

    #[test]
    fn params_leaves_partial_pair() {
        let input = [1, 1, b'A', b'1', 2, 2, b'B'];

        let (pairs, consumed) = name_value_pairs(&input[..]);
        assert_eq!(pairs, vec![NameValuePair::new("A", "1")]);
        assert_eq!(consumed, 4);
    }

    #[test]
    fn params_empty() {
        let (pairs, consumed) = name_value_pairs(&[]);
        assert!(pairs.is_empty());
        assert_eq!(consumed, 0);
    }

    #[test]
    fn unknown_type() {
        let (_, kind) = unknown_type_body(&[42, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(kind, 42);
    }
}
