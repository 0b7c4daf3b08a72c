//! Serialization of FastCGI messages

use crate::errors::{Result, SerializationError};
use crate::fastcgi::{Role, record_kind, MANAGEMENT_ID, MAX_CONTENT_LENGTH,
                     MAX_NAME_VALUE_LENGTH, VERSION_1};

use byteorder::{BigEndian, WriteBytesExt};

use std::io::Write;

const PADDING: [u8; 8] = [0; 8];

/// The number of padding bytes that bring `content_length` to a multiple of 8
#[inline]
pub fn padding_for(content_length: usize) -> u8 {
    ((8 - content_length % 8) % 8) as u8
}

/// Writes a header from its bits
///
/// If succesful, returns the number of bytes of padding we told the other end
/// of the connection we were going to write.
pub fn write_header<W: Write>(mut output: W, kind: u8, id: u16,
                              content_length: usize)
                              -> Result<u8>
{
    if content_length > MAX_CONTENT_LENGTH {
        return Err(SerializationError::TooLong.into());
    }

    let padding_length = padding_for(content_length);

    output.write_all(&[VERSION_1, kind])?;
    output.write_u16::<BigEndian>(id)?;
    output.write_u16::<BigEndian>(content_length as u16)?;
    output.write_u8(padding_length)?;
    output.write_u8(0)?; // reserved byte

    Ok(padding_length)
}

/// Writes one whole record: header, content, and padding
pub fn write_record<W: Write>(mut output: W, kind: u8, id: u16,
                              content: &[u8])
                              -> Result<()>
{
    let padding_length = write_header(&mut output, kind, id, content.len())?;
    output.write_all(content)?;
    output.write_all(&PADDING[.. padding_length as usize])?;

    Ok(())
}

/// Writes a stream's content as however many records it takes
///
/// Empty content is written as the stream-terminating empty record.
fn write_stream<W: Write>(mut output: W, kind: u8, id: u16, content: &[u8])
                          -> Result<()>
{
    if content.is_empty() {
        return write_record(&mut output, kind, id, content);
    }

    for chunk in content.chunks(MAX_CONTENT_LENGTH) {
        write_record(&mut output, kind, id, chunk)?;
    }

    Ok(())
}

/// Computes the number of bytes a name or value will take up on the wire once
/// serialized into the FastCGI name-value pair format
pub fn encoded_len(val: &[u8]) -> usize {
    let length = val.len();
    let length_length = if length > 127 { 4 } else { 1 };

    length + length_length
}

/// Writes one length prefix of a name-value pair
pub fn write_name_value_length<W: Write>(mut output: W, length: usize)
                                         -> Result<()>
{
    if length > MAX_NAME_VALUE_LENGTH as usize {
        return Err(SerializationError::TooLong.into());
    }

    if length > 127 {
        output.write_u32::<BigEndian>(length as u32 | 0x8000_0000)?;
    }
    else {
        output.write_u8(length as u8)?;
    }

    Ok(())
}

/// Writes a name-value pair to the stream
pub fn write_name_val_pair<W: Write>(mut output: W, name: &[u8], val: &[u8])
                                     -> Result<()>
{
    write_name_value_length(&mut output, name.len())?;
    write_name_value_length(&mut output, val.len())?;
    output.write_all(name)?;
    output.write_all(val)?;

    Ok(())
}

fn pairs_len(pairs: &[(&[u8], &[u8])]) -> usize {
    pairs.iter()
        .map(|&(name, value)| encoded_len(name) + encoded_len(value))
        .sum()
}

fn write_pairs<W: Write>(mut output: W, kind: u8, id: u16,
                         pairs: &[(&[u8], &[u8])])
                         -> Result<()>
{
    let padding_length = write_header(&mut output, kind, id,
                                      pairs_len(pairs))?;
    for &(name, value) in pairs {
        write_name_val_pair(&mut output, name, value)?;
    }
    output.write_all(&PADDING[.. padding_length as usize])?;

    Ok(())
}

/// Write a `BeginRequest` message
pub fn begin_request<W: Write>(mut output: W, id: u16, role: Role, flags: u8)
                               -> Result<()> {
    let padding_length = write_header(&mut output,
                                      record_kind::BEGIN_REQUEST,
                                      id,
                                      8)?;
    output.write_u16::<BigEndian>(role.to_protocol_number())?;
    output.write_u8(flags)?;
    output.write_all(&[0; 5])?; // reserved

    output.write_all(&PADDING[.. padding_length as usize])?;

    Ok(())
}

pub fn abort_request<W: Write>(output: W, id: u16) -> Result<()> {
    write_record(output, record_kind::ABORT_REQUEST, id, &[])
}

/// Write a stream of parameters
///
/// This will automatically emit the stream-terminating empty message as well.
pub fn params<W: Write>(mut output: W, id: u16, params: &[(&[u8], &[u8])])
                        -> Result<()> {
    write_pairs(&mut output, record_kind::PARAMS, id, params)?;
    write_record(&mut output, record_kind::PARAMS, id, &[])
}

/// Write a frame of a FCGI_STDIN stream
pub fn stdin<W: Write>(output: W, id: u16, content: &[u8]) -> Result<()> {
    write_record(output, record_kind::STDIN, id, content)
}

/// Write a frame of a FCGI_DATA stream
pub fn data<W: Write>(output: W, id: u16, content: &[u8]) -> Result<()> {
    write_record(output, record_kind::DATA, id, content)
}

/// Write response output, split across as many records as needed
///
/// An empty `content` writes the end-of-stream marker.
pub fn stdout<W: Write>(output: W, id: u16, content: &[u8]) -> Result<()> {
    write_stream(output, record_kind::STDOUT, id, content)
}

/// Write error output, split across as many records as needed
pub fn stderr<W: Write>(output: W, id: u16, content: &[u8]) -> Result<()> {
    write_stream(output, record_kind::STDERR, id, content)
}

/// Write an `EndRequest` message
pub fn end_request<W: Write>(mut output: W, id: u16, app_status: u32,
                             protocol_status: u8)
                             -> Result<()> {
    let padding_length = write_header(&mut output,
                                      record_kind::END_REQUEST,
                                      id,
                                      8)?;
    output.write_u32::<BigEndian>(app_status)?;
    output.write_u8(protocol_status)?;
    output.write_all(&[0; 3])?; // reserved

    output.write_all(&PADDING[.. padding_length as usize])?;

    Ok(())
}

/// Writes a `GetValues` record to the output stream
pub fn get_values<W: Write>(output: W, get_for: &[&[u8]]) -> Result<()>
{
    let pairs: Vec<(&[u8], &[u8])> = get_for.iter()
        .map(|&name| (name, &b""[..]))
        .collect();

    write_pairs(output, record_kind::GET_VALUES, MANAGEMENT_ID, &pairs[..])
}

/// Answers a `GetValues` query
pub fn get_values_result<W: Write>(output: W, values: &[(&[u8], &[u8])])
                                   -> Result<()>
{
    write_pairs(output, record_kind::GET_VALUES_RESULT, MANAGEMENT_ID, values)
}

/// Tells the peer we don't understand management records of type `kind`
pub fn unknown_type<W: Write>(mut output: W, kind: u8) -> Result<()> {
    let padding_length = write_header(&mut output, record_kind::UNKNOWN_TYPE,
                                      MANAGEMENT_ID, 8)?;
    output.write_u8(kind)?;
    output.write_all(&[0; 7])?; // reserved

    output.write_all(&PADDING[.. padding_length as usize])?;

    Ok(())
}
