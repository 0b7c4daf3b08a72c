//! A driver for FastCGI connections
//!
//! One `ConnectionParser` owns one connection from the front end, reading
//! records off it until a request is complete. The connection serves a single
//! request; we answer `FCGI_MPXS_CONNS` with 0 and turn away any second
//! request that shows up alongside the first.

use crate::errors::{ProtocolError, Result};
use crate::fastcgi::parser::{decode_begin_request_body, decode_header,
                             name_value_pairs};
use crate::fastcgi::request::RequestSequence;
use crate::fastcgi::serializer::{end_request, get_values_result,
                                 unknown_type};
use crate::fastcgi::{management_records, protocol_status, record_kind, Header,
                     HEADER_LEN};
use crate::log_util::*;
use crate::shutdown::Shutdown;

use std::cmp;
use std::io::{self, Read, Write};

/// Stream content is read off the wire in pieces no bigger than this
const CHUNK_SIZE: usize = 4096;

/// The most params bytes held back waiting for the rest of a pair
const MAX_PENDING_PARAMS: usize = 1 << 20;

/// How reading a connection ended, when it ended without an error
#[derive(Debug)]
pub enum Outcome<S> {
    /// The request is fully assembled and ready to dispatch
    Complete(RequestSequence<S>),
    /// The front end sent `ABORT_REQUEST` for the given request
    Aborted(u16),
    /// The request asked for a role we don't know, and we said so
    Rejected(u16),
    /// The server is shutting down
    Cancelled
}

/// What to do after a record has been handled
enum Step {
    Next,
    Complete,
    Aborted(u16),
    Rejected(u16)
}

pub struct ConnectionParser<S> {
    request: RequestSequence<S>,
    /// The id from `BEGIN_REQUEST`, once we've seen it
    active: Option<u16>,
    /// Params bytes not yet making up a whole name-value pair
    pending_params: Vec<u8>,
    /// What we report as `FCGI_MAX_CONNS` and `FCGI_MAX_REQS`
    max_conns: usize
}

impl<S: Read + Write> ConnectionParser<S> {
    pub fn new(conn: S, max_conns: usize) -> ConnectionParser<S> {
        ConnectionParser {
            request: RequestSequence::new(conn),
            active: None,
            pending_params: Vec::new(),
            max_conns: max_conns
        }
    }

    /// Reads records until the request is complete
    ///
    /// `shutdown` is checked before every record header.
    pub fn run(mut self, shutdown: &Shutdown) -> Result<Outcome<S>> {
        loop {
            if shutdown.is_triggered() {
                return Ok(Outcome::Cancelled);
            }

            let header = self.read_header()?;
            debug!("Record kind {} for request {}: {} bytes, {} padding",
                   header.kind, header.request_id, header.content_length,
                   header.padding_length);

            match self.record(header)? {
                Step::Next => (),
                Step::Complete => {
                    if !self.pending_params.is_empty() {
                        return Err(ProtocolError::TruncatedParams.into());
                    }
                    return Ok(Outcome::Complete(self.request));
                },
                Step::Aborted(id) => return Ok(Outcome::Aborted(id)),
                Step::Rejected(id) => return Ok(Outcome::Rejected(id))
            }
        }
    }

    fn conn(&mut self) -> &mut S {
        self.request.conn_mut()
    }

    fn read_header(&mut self) -> Result<Header> {
        let mut buffer = [0; HEADER_LEN];
        let mut filled = 0;

        while filled < HEADER_LEN {
            match self.conn().read(&mut buffer[filled ..]) {
                Ok(0) if filled == 0 => return Err(ProtocolError::Closed.into()),
                Ok(0) => return Err(ProtocolError::Truncated.into()),
                Ok(read) => filled += read,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => (),
                Err(e) => return Err(e.into())
            }
        }

        Ok(decode_header(&buffer[..])?)
    }

    fn record(&mut self, header: Header) -> Result<Step> {
        if header.is_management() {
            self.management(header)?;
            return Ok(Step::Next);
        }

        if header.kind == record_kind::BEGIN_REQUEST {
            return self.begin_request(header);
        }

        if self.active != Some(header.request_id) {
            debug!("Skipping record kind {} for inactive request {}",
                   header.kind, header.request_id);
            self.skip(header.content_len())?;
            self.skip_padding(&header)?;
            return Ok(Step::Next);
        }

        match header.kind {
            record_kind::PARAMS => {
                self.params(&header)?;
            },
            record_kind::DATA => {
                self.read_chunked(header.content_len(),
                                  RequestSequence::push_data)?;
                self.skip_padding(&header)?;
            },
            record_kind::STDIN if header.content_length == 0 => {
                self.skip_padding(&header)?;
                return Ok(Step::Complete);
            },
            record_kind::STDIN => {
                self.read_chunked(header.content_len(),
                                  RequestSequence::push_stdin)?;
                self.skip_padding(&header)?;
            },
            record_kind::ABORT_REQUEST => {
                self.skip(header.content_len())?;
                self.skip_padding(&header)?;
                return Ok(Step::Aborted(header.request_id));
            },
            other => {
                debug!("Ignoring record kind {}", other);
                self.skip(header.content_len())?;
                self.skip_padding(&header)?;
            }
        }

        Ok(Step::Next)
    }

    fn begin_request(&mut self, header: Header) -> Result<Step> {
        let body = self.read_content(header.content_len())?;
        self.skip_padding(&header)?;

        match self.active {
            Some(active) if active != header.request_id => {
                warn!("Refusing request {} multiplexed alongside request {}",
                      header.request_id, active);
                end_request(&mut *self.conn(), header.request_id, 0,
                            protocol_status::CANT_MPX_CONN)?;
                self.conn().flush()?;
                return Ok(Step::Next);
            },
            Some(_) => {
                warn!("Ignoring repeated BEGIN_REQUEST for request {}",
                      header.request_id);
                return Ok(Step::Next);
            },
            None => ()
        }

        match decode_begin_request_body(&body[..]) {
            Ok(begin) => {
                debug!("Request {} begins with role {:?}, flags {}",
                       header.request_id, begin.role, begin.flags);
                self.request.begin(header.request_id, begin);
                self.active = Some(header.request_id);
                Ok(Step::Next)
            },
            Err(ProtocolError::UnknownRole(role)) => {
                warn!("Request {} asked for unknown role {}",
                      header.request_id, role);
                end_request(&mut *self.conn(), header.request_id, 0,
                            protocol_status::UNKNOWN_ROLE)?;
                self.conn().flush()?;
                Ok(Step::Rejected(header.request_id))
            },
            Err(e) => Err(e.into())
        }
    }

    fn params(&mut self, header: &Header) -> Result<()> {
        if header.content_length == 0 {
            self.skip_padding(header)?;
            if !self.pending_params.is_empty() {
                return Err(ProtocolError::TruncatedParams.into());
            }
            return Ok(());
        }

        let content = self.read_content(header.content_len())?;
        self.skip_padding(header)?;
        self.pending_params.extend_from_slice(&content[..]);

        let (pairs, consumed) = name_value_pairs(&self.pending_params[..]);
        for pair in pairs {
            debug!("Param {} = {}", ascii_escape(&pair.name),
                   preview(&pair.value));
            self.request.add_param(pair);
        }
        self.pending_params.drain(.. consumed);

        if self.pending_params.len() > MAX_PENDING_PARAMS {
            return Err(ProtocolError::OversizedParams.into());
        }

        Ok(())
    }

    fn management(&mut self, header: Header) -> Result<()> {
        let content = self.read_content(header.content_len())?;
        self.skip_padding(&header)?;

        if header.kind != record_kind::GET_VALUES {
            warn!("Unknown management record kind {}", header.kind);
            unknown_type(&mut *self.conn(), header.kind)?;
            return Ok(self.conn().flush()?);
        }

        let max_conns = self.max_conns.to_string();
        let (queried, _) = name_value_pairs(&content[..]);
        let mut values: Vec<(&[u8], &[u8])> = Vec::new();
        for pair in &queried {
            let value = match &pair.name[..] {
                management_records::MAX_CONNS => max_conns.as_bytes(),
                management_records::MAX_REQS => max_conns.as_bytes(),
                management_records::MPXS_CONNS => &b"0"[..],
                other => {
                    debug!("Not answering for unknown variable {}",
                           ascii_escape(other));
                    continue;
                }
            };
            values.push((&pair.name[..], value));
        }

        get_values_result(&mut *self.conn(), &values[..])?;
        Ok(self.conn().flush()?)
    }

    fn read_content(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut content = vec![0; length];
        self.conn().read_exact(&mut content[..])?;
        Ok(content)
    }

    fn read_chunked<F>(&mut self, length: usize, mut sink: F) -> Result<()>
        where F: FnMut(&mut RequestSequence<S>, &[u8])
    {
        let mut buffer = [0; CHUNK_SIZE];
        let mut remaining = length;

        while remaining > 0 {
            let chunk = cmp::min(remaining, CHUNK_SIZE);
            self.conn().read_exact(&mut buffer[.. chunk])?;
            sink(&mut self.request, &buffer[.. chunk]);
            remaining -= chunk;
        }

        Ok(())
    }

    fn skip(&mut self, length: usize) -> Result<()> {
        let skipped = io::copy(&mut Read::by_ref(self.conn())
                                   .take(length as u64),
                               &mut io::sink())?;
        if skipped < length as u64 {
            return Err(ProtocolError::Truncated.into());
        }

        Ok(())
    }

    fn skip_padding(&mut self, header: &Header) -> Result<()> {
        self.skip(header.padding_length as usize)
    }
}
