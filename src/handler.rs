//! The application side of a request
//!
//! The server knows how to get a `RequestSequence` off the wire; what to say
//! back is up to a `Handler`. Whatever it writes has to end the way
//! `respond` ends, and the handler closes the connection when it's done.

use crate::errors::Result;
use crate::fastcgi::protocol_status;
use crate::fastcgi::request::RequestSequence;
use crate::fastcgi::serializer::{end_request, stdout};

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};

/// A connection a response can be written to and then closed
pub trait Connection: Read + Write {
    fn close(&mut self) -> Result<()>;
}

impl Connection for TcpStream {
    fn close(&mut self) -> Result<()> {
        Ok(self.shutdown(Shutdown::Both)?)
    }
}

/// Values which can handle requests
pub trait Handler<S>: Send + Sync {
    fn handle(&self, request: RequestSequence<S>) -> Result<()>;
}

impl<S, F> Handler<S> for F
    where F: Fn(RequestSequence<S>) -> Result<()> + Send + Sync
{
    fn handle(&self, request: RequestSequence<S>) -> Result<()> {
        self(request)
    }
}

/// Writes a complete response for `request_id`
///
/// The payload goes out as STDOUT records, then the empty STDOUT record that
/// ends the stream, then `END_REQUEST` with a zero app status.
pub fn respond<W: Write>(mut output: W, request_id: u16, payload: &[u8])
                         -> Result<()> {
    if !payload.is_empty() {
        stdout(&mut output, request_id, payload)?;
    }
    stdout(&mut output, request_id, &[])?;
    end_request(&mut output, request_id, 0,
                protocol_status::REQUEST_COMPLETE)?;
    output.flush()?;

    Ok(())
}

/// Answers every request with the same tiny HTML document
#[derive(Debug, Clone, Copy, Default)]
pub struct HelloHandler;

impl HelloHandler {
    pub const BODY: &'static [u8] = b"Content-type: text/html\r\n\r\nHELLO";
}

impl<S: Connection> Handler<S> for HelloHandler {
    fn handle(&self, mut request: RequestSequence<S>) -> Result<()> {
        debug!("Handling {:?}", request);

        let id = request.request_id;
        respond(&mut *request.conn_mut(), id, HelloHandler::BODY)?;
        request.conn_mut().close()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fastcgi::parser::{decode_header, end_request_body};
    use crate::fastcgi::{record_kind, MAX_CONTENT_LENGTH};

    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    #[derive(Default)]
    struct Written {
        bytes: Vec<u8>,
        closed: bool
    }

    /// A connection whose output outlives the request that owns it
    #[derive(Clone, Default)]
    struct Sink(Rc<RefCell<Written>>);

    impl Read for Sink {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().bytes.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Connection for Sink {
        fn close(&mut self) -> Result<()> {
            self.0.borrow_mut().closed = true;
            Ok(())
        }
    }

    /// Splits written bytes back into (kind, content) records
    fn records(mut bytes: &[u8]) -> Vec<(u8, Vec<u8>)> {
        let mut found = Vec::new();
        while !bytes.is_empty() {
            let h = decode_header(&bytes[.. 8]).unwrap();
            found.push((h.kind, Vec::from(&bytes[8 .. 8 + h.content_len()])));
            bytes = &bytes[8 + h.content_len() + h.padding_length as usize ..];
        }
        found
    }

    #[test]
    fn hello_response_framing() {
        let sink = Sink::default();
        let mut request = RequestSequence::new(sink.clone());
        request.request_id = 1;

        HelloHandler.handle(request).unwrap();

        let written = sink.0.borrow();
        assert!(written.closed);

        let found = records(&written.bytes[..]);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0], (record_kind::STDOUT,
                              Vec::from(HelloHandler::BODY)));
        assert_eq!(found[1], (record_kind::STDOUT, vec![]));
        assert_eq!(found[2].0, record_kind::END_REQUEST);

        let (_, end) = end_request_body(&found[2].1[..]).unwrap();
        assert_eq!(end.app_status, 0);
        assert_eq!(end.protocol_status, protocol_status::REQUEST_COMPLETE);
    }

    #[test]
    fn closures_are_handlers() {
        let sink = Sink::default();
        let mut request = RequestSequence::new(sink.clone());
        request.request_id = 12;
        request.push_stdin(b"ping");

        let echo = |mut req: RequestSequence<Sink>| -> Result<()> {
            let id = req.request_id;
            let body = req.stdin.clone();
            respond(&mut *req.conn_mut(), id, &body[..])?;
            req.conn_mut().close()
        };
        echo.handle(request).unwrap();

        let written = sink.0.borrow();
        let found = records(&written.bytes[..]);
        assert_eq!(found[0], (record_kind::STDOUT, Vec::from(&b"ping"[..])));
        assert!(written.closed);
    }

    #[test]
    fn empty_payload_is_just_the_terminators() {
        let mut conn = Vec::new();
        respond(&mut conn, 5, &[]).unwrap();

        let found = records(&conn[..]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], (record_kind::STDOUT, vec![]));
        assert_eq!(found[1].0, record_kind::END_REQUEST);
    }

    #[test]
    fn large_payload_is_chunked() {
        let payload = vec![b'z'; MAX_CONTENT_LENGTH + 1];
        let mut conn = Vec::new();
        respond(&mut conn, 1, &payload[..]).unwrap();

        let found = records(&conn[..]);
        let kinds: Vec<u8> = found.iter().map(|r| r.0).collect();
        assert_eq!(kinds, vec![record_kind::STDOUT, record_kind::STDOUT,
                               record_kind::STDOUT, record_kind::END_REQUEST]);
        assert_eq!(found[0].1.len(), MAX_CONTENT_LENGTH);
        assert_eq!(found[1].1.len(), 1);
    }
}
