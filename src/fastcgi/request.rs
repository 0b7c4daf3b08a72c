//! A request as assembled from its records

use crate::fastcgi::{BeginRequest, NameValuePair, Role};
use crate::log_util::ascii_escape;

use std::collections::HashMap;
use std::fmt;

/// Everything the front end sent for one request
///
/// The driver builds this up record by record. Once the empty STDIN record
/// arrives it is handed whole to a handler, along with the connection the
/// response has to go out on.
pub struct RequestSequence<S> {
    pub request_id: u16,
    pub role: Role,
    pub flags: u8,
    pub params: HashMap<String, String>,
    /// The FCGI_DATA stream; only filters get one
    pub data: Vec<u8>,
    pub stdin: Vec<u8>,
    conn: S
}

impl<S> RequestSequence<S> {
    pub fn new(conn: S) -> RequestSequence<S> {
        RequestSequence {
            request_id: 0,
            role: Role::Responder,
            flags: 0,
            params: HashMap::new(),
            data: Vec::new(),
            stdin: Vec::new(),
            conn: conn
        }
    }

    pub fn begin(&mut self, request_id: u16, begin: BeginRequest) {
        self.request_id = request_id;
        self.role = begin.role;
        self.flags = begin.flags;
    }

    /// Records a parameter; a repeated name replaces the earlier value
    pub fn add_param(&mut self, pair: NameValuePair) {
        let name = String::from_utf8_lossy(&pair.name).into_owned();
        let value = String::from_utf8_lossy(&pair.value).into_owned();
        self.params.insert(name, value);
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn push_data(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
    }

    pub fn push_stdin(&mut self, chunk: &[u8]) {
        self.stdin.extend_from_slice(chunk);
    }

    #[inline]
    pub fn conn_mut(&mut self) -> &mut S {
        &mut self.conn
    }

    /// Gives up the request's contents, leaving just the connection
    pub fn into_conn(self) -> S {
        self.conn
    }
}

impl<S> fmt::Debug for RequestSequence<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RequestSequence")
            .field("request_id", &self.request_id)
            .field("role", &self.role)
            .field("flags", &self.flags)
            .field("params", &self.params)
            .field("data", &ascii_escape(&self.data))
            .field("stdin", &ascii_escape(&self.stdin))
            .finish()
    }
}
