//! Server functionality
//!
//! Three stages, each handing off to the next through a bounded queue:
//!
//! 1. The acceptor takes connections off the listening socket.
//! 2. Parser workers each own one connection at a time, reading records
//!    until a request is assembled.
//! 3. Dispatcher workers run the handler on assembled requests.

mod pool;

use crate::config::Config;
use crate::errors::{Error, Result};
use crate::fastcgi::driver::{ConnectionParser, Outcome};
use crate::fastcgi::request::RequestSequence;
use crate::handler::Handler;
use crate::shutdown::Shutdown;
use self::pool::Pool;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError,
                        Sender};

use std::io::{self, ErrorKind};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often idle loops come up to check for shutdown
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

type Request = RequestSequence<TcpStream>;

pub struct Server<H> {
    listener: TcpListener,
    config: Config,
    handler: Arc<H>,
    shutdown: Shutdown
}

impl<H: Handler<TcpStream> + 'static> Server<H> {
    /// Binds the configured address
    ///
    /// Nothing is accepted until `serve` is called.
    pub fn bind(config: Config, handler: H) -> Result<Server<H>> {
        let listener = match TcpListener::bind(&config.listen[..]) {
            Ok(l) => l,
            Err(e) => return Err(Error::Bind {
                addr: config.listen.clone(),
                source: e
            })
        };
        listener.set_nonblocking(true)?;

        info!("Listening on {}", listener.local_addr()?);

        Ok(Server {
            listener: listener,
            config: config,
            handler: Arc::new(handler),
            shutdown: Shutdown::new()
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// A handle that stops `serve` when triggered
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Serves connections until shutdown is triggered
    ///
    /// Returns once every worker has stopped. Requests that were already
    /// assembled are still handed to the handler before that happens.
    pub fn serve(self) -> Result<()> {
        let (conn_tx, conn_rx) = bounded::<TcpStream>(
            self.config.queues.connections);
        let (request_tx, request_rx) = bounded::<Request>(
            self.config.queues.requests);

        let dispatchers = {
            let handler = Arc::clone(&self.handler);
            Pool::spawn("fcgi-dispatcher", self.config.workers.dispatchers,
                        move |_| dispatch_requests(&request_rx, &*handler))?
        };

        let parsers = {
            let shutdown = self.shutdown.clone();
            let max_conns = self.config.workers.parsers;
            Pool::spawn("fcgi-parser", self.config.workers.parsers,
                        move |_| parse_connections(&conn_rx, &request_tx,
                                                   &shutdown, max_conns))
        };
        let parsers = match parsers {
            Ok(p) => p,
            Err(e) => {
                // Any parsers that did start hold request senders; they have
                // to stop before the dispatchers can.
                self.shutdown.trigger();
                drop(conn_tx);
                dispatchers.join();
                return Err(e.into());
            }
        };

        info!("Serving with {} parsers and {} dispatchers",
              parsers.size(), dispatchers.size());

        self.accept(conn_tx);

        info!("Shutting down");
        parsers.join();
        dispatchers.join();
        info!("Stopped");

        Ok(())
    }

    fn accept(&self, conns: Sender<TcpStream>) {
        while !self.shutdown.is_triggered() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!("Accepted connection from {}", peer);
                    if let Err(e) = self.prepare(&stream) {
                        warn!("Couldn't set up connection from {}: {}",
                              peer, e);
                        continue;
                    }
                    if !self.enqueue(&conns, stream) {
                        break;
                    }
                },
                Err(e) => accept_failed(&e)
            }
        }
    }

    fn prepare(&self, stream: &TcpStream) -> Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(self.config.timeouts.read)?;
        stream.set_write_timeout(self.config.timeouts.write)?;
        Ok(())
    }

    /// Waits for room in the connection queue
    ///
    /// Returns false if the server is going away instead.
    fn enqueue(&self, conns: &Sender<TcpStream>, stream: TcpStream) -> bool {
        let mut stream = stream;
        loop {
            match conns.send_timeout(stream, POLL_INTERVAL) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(s)) => {
                    if self.shutdown.is_triggered() {
                        return false;
                    }
                    stream = s;
                },
                Err(SendTimeoutError::Disconnected(_)) => return false
            }
        }
    }
}

/// Waits out an `accept` failure before the next try
fn accept_failed(e: &io::Error) {
    if e.kind() != ErrorKind::WouldBlock {
        warn!("Failed connection: {}", e);
    }
    thread::sleep(POLL_INTERVAL);
}

/// The body of a parser worker
fn parse_connections(conns: &Receiver<TcpStream>, requests: &Sender<Request>,
                     shutdown: &Shutdown, max_conns: usize) {
    while !shutdown.is_triggered() {
        let stream = match conns.recv_timeout(POLL_INTERVAL) {
            Ok(s) => s,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break
        };

        let peer = match stream.peer_addr() {
            Ok(addr) => addr.to_string(),
            Err(_) => String::from("unknown peer")
        };

        match ConnectionParser::new(stream, max_conns).run(shutdown) {
            Ok(Outcome::Complete(request)) => {
                debug!("Request {} from {} assembled", request.request_id,
                       peer);
                if let Err(e) = requests.send(request) {
                    warn!("Dropping request {}: no dispatchers left",
                          e.into_inner().request_id);
                }
            },
            Ok(Outcome::Aborted(id)) =>
                info!("Request {} from {} aborted", id, peer),
            Ok(Outcome::Rejected(id)) =>
                info!("Request {} from {} rejected", id, peer),
            Ok(Outcome::Cancelled) =>
                debug!("Dropping connection from {} for shutdown", peer),
            Err(ref e) if e.is_closed() =>
                debug!("{} closed the connection", peer),
            Err(e) => warn!("Abandoning connection from {}: {}", peer, e)
        }
    }
}

/// The body of a dispatcher worker
///
/// Runs until every parser has stopped and the queue is drained.
fn dispatch_requests<H: Handler<TcpStream>>(requests: &Receiver<Request>,
                                            handler: &H) {
    for request in requests.iter() {
        let id = request.request_id;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            handler.handle(request)
        }));

        match outcome {
            Ok(Ok(())) => debug!("Request {} handled", id),
            Ok(Err(e)) => warn!("Error handling request {}: {}", id, e),
            Err(_) => error!("Handler panicked on request {}", id)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::time::Instant;

    #[test]
    fn accept_errors_back_off() {
        for &kind in &[ErrorKind::WouldBlock, ErrorKind::Other] {
            let started = Instant::now();
            accept_failed(&io::Error::new(kind, "too many open files"));
            assert!(started.elapsed() >= POLL_INTERVAL, "{:?}", kind);
        }
    }
}
