//! A FastCGI application server.
//!
//! A front-end Web server connects over TCP and speaks FastCGI; this crate
//! reads each connection's records into a `RequestSequence` and hands it to
//! a `Handler`, which writes STDOUT and END_REQUEST records back.
//!
//! ```no_run
//! use fcgi_server::config::Config;
//! use fcgi_server::handler::HelloHandler;
//! use fcgi_server::server::Server;
//!
//! let server = Server::bind(Config::default(), HelloHandler).unwrap();
//! server.serve().unwrap();
//! ```

#[macro_use] extern crate log;

pub mod config;
pub mod errors;
pub mod fastcgi;
pub mod handler;
pub mod log_util;
pub mod server;
pub mod shutdown;
