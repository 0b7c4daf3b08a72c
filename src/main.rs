//! A FastCGI application server.
//!
//! Call it like this:
//!
//!     fcgi-server -f config.toml
//!
//! The config file is in the [TOML format][toml]. Here is an example:
//!
//! ```toml
//! [listen]
//! address = "127.0.0.1:9000"
//!
//! [workers]
//! parsers = 5
//! dispatchers = 5
//!
//! [queues]
//! connections = 64
//! requests = 64
//!
//! [timeouts]
//! read_secs = 30
//! write_secs = 30
//! ```
//!
//! This example also serves as the defaults if no config file is provided,
//! or any given key is not present. If a key is of the wrong type, the server
//! will bail, so don’t do that.
//!
//! Every request gets the same small HTML page back; plug in another
//! `Handler` to do something useful.
//!
//! [toml]: https://github.com/toml-lang/toml

#[macro_use] extern crate log;

use fcgi_server::config::parser::{self, parse_file};
use fcgi_server::config::Config;
use fcgi_server::handler::HelloHandler;
use fcgi_server::server::Server;
use fcgi_server::shutdown::Shutdown;

use clap::Parser;

use std::path::{Path, PathBuf};
use std::process::exit;

const DEFAULT_CONFIG: &'static str = "/etc/fcgi-server/config.toml";

#[derive(Parser, Debug)]
#[command(name = "fcgi-server", version, author,
          about = "A FastCGI application server")]
struct Args {
    /// The TOML file with server configuration
    #[arg(short = 'f', value_name = "FILE")]
    config_file: Option<PathBuf>,

    /// Address to listen on, overriding the config file
    #[arg(short = 'l', long = "listen", value_name = "ADDR")]
    listen: Option<String>
}

fn init_logging() {
    let mut log_builder = env_logger::Builder::new();
    log_builder.filter_level(log::LevelFilter::Info);

    if let Ok(var) = std::env::var("FCGI_LOG") {
        log_builder.parse_filters(&var);
    }

    if let Err(e) = log_builder.try_init() {
        eprintln!("fcgi-server: Error when initializing logging: {}", e);
        exit(1);
    }
}

fn load_config(args: &Args) -> Config {
    let config_file = match args.config_file {
        Some(ref path) => path.clone(),
        None if Path::new(DEFAULT_CONFIG).exists() => PathBuf::from(DEFAULT_CONFIG),
        None => return Config::default()
    };

    match parse_file(&config_file) {
        Ok(c) => c,
        Err(parser::Error::Io(e)) => {
            error!("Error opening config file {:?}: {}", config_file, e);
            exit(1);
        },
        Err(parser::Error::Parse(e)) => {
            error!("Errors parsing config file {:?}: {}", config_file, e);
            exit(1);
        },
        Err(parser::Error::Validation(message)) => {
            error!("Error in config file: {}", message);
            exit(1);
        }
    }
}

/// The first SIGINT or SIGTERM stops the server, the second the process
fn handle_signals(shutdown: Shutdown) {
    let installed = ctrlc::set_handler(move || {
        if shutdown.trigger() {
            eprintln!("fcgi-server: Stopping now");
            exit(1);
        }
        info!("Signal received, finishing queued requests");
    });

    if let Err(e) = installed {
        warn!("Couldn't install signal handler: {}", e);
    }
}

fn main() {
    init_logging();

    let args = Args::parse();
    let mut config = load_config(&args);
    if let Some(ref listen) = args.listen {
        config.listen = listen.clone();
    }

    info!("Starting server on {}", config.listen);
    let server = match Server::bind(config, HelloHandler) {
        Ok(s) => s,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };

    handle_signals(server.shutdown_handle());

    if let Err(e) = server.serve() {
        error!("{}", e);
        exit(1);
    }
}
