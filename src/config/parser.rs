use super::*;
use toml::{Table, Value};

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::net::ToSocketAddrs;
use std::path::Path;
use std::time::Duration;

pub fn parse_file<P: AsRef<Path>>(conf: P)
                                  -> Result<Config, Error>
{
    let mut toml = String::new();
    {
        let mut f = File::open(conf)?;
        f.read_to_string(&mut toml)?;
    }

    config_from_str(&toml)
}

pub fn config_from_str(toml: &str) -> Result<Config, Error> {
    match toml.parse::<Table>() {
        Ok(table) => config_from_table(table),
        Err(e) => Err(Error::Parse(e.to_string()))
    }
}

/// Finds a dotted key like `listen.address`
fn lookup<'a>(table: &'a Table, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = table.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

/// A positive count, for pool sizes and queue capacities
fn count(table: &Table, path: &str, default: usize) -> Result<usize, Error> {
    match lookup(table, path) {
        Some(&Value::Integer(n)) if n > 0 => Ok(n as usize),
        Some(&Value::Integer(n)) => Err(Error::Validation(
            format!("{} must be at least 1, got {}", path, n)
        )),
        Some(val) => Err(Error::Validation(
            format!("Expected {} to be an integer, got a {}",
                    path, val.type_str())
        )),
        None => Ok(default)
    }
}

/// A timeout in seconds, where 0 turns the timeout off
fn seconds(table: &Table, path: &str, default: Option<Duration>)
           -> Result<Option<Duration>, Error> {
    match lookup(table, path) {
        Some(&Value::Integer(0)) => Ok(None),
        Some(&Value::Integer(n)) if n > 0 =>
            Ok(Some(Duration::from_secs(n as u64))),
        Some(&Value::Integer(n)) => Err(Error::Validation(
            format!("{} can't be negative, got {}", path, n)
        )),
        Some(val) => Err(Error::Validation(
            format!("Expected {} to be an integer, got a {}",
                    path, val.type_str())
        )),
        None => Ok(default)
    }
}

fn config_from_table(table: Table) -> Result<Config, Error> {
    let mut config: Config = Default::default();

    match lookup(&table, "listen.address") {
        Some(&Value::String(ref address)) => {
            if address.to_socket_addrs().is_err() {
                return Err(Error::Validation(
                    format!("The listen address {:?} isn't host:port",
                            address)
                ));
            }
            config.listen = address.clone();
        },
        Some(val) => return Err(Error::Validation(
            format!("Expected the listen address to be a string, got a {}",
                    val.type_str())
        )),
        None => ()
    }

    config.workers.parsers =
        count(&table, "workers.parsers", config.workers.parsers)?;
    config.workers.dispatchers =
        count(&table, "workers.dispatchers", config.workers.dispatchers)?;
    config.queues.connections =
        count(&table, "queues.connections", config.queues.connections)?;
    config.queues.requests =
        count(&table, "queues.requests", config.queues.requests)?;
    config.timeouts.read =
        seconds(&table, "timeouts.read_secs", config.timeouts.read)?;
    config.timeouts.write =
        seconds(&table, "timeouts.write_secs", config.timeouts.write)?;

    Ok(config)
}

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Parse(String),
    Validation(String)
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref e) => write!(f, "{}", e),
            Error::Parse(ref message) => write!(f, "{}", message),
            Error::Validation(ref message) => write!(f, "{}", message)
        }
    }
}
