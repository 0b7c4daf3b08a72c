pub mod parser;

use std::time::Duration;

/// A holder for app configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Address to listen on, as `host:port`
    pub listen: String,
    pub workers: WorkerConfig,
    pub queues: QueueConfig,
    pub timeouts: TimeoutConfig
}

impl Default for Config {
    fn default() -> Config {
        Config {
            listen: String::from("127.0.0.1:9000"),
            workers: Default::default(),
            queues: Default::default(),
            timeouts: Default::default()
        }
    }
}

/// Sizes of the two worker pools
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Threads reading records off connections, one connection each
    pub parsers: usize,
    /// Threads running the handler on assembled requests
    pub dispatchers: usize
}

impl Default for WorkerConfig {
    fn default() -> WorkerConfig {
        WorkerConfig { parsers: 5, dispatchers: 5 }
    }
}

/// Capacities of the queues between stages
///
/// A full queue blocks whoever is pushing into it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    pub connections: usize,
    pub requests: usize
}

impl Default for QueueConfig {
    fn default() -> QueueConfig {
        QueueConfig { connections: 64, requests: 64 }
    }
}

/// Socket timeouts for connections from the front end; `None` waits forever
#[derive(Debug, Clone, PartialEq)]
pub struct TimeoutConfig {
    pub read: Option<Duration>,
    pub write: Option<Duration>
}

impl Default for TimeoutConfig {
    fn default() -> TimeoutConfig {
        TimeoutConfig {
            read: Some(Duration::from_secs(30)),
            write: Some(Duration::from_secs(30))
        }
    }
}
