//! Fixed-size pools of named worker threads

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub struct Pool {
    name: &'static str,
    workers: Vec<JoinHandle<()>>
}

impl Pool {
    /// Starts `size` threads, each running `work` with its worker index
    ///
    /// The closure is shared, so whatever it captures lives until the last
    /// worker returns.
    pub fn spawn<F>(name: &'static str, size: usize, work: F) -> io::Result<Pool>
        where F: Fn(usize) + Send + Sync + 'static
    {
        let work = Arc::new(work);
        let mut workers = Vec::with_capacity(size);

        for index in 0 .. size {
            let work = Arc::clone(&work);
            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, index))
                .spawn(move || work(index))?;
            workers.push(handle);
        }

        debug!("Started {} {} workers", size, name);
        Ok(Pool { name: name, workers: workers })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Waits for every worker to return
    pub fn join(self) {
        for worker in self.workers {
            if worker.join().is_err() {
                error!("A {} worker panicked", self.name);
            }
        }
        debug!("All {} workers stopped", self.name);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn runs_every_worker_once() {
        let ran = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&ran);

        let pool = Pool::spawn("test", 4, move |index| {
            seen.fetch_add(index + 1, Ordering::SeqCst);
        }).unwrap();
        assert_eq!(pool.size(), 4);
        pool.join();

        assert_eq!(ran.load(Ordering::SeqCst), 1 + 2 + 3 + 4);
    }

    #[test]
    fn join_survives_a_panicking_worker() {
        let pool = Pool::spawn("doomed", 2, |index| {
            if index == 0 {
                panic!("worker {} gives up", index);
            }
        }).unwrap();

        pool.join();
    }
}
