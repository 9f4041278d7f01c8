use tracing::{debug, error};

use super::{Occupancy, ThreadPool};
use crate::{BookscanError, Result};

/// A thread pool that uses a work stealing strategy as implemented by the [`Rayon`] library.
///
/// A panicking connection handler is logged and does not take the process down.
///
/// [`Rayon`]: https://docs.rs/rayon/latest/rayon/index.html
#[derive(Debug)]
pub struct RayonThreadPool {
    pool: rayon::ThreadPool,
    occupancy: Occupancy,
}

impl ThreadPool for RayonThreadPool {
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads as usize)
            .thread_name(|n| format!("connection-{}", n))
            .panic_handler(|_| error!("a connection handler panicked"))
            .build()
            .map_err(|e| BookscanError::ThreadPool(format!("could not build thread pool: {:?}", &e)))?;
        debug!("created thread pool with {} threads", &threads);

        Ok(Self {
            occupancy: Occupancy::new(pool.current_num_threads()),
            pool,
        })
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // `install` would block the accept loop until the connection closes
        self.pool.spawn(self.occupancy.track(job));
    }
}
