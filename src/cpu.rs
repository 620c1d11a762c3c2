//! Multi-threaded CPU backend.
//!
//! Per-row cost varies enormously: rows crossing the set cost `max_iterations`
//! steps per pixel while rows far outside escape almost immediately. Workers
//! therefore claim rows one at a time from a shared atomic cursor instead of
//! taking fixed stripes.
//!
//! The work-counter scheduler forks its workers on every call and joins them
//! before returning. The rayon scheduler keeps a pool of the configured size
//! for the lifetime of the engine.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread,
};

use log::{debug, trace, warn};
use rayon::prelude::{IndexedParallelIterator, ParallelIterator, ParallelSliceMut};

use crate::{
    colour::{Palette, INTERIOR},
    engine::{ComputeEngine, ComputeParams, IterationBudget},
    error::Result,
    raster::Raster,
    viewport::Viewport,
};

/// How rows are handed out to threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Scheduler {
    /// Scoped threads claiming rows from an atomic cursor.
    #[default]
    WorkCounter,
    /// Rows as parallel chunks on a `rayon` pool owned by the engine.
    Rayon,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpuOptions {
    pub threads: usize,
    pub scheduler: Scheduler,
}

impl CpuOptions {
    /// One thread per core, minus one for the thread driving the window.
    pub fn default_threads() -> usize {
        num_cpus::get().saturating_sub(1).max(1)
    }
}

impl Default for CpuOptions {
    fn default() -> Self {
        Self {
            threads: Self::default_threads(),
            scheduler: Scheduler::default(),
        }
    }
}

/// Asks an in-flight [`CpuEngine::compute`] to stop early.
///
/// Workers finish the row they hold and stop claiming new ones. Rows that were
/// never claimed are filled with black, so a cancelled frame never shows stale
/// or partial rows. The engine clears the token when `compute` returns.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

pub struct CpuEngine {
    palette: Palette,
    options: CpuOptions,
    cancel: CancelToken,
    /// Only built for [`Scheduler::Rayon`]. `None` there means the pool could
    /// not be started and rows go to the global pool.
    pool: Option<rayon::ThreadPool>,
}

impl CpuEngine {
    pub fn new(palette: Palette, options: CpuOptions) -> Self {
        let options = CpuOptions {
            threads: options.threads.max(1),
            ..options
        };
        debug!(
            "cpu engine: {} threads, {:?} scheduler",
            options.threads, options.scheduler
        );

        let pool = match options.scheduler {
            Scheduler::WorkCounter => None,
            Scheduler::Rayon => match rayon::ThreadPoolBuilder::new()
                .num_threads(options.threads)
                .thread_name(|index| format!("mandelbrot-row-{index}"))
                .build()
            {
                Ok(pool) => Some(pool),
                Err(error) => {
                    warn!(
                        "cannot start {} rayon threads, using the global pool: {}",
                        options.threads, error
                    );
                    None
                }
            },
        };

        Self {
            palette,
            options,
            cancel: CancelToken::default(),
            pool,
        }
    }

    pub fn options(&self) -> CpuOptions {
        self.options
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Returns the number of rows computed before cancellation.
    fn compute_work_counter(
        &self,
        raster: &mut Raster,
        params: &ComputeParams,
        max_iterations: u32,
    ) -> usize {
        let width = raster.width() as usize;
        let height = raster.height() as usize;
        // One lock per row; each is taken exactly once, by the worker that
        // claimed the row.
        let rows: Vec<Mutex<&mut [u32]>> = raster
            .pixels_mut()
            .chunks_mut(width)
            .map(Mutex::new)
            .collect();
        let cursor = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..self.options.threads.min(height) {
                scope.spawn(|| loop {
                    if self.cancel.is_cancelled() {
                        break;
                    }

                    let row = cursor.fetch_add(1, Ordering::Relaxed);
                    if row >= height {
                        break;
                    }

                    let mut pixels = rows[row]
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    params.fill_row(row as u32, &mut **pixels, max_iterations, &self.palette);
                });
            }
        });

        cursor.into_inner().min(height)
    }

    /// Returns the number of rows computed before cancellation.
    fn compute_rayon(
        &self,
        raster: &mut Raster,
        params: &ComputeParams,
        max_iterations: u32,
    ) -> usize {
        let width = raster.width() as usize;
        let computed = AtomicUsize::new(0);

        let mut run = || {
            raster
                .pixels_mut()
                .par_chunks_mut(width)
                .enumerate()
                .for_each(|(row, pixels)| {
                    if self.cancel.is_cancelled() {
                        pixels.fill(INTERIOR);
                    } else {
                        params.fill_row(row as u32, pixels, max_iterations, &self.palette);
                        computed.fetch_add(1, Ordering::Relaxed);
                    }
                })
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }

        computed.into_inner()
    }
}

impl ComputeEngine for CpuEngine {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn palette(&self) -> &Palette {
        &self.palette
    }

    fn compute(
        &mut self,
        raster: &mut Raster,
        viewport: &Viewport,
        budget: IterationBudget,
    ) -> Result<()> {
        trace!("begin cpu compute");

        let params = ComputeParams::new(viewport, raster.width(), raster.height());
        let max_iterations = budget.get();

        let computed = match self.options.scheduler {
            Scheduler::WorkCounter => {
                let computed = self.compute_work_counter(raster, &params, max_iterations);
                let width = raster.width() as usize;
                raster.pixels_mut()[computed * width..].fill(INTERIOR);
                computed
            }
            Scheduler::Rayon => self.compute_rayon(raster, &params, max_iterations),
        };

        if self.cancel.is_cancelled() {
            debug!(
                "cpu compute cancelled after {} of {} rows",
                computed,
                raster.height()
            );
            self.cancel.reset();
        }

        trace!("end cpu compute");
        Ok(())
    }
}
