//! The interface shared by the CPU and GPU backends.

use log::warn;

use crate::{colour::Palette, error::Result, escape, raster::Raster, viewport::Viewport};

/// Fills a raster with the escape-time image of a viewport.
///
/// Implementations own their palette, fixed at construction, and treat the
/// raster as write-only output. On error the raster holds whatever the last
/// successful call left in it.
pub trait ComputeEngine {
    fn name(&self) -> &'static str;

    fn palette(&self) -> &Palette;

    fn compute(
        &mut self,
        raster: &mut Raster,
        viewport: &Viewport,
        budget: IterationBudget,
    ) -> Result<()>;
}

impl<E: ComputeEngine + ?Sized> ComputeEngine for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn palette(&self) -> &Palette {
        (**self).palette()
    }

    fn compute(
        &mut self,
        raster: &mut Raster,
        viewport: &Viewport,
        budget: IterationBudget,
    ) -> Result<()> {
        (**self).compute(raster, viewport, budget)
    }
}

/// Maximum iterations per pixel, never below [`IterationBudget::FLOOR`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct IterationBudget(i32);

impl IterationBudget {
    pub const FLOOR: i32 = 2;

    pub fn new(max_iterations: i32) -> Self {
        if max_iterations < Self::FLOOR {
            warn!(
                "iteration budget {} is below {}, clamping",
                max_iterations,
                Self::FLOOR
            );
        }
        Self(max_iterations.max(Self::FLOOR))
    }

    /// Adds `delta` iterations, keeping the floor.
    pub fn sharpen(&mut self, delta: i32) {
        self.0 = self.0.saturating_add(delta).max(Self::FLOOR);
    }

    pub fn get(self) -> u32 {
        self.0 as u32
    }
}

/// Per-call mapping from raster pixels to plane points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComputeParams {
    pub image_width: u32,
    pub image_height: u32,
    pub min_x: f64,
    pub min_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl ComputeParams {
    pub fn new(viewport: &Viewport, image_width: u32, image_height: u32) -> Self {
        Self {
            image_width,
            image_height,
            min_x: viewport.min_x(),
            min_y: viewport.min_y(),
            scale_x: viewport.width() / image_width as f64,
            scale_y: viewport.height() / image_height as f64,
        }
    }

    /// Plane point under a pixel. Plane `y` grows towards the top row.
    pub fn plane_point(&self, column: u32, row: u32) -> (f64, f64) {
        let j = self.image_height - row - 1;
        (
            self.min_x + column as f64 * self.scale_x,
            self.min_y + j as f64 * self.scale_y,
        )
    }

    /// The pixel whose plane point is closest to `(x, y)`, clamped to the raster.
    pub fn nearest_pixel(&self, x: f64, y: f64) -> (u32, u32) {
        let column = nearest_index((x - self.min_x) / self.scale_x, self.image_width);
        let j = nearest_index((y - self.min_y) / self.scale_y, self.image_height);
        (column, self.image_height - j - 1)
    }

    /// Computes one raster row.
    pub fn fill_row(&self, row: u32, pixels: &mut [u32], max_iterations: u32, palette: &Palette) {
        debug_assert_eq!(pixels.len(), self.image_width as usize);

        let y0 = self.plane_point(0, row).1;
        for (column, pixel) in pixels.iter_mut().enumerate() {
            let x0 = self.min_x + column as f64 * self.scale_x;
            let iteration = escape::iterations(x0, y0, max_iterations);
            *pixel = escape::colour(iteration, max_iterations, palette);
        }
    }
}

fn nearest_index(position: f64, len: u32) -> u32 {
    position.round().clamp(0.0, (len - 1) as f64) as u32
}
