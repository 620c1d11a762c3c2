//! The escape-time iteration shared by every compute engine.

use crate::colour::{Palette, INTERIOR};

/// Squared bailout radius.
pub const BAILOUT: f64 = 4.0;

/// Counts applications of `z ← z² + c`, for `c = x0 + i·y0`, until
/// `|z|² ≥ 4` or `max_iterations` is reached.
#[inline]
pub fn iterations(x0: f64, y0: f64, max_iterations: u32) -> u32 {
    let mut x = 0.0;
    let mut y = 0.0;
    let mut xx = 0.0;
    let mut yy = 0.0;

    let mut iteration = 0;
    while iteration < max_iterations && xx + yy < BAILOUT {
        y = (x + x) * y + y0;
        x = xx - yy + x0;

        xx = x * x;
        yy = y * y;

        iteration += 1;
    }

    iteration
}

/// Colour for an iteration count: black when the budget ran out.
#[inline]
pub fn colour(iteration: u32, max_iterations: u32, palette: &Palette) -> u32 {
    if iteration >= max_iterations {
        INTERIOR
    } else {
        palette.colour(iteration)
    }
}
