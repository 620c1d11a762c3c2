//! The visible rectangle of the complex plane.

use crate::error::{Error, Result};

/// A center point plus half-extents. Both half-extents are always finite and
/// strictly positive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    center_x: f64,
    center_y: f64,
    half_width: f64,
    half_height: f64,
}

impl Viewport {
    /// Builds the viewport covering `[min_x, max_x) × [min_y, max_y)`.
    pub fn from_bounds(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Result<Self> {
        if ![min_x, max_x, min_y, max_y].iter().all(|bound| bound.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "bounds must be finite, got [{min_x}, {max_x}) x [{min_y}, {max_y})"
            )));
        }

        let center_x = (min_x + max_x) / 2.0;
        let center_y = (min_y + max_y) / 2.0;
        let half_width = center_x - min_x;
        let half_height = center_y - min_y;

        if !(half_width > 0.0 && half_height > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "bounds must not be empty, got [{min_x}, {max_x}) x [{min_y}, {max_y})"
            )));
        }

        Ok(Self {
            center_x,
            center_y,
            half_width,
            half_height,
        })
    }

    /// Zooms by `factor` around the plane point `(x, y)`, which stays fixed on
    /// screen. `factor > 1` zooms in, `0 < factor < 1` zooms out.
    pub fn zoom(&mut self, x: f64, y: f64, factor: f64) -> Result<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "zoom factor must be finite and positive, got {factor}"
            )));
        }
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "zoom anchor must be finite, got ({x}, {y})"
            )));
        }

        let half_width = self.half_width / factor;
        let half_height = self.half_height / factor;

        if !(half_width.is_finite() && half_height.is_finite())
            || half_width <= 0.0
            || half_height <= 0.0
        {
            return Err(Error::InvalidArgument(format!(
                "zoom by {factor} would degenerate the viewport"
            )));
        }

        self.half_width = half_width;
        self.half_height = half_height;
        self.center_x = x - (x - self.center_x) / factor;
        self.center_y = y - (y - self.center_y) / factor;

        Ok(())
    }

    /// Moves the center by `(dx, dy)` plane units.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.center_x += dx;
        self.center_y += dy;
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_x, self.center_y)
    }

    pub fn half_extents(&self) -> (f64, f64) {
        (self.half_width, self.half_height)
    }

    pub fn min_x(&self) -> f64 {
        self.center_x - self.half_width
    }

    pub fn max_x(&self) -> f64 {
        self.center_x + self.half_width
    }

    pub fn min_y(&self) -> f64 {
        self.center_y - self.half_height
    }

    pub fn max_y(&self) -> f64 {
        self.center_y + self.half_height
    }

    pub fn width(&self) -> f64 {
        self.half_width * 2.0
    }

    pub fn height(&self) -> f64 {
        self.half_height * 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        let tolerance = 1e-12 * expected.abs().max(1.0);
        assert!(
            (actual - expected).abs() <= tolerance,
            "{actual} is not within {tolerance} of {expected}"
        );
    }

    fn initial() -> Viewport {
        Viewport::from_bounds(-2.0, 0.6, -1.3, 1.3).unwrap()
    }

    #[test]
    fn from_bounds_derives_center_and_half_extents() {
        let viewport = initial();
        let (center_x, center_y) = viewport.center();
        let (half_width, half_height) = viewport.half_extents();
        assert_close(center_x, -0.7);
        assert_close(center_y, 0.0);
        assert_close(half_width, 1.3);
        assert_close(half_height, 1.3);
        assert_close(viewport.min_x(), -2.0);
        assert_close(viewport.max_x(), 0.6);
        assert_close(viewport.min_y(), -1.3);
        assert_close(viewport.max_y(), 1.3);
    }

    #[test]
    fn from_bounds_rejects_empty_or_non_finite_bounds() {
        assert!(Viewport::from_bounds(1.0, 1.0, -1.0, 1.0).is_err());
        assert!(Viewport::from_bounds(1.0, -1.0, -1.0, 1.0).is_err());
        assert!(Viewport::from_bounds(-1.0, 1.0, f64::NAN, 1.0).is_err());
        assert!(Viewport::from_bounds(f64::NEG_INFINITY, 1.0, -1.0, 1.0).is_err());
    }

    #[test]
    fn zoom_then_inverse_zoom_restores_state() {
        for factor in [1.5, 2.0, 0.25, 2f64.powf(-0.3), 1000.0] {
            let mut viewport = initial();
            viewport.zoom(-0.75, 0.1, factor).unwrap();
            viewport.zoom(-0.75, 0.1, 1.0 / factor).unwrap();

            let expected = initial();
            assert_close(viewport.center().0, expected.center().0);
            assert_close(viewport.center().1, expected.center().1);
            assert_close(viewport.half_extents().0, expected.half_extents().0);
            assert_close(viewport.half_extents().1, expected.half_extents().1);
        }
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let mut viewport = initial();
        let (x, y) = (-1.0, 0.5);
        let relative_x = (x - viewport.min_x()) / viewport.width();
        let relative_y = (y - viewport.min_y()) / viewport.height();

        viewport.zoom(x, y, 4.0).unwrap();

        assert_close(viewport.width(), 2.6 / 4.0);
        assert_close((x - viewport.min_x()) / viewport.width(), relative_x);
        assert_close((y - viewport.min_y()) / viewport.height(), relative_y);
    }

    #[test]
    fn zoom_rejects_invalid_factors_without_mutation() {
        let mut viewport = initial();
        for factor in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                viewport.zoom(0.0, 0.0, factor),
                Err(Error::InvalidArgument(_))
            ));
            assert_eq!(viewport, initial());
        }
        assert!(viewport.zoom(f64::NAN, 0.0, 2.0).is_err());
        assert_eq!(viewport, initial());
    }

    #[test]
    fn zoom_rejects_degenerate_results() {
        let mut viewport = initial();
        assert!(viewport.zoom(0.0, 0.0, f64::MAX).is_ok());
        let before = viewport;
        assert!(viewport.zoom(0.0, 0.0, f64::MAX).is_err());
        assert_eq!(viewport, before);
        assert!(viewport.width() > 0.0 && viewport.height() > 0.0);
    }

    #[test]
    fn translate_then_inverse_is_identity() {
        let mut viewport = initial();
        viewport.translate(0.125, -0.5);
        viewport.translate(-0.125, 0.5);
        assert_eq!(viewport, initial());
    }

    #[test]
    fn width_and_height_stay_positive() {
        let mut viewport = initial();
        viewport.zoom(-0.5, 0.0, 3.0).unwrap();
        viewport.translate(10.0, -3.0);
        viewport.zoom(1.0, 1.0, 0.01).unwrap();
        let (half_width, half_height) = viewport.half_extents();
        assert_eq!(viewport.width(), half_width * 2.0);
        assert_eq!(viewport.height(), half_height * 2.0);
        assert!(viewport.width() > 0.0);
        assert!(viewport.height() > 0.0);
    }
}
