//! Glue between interaction events, the viewport, and the active engine.
//!
//! Events only mutate state and mark the frame dirty. The engine runs once per
//! [`Renderer::redraw`], so a burst of events arriving between two redraws is
//! coalesced into a single frame showing the latest viewport.

use log::{debug, trace};

use crate::{
    engine::{ComputeEngine, IterationBudget},
    error::Result,
    raster::Raster,
    screen,
    viewport::Viewport,
};

/// Wheel clicks needed to zoom by a factor of 2.
pub const CLICKS_PER_DOUBLING: f64 = 10.0;

/// Iterations added per wheel click while sharpening.
pub const ITERATIONS_PER_CLICK: i32 = 5;

/// Cursor position in raster pixels, origin at the top left.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelPosition {
    pub x: f64,
    pub y: f64,
}

impl PixelPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Interaction {
    Drag {
        previous: PixelPosition,
        current: PixelPosition,
    },
    /// `rotation` is in wheel clicks, positive towards the user.
    Wheel {
        rotation: i32,
        cursor: PixelPosition,
        sharpen: bool,
    },
    Click,
}

/// Pans so the plane point under `previous` ends up under `current`.
pub fn transform_from_drag(
    previous: PixelPosition,
    current: PixelPosition,
    viewport: &mut Viewport,
    size: screen::Size,
) {
    let dx = previous.x - current.x;
    let dy = previous.y - current.y;

    let scale_x = size.width as f64 / viewport.width();
    let scale_y = size.height as f64 / viewport.height();

    viewport.translate(dx / scale_x, -dy / scale_y);
}

/// Zooms around the plane point under `cursor`, by `2^(-rotation / 10)`.
pub fn transform_from_wheel(
    rotation: i32,
    cursor: PixelPosition,
    viewport: &mut Viewport,
    size: screen::Size,
) -> Result<()> {
    let factor = 2f64.powf(-(rotation as f64) / CLICKS_PER_DOUBLING);

    let scale_x = size.width as f64 / viewport.width();
    let scale_y = size.height as f64 / viewport.height();

    let x = viewport.min_x() + cursor.x / scale_x;
    let y = viewport.min_y() + (size.height as f64 - cursor.y - 1.0) / scale_y;

    viewport.zoom(x, y, factor)
}

/// Turns fractional wheel input, such as touchpad pixel deltas, into whole
/// clicks. Whatever does not add up to a click carries over to the next event.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WheelAccumulator {
    remainder: f64,
}

impl WheelAccumulator {
    pub fn clicks(&mut self, delta: f64) -> i32 {
        let total = self.remainder + delta;
        let clicks = total.trunc();
        self.remainder = total - clicks;
        clicks as i32
    }
}

/// Scrolling away from the user adds iterations.
pub fn sharpen_from_wheel(rotation: i32, budget: &mut IterationBudget) {
    budget.sharpen(rotation.saturating_mul(-ITERATIONS_PER_CLICK));
}

pub fn render_frame<E: ComputeEngine + ?Sized>(
    engine: &mut E,
    viewport: &Viewport,
    budget: IterationBudget,
    raster: &mut Raster,
) -> Result<()> {
    engine.compute(raster, viewport, budget)
}

pub fn status_text(viewport: &Viewport) -> String {
    format!(
        "[{:.6}; {:.6}[ x [{:.6}; {:.6}[",
        viewport.min_x(),
        viewport.max_x(),
        viewport.min_y(),
        viewport.max_y()
    )
}

/// Owns everything one window needs to turn events into frames.
pub struct Renderer<E> {
    engine: E,
    viewport: Viewport,
    budget: IterationBudget,
    raster: Raster,
    status: String,
    status_visible: bool,
    dirty: bool,
}

impl<E: ComputeEngine> Renderer<E> {
    pub fn new(engine: E, viewport: Viewport, budget: IterationBudget, raster: Raster) -> Self {
        Self {
            engine,
            status: status_text(&viewport),
            viewport,
            budget,
            raster,
            status_visible: false,
            dirty: true,
        }
    }

    /// Applies an interaction. Returns whether the window needs repainting.
    ///
    /// A rejected zoom leaves every piece of state untouched.
    pub fn handle(&mut self, interaction: Interaction) -> Result<bool> {
        let size = self.raster.size();

        match interaction {
            Interaction::Drag { previous, current } => {
                if previous == current {
                    return Ok(false);
                }
                transform_from_drag(previous, current, &mut self.viewport, size);
                self.dirty = true;
            }
            Interaction::Wheel {
                rotation: 0, ..
            } => return Ok(false),
            Interaction::Wheel {
                rotation,
                sharpen: true,
                ..
            } => {
                sharpen_from_wheel(rotation, &mut self.budget);
                debug!("max iterations: {}", self.budget.get());
                self.dirty = true;
            }
            Interaction::Wheel {
                rotation,
                cursor,
                sharpen: false,
            } => {
                transform_from_wheel(rotation, cursor, &mut self.viewport, size)?;
                self.dirty = true;
            }
            Interaction::Click => {
                self.status_visible = !self.status_visible;
                return Ok(true);
            }
        }

        self.status = status_text(&self.viewport);
        Ok(true)
    }

    /// Matches the raster to a new window size. Empty sizes are ignored.
    pub fn resize(&mut self, size: screen::Size) -> Result<()> {
        if size.is_empty() || size == self.raster.size() {
            return Ok(());
        }
        self.raster.resize(size.width, size.height)?;
        self.dirty = true;
        Ok(())
    }

    /// Recomputes the raster if anything changed since the last frame.
    /// Returns whether a frame was computed.
    pub fn redraw(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }

        trace!("begin frame");
        render_frame(&mut self.engine, &self.viewport, self.budget, &mut self.raster)?;
        self.dirty = false;
        trace!("end frame");

        Ok(true)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn budget(&self) -> IterationBudget {
        self.budget
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The bounds overlay, if the user has it switched on.
    pub fn status(&self) -> Option<&str> {
        self.status_visible.then_some(self.status.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        colour::Palette,
        cpu::{CpuEngine, CpuOptions},
    };

    const SIZE: screen::Size = screen::Size {
        width: 100,
        height: 100,
    };

    fn viewport() -> Viewport {
        Viewport::from_bounds(-2.0, 0.6, -1.3, 1.3).unwrap()
    }

    fn renderer() -> Renderer<CpuEngine> {
        Renderer::new(
            CpuEngine::new(Palette::default(), CpuOptions::default()),
            viewport(),
            IterationBudget::new(100),
            Raster::new(SIZE.width, SIZE.height).unwrap(),
        )
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "{actual} is not close to {expected}"
        );
    }

    #[test]
    fn dragging_right_moves_the_plane_left() {
        let mut viewport = viewport();
        transform_from_drag(
            PixelPosition::new(50.0, 50.0),
            PixelPosition::new(60.0, 40.0),
            &mut viewport,
            SIZE,
        );
        // 10 pixels at 0.026 plane units per pixel.
        assert_close(viewport.min_x(), -2.0 - 0.26);
        assert_close(viewport.min_y(), -1.3 - 0.26);
        assert_close(viewport.width(), 2.6);
    }

    #[test]
    fn ten_wheel_clicks_halve_the_zoom() {
        let mut viewport = viewport();
        transform_from_wheel(10, PixelPosition::new(50.0, 50.0), &mut viewport, SIZE).unwrap();
        assert_close(viewport.width(), 5.2);

        transform_from_wheel(-20, PixelPosition::new(50.0, 50.0), &mut viewport, SIZE).unwrap();
        assert_close(viewport.width(), 1.3);
    }

    #[test]
    fn wheel_zoom_keeps_the_point_under_the_cursor() {
        let mut viewport = viewport();
        let cursor = PixelPosition::new(20.0, 70.0);
        let before = (
            viewport.min_x() + cursor.x * viewport.width() / 100.0,
            viewport.min_y() + (100.0 - cursor.y - 1.0) * viewport.height() / 100.0,
        );

        transform_from_wheel(-7, cursor, &mut viewport, SIZE).unwrap();

        let after = (
            viewport.min_x() + cursor.x * viewport.width() / 100.0,
            viewport.min_y() + (100.0 - cursor.y - 1.0) * viewport.height() / 100.0,
        );
        assert_close(after.0, before.0);
        assert_close(after.1, before.1);
    }

    #[test]
    fn sharpening_adds_five_iterations_per_click_away() {
        let mut budget = IterationBudget::new(100);
        sharpen_from_wheel(-2, &mut budget);
        assert_eq!(budget.get(), 110);
        sharpen_from_wheel(100, &mut budget);
        assert_eq!(budget.get(), 2);
    }

    #[test]
    fn small_wheel_deltas_add_up_to_clicks() {
        let mut wheel = WheelAccumulator::default();
        let clicks: Vec<i32> = (0..8).map(|_| wheel.clicks(0.3)).collect();
        assert_eq!(clicks, [0, 0, 0, 1, 0, 0, 1, 0]);

        assert_eq!(wheel.clicks(2.0), 2);
        assert_eq!(wheel.clicks(-0.5), 0);
        assert_eq!(wheel.clicks(-0.5), 0);
        assert_eq!(wheel.clicks(-0.5), -1);
    }

    #[test]
    fn status_text_shows_half_open_bounds() {
        assert_eq!(
            status_text(&viewport()),
            "[-2.000000; 0.600000[ x [-1.300000; 1.300000["
        );
    }

    #[test]
    fn shift_wheel_sharpens_without_zooming() {
        let mut renderer = renderer();
        renderer.redraw().unwrap();

        let changed = renderer
            .handle(Interaction::Wheel {
                rotation: -1,
                cursor: PixelPosition::new(10.0, 10.0),
                sharpen: true,
            })
            .unwrap();

        assert!(changed);
        assert!(renderer.is_dirty());
        assert_eq!(renderer.budget().get(), 105);
        assert_eq!(renderer.viewport(), &viewport());
    }

    #[test]
    fn events_between_redraws_are_coalesced() {
        let mut renderer = renderer();
        assert!(renderer.redraw().unwrap());
        assert!(!renderer.redraw().unwrap());

        for _ in 0..3 {
            renderer
                .handle(Interaction::Wheel {
                    rotation: -1,
                    cursor: PixelPosition::new(30.0, 30.0),
                    sharpen: false,
                })
                .unwrap();
        }
        let mut expected = viewport();
        for _ in 0..3 {
            transform_from_wheel(-1, PixelPosition::new(30.0, 30.0), &mut expected, SIZE)
                .unwrap();
        }

        assert!(renderer.redraw().unwrap());
        assert!(!renderer.redraw().unwrap());
        assert_eq!(renderer.viewport(), &expected);

        let mut reference = Raster::new(SIZE.width, SIZE.height).unwrap();
        CpuEngine::new(Palette::default(), CpuOptions::default())
            .compute(&mut reference, &expected, IterationBudget::new(100))
            .unwrap();
        assert_eq!(renderer.raster(), &reference);
    }

    #[test]
    fn click_toggles_the_status_overlay() {
        let mut renderer = renderer();
        assert_eq!(renderer.status(), None);

        renderer.handle(Interaction::Click).unwrap();
        assert_eq!(
            renderer.status(),
            Some("[-2.000000; 0.600000[ x [-1.300000; 1.300000[")
        );
        assert!(renderer.is_dirty());

        renderer
            .handle(Interaction::Drag {
                previous: PixelPosition::new(0.0, 0.0),
                current: PixelPosition::new(100.0, 0.0),
            })
            .unwrap();
        assert_eq!(
            renderer.status(),
            Some("[-4.600000; -2.000000[ x [-1.300000; 1.300000[")
        );

        renderer.handle(Interaction::Click).unwrap();
        assert_eq!(renderer.status(), None);
    }

    #[test]
    fn resize_reallocates_and_marks_dirty() {
        let mut renderer = renderer();
        renderer.redraw().unwrap();

        renderer.resize(screen::Size::new(0, 10)).unwrap();
        assert!(!renderer.is_dirty());

        renderer.resize(screen::Size::new(40, 30)).unwrap();
        assert!(renderer.is_dirty());
        renderer.redraw().unwrap();
        assert_eq!(renderer.raster().size(), screen::Size::new(40, 30));
    }

    #[test]
    fn rejected_zoom_leaves_state_untouched() {
        let mut renderer = renderer();
        renderer.redraw().unwrap();

        let result = renderer.handle(Interaction::Wheel {
            rotation: i32::MIN,
            cursor: PixelPosition::new(50.0, 50.0),
            sharpen: false,
        });

        assert!(result.is_err());
        assert_eq!(renderer.viewport(), &viewport());
        assert!(!renderer.is_dirty());
    }
}
