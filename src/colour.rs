//! Colouring by iteration count.
//!
//! A [`Palette`] is a precomputed sequence of packed `0x00RRGGBB` colours,
//! indexed by `iteration mod len`. Consecutive anchors are joined by linear
//! ramps, which produces the banded look of discrete escape-time colouring.

use log::debug;

use crate::error::{Error, Result};

/// Colour of points that never escape.
pub const INTERIOR: u32 = 0x000000;

/// Anchors used when nothing else is configured.
pub const DEFAULT_ANCHORS: [Rgb; 5] = [
    Rgb::new(0, 0, 96),
    Rgb::new(128, 192, 255),
    Rgb::new(255, 255, 255),
    Rgb::new(255, 192, 0),
    Rgb::new(255, 96, 0),
];

pub const DEFAULT_STEPS_PER_SEGMENT: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub const fn packed(self) -> u32 {
        (self.red as u32) << 16 | (self.green as u32) << 8 | self.blue as u32
    }

    pub const fn unpack(packed: u32) -> Self {
        Self {
            red: (packed >> 16) as u8,
            green: (packed >> 8) as u8,
            blue: packed as u8,
        }
    }
}

/// Whether the last anchor ramps back to the first one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Wrap {
    /// `anchors.len()` segments; the palette loops seamlessly.
    #[default]
    Cyclic,
    /// `anchors.len() - 1` segments; the last colour is the last anchor.
    Clamped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colours: Vec<u32>,
}

impl Palette {
    pub fn build(anchors: &[Rgb], steps_per_segment: usize, wrap: Wrap) -> Result<Self> {
        if anchors.len() < 2 {
            return Err(Error::InvalidConfiguration(format!(
                "a palette needs at least 2 anchors, got {}",
                anchors.len()
            )));
        }
        if steps_per_segment < 2 {
            return Err(Error::InvalidConfiguration(format!(
                "a palette needs at least 2 steps per segment, got {steps_per_segment}"
            )));
        }

        let colours = ramp(anchors, steps_per_segment, wrap);

        debug!(
            "built {:?} palette of {} colours from {} anchors",
            wrap,
            colours.len(),
            anchors.len()
        );

        Ok(Self { colours })
    }

    pub fn colours(&self) -> &[u32] {
        &self.colours
    }

    pub fn len(&self) -> usize {
        self.colours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colours.is_empty()
    }

    /// Colour of a point that escaped after `iteration` steps.
    pub fn colour(&self, iteration: u32) -> u32 {
        self.colours[iteration as usize % self.colours.len()]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colours: ramp(&DEFAULT_ANCHORS, DEFAULT_STEPS_PER_SEGMENT, Wrap::Cyclic),
        }
    }
}

/// Joins consecutive anchors with `steps_per_segment` samples each. Every
/// segment includes both of its endpoints.
fn ramp(anchors: &[Rgb], steps_per_segment: usize, wrap: Wrap) -> Vec<u32> {
    let segments = match wrap {
        Wrap::Cyclic => anchors.len(),
        Wrap::Clamped => anchors.len() - 1,
    };

    let mut colours = Vec::with_capacity(segments * steps_per_segment);
    for segment in 0..segments {
        let from = anchors[segment];
        let to = anchors[(segment + 1) % anchors.len()];

        for step in 0..steps_per_segment {
            let coefficient = step as f64 / (steps_per_segment - 1) as f64;
            colours.push(
                Rgb::new(
                    interpolate(from.red, to.red, coefficient),
                    interpolate(from.green, to.green, coefficient),
                    interpolate(from.blue, to.blue, coefficient),
                )
                .packed(),
            );
        }
    }
    colours
}

fn interpolate(from: u8, to: u8, coefficient: f64) -> u8 {
    let value = from as f64 + coefficient * (to as f64 - from as f64);
    value.round().clamp(0.0, 255.0) as u8
}
