//! Command-line configuration.

use clap::{Parser, ValueEnum};

use crate::{
    colour::{Palette, Wrap, DEFAULT_ANCHORS, DEFAULT_STEPS_PER_SEGMENT},
    cpu::{CpuOptions, Scheduler},
    engine::IterationBudget,
    error::Result,
    gpu::GpuOptions,
    viewport::Viewport,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    Cpu,
    Gpu,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SchedulerArg {
    WorkCounter,
    Rayon,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum WrapArg {
    Cyclic,
    Clamped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PowerPreferenceArg {
    Low,
    High,
}

/// Interactive Mandelbrot set explorer.
///
/// Drag to pan, scroll to zoom, shift+scroll to change the iteration budget,
/// click to show the plane bounds in the title bar.
#[derive(Clone, Debug, Parser)]
#[command(version)]
pub struct Config {
    #[arg(long, default_value_t = -2.0, allow_hyphen_values = true)]
    pub min_x: f64,

    #[arg(long, default_value_t = 0.6, allow_hyphen_values = true)]
    pub max_x: f64,

    #[arg(long, default_value_t = -1.3, allow_hyphen_values = true)]
    pub min_y: f64,

    #[arg(long, default_value_t = 1.3, allow_hyphen_values = true)]
    pub max_y: f64,

    /// Initial raster width in pixels.
    #[arg(long, default_value_t = 1024)]
    pub width: u32,

    /// Initial raster height in pixels.
    #[arg(long, default_value_t = 1024)]
    pub height: u32,

    #[arg(long, default_value_t = 512, allow_hyphen_values = true)]
    pub max_iterations: i32,

    #[arg(long, value_enum, default_value_t = EngineKind::Gpu)]
    pub engine: EngineKind,

    /// Fail instead of using the CPU when no GPU is available.
    #[arg(long)]
    pub no_fallback: bool,

    #[arg(long, value_enum, default_value_t = SchedulerArg::WorkCounter)]
    pub scheduler: SchedulerArg,

    /// CPU worker threads. Defaults to one less than the number of cores.
    #[arg(long)]
    pub threads: Option<usize>,

    #[arg(long, default_value_t = DEFAULT_STEPS_PER_SEGMENT)]
    pub palette_steps: usize,

    #[arg(long, value_enum, default_value_t = WrapArg::Cyclic)]
    pub palette_wrap: WrapArg,

    #[arg(long, value_enum, default_value_t = PowerPreferenceArg::High)]
    pub power_preference: PowerPreferenceArg,
}

impl Config {
    pub fn viewport(&self) -> Result<Viewport> {
        Viewport::from_bounds(self.min_x, self.max_x, self.min_y, self.max_y)
    }

    pub fn budget(&self) -> IterationBudget {
        IterationBudget::new(self.max_iterations)
    }

    pub fn palette(&self) -> Result<Palette> {
        let wrap = match self.palette_wrap {
            WrapArg::Cyclic => Wrap::Cyclic,
            WrapArg::Clamped => Wrap::Clamped,
        };
        Palette::build(&DEFAULT_ANCHORS, self.palette_steps, wrap)
    }

    pub fn cpu_options(&self) -> CpuOptions {
        CpuOptions {
            threads: self.threads.unwrap_or_else(CpuOptions::default_threads),
            scheduler: match self.scheduler {
                SchedulerArg::WorkCounter => Scheduler::WorkCounter,
                SchedulerArg::Rayon => Scheduler::Rayon,
            },
        }
    }

    pub fn gpu_options(&self) -> GpuOptions {
        GpuOptions {
            power_preference: match self.power_preference {
                PowerPreferenceArg::Low => wgpu::PowerPreference::LowPower,
                PowerPreferenceArg::High => wgpu::PowerPreference::HighPerformance,
            },
            ..GpuOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;
    use crate::error::Error;

    #[test]
    fn command_is_well_formed() {
        Config::command().debug_assert();
    }

    #[test]
    fn defaults_match_the_classic_view() {
        let config = Config::try_parse_from(["mandelbrot-explorer"]).unwrap();
        assert_eq!(config.engine, EngineKind::Gpu);
        assert_eq!((config.width, config.height), (1024, 1024));
        assert_eq!(config.budget().get(), 512);
        assert!(!config.no_fallback);

        let viewport = config.viewport().unwrap();
        assert!((viewport.min_x() - -2.0).abs() < 1e-12);
        assert!((viewport.max_y() - 1.3).abs() < 1e-12);

        let palette = config.palette().unwrap();
        assert_eq!(palette, Palette::default());
        assert_eq!(config.cpu_options(), CpuOptions::default());
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "mandelbrot-explorer",
            "--engine",
            "cpu",
            "--scheduler",
            "rayon",
            "--threads",
            "3",
            "--min-x",
            "-1.5",
            "--max-x",
            "-0.5",
            "--max-iterations",
            "-10",
            "--palette-steps",
            "4",
            "--palette-wrap",
            "clamped",
            "--power-preference",
            "low",
        ])
        .unwrap();

        assert_eq!(config.engine, EngineKind::Cpu);
        assert_eq!(
            config.cpu_options(),
            CpuOptions {
                threads: 3,
                scheduler: Scheduler::Rayon,
            }
        );
        assert_eq!(config.budget().get(), 2);
        assert_eq!(config.palette().unwrap().len(), 4 * (DEFAULT_ANCHORS.len() - 1));
        assert_eq!(
            config.gpu_options().power_preference,
            wgpu::PowerPreference::LowPower
        );
        assert!((config.viewport().unwrap().width() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_values_surface_as_errors() {
        let config =
            Config::try_parse_from(["mandelbrot-explorer", "--min-x", "1", "--max-x", "0"])
                .unwrap();
        assert!(matches!(config.viewport(), Err(Error::InvalidArgument(_))));

        let config = Config::try_parse_from(["mandelbrot-explorer", "--palette-steps", "1"])
            .unwrap();
        assert!(matches!(
            config.palette(),
            Err(Error::InvalidConfiguration(_))
        ));

        assert!(Config::try_parse_from(["mandelbrot-explorer", "--engine", "tpu"]).is_err());
    }
}
