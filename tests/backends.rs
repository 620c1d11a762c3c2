//! The CPU and GPU engines must draw the same picture.
//!
//! The GPU kernel runs in `f32`, so pixels near the boundary of the set may land
//! on a different iteration count. These tests bound the share of differing
//! pixels instead of demanding identical rasters. They are skipped when no
//! adapter is available.

use mandelbrot_explorer::{
    colour::{Palette, INTERIOR},
    cpu::{CpuEngine, CpuOptions},
    engine::{ComputeEngine, ComputeParams, IterationBudget},
    error::Error,
    gpu::{GpuEngine, GpuOptions},
    raster::Raster,
    viewport::Viewport,
};

/// Share of pixels allowed to differ between the backends.
const TOLERANCE: f64 = 0.05;

fn gpu_engine() -> Option<GpuEngine> {
    match GpuEngine::new(Palette::default(), GpuOptions::default()) {
        Ok(engine) => Some(engine),
        Err(Error::DeviceUnavailable(reason)) => {
            eprintln!("skipping gpu test: {reason}");
            None
        }
        Err(error) => panic!("unexpected error building the gpu engine: {error}"),
    }
}

fn cpu_engine() -> CpuEngine {
    CpuEngine::new(Palette::default(), CpuOptions::default())
}

fn classic_view() -> Viewport {
    Viewport::from_bounds(-2.0, 0.6, -1.3, 1.3).unwrap()
}

fn render(engine: &mut impl ComputeEngine, viewport: &Viewport, width: u32, height: u32) -> Raster {
    let mut raster = Raster::new(width, height).unwrap();
    engine
        .compute(&mut raster, viewport, IterationBudget::new(64))
        .unwrap();
    raster
}

fn differing_share(left: &Raster, right: &Raster) -> f64 {
    assert_eq!(left.size(), right.size());
    let differing = left
        .pixels()
        .iter()
        .zip(right.pixels())
        .filter(|(left, right)| left != right)
        .count();
    differing as f64 / left.pixels().len() as f64
}

fn assert_agree(gpu: &Raster, cpu: &Raster) {
    let share = differing_share(gpu, cpu);
    assert!(
        share <= TOLERANCE,
        "{:.2}% of pixels differ between the backends",
        share * 100.0
    );
}

#[test]
fn gpu_matches_cpu_on_the_classic_view() {
    let Some(mut gpu) = gpu_engine() else { return };
    let viewport = classic_view();

    let gpu_raster = render(&mut gpu, &viewport, 96, 80);
    let cpu_raster = render(&mut cpu_engine(), &viewport, 96, 80);

    assert_agree(&gpu_raster, &cpu_raster);
}

#[test]
fn gpu_matches_cpu_after_zooming() {
    let Some(mut gpu) = gpu_engine() else { return };
    let mut viewport = classic_view();
    viewport.zoom(-0.75, 0.1, 8.0).unwrap();
    viewport.translate(0.01, -0.02);

    let gpu_raster = render(&mut gpu, &viewport, 64, 64);
    let cpu_raster = render(&mut cpu_engine(), &viewport, 64, 64);

    assert_agree(&gpu_raster, &cpu_raster);
}

#[test]
fn gpu_survives_resizing_back_and_forth() {
    let Some(mut gpu) = gpu_engine() else { return };
    let mut cpu = cpu_engine();
    let viewport = classic_view();

    for (width, height) in [(64, 48), (33, 71), (64, 48)] {
        let gpu_raster = render(&mut gpu, &viewport, width, height);
        let cpu_raster = render(&mut cpu, &viewport, width, height);
        assert_agree(&gpu_raster, &cpu_raster);
    }
}

#[test]
fn gpu_is_deterministic() {
    let Some(mut gpu) = gpu_engine() else { return };
    let viewport = classic_view();

    let first = render(&mut gpu, &viewport, 50, 50);
    let second = render(&mut gpu, &viewport, 50, 50);

    assert_eq!(first, second);
}

#[test]
fn gpu_renders_the_reference_scenario() {
    let Some(mut gpu) = gpu_engine() else { return };
    let viewport = classic_view();
    let budget = IterationBudget::new(100);

    let mut raster = Raster::new(100, 100).unwrap();
    gpu.compute(&mut raster, &viewport, budget).unwrap();

    let params = ComputeParams::new(&viewport, 100, 100);

    let (column, row) = params.nearest_pixel(-0.5, 0.0);
    assert_eq!(raster.pixel(column, row), INTERIOR);

    let (column, row) = params.nearest_pixel(2.0, 2.0);
    let pixel = raster.pixel(column, row);
    assert!(
        (0..5).any(|iteration| gpu.palette().colour(iteration) == pixel),
        "pixel {pixel:#08x} is not an early escape colour"
    );
}

#[test]
fn cpu_engines_behind_the_trait_object_agree() {
    let viewport = classic_view();
    let mut boxed: Box<dyn ComputeEngine> = Box::new(cpu_engine());

    let from_box = render(&mut boxed, &viewport, 40, 30);
    let direct = render(&mut cpu_engine(), &viewport, 40, 30);

    assert_eq!(boxed.name(), "cpu");
    assert_eq!(from_box, direct);
}
