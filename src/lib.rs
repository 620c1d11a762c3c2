/*!
Interactive Mandelbrot set rendering.

A [`viewport::Viewport`] selects a rectangle of the complex plane; a
[`engine::ComputeEngine`] fills a [`raster::Raster`] with the escape-time image
of that rectangle, coloured through a [`colour::Palette`]. Two engines exist:
[`cpu::CpuEngine`] spreads rows over worker threads, [`gpu::GpuEngine`] runs a
`wgpu` compute kernel. [`driver::Renderer`] turns pointer interactions into
viewport changes and frames.
*/

pub mod colour;
pub mod compute;
pub mod config;
pub mod cpu;
pub mod driver;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod escape;
pub mod gpu;
pub mod present;
pub mod raster;
pub mod screen;
pub mod typed_buffer;
pub mod viewport;
