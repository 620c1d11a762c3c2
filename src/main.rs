use clap::Parser;
use log::{error, info, warn};
use winit::{
    dpi::PhysicalSize,
    event::{
        ElementState, Event, ModifiersState, MouseButton, MouseScrollDelta, WindowEvent,
    },
    event_loop::EventLoop,
    window::WindowBuilder,
};

use mandelbrot_explorer::{
    config::{Config, EngineKind},
    cpu::CpuEngine,
    driver::{Interaction, PixelPosition, Renderer, WheelAccumulator},
    engine::ComputeEngine,
    error::Result,
    gpu::GpuEngine,
    present::Presenter,
    raster::Raster,
};

const TITLE: &str = "Mandelbrot set rendering";

/// Touchpads report pixels; this many count as one wheel click.
const PIXELS_PER_CLICK: f64 = 40.0;

fn main() {
    env_logger::init();

    let config = Config::parse();
    if let Err(error) = run(config) {
        error!("{}", error);
        std::process::exit(1);
    }
}

/// Builds the configured engine. A GPU that cannot be set up is replaced by the
/// CPU engine unless `--no-fallback` was given.
fn create_engine(config: &Config) -> Result<Box<dyn ComputeEngine>> {
    let palette = config.palette()?;

    match config.engine {
        EngineKind::Cpu => Ok(Box::new(CpuEngine::new(palette, config.cpu_options()))),
        EngineKind::Gpu => match GpuEngine::new(palette.clone(), config.gpu_options()) {
            Ok(engine) => Ok(Box::new(engine)),
            Err(error) if !config.no_fallback => {
                warn!("{}, falling back to the cpu engine", error);
                Ok(Box::new(CpuEngine::new(palette, config.cpu_options())))
            }
            Err(error) => Err(error),
        },
    }
}

fn title<E: ComputeEngine>(renderer: &Renderer<E>) -> String {
    match renderer.status() {
        Some(status) => format!("{} - {} iterations", status, renderer.budget().get()),
        None => TITLE.to_string(),
    }
}

fn run(config: Config) -> Result<()> {
    let viewport = config.viewport()?;
    let engine = create_engine(&config)?;
    info!("rendering with the {} engine", engine.name());

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title(TITLE)
        .with_inner_size(PhysicalSize::new(config.width, config.height))
        .build(&event_loop)?;

    let mut presenter = Presenter::new(&window)?;

    let mut renderer = Renderer::new(
        engine,
        viewport,
        config.budget(),
        Raster::new(config.width, config.height)?,
    );
    renderer.resize(window.inner_size().into())?;

    let mut cursor = PixelPosition::default();
    let mut pressed = false;
    let mut moved_while_pressed = false;
    let mut modifiers = ModifiersState::empty();
    let mut wheel = WheelAccumulator::default();

    event_loop.run(move |event, _, control_flow| {
        control_flow.set_wait();

        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                let interaction = match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                        None
                    }
                    WindowEvent::Resized(size) => {
                        if let Err(error) = renderer.resize(size.into()) {
                            warn!("ignoring resize to {:?}: {}", size, error);
                        }
                        presenter.resize(size.into());
                        window.request_redraw();
                        None
                    }
                    WindowEvent::ModifiersChanged(state) => {
                        modifiers = state;
                        None
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let current = PixelPosition::new(position.x, position.y);
                        let previous = std::mem::replace(&mut cursor, current);
                        if pressed {
                            moved_while_pressed = true;
                            Some(Interaction::Drag { previous, current })
                        } else {
                            None
                        }
                    }
                    WindowEvent::MouseInput {
                        state,
                        button: MouseButton::Left,
                        ..
                    } => match state {
                        ElementState::Pressed => {
                            pressed = true;
                            moved_while_pressed = false;
                            None
                        }
                        ElementState::Released => {
                            pressed = false;
                            (!moved_while_pressed).then_some(Interaction::Click)
                        }
                    },
                    WindowEvent::MouseWheel { delta, .. } => {
                        let rotation = wheel.clicks(match delta {
                            MouseScrollDelta::LineDelta(_, y) => -f64::from(y),
                            MouseScrollDelta::PixelDelta(position) => {
                                -position.y / PIXELS_PER_CLICK
                            }
                        });
                        Some(Interaction::Wheel {
                            rotation,
                            cursor,
                            sharpen: modifiers.shift(),
                        })
                    }
                    _ => None,
                };

                if let Some(interaction) = interaction {
                    match renderer.handle(interaction) {
                        Ok(true) => {
                            window.set_title(&title(&renderer));
                            window.request_redraw();
                        }
                        Ok(false) => {}
                        Err(error) => warn!("ignoring {:?}: {}", interaction, error),
                    }
                }
            }
            Event::RedrawRequested(window_id) if window_id == window.id() => {
                match renderer.redraw() {
                    Ok(true) => presenter.upload(renderer.raster()),
                    Ok(false) => {}
                    Err(error) => error!("frame failed: {}", error),
                }

                if let Err(error) = presenter.render() {
                    error!("{}", error);
                    control_flow.set_exit();
                }
            }
            _ => {}
        }
    });
}
