//! Drives a canvas without any device attached.
//!
//! The backend only logs what it is asked to do, which makes the resource lifecycle visible:
//! run with `RUST_LOG=info` for the frame summaries, or `RUST_LOG=trace` to see every create,
//! upload and destroy. Engine options such as `--single-threaded` or `--detached-loads` are
//! picked up from the command line.

use glamx::{Affine3A, UVec2, Vec2, Vec3};
use std::error::Error;
use std::io;
use tessel::Engine;
use tessel_asset::{Image, MeshData};
use tessel_render::{
    Drawable, FrameContext, HandleId, MeshDraw, RenderBackend, Scene, TextureDraw,
};
use tracing::{error, info, trace};
use tracing_subscriber::EnvFilter;
use web_time::Duration;

#[derive(Default)]
struct LogBackend {
    draws: usize,
}

impl RenderBackend for LogBackend {
    fn create_texture(&mut self, id: HandleId) {
        trace!("create texture {id}");
    }

    fn destroy_texture(&mut self, id: HandleId) {
        trace!("destroy texture {id}");
    }

    fn load_texture(&mut self, id: HandleId, image: &Image) {
        trace!("upload {} bytes to texture {id}", image.pixels().len());
    }

    fn create_mesh(&mut self, id: HandleId) {
        trace!("create mesh {id}");
    }

    fn destroy_mesh(&mut self, id: HandleId) {
        trace!("destroy mesh {id}");
    }

    fn load_mesh(&mut self, id: HandleId, mesh: &MeshData) {
        trace!("upload {} vertices to mesh {id}", mesh.vertex_count());
    }

    fn render_texture(&mut self, _frame: &FrameContext, draw: &TextureDraw) {
        self.draws += 1;
        if let Some(text) = &draw.text {
            trace!("text {text:?} at {}", draw.position);
        }
    }

    fn render_mesh(&mut self, _frame: &FrameContext, _draw: &MeshDraw) {
        self.draws += 1;
    }

    fn release(&mut self) {
        info!("Backend released after {} draw calls", self.draws);
    }
}

fn checkerboard(size: u32) -> Result<Image, io::Error> {
    let pixels = (0..size * size)
        .flat_map(|i| {
            let on = (i % size + i / size) % 2 == 0;
            if on { [255, 255, 255, 255] } else { [0, 0, 0, 255] }
        })
        .collect();
    Ok(Image::new(UVec2::splat(size), pixels))
}

fn cube() -> Result<MeshData, io::Error> {
    Ok(MeshData::new(24, vec![0; 24 * 32], (0..36).collect()))
}

fn run() -> Result<(), Box<dyn Error>> {
    let engine = Engine::from_env()?;
    let mut canvas = engine.create_canvas(LogBackend::default)?;

    let tiles = engine.resource("tiles", || checkerboard(32));
    let font = engine.resource("font atlas", || checkerboard(256));
    let crate_mesh = engine.resource("crate", cube);

    let mut scene = Scene::new();
    let sprites: Vec<_> = (0..8)
        .map(|i| scene.add(Drawable::sprite(tiles.clone(), Vec2::new(i as f32 * 32.0, 0.0))))
        .collect();
    scene.add(Drawable::text(font, "tessel", Vec2::new(8.0, 8.0)));
    let model = scene.add(
        Drawable::model(
            crate_mesh,
            Affine3A::from_translation(Vec3::new(0.0, 0.0, -5.0)),
        )
        .with_diffuse(tiles),
    );

    for frame in 0..120 {
        match frame {
            40 => {
                for id in &sprites {
                    scene.remove(*id);
                }
            }
            80 => {
                scene.remove(model);
            }
            _ => {}
        }

        canvas.render(&scene)?;
        if let Err(e) = canvas.sync() {
            error!("Frame {frame} is running late: {e}");
            continue;
        }

        if frame % 20 == 0 {
            let (stats, fps) =
                canvas.query(|ctx| (ctx.last_stats(), ctx.frame_counter().fps_mean()))?;
            info!(
                "frame {frame}: {} drawn, {} skipped, {} created, {} destroyed, {fps} fps",
                stats.drawn, stats.skipped, stats.created, stats.destroyed
            );
        }

        std::thread::sleep(Duration::from_millis(4));
    }

    canvas.close();
    Ok(())
}

fn main() {
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        error!("{e}");
    }
}
