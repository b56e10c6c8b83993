//! Headless scene viewer
//!
//! Loads a scene configuration, initializes it on a recording context and
//! flies the camera through a short scripted sequence, logging what the GPU
//! would have been asked to do.
//!
//! ```text
//! scene_viewer [CONFIG] [--frames N] [--gl MAJOR.MINOR]
//! ```

use std::cell::Cell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use scene_engine::config::ModelConfig;
use scene_engine::foundation::logging;
use scene_engine::prelude::*;
use thiserror::Error;

const FRAME_RATE: f64 = 60.0;

#[derive(Debug, Error)]
enum ViewerError {
    #[error("Invalid arguments: {0}")]
    Usage(String),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

#[derive(Debug)]
struct Options {
    config: Option<PathBuf>,
    frames: u32,
    gl_version: (u32, u32),
}

impl Options {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, ViewerError> {
        let mut options = Self {
            config: None,
            frames: 120,
            gl_version: (4, 3),
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--frames" => {
                    let value = args.next().ok_or_else(|| ViewerError::Usage("--frames needs a value".into()))?;
                    options.frames = value
                        .parse()
                        .map_err(|_| ViewerError::Usage(format!("bad frame count '{value}'")))?;
                }
                "--gl" => {
                    let value = args.next().ok_or_else(|| ViewerError::Usage("--gl needs a value".into()))?;
                    options.gl_version = parse_version(&value)
                        .ok_or_else(|| ViewerError::Usage(format!("bad version '{value}'")))?;
                }
                _ if arg.starts_with("--") => return Err(ViewerError::Usage(format!("unknown flag '{arg}'"))),
                _ => options.config = Some(PathBuf::from(arg)),
            }
        }

        Ok(options)
    }
}

fn parse_version(value: &str) -> Option<(u32, u32)> {
    let (major, minor) = value.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

fn main() -> ExitCode {
    logging::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(ViewerError::Scene(SceneError::UnsupportedContext { required, found })) => {
            eprintln!("Requires OpenGL >= {required}, but the context provides {found}");
            ExitCode::from(1)
        }
        Err(e) => {
            log::error!("Scene viewer failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), ViewerError> {
    let options = Options::parse(std::env::args().skip(1))?;

    let mut scene: Scene<HeadlessContext> = match &options.config {
        Some(path) => {
            log::info!("Loading scene configuration from {:?}", path);
            Scene::from_config_file(path)?
        }
        None => {
            log::info!("No configuration given, using the bundled cube");
            Scene::new(bundled_config())
        }
    };

    let rendered = Rc::new(Cell::new(0_u64));
    let counter = Rc::clone(&rendered);
    scene.on_frame_rendered(move |info| {
        counter.set(info.frame);
        if info.frame % 60 == 0 {
            log::info!("Frame {} at t = {:.2}s", info.frame, info.time);
        }
    });

    let (major, minor) = options.gl_version;
    scene.initialize(HeadlessContext::new().with_version(major, minor))?;
    scene.resize(1280, 720)?;

    for frame in 0..options.frames {
        script(&mut scene, frame);
        let time = f64::from(frame) / FRAME_RATE;
        scene.update(time)?;
        scene.render(time)?;
    }

    let camera = scene.camera();
    log::info!(
        "Rendered {} frames; camera at {:?} looking at {:?}",
        rendered.get(),
        camera.position(),
        camera.view_center()
    );
    if let Some(context) = scene.context() {
        log::info!(
            "{} draw calls, {} meshes, {} textures, {} uniform buffers",
            context.draw_calls().len(),
            context.mesh_count(),
            context.texture_count(),
            context.buffer_count()
        );
    }

    Ok(())
}

fn bundled_config() -> SceneConfig {
    SceneConfig {
        model: Some(ModelConfig {
            name: "Cube".to_string(),
            path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/cube/cube.obj"),
        }),
        ..Default::default()
    }
}

/// Input a user would have produced at `frame`
fn script(scene: &mut Scene<HeadlessContext>, frame: u32) {
    match frame {
        0 => scene.set_forward_speed(20.0),
        30 => {
            scene.pan(15.0);
            scene.toggle_blinn_phong(true);
        }
        60 => {
            scene.tilt(-5.0);
            scene.toggle_wireframe(true);
            scene.toggle_aa(true);
        }
        90 => {
            scene.set_forward_speed(0.0);
            scene.toggle_fill(true);
            scene.toggle_rim_lighting(true);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| (*s).to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_defaults() {
        let options = Options::parse(args(&[])).unwrap();
        assert!(options.config.is_none());
        assert_eq!(options.frames, 120);
        assert_eq!(options.gl_version, (4, 3));
    }

    #[test]
    fn test_parse_flags_and_config() {
        let options = Options::parse(args(&["scene.toml", "--frames", "10", "--gl", "3.3"])).unwrap();
        assert_eq!(options.config, Some(PathBuf::from("scene.toml")));
        assert_eq!(options.frames, 10);
        assert_eq!(options.gl_version, (3, 3));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Options::parse(args(&["--gl", "four"])).is_err());
        assert!(Options::parse(args(&["--frames"])).is_err());
        assert!(Options::parse(args(&["--verbose"])).is_err());
    }

    #[test]
    fn test_bundled_scene_runs() {
        let mut scene: Scene<HeadlessContext> = Scene::new(bundled_config());
        scene.initialize(HeadlessContext::new()).unwrap();
        for frame in 0..100 {
            script(&mut scene, frame);
            let time = f64::from(frame) / FRAME_RATE;
            scene.update(time).unwrap();
            scene.render(time).unwrap();
        }

        assert_eq!(scene.frame_count(), 100);
        assert_eq!(scene.light_mode(), LightMode::RimLighting);
        let model = scene.model().unwrap();
        assert_eq!(model.parts().len(), 2);
        let context = scene.context().unwrap();
        assert_eq!(context.draw_calls().len(), 200);
    }

    #[test]
    fn test_old_context_reports_unsupported() {
        let mut scene: Scene<HeadlessContext> = Scene::new(SceneConfig::default());
        let result = scene.initialize(HeadlessContext::new().with_version(3, 3));
        assert!(matches!(result, Err(SceneError::UnsupportedContext { .. })));
    }
}
