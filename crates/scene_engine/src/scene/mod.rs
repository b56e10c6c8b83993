//! Scene orchestration
//!
//! The [`Scene`] owns the camera, the light, the active model and the
//! resource managers, and drives one forward pass per frame:
//!
//! 1. [`Scene::initialize`] checks the context, links the program, sets GPU
//!    defaults and builds the managers (model, material, texture, mesh).
//! 2. [`Scene::update`] integrates camera velocity and applies pending
//!    pan/tilt input.
//! 3. [`Scene::render`] selects the lighting subroutine, uploads the
//!    matrices, draws the model and uploads the light.
//!
//! Everything that touches the GPU lives in one `GpuState` created at the
//! end of a successful `initialize`, so a failed initialization leaves the
//! scene exactly as it was.

mod error;


pub use error::SceneError;

use std::path::Path;
use std::sync::Arc;

use crate::assets::{
    MaterialManager, MeshManager, Model, ModelLoader, ModelManager, ModelSources, ObjModelLoader,
    TextureManager,
};
use crate::config::{
    CameraConfig, Config, LightConfig, LightKindConfig, ProjectionConfig, SceneConfig, ShaderConfig,
};
use crate::foundation::math::{Transform, Vec3};
use crate::render::gpu::{
    Capability, ClearBuffers, DepthFunc, GlVersion, PolygonMode, ProgramHandle, ShaderStage,
    UniformValue,
};
use crate::render::light::LIGHT_BLOCK;
use crate::render::{
    Camera, CameraTranslation, GpuContext, Light, LightBlock, LightUniformData, Projection,
    RasterState, TextureUnit,
};

/// Lighting model selected in the fragment stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LightMode {
    /// Per-fragment Phong
    #[default]
    PerFragmentPhong,
    /// Per-fragment Blinn-Phong
    PerFragmentBlinnPhong,
    /// Rim lighting
    RimLighting,
}

/// Passed to frame observers after every rendered frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Frames rendered so far, this one included
    pub frame: u64,
    /// Time passed to [`Scene::render`]
    pub time: f64,
}

type FrameObserver = Box<dyn FnMut(&FrameInfo)>;

/// Fragment subroutine index of each light mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LightModeSubroutines {
    phong: u32,
    blinn_phong: u32,
    rim_lighting: u32,
}

impl LightModeSubroutines {
    fn resolve<C: GpuContext + ?Sized>(
        context: &C,
        program: ProgramHandle,
        shaders: &ShaderConfig,
    ) -> Result<Self, SceneError> {
        let find = |name: &str| {
            context
                .subroutine_index(program, ShaderStage::Fragment, name)
                .ok_or_else(|| SceneError::MissingSubroutine {
                    name: name.to_string(),
                })
        };

        Ok(Self {
            phong: find(&shaders.phong_subroutine)?,
            blinn_phong: find(&shaders.blinn_phong_subroutine)?,
            rim_lighting: find(&shaders.rim_lighting_subroutine)?,
        })
    }

    fn index(self, mode: LightMode) -> u32 {
        match mode {
            LightMode::PerFragmentPhong => self.phong,
            LightMode::PerFragmentBlinnPhong => self.blinn_phong,
            LightMode::RimLighting => self.rim_lighting,
        }
    }
}

/// Everything created by `initialize`
struct GpuState<C> {
    context: C,
    program: ProgramHandle,
    subroutines: LightModeSubroutines,
    light_block: LightBlock,
    model_manager: Arc<ModelManager>,
    material_manager: Arc<MaterialManager>,
    texture_manager: Arc<TextureManager>,
    mesh_manager: Arc<MeshManager>,
    model: Option<Arc<Model>>,
}

/// Single-model forward-rendered scene
pub struct Scene<C: GpuContext> {
    config: SceneConfig,
    loader: Arc<dyn ModelLoader>,
    camera: Camera,
    light: Light,
    object: Transform,
    raster: RasterState,
    light_mode: LightMode,
    velocity: Vec3,
    pan_angle: f32,
    tilt_angle: f32,
    view_center_fixed: bool,
    time: f64,
    frame_count: u64,
    observers: Vec<FrameObserver>,
    gpu: Option<GpuState<C>>,
}

impl<C: GpuContext> Scene<C> {
    /// Create a scene that reads models as Wavefront OBJ
    pub fn new(config: SceneConfig) -> Self {
        Self::with_loader(config, Arc::new(ObjModelLoader::new()))
    }

    /// Create a scene with a custom model loader
    pub fn with_loader(config: SceneConfig, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            camera: camera_from_config(&config.camera),
            light: light_from_config(&config.light),
            config,
            loader,
            object: Transform::identity(),
            raster: RasterState::default(),
            light_mode: LightMode::default(),
            velocity: Vec3::zeros(),
            pan_angle: 0.0,
            tilt_angle: 0.0,
            view_center_fixed: false,
            time: 0.0,
            frame_count: 0,
            observers: Vec::new(),
            gpu: None,
        }
    }

    /// Create a scene from a validated TOML or RON configuration file
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let config = SceneConfig::load_from_file(path)?;
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Create GPU resources and load the configured model
    ///
    /// Nothing is committed to the scene unless every step succeeds.
    pub fn initialize(&mut self, mut context: C) -> Result<(), SceneError> {
        if self.gpu.is_some() {
            return Err(SceneError::AlreadyInitialized);
        }
        self.config.validate()?;

        let found = context.version();
        if found < GlVersion::MINIMUM {
            log::error!("Requires OpenGL >= {} (context provides {})", GlVersion::MINIMUM, found);
            return Err(SceneError::UnsupportedContext {
                required: GlVersion::MINIMUM,
                found,
            });
        }

        let shaders = &self.config.shaders;
        let program = context.create_program(&shaders.vertex, &shaders.fragment)?;

        context.clear_color(self.config.clear_color);
        context.set_capability(Capability::DepthTest, true);
        context.depth_func(DepthFunc::LessEqual);
        context.set_capability(Capability::CullFace, true);
        self.raster.apply(&mut context);

        context.use_program(program)?;
        for unit in [TextureUnit::Color, TextureUnit::Normal] {
            #[allow(clippy::cast_possible_wrap)]
            let index = unit.index() as i32;
            context.set_uniform(program, unit.sampler_name(), UniformValue::Int(index))?;
        }

        let subroutines = LightModeSubroutines::resolve(&context, program, shaders)?;

        let block = context
            .uniform_block(program, LIGHT_BLOCK)
            .ok_or(SceneError::MissingUniformBlock { block: LIGHT_BLOCK })?;
        let required = std::mem::size_of::<LightUniformData>();
        if block.size < required {
            return Err(SceneError::LightBlockTooSmall {
                required,
                found: block.size,
            });
        }
        let light_block = LightBlock::create(&mut context, block.binding)?;
        let light = light_from_config(&self.config.light);

        let model_manager = Arc::new(ModelManager::new(Arc::clone(&self.loader)));
        let material_manager = Arc::new(MaterialManager::new(program));
        let texture_manager = Arc::new(TextureManager::new());
        let mesh_manager = Arc::new(MeshManager::new());

        let model = match &self.config.model {
            Some(initial) => {
                let sources = ModelSources {
                    meshes: &mesh_manager,
                    materials: &material_manager,
                    textures: &texture_manager,
                };
                Some(model_manager.load_model(&mut context, &initial.name, &initial.path, sources)?)
            }
            None => None,
        };

        self.light = light;
        self.gpu = Some(GpuState {
            context,
            program,
            subroutines,
            light_block,
            model_manager,
            material_manager,
            texture_manager,
            mesh_manager,
            model,
        });

        log::info!("Scene initialized (OpenGL {}, program {:?})", found, program);
        Ok(())
    }

    /// Advance the camera to `elapsed_seconds`
    ///
    /// Velocity is integrated over the time since the previous update, then
    /// pending pan (about world Y) and tilt (about the camera right axis) are
    /// applied once and cleared.
    pub fn update(&mut self, elapsed_seconds: f64) -> Result<(), SceneError> {
        if self.gpu.is_none() {
            return Err(SceneError::NotInitialized);
        }

        #[allow(clippy::cast_possible_truncation)]
        let dt = (elapsed_seconds - self.time) as f32;
        self.time = elapsed_seconds;

        let option = if self.view_center_fixed {
            CameraTranslation::DontTranslateViewCenter
        } else {
            CameraTranslation::TranslateViewCenter
        };
        self.camera
            .translate(self.velocity * dt * self.config.meters_to_units, option);

        if !is_fuzzy_zero(self.pan_angle) {
            self.camera.pan(self.pan_angle, Vec3::y());
            self.pan_angle = 0.0;
        }
        if !is_fuzzy_zero(self.tilt_angle) {
            self.camera.tilt(self.tilt_angle);
            self.tilt_angle = 0.0;
        }

        Ok(())
    }

    /// Draw one frame and notify frame observers
    pub fn render(&mut self, current_time: f64) -> Result<(), SceneError> {
        let gpu = self.gpu.as_mut().ok_or(SceneError::NotInitialized)?;
        let context = &mut gpu.context;

        context.clear(ClearBuffers::COLOR | ClearBuffers::DEPTH);
        // Subroutine selection is per-program state, so bind first
        context.use_program(gpu.program)?;
        context.select_subroutines(ShaderStage::Fragment, &[gpu.subroutines.index(self.light_mode)]);
        context.set_uniform(gpu.program, "modelMatrix", UniformValue::Mat4(self.object.to_matrix()))?;
        context.set_uniform(
            gpu.program,
            "viewProjectionMatrix",
            UniformValue::Mat4(self.camera.view_projection_matrix()),
        )?;

        if let Some(model) = &gpu.model {
            model.render(context, &self.raster)?;
        }

        self.light.set_position(self.camera.position());
        self.light.aim_at(self.camera.view_center());
        self.light.render(context, &gpu.light_block)?;

        self.frame_count += 1;
        let info = FrameInfo {
            frame: self.frame_count,
            time: current_time,
        };
        for observer in &mut self.observers {
            observer(&info);
        }

        log::trace!("Rendered frame {} at t = {:.3}", info.frame, current_time);
        Ok(())
    }

    /// Apply a new surface size
    ///
    /// The projection keeps its type; a zero height is treated as 1.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SceneError> {
        let gpu = self.gpu.as_mut().ok_or(SceneError::NotInitialized)?;
        let height = height.max(1);
        gpu.context.viewport(0, 0, width, height);
        self.camera.set_viewport_size(width, height);
        Ok(())
    }

    /// Switch the active model, loading it on first use
    ///
    /// On error the previous model stays active.
    pub fn load_model(&mut self, name: &str, path: impl AsRef<Path>) -> Result<Arc<Model>, SceneError> {
        let gpu = self.gpu.as_mut().ok_or(SceneError::NotInitialized)?;
        let sources = ModelSources {
            meshes: &gpu.mesh_manager,
            materials: &gpu.material_manager,
            textures: &gpu.texture_manager,
        };
        let model = gpu
            .model_manager
            .load_model(&mut gpu.context, name, path, sources)?;

        log::info!("Active model: '{}'", model.name());
        gpu.model = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Register a callback run after every rendered frame
    pub fn on_frame_rendered(&mut self, observer: impl FnMut(&FrameInfo) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Fill polygons (culling on); `false` is ignored
    pub fn toggle_fill(&mut self, state: bool) {
        if state {
            self.set_polygon_mode(PolygonMode::Fill);
        }
    }

    /// Draw polygon edges (culling off); `false` is ignored
    pub fn toggle_wireframe(&mut self, state: bool) {
        if state {
            self.set_polygon_mode(PolygonMode::Line);
        }
    }

    /// Draw polygon vertices (culling off); `false` is ignored
    pub fn toggle_points(&mut self, state: bool) {
        if state {
            self.set_polygon_mode(PolygonMode::Point);
        }
    }

    /// Select Phong shading; `false` is ignored
    pub fn toggle_phong(&mut self, state: bool) {
        if state {
            self.light_mode = LightMode::PerFragmentPhong;
        }
    }

    /// Select Blinn-Phong shading; `false` is ignored
    pub fn toggle_blinn_phong(&mut self, state: bool) {
        if state {
            self.light_mode = LightMode::PerFragmentBlinnPhong;
        }
    }

    /// Select rim lighting; `false` is ignored
    pub fn toggle_rim_lighting(&mut self, state: bool) {
        if state {
            self.light_mode = LightMode::RimLighting;
        }
    }

    /// Enable or disable multisampling
    pub fn toggle_aa(&mut self, state: bool) {
        self.raster.multisample = state;
        self.apply_raster_state();
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.raster.select_polygon_mode(mode);
        self.apply_raster_state();
    }

    fn apply_raster_state(&mut self) {
        if let Some(gpu) = self.gpu.as_mut() {
            self.raster.apply(&mut gpu.context);
        }
    }

    /// Camera velocity along its right axis (m/s)
    pub fn set_side_speed(&mut self, speed: f32) {
        self.velocity.x = speed;
    }

    /// Camera velocity along its up axis (m/s)
    pub fn set_vertical_speed(&mut self, speed: f32) {
        self.velocity.y = speed;
    }

    /// Camera velocity along its view direction (m/s)
    pub fn set_forward_speed(&mut self, speed: f32) {
        self.velocity.z = speed;
    }

    /// Camera velocity in local axes (m/s)
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    /// Keep the view center in place while the camera moves
    pub fn set_view_center_fixed(&mut self, fixed: bool) {
        self.view_center_fixed = fixed;
    }

    /// Queue a pan (degrees) for the next update
    pub fn pan(&mut self, angle: f32) {
        self.pan_angle = angle;
    }

    /// Queue a tilt (degrees) for the next update
    pub fn tilt(&mut self, angle: f32) {
        self.tilt_angle = angle;
    }

    /// Camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Scene light
    pub fn light(&self) -> &Light {
        &self.light
    }

    /// Model transform
    pub fn object(&self) -> &Transform {
        &self.object
    }

    /// Mutable model transform
    pub fn object_mut(&mut self) -> &mut Transform {
        &mut self.object
    }

    /// Active model
    pub fn model(&self) -> Option<&Arc<Model>> {
        self.gpu.as_ref().and_then(|gpu| gpu.model.as_ref())
    }

    /// Active lighting model
    pub fn light_mode(&self) -> LightMode {
        self.light_mode
    }

    /// Rasterizer state
    pub fn raster_state(&self) -> &RasterState {
        &self.raster
    }

    /// Configuration the scene was built from
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// GPU context, once initialized
    pub fn context(&self) -> Option<&C> {
        self.gpu.as_ref().map(|gpu| &gpu.context)
    }

    /// Mutable GPU context, once initialized
    pub fn context_mut(&mut self) -> Option<&mut C> {
        self.gpu.as_mut().map(|gpu| &mut gpu.context)
    }

    /// Whether `initialize` has succeeded
    pub fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    /// Frames rendered so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Mesh manager, once initialized
    pub fn mesh_manager(&self) -> Option<Arc<MeshManager>> {
        self.gpu.as_ref().map(|gpu| Arc::clone(&gpu.mesh_manager))
    }

    /// Texture manager, once initialized
    pub fn texture_manager(&self) -> Option<Arc<TextureManager>> {
        self.gpu.as_ref().map(|gpu| Arc::clone(&gpu.texture_manager))
    }

    /// Material manager, once initialized
    pub fn material_manager(&self) -> Option<Arc<MaterialManager>> {
        self.gpu.as_ref().map(|gpu| Arc::clone(&gpu.material_manager))
    }

    /// Model manager, once initialized
    pub fn model_manager(&self) -> Option<Arc<ModelManager>> {
        self.gpu.as_ref().map(|gpu| Arc::clone(&gpu.model_manager))
    }
}

fn is_fuzzy_zero(angle: f32) -> bool {
    angle.abs() <= 1e-5
}

fn camera_from_config(config: &CameraConfig) -> Camera {
    let projection = match config.projection {
        ProjectionConfig::Perspective { fov_degrees, aspect, near, far } => Projection::Perspective {
            fov: fov_degrees,
            aspect,
            near,
            far,
        },
        ProjectionConfig::Orthographic { left, right, bottom, top, near, far } => {
            Projection::Orthographic { left, right, bottom, top, near, far }
        }
    };

    Camera::new(
        Vec3::from(config.position),
        Vec3::from(config.view_center),
        Vec3::from(config.up),
        projection,
    )
}

fn light_from_config(config: &LightConfig) -> Light {
    let mut light = match config.kind {
        LightKindConfig::Spot => Light::spot(config.cutoff_degrees),
        LightKindConfig::Point => Light::point(),
    };
    light.set_diffuse_color(Vec3::from(config.diffuse_color));
    light.set_specular_color(Vec3::from(config.specular_color));
    light.set_linear_attenuation(config.linear_attenuation);
    light.set_intensity(config.intensity);
    light
}
