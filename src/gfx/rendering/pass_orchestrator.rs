//! Per-frame pass sequencing
//!
//! The orchestrator turns the frame inputs (camera parameters, the reflective
//! object's translation, the window size) into a [`FramePlan`]: the three
//! passes in their fixed order, each with the complete device state it needs.
//! No step relies on state left behind by the step before it.
//!
//! Planning is pure; the [`RenderEngine`](super::RenderEngine) executes a plan
//! against the device.

use cgmath::{Matrix4, Rad, SquareMatrix, Vector3};

use crate::{
    config::ViewerConfig,
    gfx::{
        camera::{
            camera_controller::{camera_world_position, view_matrix, CameraParams},
            camera_utils::{camera_projection, cube_face_projection},
        },
        resources::global_bindings::{LightRig, ViewUniform},
        scene::{DrawMode, SceneRole},
    },
};

/// View slot of the shadow pass
pub const SHADOW_VIEW_SLOT: usize = 0;
/// First of the six cube face view slots
pub const CUBE_VIEW_SLOT_BASE: usize = 1;
/// View slot of the final camera pass
pub const CAMERA_VIEW_SLOT: usize = 7;
pub const VIEW_SLOT_COUNT: usize = 8;

pub const CUBE_FACE_COUNT: usize = 6;

/// Quarter turns about X, Y and Z for cube layers +X, -X, +Y, -Y, +Z, -Z.
/// Each layer looks along its own axis with the orientation cube sampling
/// expects, so a lookup along direction `d` reads what lies toward `d`.
const CUBE_FACE_TURNS: [[f32; 3]; CUBE_FACE_COUNT] = [
    [2.0, 3.0, 0.0],
    [2.0, 1.0, 0.0],
    [-1.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 2.0, 2.0],
    [0.0, 0.0, 2.0],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Shadow,
    EnvironmentCapture,
    Final,
}

impl PassKind {
    /// Execution order inside one frame
    pub const ORDER: [PassKind; 3] = [
        PassKind::Shadow,
        PassKind::EnvironmentCapture,
        PassKind::Final,
    ];

    /// Faces culled while this pass draws. The shadow pass culls front faces
    /// against peter-panning on thin geometry. Planned steps and the pass
    /// pipelines both read it from here.
    pub fn cull(self) -> CullFace {
        match self {
            PassKind::Shadow => CullFace::Front,
            PassKind::EnvironmentCapture | PassKind::Final => CullFace::Back,
        }
    }

    /// The pass that follows `self`; `Final` wraps to the next frame's shadow pass
    pub fn next(self) -> PassKind {
        match self {
            PassKind::Shadow => PassKind::EnvironmentCapture,
            PassKind::EnvironmentCapture => PassKind::Final,
            PassKind::Final => PassKind::Shadow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    ShadowMap,
    /// Cube layer in +X, -X, +Y, -Y, +Z, -Z order
    CubeFace(u8),
    Surface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullFace {
    Front,
    Back,
}

impl From<CullFace> for wgpu::Face {
    fn from(face: CullFace) -> Self {
        match face {
            CullFace::Front => wgpu::Face::Front,
            CullFace::Back => wgpu::Face::Back,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// What a step clears before drawing. `None` keeps the attachment's content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearOps {
    pub color: Option<[f64; 4]>,
    pub depth: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub scene: SceneRole,
    pub mode: DrawMode,
}

/// One render pass with its full device state
#[derive(Debug, Clone, PartialEq)]
pub struct PassStep {
    pub kind: PassKind,
    pub target: RenderTarget,
    pub viewport: Viewport,
    pub cull: CullFace,
    pub clear: ClearOps,
    pub view_slot: usize,
    pub view: ViewUniform,
    /// Scene graphs in draw order
    pub draws: Vec<DrawCall>,
}

impl PassStep {
    pub fn draws_scene(&self, scene: SceneRole) -> bool {
        self.draws.iter().any(|draw| draw.scene == scene)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub steps: Vec<PassStep>,
}

impl FramePlan {
    pub fn steps_of(&self, kind: PassKind) -> impl Iterator<Item = &PassStep> {
        self.steps.iter().filter(move |step| step.kind == kind)
    }
}

/// Values that change between frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    pub camera: CameraParams,
    /// Current translation of the reflective object, the cube capture centre
    pub reflective_translation: Vector3<f32>,
}

/// View matrix of cube layer `face` centred on `center`
pub fn cube_face_view(face: usize, center: Vector3<f32>) -> Matrix4<f32> {
    let [x, y, z] = CUBE_FACE_TURNS[face % CUBE_FACE_COUNT];
    let quarter = std::f32::consts::FRAC_PI_2;

    Matrix4::from_angle_x(Rad(x * quarter))
        * Matrix4::from_angle_y(Rad(y * quarter))
        * Matrix4::from_angle_z(Rad(z * quarter))
        * Matrix4::from_translation(-center)
}

/// Sequences shadow, environment capture and final passes every frame
#[derive(Debug, Clone)]
pub struct PassOrchestrator {
    lights: LightRig,
    shadow_resolution: u32,
    cubemap_resolution: u32,
    near: f32,
    far: f32,
    fov_y: f32,
    clear_color: [f64; 4],
    window_width: u32,
    window_height: u32,
}

impl PassOrchestrator {
    pub fn new(config: &ViewerConfig, lights: LightRig) -> Self {
        Self {
            lights,
            shadow_resolution: config.shadow_map_resolution,
            cubemap_resolution: config.cubemap_resolution,
            near: config.near,
            far: config.far,
            fov_y: config.fov_y,
            clear_color: config.clear_color,
            window_width: config.window_width.max(1),
            window_height: config.window_height.max(1),
        }
    }

    pub fn lights(&self) -> &LightRig {
        &self.lights
    }

    /// Takes effect at the next final pass. Zero sizes (minimised window)
    /// are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.window_width = width;
        self.window_height = height;
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn plan_frame(&self, inputs: &FrameInputs) -> FramePlan {
        let shadow_transform = self.lights.shadow_transform();

        let mut steps = Vec::with_capacity(2 + CUBE_FACE_COUNT);
        for kind in PassKind::ORDER {
            match kind {
                PassKind::Shadow => steps.push(self.shadow_step(shadow_transform)),
                PassKind::EnvironmentCapture => {
                    steps.extend((0..CUBE_FACE_COUNT).map(|face| {
                        self.cube_face_step(face, inputs.reflective_translation, shadow_transform)
                    }))
                }
                PassKind::Final => steps.push(self.final_step(&inputs.camera, shadow_transform)),
            }
        }

        FramePlan { steps }
    }

    fn shadow_step(&self, shadow_transform: Matrix4<f32>) -> PassStep {
        PassStep {
            kind: PassKind::Shadow,
            target: RenderTarget::ShadowMap,
            viewport: Viewport {
                width: self.shadow_resolution,
                height: self.shadow_resolution,
            },
            cull: PassKind::Shadow.cull(),
            clear: ClearOps {
                color: None,
                depth: Some(1.0),
            },
            view_slot: SHADOW_VIEW_SLOT,
            view: ViewUniform::new(
                Matrix4::identity(),
                Matrix4::identity(),
                shadow_transform,
                Vector3::new(0.0, 0.0, 0.0),
            ),
            draws: vec![
                DrawCall {
                    scene: SceneRole::Static,
                    mode: DrawMode::DepthOnly,
                },
                DrawCall {
                    scene: SceneRole::AnimatedReflective,
                    mode: DrawMode::DepthOnly,
                },
            ],
        }
    }

    fn cube_face_step(
        &self,
        face: usize,
        center: Vector3<f32>,
        shadow_transform: Matrix4<f32>,
    ) -> PassStep {
        PassStep {
            kind: PassKind::EnvironmentCapture,
            target: RenderTarget::CubeFace(face as u8),
            viewport: Viewport {
                width: self.cubemap_resolution,
                height: self.cubemap_resolution,
            },
            cull: PassKind::EnvironmentCapture.cull(),
            clear: ClearOps {
                color: Some(self.clear_color),
                depth: Some(1.0),
            },
            view_slot: CUBE_VIEW_SLOT_BASE + face,
            view: ViewUniform::new(
                cube_face_view(face, center),
                cube_face_projection(self.near, self.far),
                shadow_transform,
                center,
            ),
            // The reflective object never sees itself
            draws: vec![DrawCall {
                scene: SceneRole::Static,
                mode: DrawMode::Shaded,
            }],
        }
    }

    fn final_step(&self, camera: &CameraParams, shadow_transform: Matrix4<f32>) -> PassStep {
        let view = view_matrix(camera);
        let projection = camera_projection(
            self.fov_y,
            self.window_width,
            self.window_height,
            self.near,
            self.far,
        );

        PassStep {
            kind: PassKind::Final,
            target: RenderTarget::Surface,
            viewport: Viewport {
                width: self.window_width,
                height: self.window_height,
            },
            cull: PassKind::Final.cull(),
            clear: ClearOps {
                color: Some(self.clear_color),
                depth: Some(1.0),
            },
            view_slot: CAMERA_VIEW_SLOT,
            view: ViewUniform::new(
                view,
                projection,
                shadow_transform,
                camera_world_position(&view),
            ),
            draws: vec![
                DrawCall {
                    scene: SceneRole::Static,
                    mode: DrawMode::Shaded,
                },
                DrawCall {
                    scene: SceneRole::AnimatedReflective,
                    mode: DrawMode::Shaded,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector4};

    fn orchestrator() -> PassOrchestrator {
        PassOrchestrator::new(&ViewerConfig::default(), LightRig::default())
    }

    fn inputs() -> FrameInputs {
        FrameInputs {
            camera: CameraParams::default(),
            reflective_translation: Vector3::new(0.02, 0.1, -0.01),
        }
    }

    #[test]
    fn test_pass_order_is_fixed() {
        let plan = orchestrator().plan_frame(&inputs());
        let kinds: Vec<PassKind> = plan.steps.iter().map(|s| s.kind).collect();

        assert_eq!(kinds.len(), 8);
        assert_eq!(kinds[0], PassKind::Shadow);
        assert!(kinds[1..7].iter().all(|k| *k == PassKind::EnvironmentCapture));
        assert_eq!(kinds[7], PassKind::Final);
    }

    #[test]
    fn test_pass_cycle_wraps() {
        let mut kind = PassKind::Shadow;
        for expected in PassKind::ORDER.iter().cycle().skip(1).take(6) {
            kind = kind.next();
            assert_eq!(kind, *expected);
        }
    }

    #[test]
    fn test_environment_capture_renders_six_faces_without_reflective_object() {
        let plan = orchestrator().plan_frame(&inputs());
        let faces: Vec<&PassStep> = plan.steps_of(PassKind::EnvironmentCapture).collect();

        assert_eq!(faces.len(), CUBE_FACE_COUNT);
        for (i, step) in faces.iter().enumerate() {
            assert_eq!(step.target, RenderTarget::CubeFace(i as u8));
            assert_eq!(step.view_slot, CUBE_VIEW_SLOT_BASE + i);
            assert!(step.draws_scene(SceneRole::Static));
            assert!(!step.draws_scene(SceneRole::AnimatedReflective));
            assert_eq!(step.cull, CullFace::Back);
            assert_eq!(step.viewport, Viewport { width: 1024, height: 1024 });
            assert!(step.clear.color.is_some() && step.clear.depth.is_some());
        }
    }

    #[test]
    fn test_shadow_pass_culls_front_and_draws_depth_only() {
        let plan = orchestrator().plan_frame(&inputs());
        let shadow = &plan.steps[0];

        assert_eq!(shadow.cull, CullFace::Front);
        assert_eq!(shadow.target, RenderTarget::ShadowMap);
        assert_eq!(shadow.clear.color, None);
        assert_eq!(shadow.clear.depth, Some(1.0));
        assert_eq!(shadow.viewport.width, 4096);
        assert_eq!(shadow.draws.len(), 2);
        assert!(shadow.draws.iter().all(|d| d.mode == DrawMode::DepthOnly));
    }

    #[test]
    fn test_final_pass_draws_static_then_reflective() {
        let plan = orchestrator().plan_frame(&inputs());
        let last = plan.steps.last().unwrap();

        assert_eq!(last.target, RenderTarget::Surface);
        assert_eq!(last.view_slot, CAMERA_VIEW_SLOT);
        let scenes: Vec<SceneRole> = last.draws.iter().map(|d| d.scene).collect();
        assert_eq!(scenes, vec![SceneRole::Static, SceneRole::AnimatedReflective]);
    }

    #[test]
    fn test_view_slots_are_distinct() {
        let plan = orchestrator().plan_frame(&inputs());
        let mut slots: Vec<usize> = plan.steps.iter().map(|s| s.view_slot).collect();
        slots.sort_unstable();
        slots.dedup();
        assert_eq!(slots.len(), VIEW_SLOT_COUNT);
        assert!(slots.iter().all(|s| *s < VIEW_SLOT_COUNT));
    }

    #[test]
    fn test_resize_takes_effect_in_final_pass_only() {
        let mut orchestrator = orchestrator();
        orchestrator.resize(1920, 1080);
        orchestrator.resize(0, 500);
        assert_eq!(orchestrator.window_size(), (1920, 1080));

        let plan = orchestrator.plan_frame(&inputs());
        let last = plan.steps.last().unwrap();
        assert_eq!(last.viewport, Viewport { width: 1920, height: 1080 });
        assert_eq!(plan.steps[1].viewport.width, 1024);
    }

    #[test]
    fn test_cube_faces_are_centred_on_reflective_object() {
        let center = Vector3::new(0.03, 0.11, -0.02);
        for face in 0..CUBE_FACE_COUNT {
            let view = cube_face_view(face, center);
            let eye = view.invert().unwrap() * Vector4::new(0.0, 0.0, 0.0, 1.0);
            assert!((eye.truncate() - center).magnitude() < 1e-5);
        }
    }

    /// Layer and texel coordinates a cube lookup along `d` resolves to
    fn cube_lookup(d: Vector3<f32>) -> (usize, f32, f32) {
        let (ax, ay, az) = (d.x.abs(), d.y.abs(), d.z.abs());
        let (layer, sc, tc, ma) = if ax >= ay && ax >= az {
            if d.x > 0.0 {
                (0, -d.z, -d.y, ax)
            } else {
                (1, d.z, -d.y, ax)
            }
        } else if ay >= az {
            if d.y > 0.0 {
                (2, d.x, d.z, ay)
            } else {
                (3, d.x, -d.z, ay)
            }
        } else if d.z > 0.0 {
            (4, d.x, -d.y, az)
        } else {
            (5, -d.x, -d.y, az)
        };
        (layer, (sc / ma + 1.0) * 0.5, (tc / ma + 1.0) * 0.5)
    }

    #[test]
    fn test_cube_faces_render_what_lookups_sample() {
        let center = Vector3::new(0.02, 0.1, -0.01);
        let projection = cube_face_projection(0.01, 10.0);
        let directions = [
            Vector3::new(1.0, 0.2, 0.3),
            Vector3::new(-1.0, 0.2, 0.3),
            Vector3::new(0.3, 1.0, -0.2),
            Vector3::new(0.3, -1.0, -0.2),
            Vector3::new(-0.4, 0.1, 1.0),
            Vector3::new(-0.4, 0.1, -1.0),
        ];

        for (expected_layer, d) in directions.iter().enumerate() {
            let (layer, u, v) = cube_lookup(*d);
            assert_eq!(layer, expected_layer);

            let world = (center + *d * 0.5).extend(1.0);
            let clip = projection * cube_face_view(layer, center) * world;
            assert!(clip.w > 0.0, "layer {} renders {:?} behind its camera", layer, d);

            let ndc_x = clip.x / clip.w;
            let ndc_y = clip.y / clip.w;
            let (tex_u, tex_v) = ((ndc_x + 1.0) * 0.5, (1.0 - ndc_y) * 0.5);
            assert!((tex_u - u).abs() < 1e-4, "layer {}: u {} != {}", layer, tex_u, u);
            assert!((tex_v - v).abs() < 1e-4, "layer {}: v {} != {}", layer, tex_v, v);
        }
    }

    #[test]
    fn test_planned_culling_matches_pass_kind() {
        let plan = orchestrator().plan_frame(&inputs());
        for step in &plan.steps {
            assert_eq!(step.cull, step.kind.cull());
        }
        assert_eq!(PassKind::Shadow.cull(), CullFace::Front);
        assert_eq!(PassKind::EnvironmentCapture.cull(), CullFace::Back);
        assert_eq!(PassKind::Final.cull(), CullFace::Back);
    }

    #[test]
    fn test_cube_faces_cover_every_axis() {
        let mut directions: Vec<[i32; 3]> = (0..CUBE_FACE_COUNT)
            .map(|face| {
                let inverse = cube_face_view(face, Vector3::new(0.0, 0.0, 0.0)).invert().unwrap();
                let forward = inverse * Vector4::new(0.0, 0.0, -1.0, 0.0);
                [
                    forward.x.round() as i32,
                    forward.y.round() as i32,
                    forward.z.round() as i32,
                ]
            })
            .collect();
        directions.sort_unstable();
        directions.dedup();
        assert_eq!(directions.len(), CUBE_FACE_COUNT);
    }
}
