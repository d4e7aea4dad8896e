//! Frame planning through the public API, no device required

use atrium::{
    app::Session,
    gfx::{
        camera::HeldKeys,
        rendering::{
            pass_orchestrator::{CullFace, RenderTarget, Viewport},
            PassKind, PassOrchestrator,
        },
        resources::LightRig,
        scene::{DrawMode, SceneRole},
    },
    ViewerConfig,
};

fn orchestrator() -> PassOrchestrator {
    let config = ViewerConfig::default()
        .with_shadow_map_resolution(2048)
        .with_cubemap_resolution(256);
    PassOrchestrator::new(&config, LightRig::default())
}

#[test]
fn test_every_frame_runs_shadow_capture_final() {
    let orchestrator = orchestrator();
    let mut session = Session::default();

    for _ in 0..3 {
        session.step(&HeldKeys::default(), 1.0 / 60.0);
        let plan = orchestrator.plan_frame(&session.frame_inputs());

        let mut kinds: Vec<PassKind> = plan.steps.iter().map(|s| s.kind).collect();
        kinds.dedup();
        assert_eq!(kinds, PassKind::ORDER.to_vec());
    }
}

#[test]
fn test_environment_capture_follows_reflective_object() {
    let orchestrator = orchestrator();
    let mut session = Session::default();

    let before = orchestrator.plan_frame(&session.frame_inputs());
    session.step(&HeldKeys::default(), 0.5);
    let after = orchestrator.plan_frame(&session.frame_inputs());

    let capture_before: Vec<_> = before.steps_of(PassKind::EnvironmentCapture).collect();
    let capture_after: Vec<_> = after.steps_of(PassKind::EnvironmentCapture).collect();
    assert_eq!(capture_after.len(), 6);

    // Capture centre moved with the animation
    assert_ne!(
        capture_before[0].view.camera_position,
        capture_after[0].view.camera_position
    );
    let centre = session.frame_inputs().reflective_translation;
    assert_eq!(
        capture_after[0].view.camera_position,
        [centre.x, centre.y, centre.z, 1.0]
    );

    for step in capture_after {
        assert_eq!(step.viewport, Viewport { width: 256, height: 256 });
        assert!(!step.draws_scene(SceneRole::AnimatedReflective));
    }
}

#[test]
fn test_paused_animation_keeps_capture_centre() {
    let orchestrator = orchestrator();
    let mut session = Session::default();
    session.toggle_pause();

    let before = orchestrator.plan_frame(&session.frame_inputs());
    session.step(&HeldKeys::default(), 2.0);
    let after = orchestrator.plan_frame(&session.frame_inputs());

    assert_eq!(before.steps[1].view, after.steps[1].view);
}

#[test]
fn test_device_state_is_complete_per_step() {
    let mut orchestrator = orchestrator();
    orchestrator.resize(640, 480);
    let plan = orchestrator.plan_frame(&Session::default().frame_inputs());

    let shadow = &plan.steps[0];
    assert_eq!(shadow.target, RenderTarget::ShadowMap);
    assert_eq!(shadow.cull, CullFace::Front);
    assert_eq!(shadow.viewport, Viewport { width: 2048, height: 2048 });
    assert!(shadow.draws.iter().all(|d| d.mode == DrawMode::DepthOnly));

    let last = plan.steps.last().unwrap();
    assert_eq!(last.target, RenderTarget::Surface);
    assert_eq!(last.cull, CullFace::Back);
    assert_eq!(last.viewport, Viewport { width: 640, height: 480 });
    assert_eq!(last.clear.color, Some([0.8, 0.8, 0.9, 0.0]));
    assert!(last.draws.iter().all(|d| d.mode == DrawMode::Shaded));

    // The pass pipelines are built from the same per-kind culling
    assert!(plan.steps.iter().all(|step| step.cull == step.kind.cull()));
}
