//! Integration tests for the render pipeline
//!
//! Loads pipelines from RON documents and executes them against the
//! headless device. No GPU required.
//!
//! Run with: cargo test --test pipeline_integration_tests


use fury_engine::fury::config::EngineConfig;
use fury_engine::fury::device::Command;
use fury_engine::fury::pipeline::{PassKind, PassStatus, PipelineDesc, RenderPipeline};
use fury_engine::fury::scene::{Attachment, LightDesc, MaterialLayer};
use fury_engine::fury::Error;
use fury_engine::glam::{Mat4, Vec3};
use headless_test_utils::TestFrame;

const FORWARD_PLUS: &str = r#"
(
    name: "forward_plus",
    resources: [
        (name: "history", shape: (width: 1280, height: 720, depth: 1, format: R16G16B16A16_SFLOAT, kind: Texture2D)),
    ],
    passes: [
        (
            name: "shadows",
            kind: Shadow,
            program: "shadow",
            outputs: [
                (name: "maps", target: Transient(size: Fixed(width: 1024, height: 1024), depth: 4, format: D32_SFLOAT, kind: Texture2DArray)),
            ],
        ),
        (
            name: "opaque",
            kind: Geometry,
            program: "gbuffer",
            outputs: [
                (name: "color", target: Transient(size: Viewport(scale: 1.0), depth: 1, format: R16G16B16A16_SFLOAT, kind: Texture2D)),
                (name: "depth", target: Transient(size: Viewport(scale: 1.0), depth: 1, format: D32_SFLOAT, kind: Texture2D)),
            ],
            filter: (layers: [Opaque, AlphaTest]),
        ),
        (
            name: "lights",
            kind: Lighting,
            program: "light",
            inputs: [
                (name: "color", source: Pass(pass: "opaque", output: "color")),
                (name: "shadow", source: Pass(pass: "shadows", output: "maps")),
            ],
            outputs: [
                (name: "lit", target: Resource("history")),
            ],
            blend: Additive,
        ),
        (
            name: "bloom",
            kind: PostProcess,
            program: "post",
            inputs: [
                (name: "lit", source: Resource("history")),
            ],
            outputs: [
                (name: "half", target: Transient(size: Viewport(scale: 0.5), depth: 1, format: R16G16B16A16_SFLOAT, kind: Texture2D)),
            ],
            params: {"threshold": 1.0, "intensity": 0.25},
        ),
    ],
)
"#;

fn populated_frame() -> TestFrame {
    let mut frame = TestFrame::new();
    frame.spawn_cube("crate", Vec3::ZERO, MaterialLayer::Opaque);
    frame.spawn_cube("fence", Vec3::new(4.0, 0.0, 0.0), MaterialLayer::AlphaTest);
    frame.spawn_cube("window", Vec3::new(-4.0, 0.0, 0.0), MaterialLayer::Transparent);

    let root = frame.scene.root();
    let lamp = frame.scene.spawn(root, "lamp", Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0))).unwrap();
    frame
        .scene
        .attach(lamp, Attachment::Light(LightDesc::point(Vec3::ONE, 20.0, 10.0).with_shadows()))
        .unwrap();
    frame
}

// ============================================================================
// DOCUMENT ROUND TRIP
// ============================================================================

#[test]
fn test_integration_document_executes() {
    let mut frame = populated_frame();
    let pipeline = RenderPipeline::load(PipelineDesc::from_ron(FORWARD_PLUS).unwrap(), &mut frame.pool).unwrap();

    let report = frame.run(&pipeline);

    assert!(report.is_complete(), "report: {:?}", report);
    assert_eq!(frame.commands.pass_names(), vec!["shadows", "opaque", "lights", "bloom"]);
    assert_eq!(report.pass("opaque").unwrap().draw_count, 2);
    assert_eq!(report.pass("lights").unwrap().draw_count, 1);

    let half = report.pass("bloom").unwrap().output("half").unwrap().shape.unwrap();
    assert_eq!((half.width, half.height), (640, 360));
}

#[test]
fn test_integration_file_round_trip_same_signature() {
    let mut frame = populated_frame();
    let path = std::env::temp_dir().join(format!("fury_pipeline_{}.ron", std::process::id()));

    let first = RenderPipeline::load(PipelineDesc::from_ron(FORWARD_PLUS).unwrap(), &mut frame.pool).unwrap();
    let expected = frame.run(&first).signature();
    first.save_to_file(&path).unwrap();

    let second = RenderPipeline::load_from_file(&path, &mut frame.pool).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(second.descriptor(), first.descriptor());
    assert_eq!(frame.run(&second).signature(), expected);
}

#[test]
fn test_integration_engine_config_file() {
    let path = std::env::temp_dir().join(format!("fury_engine_{}.ron", std::process::id()));
    let mut config = EngineConfig::new(PipelineDesc::from_ron(FORWARD_PLUS).unwrap());
    config.pool.memory_budget = Some(256 * 1024 * 1024);

    config.save_to_file(&path).unwrap();
    let loaded = EngineConfig::load_from_file(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded, config);
}

#[test]
fn test_integration_missing_file_is_configuration_error() {
    let mut frame = TestFrame::new();
    let result = RenderPipeline::load_from_file("/nonexistent/fury/pipeline.ron", &mut frame.pool);
    assert!(matches!(result, Err(Error::ConfigurationError(_))));
}

// ============================================================================
// FAILURE POLICY
// ============================================================================

#[test]
fn test_integration_shadow_failure_renders_unshadowed() {
    let mut frame = populated_frame();
    let pipeline = RenderPipeline::load(PipelineDesc::from_ron(FORWARD_PLUS).unwrap(), &mut frame.pool).unwrap();

    // The shadow array is the first allocation of the frame
    frame.device.lock().unwrap().fail_next_allocations(1);
    let report = frame.run(&pipeline);

    assert_eq!(report.pass("shadows").unwrap().status, PassStatus::Skipped(Error::OutOfMemory));
    assert_eq!(report.pass("opaque").unwrap().status, PassStatus::Executed);
    let lights = report.pass("lights").unwrap();
    assert_eq!(lights.status, PassStatus::Degraded);
    assert!(lights.input("color").unwrap().is_available());
    assert!(!lights.input("shadow").unwrap().is_available());
    assert_eq!(report.pass("bloom").unwrap().status, PassStatus::Executed);

    // Next frame recovers
    frame.commands.clear();
    assert!(frame.run(&pipeline).is_complete());
}

#[test]
fn test_integration_unresolved_input_fails_load() {
    let mut frame = TestFrame::new();
    let text = FORWARD_PLUS.replace(r#"output: "maps""#, r#"output: "cascades""#);
    let result = RenderPipeline::load(PipelineDesc::from_ron(&text).unwrap(), &mut frame.pool);

    assert_eq!(
        result.err(),
        Some(Error::UnresolvedName { pass: "lights".to_string(), name: "shadows.cascades".to_string() })
    );
}

#[test]
fn test_integration_pool_memory_stable_across_frames() {
    let mut frame = populated_frame();
    let pipeline = RenderPipeline::load(PipelineDesc::from_ron(FORWARD_PLUS).unwrap(), &mut frame.pool).unwrap();

    frame.run(&pipeline);
    let memory = frame.pool.memory_bytes();
    let resources = frame.pool.resource_count();

    for _ in 0..5 {
        frame.run(&pipeline);
    }
    assert_eq!(frame.pool.memory_bytes(), memory);
    assert_eq!(frame.pool.resource_count(), resources);
    assert_eq!(frame.pool.checked_out_count(), 0);
}

#[test]
fn test_integration_pass_kinds_in_signature() {
    let mut frame = populated_frame();
    let pipeline = RenderPipeline::load(PipelineDesc::from_ron(FORWARD_PLUS).unwrap(), &mut frame.pool).unwrap();
    let kinds: Vec<PassKind> = frame.run(&pipeline).signature().into_iter().map(|(kind, _, _)| kind).collect();
    assert_eq!(kinds, vec![PassKind::Shadow, PassKind::Geometry, PassKind::Lighting, PassKind::PostProcess]);
}

#[test]
fn test_integration_bloom_pushes_params_in_name_order() {
    let mut frame = populated_frame();
    let pipeline = RenderPipeline::load(PipelineDesc::from_ron(FORWARD_PLUS).unwrap(), &mut frame.pool).unwrap();
    frame.run(&pipeline);

    let mut expected = Vec::new();
    expected.extend_from_slice(&0.25f32.to_le_bytes()); // intensity
    expected.extend_from_slice(&1.0f32.to_le_bytes()); // threshold
    let push = Command::PushConstants { offset: 0, data: expected };
    assert!(frame.commands.pass_commands("bloom").contains(&&push));
}
