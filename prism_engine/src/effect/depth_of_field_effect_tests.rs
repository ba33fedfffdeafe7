use super::*;
use crate::error::Error;
use crate::effect::test_support::{Harness, ShaderDir, quad};

fn dof(shaders: &ShaderDir) -> DepthOfFieldEffect {
    DepthOfFieldEffect::new(shaders.library(), quad(None), DofSettings::default())
}

#[test]
fn test_setup_builds_six_passes() {
    let shaders = ShaderDir::new("dof_setup");
    let mut harness = Harness::new(800, 600);
    let mut effect = dof(&shaders);

    harness.setup(&mut effect).unwrap();
    assert_eq!(effect.graph().pass_count(), 6);
    assert_eq!(effect.graph().image_count(), 5);
    assert_eq!(harness.frame(&mut effect, 0), (1, 6));
    assert_eq!(harness.shutdown(&mut effect), 0);
}

#[test]
fn test_coc_stage_uses_single_channel_format() {
    let shaders = ShaderDir::new("dof_coc_format");
    let mut harness = Harness::new(800, 600);
    let mut effect = dof(&shaders);
    harness.setup(&mut effect).unwrap();

    assert_eq!(harness.device.count(&format!(":create 800x600 {:?}", COC_FORMAT)), 1);
    harness.shutdown(&mut effect);
}

#[test]
fn test_focus_parameters_rewrite_params() {
    let shaders = ShaderDir::new("dof_focus");
    let mut harness = Harness::new(800, 600);
    let mut effect = dof(&shaders);
    harness.setup(&mut effect).unwrap();
    harness.device.clear_journal();

    for (name, value) in [("focus_distance", 25.0f32), ("focus_range", 2.0), ("bokeh_radius", 6.0)] {
        let kind = effect.apply_parameter(&mut harness.ctx, &ParameterChange::new(name, value)).unwrap();
        assert_eq!(kind, RebuildKind::Parameters);
    }
    assert_eq!(harness.device.count(":update 32"), 3);
    assert_eq!(effect.settings().focus_distance, 25.0);
    assert_eq!(effect.settings().focus_range, 2.0);
    assert_eq!(effect.settings().bokeh_radius, 6.0);
    harness.shutdown(&mut effect);
}

#[test]
fn test_debug_view_selection() {
    let shaders = ShaderDir::new("dof_debug");
    let mut harness = Harness::new(320, 240);
    let mut effect = dof(&shaders);
    harness.setup(&mut effect).unwrap();

    effect.apply_parameter(&mut harness.ctx, &ParameterChange::new("debug_view", 2u32)).unwrap();
    assert_eq!(effect.settings().debug_view, DofDebugView::Bokeh);
    effect.apply_parameter(&mut harness.ctx, &ParameterChange::new("debug_view", 1u32)).unwrap();
    assert_eq!(effect.settings().debug_view, DofDebugView::CircleOfConfusion);

    let result = effect.apply_parameter(&mut harness.ctx, &ParameterChange::new("debug_view", 3u32));
    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert_eq!(effect.settings().debug_view, DofDebugView::CircleOfConfusion);
    harness.shutdown(&mut effect);
}

#[test]
fn test_non_positive_focus_rejected() {
    let shaders = ShaderDir::new("dof_negative");
    let mut harness = Harness::new(320, 240);
    let mut effect = dof(&shaders);
    harness.setup(&mut effect).unwrap();
    let before = *effect.settings();

    for value in [0.0f32, -1.0] {
        let result = effect.apply_parameter(&mut harness.ctx, &ParameterChange::new("focus_distance", value));
        assert!(matches!(result, Err(Error::InvalidResource(_))));
    }
    assert!(effect.apply_parameter(&mut harness.ctx, &ParameterChange::new("aperture", 1.0f32)).is_err());
    assert_eq!(*effect.settings(), before);
    harness.shutdown(&mut effect);
}

#[test]
fn test_resize_rebuilds_half_resolution_stages() {
    let shaders = ShaderDir::new("dof_resize");
    let mut harness = Harness::new(800, 600);
    let mut effect = dof(&shaders);
    harness.setup(&mut effect).unwrap();
    let generation = effect.graph().generation();
    harness.device.clear_journal();

    harness.resize(&mut effect, 1024, 768).unwrap();
    assert_eq!(effect.graph().generation(), generation + 1);
    assert_eq!(harness.device.count(":update 32"), 1);

    harness.device.clear_journal();
    harness.frame(&mut effect, 0);
    assert_eq!(harness.device.count("begin_render_pass 512x384"), 2);
    harness.shutdown(&mut effect);
}
