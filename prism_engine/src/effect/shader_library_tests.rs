use super::*;
use std::sync::Arc;
use crate::effect::test_support::{Harness, ShaderDir};

fn render_pass_creates(harness: &Harness) -> usize {
    harness.device.count("render_pass#")
}

#[test]
fn test_source_path_under_root() {
    let library = ShaderLibrary::new("/shaders");
    let source = library.source(ShaderStage::Fragment, "bloom_combine.frag");
    assert_eq!(source, ShaderSource::new(ShaderStage::Fragment, "/shaders/bloom_combine.frag.spv"));
}

#[test]
fn test_repeated_blit_pipeline_reuses_render_pass() {
    let shaders = ShaderDir::new("blit_reuse");
    let library = shaders.library();
    let mut harness = Harness::new(64, 64);
    let mut handles = HandleSet::new();
    harness.device.clear_journal();

    let format = TextureFormat::R16G16B16A16_SFLOAT;
    let first = handles.blit_pipeline(&mut harness.ctx, &library, "bloom_prefilter.frag", format, BlendMode::Opaque, 1).unwrap();
    let again = handles.blit_pipeline(&mut harness.ctx, &library, "bloom_prefilter.frag", format, BlendMode::Opaque, 1).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(render_pass_creates(&harness), 1);

    // another shader into the same output shares the pass
    handles.blit_pipeline(&mut harness.ctx, &library, "bloom_downsample.frag", format, BlendMode::Opaque, 1).unwrap();
    assert_eq!(render_pass_creates(&harness), 1);

    handles.blit_pipeline(&mut harness.ctx, &library, "bloom_upsample.frag", format, BlendMode::Additive, 1).unwrap();
    assert_eq!(render_pass_creates(&harness), 2);

    handles.release(&mut harness.ctx.caches);
    assert!(handles.is_empty());
}

#[test]
fn test_release_returns_every_handle() {
    let shaders = ShaderDir::new("blit_release");
    let library = shaders.library();
    let mut harness = Harness::new(64, 64);
    let mut handles = HandleSet::new();

    handles.blit_pipeline(&mut harness.ctx, &library, "dof_coc.frag", TextureFormat::R16G16B16A16_SFLOAT, BlendMode::Opaque, 1).unwrap();
    assert_eq!(handles.len(), 2);

    handles.release(&mut harness.ctx.caches);
    let (programs, pipelines, _) = harness.ctx.caches.stats();
    assert_eq!(programs.entries + pipelines.entries, 0);
}
