use super::*;
use crate::graphics_device::Extent2D;
use crate::post_process::test_support::{Fixture, COLOR};

#[test]
fn test_build_acquires_stage_images_from_pool() {
    let mut fx = Fixture::new(64, 32);
    let mut graph = PostProcessGraph::new();
    let topology = fx.copy_and_add();

    fx.build(&mut graph, topology).unwrap();

    assert_eq!(graph.pass_count(), 2);
    assert_eq!(graph.image_count(), 1);
    assert_eq!(graph.generation(), 1);
    assert!(graph.passes()[1].writes_presentation());
    assert!(!graph.passes()[0].is_valid());
    // color + depth + one stage image
    assert_eq!(fx.ctx.pool.stats().allocations, 3);

    graph.teardown(&mut fx.ctx.pool);
    assert_eq!(fx.ctx.pool.stats().pooled, 1);
}

#[test]
fn test_execute_draws_one_triangle_per_pass() {
    let mut fx = Fixture::new(64, 32);
    let mut graph = PostProcessGraph::new();
    let topology = fx.copy_and_add();
    fx.build(&mut graph, topology).unwrap();

    let draws = fx.execute(&mut graph);

    assert_eq!(draws, 2);
    assert_eq!(fx.device.count(":draw 3"), 2);
    assert_eq!(fx.device.count("begin_render_pass 32x16 clears=0"), 1);
    assert_eq!(fx.device.count("begin_render_pass 64x32 clears=0"), 1);
    assert_eq!(fx.device.count("set_viewport 32x16"), 1);
    assert_eq!(fx.device.count("bind_vertex_buffer"), 0);
    assert!(graph.passes().iter().all(|pass| pass.is_valid()));

    graph.teardown(&mut fx.ctx.pool);
}

#[test]
fn test_barriers_track_layouts_across_frames() {
    let mut fx = Fixture::new(64, 32);
    let mut graph = PostProcessGraph::new();
    let topology = fx.copy_and_add();
    fx.build(&mut graph, topology).unwrap();

    fx.execute(&mut graph);
    // frame color and stage image become readable once each
    assert_eq!(fx.device.count("ColorAttachment->ShaderReadOnly"), 2);
    // first write of the stage image
    assert_eq!(fx.device.count("Undefined->ColorAttachment"), 1);
    // frame color written again by the additive pass
    assert_eq!(fx.device.count("ShaderReadOnly->ColorAttachment"), 1);

    fx.device.clear_journal();
    fx.execute(&mut graph);
    // the stage image was left readable by the previous frame
    assert_eq!(fx.device.count("Undefined->ColorAttachment"), 0);
    assert_eq!(fx.device.count("ShaderReadOnly->ColorAttachment"), 2);

    graph.teardown(&mut fx.ctx.pool);
}

#[test]
fn test_frame_color_returns_to_attachment_layout() {
    let mut fx = Fixture::new(16, 16);
    let mut graph = PostProcessGraph::new();
    let topology = vec![BlitPassDesc::new("snapshot", fx.extent(), COLOR, fx.sampled.clone()).input(PassInput::FrameColor)];
    fx.build(&mut graph, topology).unwrap();

    fx.execute(&mut graph);

    let entries = fx.device.entries();
    let last_barrier = entries.iter().rev().find(|entry| entry.contains("image_barrier")).unwrap();
    assert!(last_barrier.ends_with("ShaderReadOnly->ColorAttachment"));

    graph.teardown(&mut fx.ctx.pool);
}

#[test]
fn test_depth_is_synchronized_once_per_execute() {
    let mut fx = Fixture::new(16, 16);
    let mut graph = PostProcessGraph::new();
    let params = fx.uniform(16);
    let topology = vec![
        BlitPassDesc::new("coc", fx.extent(), COLOR, fx.depth_sampled.clone())
            .input(PassInput::Depth)
            .input(PassInput::Uniform(params.clone())),
        BlitPassDesc::new("debug", fx.extent(), COLOR, fx.depth_sampled.clone())
            .input(PassInput::Depth)
            .input(PassInput::Uniform(params))
            .target(PassTarget::Presentation),
    ];
    fx.build(&mut graph, topology).unwrap();

    fx.execute(&mut graph);

    assert_eq!(fx.device.count("DepthStencilReadOnly->DepthStencilReadOnly"), 1);
    assert_eq!(fx.device.count("create set=0 resources=2"), 2);

    graph.teardown(&mut fx.ctx.pool);
}

#[test]
fn test_binding_is_lazy_and_once_per_generation() {
    let mut fx = Fixture::new(64, 32);
    let mut graph = PostProcessGraph::new();
    let topology = fx.copy_and_add();
    fx.build(&mut graph, topology).unwrap();
    assert_eq!(fx.device.count("binding_group#"), 0);

    fx.execute(&mut graph);
    fx.execute(&mut graph);
    assert_eq!(fx.device.count("binding_group#"), 2);
    assert_eq!(fx.device.count("framebuffer#"), 2 + 2);

    let topology = fx.copy_and_add();
    fx.reconfigure(&mut graph, topology).unwrap();
    assert_eq!(graph.generation(), 2);
    assert!(!graph.passes()[0].is_valid());

    fx.execute(&mut graph);
    assert_eq!(fx.device.count("binding_group#"), 4);

    graph.teardown(&mut fx.ctx.pool);
}

#[test]
fn test_reconfigure_is_idempotent() {
    let mut fx = Fixture::new(64, 32);
    let mut graph = PostProcessGraph::new();
    let topology = fx.copy_and_add();
    fx.build(&mut graph, topology).unwrap();
    let allocations = fx.ctx.pool.stats().allocations;

    for _ in 0..2 {
        let topology = fx.copy_and_add();
        fx.reconfigure(&mut graph, topology).unwrap();
    }

    assert_eq!(fx.device.count("device:wait_idle"), 2);
    assert_eq!(graph.pass_count(), 2);
    assert_eq!(graph.image_count(), 1);
    // the stage image came back from the pool both times
    assert_eq!(fx.ctx.pool.stats().allocations, allocations);
    assert_eq!(fx.ctx.pool.stats().hits, 2);

    graph.teardown(&mut fx.ctx.pool);
}

#[test]
fn test_render_passes_shared_by_format_and_blend() {
    let mut fx = Fixture::new(64, 32);
    let mut graph = PostProcessGraph::new();
    let topology = fx.copy_and_add();
    fx.build(&mut graph, topology).unwrap();
    let created = fx.device.count("render_pass#");

    let topology = fx.copy_and_add();
    fx.reconfigure(&mut graph, topology).unwrap();

    assert_eq!(fx.device.count("render_pass#"), created);
    assert!(!Arc::ptr_eq(&graph.passes()[0].render_pass, &graph.passes()[1].render_pass));

    graph.teardown(&mut fx.ctx.pool);
}

#[test]
fn test_forward_stage_reference_is_rejected() {
    let mut fx = Fixture::new(64, 32);
    let mut graph = PostProcessGraph::new();
    let extent = fx.extent();
    let topology = vec![
        BlitPassDesc::new("ok", extent, COLOR, fx.sampled.clone()).input(PassInput::FrameColor),
        BlitPassDesc::new("bad", extent, COLOR, fx.sampled.clone()).input(PassInput::Stage(5)),
    ];

    let result = fx.build(&mut graph, topology);

    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert_eq!(graph.pass_count(), 0);
    assert_eq!(graph.image_count(), 0);
    // the stage image of the first pass went back to the pool
    assert_eq!(fx.ctx.pool.stats().pooled, 1);
}

#[test]
fn test_pass_sampling_its_own_target_is_rejected() {
    let mut fx = Fixture::new(64, 32);
    let mut graph = PostProcessGraph::new();
    let topology = vec![
        BlitPassDesc::new("loop", fx.extent(), COLOR, fx.sampled.clone())
            .input(PassInput::FrameColor)
            .target(PassTarget::Presentation),
    ];

    assert!(matches!(fx.build(&mut graph, topology), Err(Error::InvalidResource(_))));
}

#[test]
fn test_presentation_extent_must_match_frame() {
    let mut fx = Fixture::new(64, 32);
    let mut graph = PostProcessGraph::new();
    let topology = vec![
        BlitPassDesc::new("depth_view", Extent2D::new(32, 32), COLOR, fx.depth_sampled.clone())
            .input(PassInput::Depth)
            .target(PassTarget::Presentation),
    ];

    assert!(matches!(fx.build(&mut graph, topology), Err(Error::InvalidResource(_))));
}

#[test]
fn test_accumulate_target_must_match_stage() {
    let mut fx = Fixture::new(64, 32);
    let mut graph = PostProcessGraph::new();
    let topology = vec![
        BlitPassDesc::new("down", Extent2D::new(32, 16), COLOR, fx.sampled.clone()).input(PassInput::FrameColor),
        BlitPassDesc::new("down2", Extent2D::new(16, 8), COLOR, fx.sampled.clone()).input(PassInput::Stage(0)),
        BlitPassDesc::new("up", Extent2D::new(16, 8), COLOR, fx.sampled.clone())
            .input(PassInput::Stage(1))
            .target(PassTarget::Stage(0))
            .blend(BlendMode::Additive),
    ];

    assert!(matches!(fx.build(&mut graph, topology), Err(Error::InvalidResource(_))));
}

#[test]
fn test_empty_topology_records_nothing() {
    let mut fx = Fixture::new(8, 8);
    let mut graph = PostProcessGraph::new();
    fx.build(&mut graph, Vec::new()).unwrap();

    assert_eq!(fx.execute(&mut graph), 0);
    assert_eq!(fx.device.count("image_barrier"), 0);
    assert_eq!(fx.device.count("begin_render_pass"), 0);
}
