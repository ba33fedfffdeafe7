use super::*;
use crate::post_process::PostProcessGraph;
use crate::post_process::test_support::{Fixture, COLOR};

fn pipelines(fx: &Fixture) -> DofPipelines {
    let [coc, combine_coc, bokeh, blur, combine, final_select] = STAGE_SAMPLERS.map(|samplers| fx.pipeline(samplers));
    DofPipelines { coc, combine_coc, bokeh, blur, combine, final_select }
}

#[test]
fn test_plan_has_six_stages_ending_in_frame_color() {
    let fx = Fixture::new(800, 600);
    let params = fx.uniform(32);
    let passes = plan(fx.extent(), COLOR, &pipelines(&fx), &params);

    let names: Vec<&str> = passes.iter().map(|pass| pass.name.as_str()).collect();
    assert_eq!(names, ["dof_coc", "dof_combine_coc", "dof_bokeh", "dof_blur", "dof_combine", "dof_final"]);
    assert_eq!(passes[0].format, COC_FORMAT);
    assert!(matches!(passes[0].inputs[0], PassInput::Depth));
    assert_eq!(passes[2].extent, Extent2D::new(400, 300));
    assert_eq!(passes[3].extent, Extent2D::new(400, 300));
    assert_eq!(passes[5].target, PassTarget::Presentation);
    assert!(passes[..5].iter().all(|pass| pass.target == PassTarget::Own));
}

#[test]
fn test_graph_executes_every_stage() {
    let mut fx = Fixture::new(800, 600);
    let params = fx.uniform(32);
    let passes = plan(fx.extent(), COLOR, &pipelines(&fx), &params);
    let mut graph = PostProcessGraph::new();
    fx.build(&mut graph, passes).unwrap();

    assert_eq!(graph.image_count(), 5);
    assert_eq!(fx.execute(&mut graph), 6);
    assert_eq!(fx.device.count("DepthStencilReadOnly->DepthStencilReadOnly"), 1);
    assert_eq!(fx.device.count("begin_render_pass 400x300"), 2);
    assert_eq!(fx.device.count("resources=4"), 2);

    graph.teardown(&mut fx.ctx.pool);
}

#[test]
fn test_half_extent_never_reaches_zero() {
    assert_eq!(half_extent(Extent2D::new(1, 3)), Extent2D::new(1, 1));
}

#[test]
fn test_params_carry_debug_view_and_texel_size() {
    let settings = DofSettings { debug_view: DofDebugView::Bokeh, ..Default::default() };
    let params = DofParams::new(&settings, Extent2D::new(800, 400));

    assert_eq!(params.as_bytes().len(), 32);
    assert_eq!(params.debug_view, 2);
    assert_eq!(params.texel_size, [1.0 / 800.0, 1.0 / 400.0]);
    assert_eq!(DofDebugView::from_index(params.debug_view), Some(DofDebugView::Bokeh));
    assert_eq!(DofDebugView::from_index(7), None);
}
