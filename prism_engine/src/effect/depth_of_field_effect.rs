/// Scene mesh followed by the depth-of-field graph

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Buffer, CommandList, Extent2D};
use crate::frame::{FrameTargets, RenderContext};
use crate::io::MeshDescription;
use crate::post_process::{BlendMode, BlitPassDesc, PostProcessGraph};
use crate::post_process::depth_of_field::{
    self, DofDebugView, DofParams, DofPipelines, DofSettings, COC_FORMAT, STAGE_SAMPLERS,
};
use crate::{engine_bail, engine_info};
use super::{
    Effect, FrameUpdate, HandleSet, ParameterChange, RebuildKind, SceneMesh, ShaderLibrary,
    uniform_buffer, unknown_parameter,
};

/// Fragment shader of each stage, in plan order
const STAGE_SHADERS: [&str; 6] = [
    "dof_coc.frag",
    "dof_combine_coc.frag",
    "dof_bokeh.frag",
    "dof_blur.frag",
    "dof_combine.frag",
    "dof_final.frag",
];

pub struct DepthOfFieldEffect {
    library: ShaderLibrary,
    mesh: MeshDescription,
    settings: DofSettings,
    handles: HandleSet,
    scene: Option<SceneMesh>,
    pipelines: Option<DofPipelines>,
    params: Option<Arc<dyn Buffer>>,
    extent: Extent2D,
    graph: PostProcessGraph,
}

impl DepthOfFieldEffect {
    pub fn new(library: ShaderLibrary, mesh: MeshDescription, settings: DofSettings) -> Self {
        Self {
            library,
            mesh,
            settings,
            handles: HandleSet::new(),
            scene: None,
            pipelines: None,
            params: None,
            extent: Extent2D::default(),
            graph: PostProcessGraph::new(),
        }
    }

    pub fn settings(&self) -> &DofSettings {
        &self.settings
    }

    pub fn graph(&self) -> &PostProcessGraph {
        &self.graph
    }

    fn topology(&self, targets: &FrameTargets) -> Result<Vec<BlitPassDesc>> {
        let (Some(pipelines), Some(params)) = (&self.pipelines, &self.params) else {
            engine_bail!("prism::DepthOfFieldEffect", "graph requested before setup");
        };
        Ok(depth_of_field::plan(targets.extent(), targets.color().format(), pipelines, params))
    }

    fn write_params(&self) -> Result<()> {
        if let Some(params) = &self.params {
            params.update(0, DofParams::new(&self.settings, self.extent).as_bytes())?;
        }
        Ok(())
    }
}

impl Effect for DepthOfFieldEffect {
    fn name(&self) -> &str {
        "depth_of_field"
    }

    fn setup(&mut self, ctx: &mut RenderContext, targets: &FrameTargets) -> Result<()> {
        self.scene = Some(SceneMesh::create(ctx, &mut self.handles, &self.library, &self.mesh, None, targets)?);

        let color = targets.color().format();
        let mut stages = Vec::with_capacity(STAGE_SHADERS.len());
        for (index, (shader, samplers)) in STAGE_SHADERS.iter().zip(STAGE_SAMPLERS).enumerate() {
            let format = if index == 0 { COC_FORMAT } else { color };
            stages.push(self.handles.blit_pipeline(ctx, &self.library, shader, format, BlendMode::Opaque, samplers)?);
        }
        let Ok([coc, combine_coc, bokeh, blur, combine, final_select]) = <[_; 6]>::try_from(stages) else {
            engine_bail!("prism::DepthOfFieldEffect", "expected one pipeline per stage");
        };
        self.pipelines = Some(DofPipelines { coc, combine_coc, bokeh, blur, combine, final_select });

        self.extent = targets.extent();
        self.params = Some(uniform_buffer(
            ctx.device(),
            DofParams::new(&self.settings, self.extent).as_bytes(),
        )?);

        let topology = self.topology(targets)?;
        self.graph.build(ctx, topology, targets)?;
        engine_info!("prism::DepthOfFieldEffect", "ready: {} passes", self.graph.pass_count());
        Ok(())
    }

    fn resize(&mut self, ctx: &mut RenderContext, targets: &FrameTargets) -> Result<()> {
        let topology = self.topology(targets)?;
        self.graph.reconfigure(ctx, topology, targets)?;
        // texel size follows the extent
        self.extent = targets.extent();
        self.write_params()
    }

    fn update(&mut self, ctx: &RenderContext, frame: &FrameUpdate) -> Result<()> {
        match &mut self.scene {
            Some(scene) => scene.update(ctx, frame),
            None => engine_bail!("prism::DepthOfFieldEffect", "update before setup"),
        }
    }

    fn record_scene(&mut self, _ctx: &RenderContext, cmd: &mut dyn CommandList, _targets: &FrameTargets) -> Result<u32> {
        match &self.scene {
            Some(scene) => scene.record(cmd),
            None => Ok(0),
        }
    }

    fn record_post(&mut self, ctx: &RenderContext, cmd: &mut dyn CommandList, targets: &FrameTargets) -> Result<u32> {
        self.graph.execute(ctx.device(), cmd, targets)
    }

    fn apply_parameter(&mut self, _ctx: &mut RenderContext, change: &ParameterChange) -> Result<RebuildKind> {
        match change.name.as_str() {
            "focus_distance" => self.settings.focus_distance = change.as_positive_f32()?,
            "focus_range" => self.settings.focus_range = change.as_positive_f32()?,
            "bokeh_radius" => self.settings.bokeh_radius = change.as_positive_f32()?,
            "debug_view" => {
                let index = change.as_u32_in(0, DofDebugView::Bokeh.index())?;
                self.settings.debug_view = DofDebugView::from_index(index).unwrap_or_default();
            }
            _ => return Err(unknown_parameter(self.name(), change)),
        }
        self.write_params()?;
        Ok(RebuildKind::Parameters)
    }

    fn shutdown(&mut self, ctx: &mut RenderContext) {
        self.graph.teardown(&mut ctx.pool);
        self.scene = None;
        self.pipelines = None;
        self.params = None;
        self.handles.release(&mut ctx.caches);
    }
}

#[cfg(test)]
#[path = "depth_of_field_effect_tests.rs"]
mod tests;
