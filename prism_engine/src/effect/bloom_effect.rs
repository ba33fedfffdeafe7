/// Scene mesh followed by the bloom graph

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Buffer, CommandList};
use crate::frame::{FrameTargets, RenderContext};
use crate::io::MeshDescription;
use crate::post_process::{BlendMode, BlitPassDesc, PostProcessGraph};
use crate::post_process::bloom::{self, BloomParams, BloomPipelines, BloomSettings, MAX_BLOOM_STEPS};
use crate::{engine_bail, engine_info};
use super::{
    Effect, FrameUpdate, HandleSet, ParameterChange, RebuildKind, SceneMesh, ShaderLibrary,
    uniform_buffer, unknown_parameter,
};

pub struct BloomEffect {
    library: ShaderLibrary,
    mesh: MeshDescription,
    settings: BloomSettings,
    handles: HandleSet,
    scene: Option<SceneMesh>,
    pipelines: Option<BloomPipelines>,
    params: Option<Arc<dyn Buffer>>,
    graph: PostProcessGraph,
}

impl BloomEffect {
    pub fn new(library: ShaderLibrary, mesh: MeshDescription, settings: BloomSettings) -> Self {
        Self {
            library,
            mesh,
            settings,
            handles: HandleSet::new(),
            scene: None,
            pipelines: None,
            params: None,
            graph: PostProcessGraph::new(),
        }
    }

    pub fn settings(&self) -> &BloomSettings {
        &self.settings
    }

    pub fn graph(&self) -> &PostProcessGraph {
        &self.graph
    }

    fn topology(&self, targets: &FrameTargets) -> Result<Vec<BlitPassDesc>> {
        let (Some(pipelines), Some(params)) = (&self.pipelines, &self.params) else {
            engine_bail!("prism::BloomEffect", "graph requested before setup");
        };
        Ok(bloom::plan(targets.extent(), targets.color().format(), &self.settings, pipelines, params))
    }

    fn write_params(&self) -> Result<()> {
        if let Some(params) = &self.params {
            params.update(0, BloomParams::from_settings(&self.settings).as_bytes())?;
        }
        Ok(())
    }
}

impl Effect for BloomEffect {
    fn name(&self) -> &str {
        "bloom"
    }

    fn setup(&mut self, ctx: &mut RenderContext, targets: &FrameTargets) -> Result<()> {
        self.settings.downsample_steps = self.settings.downsample_steps.clamp(1, MAX_BLOOM_STEPS);
        self.scene = Some(SceneMesh::create(ctx, &mut self.handles, &self.library, &self.mesh, None, targets)?);

        let format = targets.color().format();
        let library = &self.library;
        let handles = &mut self.handles;
        self.pipelines = Some(BloomPipelines {
            prefilter: handles.blit_pipeline(ctx, library, "bloom_prefilter.frag", format, BlendMode::Opaque, 1)?,
            downsample: handles.blit_pipeline(ctx, library, "bloom_downsample.frag", format, BlendMode::Opaque, 1)?,
            upsample: handles.blit_pipeline(ctx, library, "bloom_upsample.frag", format, BlendMode::Additive, 1)?,
            combine: handles.blit_pipeline(ctx, library, "bloom_combine.frag", format, BlendMode::Additive, 1)?,
        });
        self.params = Some(uniform_buffer(
            ctx.device(),
            BloomParams::from_settings(&self.settings).as_bytes(),
        )?);

        let topology = self.topology(targets)?;
        self.graph.build(ctx, topology, targets)?;
        engine_info!(
            "prism::BloomEffect",
            "ready: {} steps requested, {} passes",
            self.settings.downsample_steps, self.graph.pass_count()
        );
        Ok(())
    }

    fn resize(&mut self, ctx: &mut RenderContext, targets: &FrameTargets) -> Result<()> {
        let topology = self.topology(targets)?;
        self.graph.reconfigure(ctx, topology, targets)
    }

    fn update(&mut self, ctx: &RenderContext, frame: &FrameUpdate) -> Result<()> {
        match &mut self.scene {
            Some(scene) => scene.update(ctx, frame),
            None => engine_bail!("prism::BloomEffect", "update before setup"),
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
        let kind = match change.name.as_str() {
            "enabled" => {
                self.settings.enabled = change.as_bool()?;
                RebuildKind::Topology
            }
            "downsample_steps" => {
                self.settings.downsample_steps = change.as_u32_in(1, MAX_BLOOM_STEPS)?;
                RebuildKind::Topology
            }
            "use_upsampling" => {
                self.settings.use_upsampling = change.as_bool()?;
                RebuildKind::Topology
            }
            "box_filter" => {
                self.settings.box_filter = change.as_bool()?;
                RebuildKind::Parameters
            }
            "intensity" => {
                self.settings.intensity = change.as_f32()?.max(0.0);
                RebuildKind::Parameters
            }
            "threshold" => {
                self.settings.threshold = change.as_f32()?.max(0.0);
                RebuildKind::Parameters
            }
            _ => return Err(unknown_parameter(self.name(), change)),
        };
        if kind == RebuildKind::Parameters {
            self.write_params()?;
        }
        Ok(kind)
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
#[path = "bloom_effect_tests.rs"]
mod tests;
