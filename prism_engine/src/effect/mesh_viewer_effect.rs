/// External mesh with its diffuse texture, passthrough post-process

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use crate::error::Result;
use crate::graphics_device::{Buffer, CommandList, Pipeline};
use crate::frame::{FrameTargets, RenderContext};
use crate::io::{ImageLoader, MeshDescription};
use crate::post_process::{BlendMode, BlitPassDesc, PostProcessGraph};
use crate::post_process::passthrough::{self, PassthroughMode};
use crate::{engine_bail, engine_info};
use super::{
    Effect, FrameUpdate, HandleSet, ParameterChange, RebuildKind, SceneMesh, ShaderLibrary,
    uniform_buffer, unknown_parameter,
};

/// Depth linearization range of the depth view
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DepthViewParams {
    pub near: f32,
    pub far: f32,
    pub _pad: [f32; 2],
}

impl Default for DepthViewParams {
    fn default() -> Self {
        Self { near: 0.1, far: 100.0, _pad: [0.0; 2] }
    }
}

pub struct MeshViewerEffect {
    library: ShaderLibrary,
    mesh: MeshDescription,
    loader: Box<dyn ImageLoader>,
    mode: PassthroughMode,
    depth_view: DepthViewParams,
    handles: HandleSet,
    scene: Option<SceneMesh>,
    pipeline: Option<Arc<dyn Pipeline>>,
    params: Option<Arc<dyn Buffer>>,
    graph: PostProcessGraph,
}

impl MeshViewerEffect {
    pub fn new(library: ShaderLibrary, mesh: MeshDescription, loader: Box<dyn ImageLoader>) -> Self {
        Self {
            library,
            mesh,
            loader,
            mode: PassthroughMode::Identity,
            depth_view: DepthViewParams::default(),
            handles: HandleSet::new(),
            scene: None,
            pipeline: None,
            params: None,
            graph: PostProcessGraph::new(),
        }
    }

    pub fn mode(&self) -> PassthroughMode {
        self.mode
    }

    pub fn graph(&self) -> &PostProcessGraph {
        &self.graph
    }

    pub fn scene(&self) -> Option<&SceneMesh> {
        self.scene.as_ref()
    }

    fn topology(&self, targets: &FrameTargets) -> Result<Vec<BlitPassDesc>> {
        let (Some(pipeline), Some(params)) = (&self.pipeline, &self.params) else {
            engine_bail!("prism::MeshViewerEffect", "graph requested before setup");
        };
        Ok(passthrough::plan(targets.extent(), targets.color().format(), self.mode, pipeline, params))
    }
}

impl Effect for MeshViewerEffect {
    fn name(&self) -> &str {
        "mesh_viewer"
    }

    fn setup(&mut self, ctx: &mut RenderContext, targets: &FrameTargets) -> Result<()> {
        let scene = SceneMesh::create(
            ctx,
            &mut self.handles,
            &self.library,
            &self.mesh,
            Some(self.loader.as_ref()),
            targets,
        )?;
        let bounds = *scene.bounds();
        self.scene = Some(scene);

        self.pipeline = Some(self.handles.blit_pipeline(
            ctx,
            &self.library,
            "depth_view.frag",
            targets.color().format(),
            BlendMode::Opaque,
            1,
        )?);
        self.params = Some(uniform_buffer(ctx.device(), bytemuck::bytes_of(&self.depth_view))?);

        let topology = self.topology(targets)?;
        self.graph.build(ctx, topology, targets)?;
        engine_info!(
            "prism::MeshViewerEffect",
            "mesh of {} vertices, bounds size {:.2}",
            self.mesh.vertex_count(), bounds.size()
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
            None => engine_bail!("prism::MeshViewerEffect", "update before setup"),
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
            "depth_view" => {
                self.mode = if change.as_bool()? { PassthroughMode::DepthView } else { PassthroughMode::Identity };
                return Ok(RebuildKind::Topology);
            }
            "near_plane" => self.depth_view.near = change.as_positive_f32()?,
            "far_plane" => self.depth_view.far = change.as_positive_f32()?,
            _ => return Err(unknown_parameter(self.name(), change)),
        }
        if let Some(params) = &self.params {
            params.update(0, bytemuck::bytes_of(&self.depth_view))?;
        }
        Ok(RebuildKind::Parameters)
    }

    fn shutdown(&mut self, ctx: &mut RenderContext) {
        self.graph.teardown(&mut ctx.pool);
        self.scene = None;
        self.pipeline = None;
        self.params = None;
        self.handles.release(&mut ctx.caches);
    }
}

#[cfg(test)]
#[path = "mesh_viewer_effect_tests.rs"]
mod tests;
