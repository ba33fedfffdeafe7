/// Post-process graph
///
/// A topology is an ordered list of `BlitPassDesc`. `build` turns it into
/// passes: stage images come from the transient pool, render passes are
/// looked up by (format, blend). Binding groups and framebuffers are created
/// lazily on the first `execute` after a build.
///
/// Layout tracking: every graph image remembers the layout it was left in,
/// across frames. Before a pass, its sampled inputs move to shader-read and
/// its target to color-attachment. The frame color enters `execute` as a
/// color attachment (scene pass) and leaves it the same way.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, CommandList, RenderPass, RenderTarget, Texture, ImageBarrier, ImageLayout,
    BindingResource, FramebufferDesc, TextureFormat, Viewport, Rect2D,
};
use crate::transient::{TransientImage, TransientImagePool};
use crate::frame::{FrameTargets, RenderContext};
use crate::{engine_bail, engine_debug, engine_info, engine_warn};
use super::blit_pass::{
    BlitPass, BlitPassDesc, BlendMode, PassInput, PassTarget, ImageRef, InputSource,
    blit_render_pass_desc,
};

new_key_type! {
    /// Image owned by the graph for the lifetime of one build
    pub struct GraphImageId;
}

struct GraphImage {
    image: TransientImage,
    layout: ImageLayout,
}

/// Per-execute state of the images the graph does not own
struct FrameImageState {
    color_layout: ImageLayout,
    depth_synced: bool,
}

#[derive(Default)]
pub struct PostProcessGraph {
    passes: Vec<BlitPass>,
    images: SlotMap<GraphImageId, GraphImage>,
    render_passes: FxHashMap<(TextureFormat, BlendMode), Arc<dyn RenderPass>>,
    generation: u64,
}

impl PostProcessGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build `topology` against the current frame targets
    ///
    /// On error the partial build is torn down and its images returned to
    /// the pool.
    pub fn build(
        &mut self,
        ctx: &mut RenderContext,
        topology: Vec<BlitPassDesc>,
        targets: &FrameTargets,
    ) -> Result<()> {
        debug_assert!(self.passes.is_empty(), "build over a live graph, use reconfigure");
        self.generation += 1;

        for (stage_id, desc) in topology.into_iter().enumerate() {
            if let Err(e) = self.build_pass(ctx, stage_id, desc, targets) {
                self.teardown(&mut ctx.pool);
                return Err(e);
            }
        }

        engine_debug!(
            "prism::PostProcessGraph",
            "generation {}: {} passes, {} images",
            self.generation, self.passes.len(), self.images.len()
        );
        Ok(())
    }

    /// Device idle, teardown, build
    ///
    /// Calling it twice with the same topology leaves an equivalent graph.
    pub fn reconfigure(
        &mut self,
        ctx: &mut RenderContext,
        topology: Vec<BlitPassDesc>,
        targets: &FrameTargets,
    ) -> Result<()> {
        ctx.device.wait_idle()?;
        self.teardown(&mut ctx.pool);
        self.build(ctx, topology, targets)?;
        engine_info!(
            "prism::PostProcessGraph",
            "reconfigured: {} passes at {}x{}",
            self.passes.len(), targets.extent().width, targets.extent().height
        );
        Ok(())
    }

    /// Drop binding groups and framebuffers, return stage images to `pool`
    ///
    /// Render passes stay cached; they only depend on format and blend.
    /// The caller guarantees the GPU no longer uses the images.
    pub fn teardown(&mut self, pool: &mut TransientImagePool) {
        self.passes.clear();
        for (_, entry) in self.images.drain() {
            pool.release(entry.image);
        }
    }

    fn build_pass(
        &mut self,
        ctx: &mut RenderContext,
        stage_id: usize,
        desc: BlitPassDesc,
        targets: &FrameTargets,
    ) -> Result<()> {
        if desc.inputs.is_empty() {
            return Err(invalid(format!("pass '{}' has no inputs", desc.name)));
        }

        let mut sources = Vec::with_capacity(desc.inputs.len());
        for input in &desc.inputs {
            sources.push(match input {
                PassInput::Stage(index) => InputSource::Image(self.stage_output(*index, &desc.name)?),
                PassInput::FrameColor => InputSource::Image(ImageRef::FrameColor),
                PassInput::Depth => InputSource::Image(ImageRef::Depth),
                PassInput::Uniform(buffer) => InputSource::Uniform(buffer.clone()),
            });
        }

        let output = match desc.target {
            PassTarget::Own => {
                let image = ctx.pool.acquire(ctx.device.as_ref(), desc.extent, desc.format)?;
                ImageRef::Graph(self.images.insert(GraphImage {
                    image,
                    layout: ImageLayout::Undefined,
                }))
            }
            PassTarget::Stage(index) => {
                let output = self.stage_output(index, &desc.name)?;
                if let ImageRef::Graph(id) = output {
                    let image = &self.images[id].image;
                    if image.extent() != desc.extent || image.format() != desc.format {
                        return Err(invalid(format!(
                            "pass '{}' accumulates into stage {} of a different extent or format",
                            desc.name, index
                        )));
                    }
                }
                output
            }
            PassTarget::Presentation => {
                if desc.extent != targets.extent() || desc.format != targets.color().format() {
                    return Err(invalid(format!(
                        "pass '{}' targets the frame color with a mismatched extent or format",
                        desc.name
                    )));
                }
                ImageRef::FrameColor
            }
        };

        let feedback = sources
            .iter()
            .any(|source| matches!(source, InputSource::Image(image) if *image == output));
        if feedback {
            return Err(invalid(format!("pass '{}' samples its own target", desc.name)));
        }

        let render_pass = self.render_pass(ctx.device(), desc.format, desc.blend)?;
        self.passes.push(BlitPass::new(desc, stage_id, sources, output, render_pass));
        Ok(())
    }

    /// Output image of an already built stage
    fn stage_output(&self, index: usize, name: &str) -> Result<ImageRef> {
        match self.passes.get(index) {
            Some(pass) => Ok(pass.output),
            None => Err(invalid(format!(
                "pass '{}' references stage {} which is not an earlier stage",
                name, index
            ))),
        }
    }

    fn render_pass(
        &mut self,
        device: &dyn GraphicsDevice,
        format: TextureFormat,
        blend: BlendMode,
    ) -> Result<Arc<dyn RenderPass>> {
        if let Some(render_pass) = self.render_passes.get(&(format, blend)) {
            return Ok(render_pass.clone());
        }
        let render_pass = device.create_render_pass(&blit_render_pass_desc(format, blend))?;
        self.render_passes.insert((format, blend), render_pass.clone());
        Ok(render_pass)
    }

    /// Record every pass into `cmd`; returns the number of draws
    ///
    /// Must be called outside a render pass, after the scene pass.
    pub fn execute(
        &mut self,
        device: &dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        targets: &FrameTargets,
    ) -> Result<u32> {
        let mut frame = FrameImageState {
            color_layout: ImageLayout::ColorAttachment,
            depth_synced: false,
        };

        for index in 0..self.passes.len() {
            let barriers = self.prepare_pass(index, targets, &mut frame);
            if !barriers.is_empty() {
                cmd.pipeline_barrier(&[], &barriers)?;
            }
            if !self.passes[index].is_valid() {
                self.bind_pass(device, index, targets)?;
            }
            self.record_pass(index, cmd)?;
        }

        if frame.color_layout != ImageLayout::ColorAttachment {
            cmd.pipeline_barrier(&[], &[ImageBarrier::transition(
                targets.color_texture().clone(),
                frame.color_layout,
                ImageLayout::ColorAttachment,
            )])?;
        }

        Ok(self.passes.len() as u32)
    }

    /// Barriers that make pass `index` inputs readable and its target writable
    fn prepare_pass(
        &mut self,
        index: usize,
        targets: &FrameTargets,
        frame: &mut FrameImageState,
    ) -> Vec<ImageBarrier> {
        let Self { passes, images, .. } = self;
        let pass = &passes[index];
        let mut barriers = Vec::new();

        for source in &pass.sources {
            match source {
                InputSource::Image(ImageRef::Depth) => {
                    if !frame.depth_synced {
                        barriers.push(ImageBarrier::depth_write_to_sampled(targets.depth().texture().clone()));
                        frame.depth_synced = true;
                    }
                }
                InputSource::Image(image) => {
                    barriers.extend(transition(images, frame, targets, *image, ImageLayout::ShaderReadOnly));
                }
                InputSource::Uniform(_) => {}
            }
        }
        barriers.extend(transition(images, frame, targets, pass.output, ImageLayout::ColorAttachment));
        barriers
    }

    /// Create the binding group and framebuffer of pass `index`
    fn bind_pass(&mut self, device: &dyn GraphicsDevice, index: usize, targets: &FrameTargets) -> Result<()> {
        let Self { passes, images, generation, .. } = self;
        let pass = &mut passes[index];

        let binding_group = {
            let mut resources = Vec::with_capacity(pass.sources.len());
            for source in &pass.sources {
                resources.push(match source {
                    InputSource::Image(image) => BindingResource::SampledTexture(
                        texture_of(images, targets, *image)?.as_ref(),
                        image.sampler(),
                    ),
                    InputSource::Uniform(buffer) => BindingResource::UniformBuffer(buffer.as_ref()),
                });
            }
            device.create_binding_group(&pass.desc().pipeline, 0, &resources)?
        };

        let extent = pass.extent();
        let framebuffer = device.create_framebuffer(&FramebufferDesc {
            render_pass: &pass.render_pass,
            color_attachments: vec![render_target_of(images, targets, pass.output)?.clone()],
            depth_stencil_attachment: None,
            width: extent.width,
            height: extent.height,
        })?;

        engine_debug!("prism::PostProcessGraph", "bind '{}' (generation {})", pass.name(), generation);
        pass.binding_group = Some(binding_group);
        pass.framebuffer = Some(framebuffer);
        Ok(())
    }

    fn record_pass(&self, index: usize, cmd: &mut dyn CommandList) -> Result<()> {
        let pass = &self.passes[index];
        let (Some(binding_group), Some(framebuffer)) = (&pass.binding_group, &pass.framebuffer) else {
            engine_bail!("prism::PostProcessGraph", "pass '{}' recorded before binding", pass.name());
        };
        let extent = pass.extent();
        let pipeline = &pass.desc().pipeline;

        cmd.begin_render_pass(&pass.render_pass, framebuffer, &[])?;
        cmd.set_viewport(Viewport::full(extent.width, extent.height))?;
        cmd.set_scissor(Rect2D::full(extent.width, extent.height))?;
        cmd.bind_pipeline(pipeline)?;
        cmd.bind_binding_group(pipeline, 0, binding_group)?;
        cmd.draw(3, 0)?;
        cmd.end_render_pass()
    }

    pub fn passes(&self) -> &[BlitPass] {
        &self.passes
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Incremented on every build
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stage images currently held by the graph
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Drop for PostProcessGraph {
    fn drop(&mut self) {
        if !self.images.is_empty() {
            engine_warn!(
                "prism::PostProcessGraph",
                "dropped holding {} stage images; call teardown to return them to the pool",
                self.images.len()
            );
        }
    }
}

fn invalid(message: String) -> Error {
    engine_warn!("prism::PostProcessGraph", "{}", message);
    Error::InvalidResource(message)
}

fn texture_of<'a>(
    images: &'a SlotMap<GraphImageId, GraphImage>,
    targets: &'a FrameTargets,
    image: ImageRef,
) -> Result<&'a Arc<dyn Texture>> {
    match image {
        ImageRef::Graph(id) => match images.get(id) {
            Some(entry) => Ok(entry.image.texture()),
            None => Err(invalid(format!("stale graph image {:?}", id))),
        },
        ImageRef::FrameColor => Ok(targets.color_texture()),
        ImageRef::Depth => Ok(targets.depth().texture()),
    }
}

fn render_target_of<'a>(
    images: &'a SlotMap<GraphImageId, GraphImage>,
    targets: &'a FrameTargets,
    image: ImageRef,
) -> Result<&'a Arc<dyn RenderTarget>> {
    match image {
        ImageRef::Graph(id) => match images.get(id) {
            Some(entry) => Ok(entry.image.render_target()),
            None => Err(invalid(format!("stale graph image {:?}", id))),
        },
        ImageRef::FrameColor => Ok(targets.color().render_target()),
        ImageRef::Depth => Err(invalid("depth is read-only in the post-process graph".to_string())),
    }
}

/// Move `image` to `new_layout`, recording the barrier if it changes
fn transition(
    images: &mut SlotMap<GraphImageId, GraphImage>,
    frame: &mut FrameImageState,
    targets: &FrameTargets,
    image: ImageRef,
    new_layout: ImageLayout,
) -> Option<ImageBarrier> {
    let (layout, texture) = match image {
        ImageRef::Graph(id) => {
            let entry = images.get_mut(id)?;
            (&mut entry.layout, entry.image.texture())
        }
        ImageRef::FrameColor => (&mut frame.color_layout, targets.color_texture()),
        ImageRef::Depth => return None,
    };
    if *layout == new_layout {
        return None;
    }
    let barrier = match (*layout, new_layout) {
        (ImageLayout::ColorAttachment, ImageLayout::ShaderReadOnly) => {
            ImageBarrier::attachment_to_sampled(texture.clone())
        }
        (ImageLayout::ShaderReadOnly, ImageLayout::ColorAttachment) => {
            ImageBarrier::sampled_to_attachment(texture.clone())
        }
        (old, new) => ImageBarrier::transition(texture.clone(), old, new),
    };
    *layout = new_layout;
    Some(barrier)
}

#[cfg(test)]
#[path = "post_process_graph_tests.rs"]
mod tests;
