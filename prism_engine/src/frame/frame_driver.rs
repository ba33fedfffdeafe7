/// Frame driver: one `draw()` per displayed frame
///
/// ```text
/// begin_frame (wait + reset slot fence) -> acquire -> effect update
///   -> [compute submit] -> scene + post submit -> overlay + present blit submit -> present
/// ```
///
/// When an effect uses compute, the scene submission of frame N signals a
/// semaphore that the compute submission of frame N+1 waits on, so the
/// simulation never overwrites buffers still read as vertex input.
///
/// Out-of-date or suboptimal surfaces and pending resizes lead to a rebuild:
/// device idle, swapchain recreate, frame targets and pool renewed, effect
/// resized. Rebuilds only happen between draws.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, Swapchain, SubmitInfo, QueueType, ClearValue, Viewport, Rect2D, PipelineStageFlags,
    TextureFormat, Semaphore,
};
use crate::effect::{Effect, FrameUpdate, ParameterChange, RebuildKind};
use crate::io::{FrameInput, Overlay};
use crate::{engine_bail, engine_debug, engine_error, engine_info, engine_trace};
use super::{FrameRing, FrameTargets, RenderContext, SurfaceChain};

/// Frame-level settings
#[derive(Debug, Clone, PartialEq)]
pub struct FrameConfig {
    /// Ring size; CPU recording runs at most `frames_in_flight - 1` frames ahead
    pub frames_in_flight: usize,
    /// Offscreen frame color (scene output, post-process input and output)
    pub color_format: TextureFormat,
    pub depth_format: TextureFormat,
    pub clear_color: [f32; 4],
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            color_format: TextureFormat::R16G16B16A16_SFLOAT,
            depth_format: TextureFormat::D32_FLOAT,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Result of one `draw()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Submitted and presented (a rebuild may have followed the present)
    Presented,
    /// The surface was out of date on acquire; rebuilt, nothing submitted
    Rebuilt,
    /// Zero-sized surface (minimized window); nothing recorded
    Skipped,
}

/// Frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames presented
    pub frames: u64,
    /// Surface rebuilds
    pub rebuilds: u64,
    /// Scene draw calls of the last frame
    pub draw_calls: u32,
    /// Post-process passes of the last frame
    pub post_passes: u32,
    /// Compute submissions
    pub compute_submits: u64,
}

pub struct FrameDriver {
    config: FrameConfig,
    ctx: RenderContext,
    surface: SurfaceChain,
    ring: FrameRing,
    targets: Option<FrameTargets>,
    effect: Box<dyn Effect>,
    /// Signaled by the last scene submission and not yet waited
    graphics_release: Option<Arc<dyn Semaphore>>,
    stats: FrameStats,
    shut_down: bool,
}

impl FrameDriver {
    /// Create the ring and frame targets, then set `effect` up
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        swapchain: Box<dyn Swapchain>,
        mut effect: Box<dyn Effect>,
        config: FrameConfig,
    ) -> Result<Self> {
        let mut ctx = RenderContext::new(device);
        let surface = SurfaceChain::new(swapchain);
        let ring = FrameRing::new(ctx.device(), config.frames_in_flight)?;
        let extent = surface.extent();
        if extent.width == 0 || extent.height == 0 {
            engine_bail!("prism::FrameDriver", "cannot start on a zero-sized surface");
        }
        let targets = FrameTargets::create(ctx.device.as_ref(), &mut ctx.pool, extent, &config)?;

        if let Err(e) = effect.setup(&mut ctx, &targets) {
            engine_error!("prism::FrameDriver", "effect '{}' setup failed: {}", effect.name(), e);
            effect.shutdown(&mut ctx);
            targets.release(&mut ctx.pool);
            ctx.caches.clear();
            return Err(e);
        }

        engine_info!(
            "prism::FrameDriver",
            "'{}' at {}x{}, {} frames in flight",
            effect.name(), extent.width, extent.height, ring.size()
        );
        Ok(Self {
            config,
            ctx,
            surface,
            ring,
            targets: Some(targets),
            effect,
            graphics_release: None,
            stats: FrameStats::default(),
            shut_down: false,
        })
    }

    /// Record, submit and present one frame
    pub fn draw(&mut self, input: &FrameInput, overlay: &mut dyn Overlay) -> Result<DrawOutcome> {
        if self.shut_down {
            engine_bail!("prism::FrameDriver", "draw after shutdown");
        }

        if self.surface.needs_rebuild() {
            let extent = self.surface.target_extent();
            if extent.width == 0 || extent.height == 0 {
                return Ok(DrawOutcome::Skipped);
            }
            self.rebuild()?;
        }

        // (a)-(c) advance, wait, reset
        self.ring.begin_frame(&mut self.ctx.pool)?;

        // (d) acquire
        let Some(image_index) = self.surface.acquire()? else {
            self.rebuild()?;
            return Ok(DrawOutcome::Rebuilt);
        };

        let Some(targets) = self.targets.as_ref() else {
            engine_bail!("prism::FrameDriver", "no frame targets");
        };
        let extent = targets.extent();
        let slot_index = self.ring.index();
        self.effect.update(&self.ctx, &FrameUpdate { input, slot: slot_index })?;

        let slot = self.ring.current();
        let device = self.ctx.device.clone();

        // optional async compute
        slot.compute.begin()?;
        let compute = self.effect.record_compute(&self.ctx, slot.compute.as_mut())?;
        slot.compute.end()?;
        if compute {
            let released = self.graphics_release.take();
            let release_wait = released.as_ref()
                .map(|semaphore| (semaphore.as_ref(), PipelineStageFlags::COMPUTE_SHADER));
            device.submit(&SubmitInfo {
                queue: QueueType::Compute,
                command_lists: &[slot.compute.as_ref()],
                wait: release_wait.as_slice(),
                signal: &[slot.compute_finished.as_ref()],
                fence: None,
            })?;
            self.stats.compute_submits += 1;
        }

        // (e) scene + post-process
        let graphics = slot.graphics.as_mut();
        graphics.begin()?;
        self.effect.record_pre_scene(&self.ctx, graphics)?;
        graphics.begin_render_pass(
            targets.scene_pass(),
            targets.scene_framebuffer(),
            &[
                ClearValue::Color(self.config.clear_color),
                ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
            ],
        )?;
        graphics.set_viewport(Viewport::full(extent.width, extent.height))?;
        graphics.set_scissor(Rect2D::full(extent.width, extent.height))?;
        let draw_calls = self.effect.record_scene(&self.ctx, graphics, targets)?;
        graphics.end_render_pass()?;
        let post_passes = self.effect.record_post(&self.ctx, graphics, targets)?;
        graphics.end()?;

        let compute_wait = [(slot.compute_finished.as_ref(), PipelineStageFlags::VERTEX_INPUT)];
        let graphics_signal = [slot.graphics_finished.as_ref()];
        let (wait, signal): (&[(&dyn Semaphore, PipelineStageFlags)], &[&dyn Semaphore]) = if compute {
            (&compute_wait, &graphics_signal)
        } else {
            (&[], &[])
        };
        device.submit(&SubmitInfo {
            queue: QueueType::Graphics,
            command_lists: &[slot.graphics.as_ref()],
            wait,
            signal,
            fence: None,
        })?;
        if compute {
            // a pending signal is always consumed by this frame's compute wait
            self.graphics_release = Some(slot.graphics_finished.clone());
        }

        // (f) overlay + present blit
        let overlay_cmd = slot.overlay.as_mut();
        overlay_cmd.begin()?;
        overlay_cmd.begin_render_pass(targets.overlay_pass(), targets.overlay_framebuffer(), &[])?;
        overlay_cmd.set_viewport(Viewport::full(extent.width, extent.height))?;
        overlay_cmd.set_scissor(Rect2D::full(extent.width, extent.height))?;
        overlay.record(overlay_cmd, extent)?;
        overlay_cmd.end_render_pass()?;
        let swapchain = self.surface.swapchain();
        swapchain.record_present_blit(overlay_cmd, targets.color_texture().as_ref(), image_index)?;
        overlay_cmd.end()?;

        let image_available = swapchain.image_available_semaphore();
        let render_finished = swapchain.render_finished_semaphore(image_index);
        device.submit(&SubmitInfo {
            queue: QueueType::Graphics,
            command_lists: &[slot.overlay.as_ref()],
            wait: &[(image_available.as_ref(), PipelineStageFlags::TRANSFER)],
            signal: &[render_finished.as_ref()],
            fence: Some(slot.fence.as_ref()),
        })?;
        slot.mark_submitted();

        // (g) present
        let needs_rebuild = self.surface.present(image_index)?;
        self.stats.frames += 1;
        self.stats.draw_calls = draw_calls;
        self.stats.post_passes = post_passes;
        engine_trace!(
            "prism::FrameDriver",
            "frame {} slot {} image {}: {} draws, {} post passes",
            self.stats.frames, slot_index, image_index, draw_calls, post_passes
        );

        if needs_rebuild {
            self.rebuild()?;
        }
        Ok(DrawOutcome::Presented)
    }

    /// Request a new surface extent, applied before the next frame
    pub fn resize(&mut self, width: u32, height: u32) {
        engine_debug!("prism::FrameDriver", "resize requested: {}x{}", width, height);
        self.surface.request_resize(width, height);
    }

    /// Apply a parameter change between frames
    ///
    /// The device is idled first so uniforms can be rewritten in place.
    /// Topology changes reconfigure the effect's graph.
    pub fn apply_parameter(&mut self, change: &ParameterChange) -> Result<RebuildKind> {
        self.ctx.device.wait_idle()?;
        let kind = self.effect.apply_parameter(&mut self.ctx, change)?;
        engine_debug!("prism::FrameDriver", "'{}' = {} -> {:?}", change.name, change.value, kind);
        if kind == RebuildKind::Topology {
            if let Some(targets) = &self.targets {
                self.effect.resize(&mut self.ctx, targets)?;
            }
        }
        Ok(kind)
    }

    /// Idle the device, shut the effect down, release targets and caches
    ///
    /// Idempotent; also run on drop.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        self.ctx.device.wait_idle()?;
        self.effect.shutdown(&mut self.ctx);
        self.ring.drain_deferred(&mut self.ctx.pool);
        if let Some(targets) = self.targets.take() {
            targets.release(&mut self.ctx.pool);
        }
        self.ctx.pool.clear();
        self.ctx.caches.clear();
        engine_info!("prism::FrameDriver", "shut down after {} frames", self.stats.frames);
        Ok(())
    }

    /// Surface rebuild: idle, recreate, renew targets and pool, resize effect
    fn rebuild(&mut self) -> Result<()> {
        let extent = self.surface.rebuild(self.ctx.device())?;
        self.ring.drain_deferred(&mut self.ctx.pool);
        if let Some(targets) = self.targets.take() {
            targets.release(&mut self.ctx.pool);
        }
        self.ctx.pool.clear();

        let targets = self.targets.insert(FrameTargets::create(
            self.ctx.device.as_ref(),
            &mut self.ctx.pool,
            extent,
            &self.config,
        )?);
        self.effect.resize(&mut self.ctx, targets)?;
        // stage images of the previous extent came back during the resize
        self.ctx.pool.clear();

        self.stats.rebuilds += 1;
        engine_info!("prism::FrameDriver", "rebuilt at {}x{}", extent.width, extent.height);
        Ok(())
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    pub fn effect(&self) -> &dyn Effect {
        self.effect.as_ref()
    }

    pub fn targets(&self) -> Option<&FrameTargets> {
        self.targets.as_ref()
    }

    pub fn surface(&self) -> &SurfaceChain {
        &self.surface
    }

    pub fn ring(&self) -> &FrameRing {
        &self.ring
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            engine_error!("prism::FrameDriver", "shutdown on drop failed: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "frame_driver_tests.rs"]
mod tests;
