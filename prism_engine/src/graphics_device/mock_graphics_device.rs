/// Mock graphics device for unit tests (no GPU required)
///
/// Every created object and every recorded command is appended to a shared
/// journal as a string (`"cmd#3:begin"`, `"fence#1:wait"`, ...), so tests can
/// assert on ordering without a GPU. Objects log `"<kind>#<id>:drop"` when
/// destroyed.
///
/// Fences model an instantly-finishing GPU: `submit` signals the fence, and
/// waiting on a fence that was never signaled fails instead of hanging.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::engine_bail;
use crate::graphics_device::{
    GraphicsDevice, QueueType, SubmitInfo, DeviceStats,
    Buffer, BufferDesc, Texture, TextureDesc, TextureInfo, TextureFormat,
    Shader, ShaderDesc, ShaderStage, Pipeline, PipelineDesc, ComputePipelineDesc,
    PipelineBindPoint, BindingGroupLayoutDesc, RenderPass, RenderPassDesc,
    RenderTarget, Framebuffer, FramebufferDesc, BindingGroup, BindingResource,
    CommandList, ClearValue, Viewport, Rect2D, IndexType, ShaderStageFlags,
    BufferBarrier, ImageBarrier, AccessFlags, PipelineStageFlags, QUEUE_FAMILY_IGNORED,
    Fence, Semaphore, Swapchain, AcquireOutcome, PresentOutcome,
};

/// Shared command/event journal
pub type Journal = Arc<Mutex<Vec<String>>>;

fn push(journal: &Journal, entry: String) {
    if let Ok(mut entries) = journal.lock() {
        entries.push(entry);
    }
}

fn flag_names<I: Iterator<Item = (&'static str, T)>, T>(names: I) -> String {
    let names: Vec<&str> = names.map(|(name, _)| name).collect();
    if names.is_empty() {
        "NONE".to_string()
    } else {
        names.join("|")
    }
}

fn access_names(flags: AccessFlags) -> String {
    flag_names(flags.iter_names())
}

fn stage_names(flags: PipelineStageFlags) -> String {
    flag_names(flags.iter_names())
}

fn family_name(family: u32) -> String {
    if family == QUEUE_FAMILY_IGNORED {
        "ignored".to_string()
    } else {
        family.to_string()
    }
}

// Every object handed out by MockGraphicsDevice is one of the Mock* types
// below, which is what makes these casts sound in tests.

fn buffer_id(buffer: &dyn Buffer) -> u32 {
    unsafe { (*(buffer as *const dyn Buffer as *const MockBuffer)).id }
}

fn texture_id(texture: &dyn Texture) -> u32 {
    unsafe { (*(texture as *const dyn Texture as *const MockTexture)).id }
}

fn pipeline_id(pipeline: &dyn Pipeline) -> u32 {
    unsafe { (*(pipeline as *const dyn Pipeline as *const MockPipeline)).id }
}

fn command_list_id(cmd: &dyn CommandList) -> u32 {
    unsafe { (*(cmd as *const dyn CommandList as *const MockCommandList)).id }
}

fn fence_id(fence: &dyn Fence) -> u32 {
    unsafe { (*(fence as *const dyn Fence as *const MockFence)).id }
}

fn fence_signal(fence: &dyn Fence) {
    unsafe { (*(fence as *const dyn Fence as *const MockFence)).signaled.store(true, Ordering::SeqCst) }
}

fn semaphore_id(semaphore: &dyn Semaphore) -> u32 {
    unsafe { (*(semaphore as *const dyn Semaphore as *const MockSemaphore)).id }
}

// ============================================================================
// Mock Buffer
// ============================================================================

pub struct MockBuffer {
    pub id: u32,
    pub size: u64,
    pub data: Mutex<Vec<u8>>,
    journal: Journal,
}

impl Buffer for MockBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset as usize + data.len();
        if end as u64 > self.size {
            engine_bail!("prism::mock", "buffer#{} update out of range ({} > {})", self.id, end, self.size);
        }
        if let Ok(mut bytes) = self.data.lock() {
            bytes[offset as usize..end].copy_from_slice(data);
        }
        push(&self.journal, format!("buffer#{}:update {}", self.id, data.len()));
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        push(&self.journal, format!("buffer#{}:drop", self.id));
    }
}

// ============================================================================
// Mock Texture
// ============================================================================

pub struct MockTexture {
    pub id: u32,
    pub info: TextureInfo,
    journal: Journal,
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        push(&self.journal, format!("texture#{}:drop", self.id));
    }
}

// ============================================================================
// Mock Shader / Pipeline
// ============================================================================

pub struct MockShader {
    pub id: u32,
    pub stage: ShaderStage,
    journal: Journal,
}

impl Shader for MockShader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl Drop for MockShader {
    fn drop(&mut self) {
        push(&self.journal, format!("shader#{}:drop", self.id));
    }
}

pub struct MockPipeline {
    pub id: u32,
    pub bind_point: PipelineBindPoint,
    pub binding_layouts: Vec<BindingGroupLayoutDesc>,
    journal: Journal,
}

impl Pipeline for MockPipeline {
    fn bind_point(&self) -> PipelineBindPoint {
        self.bind_point
    }

    fn binding_layout(&self, set: u32) -> Option<&BindingGroupLayoutDesc> {
        self.binding_layouts.get(set as usize)
    }

    fn binding_group_layout_count(&self) -> u32 {
        self.binding_layouts.len() as u32
    }
}

impl Drop for MockPipeline {
    fn drop(&mut self) {
        push(&self.journal, format!("pipeline#{}:drop", self.id));
    }
}

// ============================================================================
// Mock RenderPass / RenderTarget / Framebuffer / BindingGroup
// ============================================================================

pub struct MockRenderPass {
    pub id: u32,
    pub desc: RenderPassDesc,
}

impl RenderPass for MockRenderPass {
    fn desc(&self) -> &RenderPassDesc {
        &self.desc
    }
}

pub struct MockRenderTarget {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl RenderTarget for MockRenderTarget {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

pub struct MockFramebuffer {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    journal: Journal,
}

impl Framebuffer for MockFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for MockFramebuffer {
    fn drop(&mut self) {
        push(&self.journal, format!("framebuffer#{}:drop", self.id));
    }
}

pub struct MockBindingGroup {
    pub id: u32,
    pub set_index: u32,
}

impl BindingGroup for MockBindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

// ============================================================================
// Mock Fence / Semaphore
// ============================================================================

pub struct MockFence {
    pub id: u32,
    pub signaled: AtomicBool,
    journal: Journal,
}

impl Fence for MockFence {
    fn wait(&self) -> Result<()> {
        push(&self.journal, format!("fence#{}:wait", self.id));
        if !self.signaled.load(Ordering::SeqCst) {
            engine_bail!("prism::mock", "fence#{} waited without a pending signal", self.id);
        }
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        push(&self.journal, format!("fence#{}:reset", self.id));
        self.signaled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_signaled(&self) -> Result<bool> {
        Ok(self.signaled.load(Ordering::SeqCst))
    }
}

pub struct MockSemaphore {
    pub id: u32,
}

impl Semaphore for MockSemaphore {}

// ============================================================================
// Mock CommandList
// ============================================================================

pub struct MockCommandList {
    pub id: u32,
    pub queue: QueueType,
    pub recording: bool,
    journal: Journal,
}

impl MockCommandList {
    fn record(&self, command: String) {
        push(&self.journal, format!("cmd#{}:{}", self.id, command));
    }
}

impl CommandList for MockCommandList {
    fn queue(&self) -> QueueType {
        self.queue
    }

    fn begin(&mut self) -> Result<()> {
        self.recording = true;
        self.record("begin".to_string());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording {
            engine_bail!("prism::mock", "cmd#{} end without begin", self.id);
        }
        self.recording = false;
        self.record("end".to_string());
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        _render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.record(format!(
            "begin_render_pass {}x{} clears={}",
            framebuffer.width(), framebuffer.height(), clear_values.len()
        ));
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.record("end_render_pass".to_string());
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.record(format!("set_viewport {}x{}", viewport.width, viewport.height));
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.record(format!("set_scissor {}x{}", scissor.width, scissor.height));
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.record(format!("bind_pipeline pipeline#{}", pipeline_id(&**pipeline)));
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        _binding_group: &Arc<dyn BindingGroup>,
    ) -> Result<()> {
        self.record(format!("bind_binding_group set={}", set_index));
        Ok(())
    }

    fn push_constants(&mut self, _stages: ShaderStageFlags, offset: u32, data: &[u8]) -> Result<()> {
        self.record(format!("push_constants {}+{}", offset, data.len()));
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.record(format!("bind_vertex_buffer {} buffer#{}+{}", binding, buffer_id(&**buffer), offset));
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, _offset: u64, _index_type: IndexType) -> Result<()> {
        self.record(format!("bind_index_buffer buffer#{}", buffer_id(&**buffer)));
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, _first_vertex: u32) -> Result<()> {
        self.record(format!("draw {}", vertex_count));
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, _first_index: u32, _vertex_offset: i32) -> Result<()> {
        self.record(format!("draw_indexed {}", index_count));
        Ok(())
    }

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()> {
        self.record(format!("dispatch {} {} {}", group_count_x, group_count_y, group_count_z));
        Ok(())
    }

    fn pipeline_barrier(&mut self, buffers: &[BufferBarrier], images: &[ImageBarrier]) -> Result<()> {
        for barrier in buffers {
            self.record(format!(
                "buffer_barrier buffer#{} access={}->{} stage={}->{} family={}->{}",
                buffer_id(&*barrier.buffer),
                access_names(barrier.src_access),
                access_names(barrier.dst_access),
                stage_names(barrier.src_stage),
                stage_names(barrier.dst_stage),
                family_name(barrier.src_queue_family),
                family_name(barrier.dst_queue_family),
            ));
        }
        for barrier in images {
            self.record(format!(
                "image_barrier texture#{} {:?}->{:?}",
                texture_id(&*barrier.texture),
                barrier.old_layout,
                barrier.new_layout,
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

pub struct MockGraphicsDevice {
    journal: Journal,
    next_id: AtomicU32,
    stats: Mutex<DeviceStats>,
    graphics_family: u32,
    compute_family: u32,
}

impl MockGraphicsDevice {
    /// Device with distinct graphics (0) and compute (1) queue families
    pub fn new() -> Self {
        Self::with_families(0, 1)
    }

    /// Device whose compute queue shares the graphics family
    pub fn with_shared_queue() -> Self {
        Self::with_families(0, 0)
    }

    fn with_families(graphics_family: u32, compute_family: u32) -> Self {
        Self {
            journal: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU32::new(1),
            stats: Mutex::new(DeviceStats::default()),
            graphics_family,
            compute_family,
        }
    }

    fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn log(&self, entry: String) {
        push(&self.journal, entry);
    }

    fn bump(&self, update: impl FnOnce(&mut DeviceStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            update(&mut stats);
        }
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Snapshot of the journal
    pub fn entries(&self) -> Vec<String> {
        self.journal.lock().map(|entries| entries.clone()).unwrap_or_default()
    }

    /// Number of journal entries containing `pattern`
    pub fn count(&self, pattern: &str) -> usize {
        self.entries().iter().filter(|entry| entry.contains(pattern)).count()
    }

    pub fn clear_journal(&self) {
        if let Ok(mut entries) = self.journal.lock() {
            entries.clear();
        }
    }

    /// Swapchain sharing this device's journal
    pub fn create_swapchain(&self, width: u32, height: u32, image_count: u32) -> MockSwapchain {
        let semaphores = (0..image_count * 2)
            .map(|_| Arc::new(MockSemaphore { id: self.next_id() }) as Arc<dyn Semaphore>)
            .collect::<Vec<_>>();
        let (available, finished) = semaphores.split_at(image_count as usize);
        MockSwapchain {
            journal: self.journal.clone(),
            control: Arc::new(SwapchainControl::default()),
            width,
            height,
            image_count,
            next_image: 0,
            frame: 0,
            current_available: 0,
            image_available: available.to_vec(),
            render_finished: finished.to_vec(),
        }
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        let id = self.next_id();
        self.bump(|stats| stats.buffers += 1);
        self.log(format!("buffer#{}:create {}", id, desc.size));
        Ok(Arc::new(MockBuffer {
            id,
            size: desc.size,
            data: Mutex::new(vec![0; desc.size as usize]),
            journal: self.journal.clone(),
        }))
    }

    fn create_texture(&self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        if desc.width == 0 || desc.height == 0 {
            engine_bail!("prism::mock", "texture with zero extent {}x{}", desc.width, desc.height);
        }
        let id = self.next_id();
        self.bump(|stats| stats.textures += 1);
        self.log(format!("texture#{}:create {}x{} {:?}", id, desc.width, desc.height, desc.format));
        if desc.data.is_some() {
            self.log(format!("texture#{}:upload", id));
        }
        Ok(Arc::new(MockTexture {
            id,
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                usage: desc.usage,
            },
            journal: self.journal.clone(),
        }))
    }

    fn create_shader(&self, desc: ShaderDesc) -> Result<Arc<dyn Shader>> {
        let id = self.next_id();
        self.log(format!("shader#{}:create {:?}", id, desc.stage));
        Ok(Arc::new(MockShader { id, stage: desc.stage, journal: self.journal.clone() }))
    }

    fn create_pipeline(&self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        let id = self.next_id();
        self.bump(|stats| stats.pipelines += 1);
        self.log(format!("pipeline#{}:create graphics", id));
        Ok(Arc::new(MockPipeline {
            id,
            bind_point: PipelineBindPoint::Graphics,
            binding_layouts: desc.state.binding_layouts,
            journal: self.journal.clone(),
        }))
    }

    fn create_compute_pipeline(&self, desc: ComputePipelineDesc) -> Result<Arc<dyn Pipeline>> {
        let id = self.next_id();
        self.bump(|stats| stats.pipelines += 1);
        self.log(format!("pipeline#{}:create compute", id));
        Ok(Arc::new(MockPipeline {
            id,
            bind_point: PipelineBindPoint::Compute,
            binding_layouts: desc.binding_layouts,
            journal: self.journal.clone(),
        }))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        let id = self.next_id();
        self.log(format!("render_pass#{}:create", id));
        Ok(Arc::new(MockRenderPass { id, desc: desc.clone() }))
    }

    fn create_render_target(&self, texture: &dyn Texture) -> Result<Arc<dyn RenderTarget>> {
        let info = texture.info();
        Ok(Arc::new(MockRenderTarget {
            id: self.next_id(),
            width: info.width,
            height: info.height,
            format: info.format,
        }))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        let id = self.next_id();
        self.log(format!("framebuffer#{}:create {}x{}", id, desc.width, desc.height));
        Ok(Arc::new(MockFramebuffer {
            id,
            width: desc.width,
            height: desc.height,
            journal: self.journal.clone(),
        }))
    }

    fn create_binding_group(
        &self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>> {
        if let Some(layout) = pipeline.binding_layout(set_index) {
            debug_assert_eq!(
                layout.entries.len(),
                resources.len(),
                "binding count does not match the layout of set {}",
                set_index
            );
        }
        let id = self.next_id();
        self.log(format!("binding_group#{}:create set={} resources={}", id, set_index, resources.len()));
        Ok(Arc::new(MockBindingGroup { id, set_index }))
    }

    fn create_command_list(&self, queue: QueueType) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList {
            id: self.next_id(),
            queue,
            recording: false,
            journal: self.journal.clone(),
        }))
    }

    fn create_fence(&self, signaled: bool) -> Result<Arc<dyn Fence>> {
        Ok(Arc::new(MockFence {
            id: self.next_id(),
            signaled: AtomicBool::new(signaled),
            journal: self.journal.clone(),
        }))
    }

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>> {
        Ok(Arc::new(MockSemaphore { id: self.next_id() }))
    }

    fn submit(&self, info: &SubmitInfo) -> Result<()> {
        self.bump(|stats| stats.submits += 1);
        let lists: Vec<String> = info.command_lists.iter()
            .map(|cmd| format!("cmd#{}", command_list_id(*cmd)))
            .collect();
        let waits: Vec<String> = info.wait.iter()
            .map(|(semaphore, _)| format!("sem#{}", semaphore_id(*semaphore)))
            .collect();
        let signals: Vec<String> = info.signal.iter()
            .map(|semaphore| format!("sem#{}", semaphore_id(*semaphore)))
            .collect();
        let fence = match info.fence {
            Some(fence) => {
                fence_signal(fence);
                format!("fence#{}", fence_id(fence))
            }
            None => "none".to_string(),
        };
        self.log(format!(
            "submit:{:?} [{}] wait=[{}] signal=[{}] fence={}",
            info.queue, lists.join(","), waits.join(","), signals.join(","), fence
        ));
        Ok(())
    }

    fn submit_and_wait(&self, queue: QueueType, command_lists: &[&dyn CommandList]) -> Result<()> {
        self.submit(&SubmitInfo { queue, command_lists, wait: &[], signal: &[], fence: None })
    }

    fn queue_family_index(&self, queue: QueueType) -> u32 {
        match queue {
            QueueType::Graphics => self.graphics_family,
            QueueType::Compute => self.compute_family,
        }
    }

    fn wait_idle(&self) -> Result<()> {
        self.log("device:wait_idle".to_string());
        Ok(())
    }

    fn stats(&self) -> DeviceStats {
        self.stats.lock().map(|stats| *stats).unwrap_or_default()
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

/// Failure injection for a MockSwapchain already moved into its owner
#[derive(Default)]
pub struct SwapchainControl {
    /// Number of upcoming acquires that report out-of-date
    pub acquire_out_of_date: AtomicU32,
    /// Number of upcoming acquires that succeed but report suboptimal
    pub acquire_suboptimal: AtomicU32,
    /// Number of upcoming presents that report out-of-date
    pub present_out_of_date: AtomicU32,
    /// Number of upcoming presents that report suboptimal
    pub present_suboptimal: AtomicU32,
}

impl SwapchainControl {
    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

pub struct MockSwapchain {
    journal: Journal,
    control: Arc<SwapchainControl>,
    width: u32,
    height: u32,
    image_count: u32,
    next_image: u32,
    frame: usize,
    current_available: usize,
    image_available: Vec<Arc<dyn Semaphore>>,
    render_finished: Vec<Arc<dyn Semaphore>>,
}

impl MockSwapchain {
    pub fn control(&self) -> Arc<SwapchainControl> {
        self.control.clone()
    }
}

impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self) -> Result<AcquireOutcome> {
        if SwapchainControl::take(&self.control.acquire_out_of_date) {
            push(&self.journal, "swapchain:acquire out_of_date".to_string());
            return Ok(AcquireOutcome::OutOfDate);
        }
        let suboptimal = SwapchainControl::take(&self.control.acquire_suboptimal);
        let index = self.next_image;
        self.next_image = (self.next_image + 1) % self.image_count;
        self.current_available = self.frame % self.image_available.len();
        self.frame += 1;
        push(&self.journal, format!("swapchain:acquire {}", index));
        Ok(AcquireOutcome::Acquired { index, suboptimal })
    }

    fn image_available_semaphore(&self) -> Arc<dyn Semaphore> {
        self.image_available[self.current_available].clone()
    }

    fn render_finished_semaphore(&self, index: u32) -> Arc<dyn Semaphore> {
        self.render_finished[index as usize % self.render_finished.len()].clone()
    }

    fn record_present_blit(
        &self,
        cmd: &mut dyn CommandList,
        src: &dyn Texture,
        image_index: u32,
    ) -> Result<()> {
        push(&self.journal, format!(
            "cmd#{}:present_blit texture#{} image={}",
            command_list_id(cmd), texture_id(src), image_index
        ));
        Ok(())
    }

    fn present(&mut self, image_index: u32) -> Result<PresentOutcome> {
        if SwapchainControl::take(&self.control.present_out_of_date) {
            push(&self.journal, format!("swapchain:present {} out_of_date", image_index));
            return Ok(PresentOutcome::OutOfDate);
        }
        if SwapchainControl::take(&self.control.present_suboptimal) {
            push(&self.journal, format!("swapchain:present {} suboptimal", image_index));
            return Ok(PresentOutcome::Suboptimal);
        }
        push(&self.journal, format!("swapchain:present {}", image_index));
        Ok(PresentOutcome::Presented)
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.width = width;
        self.height = height;
        self.next_image = 0;
        push(&self.journal, format!("swapchain:recreate {}x{}", width, height));
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.image_count as usize
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        TextureFormat::B8G8R8A8_SRGB
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
