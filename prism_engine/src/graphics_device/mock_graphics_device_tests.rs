use super::*;
use crate::graphics_device::{BufferUsage, MemoryLocation, TextureUsage, ImageLayout};

fn texture(device: &MockGraphicsDevice, width: u32, height: u32) -> Arc<dyn Texture> {
    device.create_texture(TextureDesc {
        width,
        height,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::SAMPLED,
        data: None,
    }).unwrap()
}

// ============================================================================
// RESOURCE CREATION
// ============================================================================

#[test]
fn test_create_texture_records_info_and_stats() {
    let device = MockGraphicsDevice::new();
    let tex = texture(&device, 64, 32);

    assert_eq!(tex.info().width, 64);
    assert_eq!(tex.info().height, 32);
    assert_eq!(device.stats().textures, 1);
    assert_eq!(device.count(":create 64x32"), 1);
}

#[test]
fn test_create_texture_zero_extent_fails() {
    let device = MockGraphicsDevice::new();
    let result = device.create_texture(TextureDesc {
        width: 0,
        height: 16,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::SAMPLED,
        data: None,
    });
    assert!(result.is_err());
    assert_eq!(device.stats().textures, 0);
}

#[test]
fn test_texture_drop_is_journaled() {
    let device = MockGraphicsDevice::new();
    let tex = texture(&device, 8, 8);
    drop(tex);
    assert_eq!(device.count(":drop"), 1);
}

#[test]
fn test_buffer_update_bounds() {
    let device = MockGraphicsDevice::new();
    let buffer = device.create_buffer(BufferDesc {
        size: 16,
        usage: BufferUsage::UNIFORM,
        location: MemoryLocation::CpuToGpu,
    }).unwrap();

    assert!(buffer.update(8, &[1; 8]).is_ok());
    assert!(buffer.update(12, &[1; 8]).is_err());
    assert_eq!(buffer.size(), 16);
}

// ============================================================================
// SYNCHRONIZATION
// ============================================================================

#[test]
fn test_fence_wait_requires_signal() {
    let device = MockGraphicsDevice::new();
    let fence = device.create_fence(true).unwrap();

    assert!(fence.wait().is_ok());
    fence.reset().unwrap();
    assert!(!fence.is_signaled().unwrap());
    assert!(fence.wait().is_err());
}

#[test]
fn test_submit_signals_fence() {
    let device = MockGraphicsDevice::new();
    let fence = device.create_fence(false).unwrap();
    let mut cmd = device.create_command_list(QueueType::Graphics).unwrap();
    cmd.begin().unwrap();
    cmd.end().unwrap();

    device.submit(&SubmitInfo {
        queue: QueueType::Graphics,
        command_lists: &[cmd.as_ref()],
        wait: &[],
        signal: &[],
        fence: Some(fence.as_ref()),
    }).unwrap();

    assert!(fence.is_signaled().unwrap());
    assert_eq!(device.stats().submits, 1);
    assert_eq!(device.count("submit:Graphics"), 1);
}

#[test]
fn test_end_without_begin_fails() {
    let device = MockGraphicsDevice::new();
    let mut cmd = device.create_command_list(QueueType::Compute).unwrap();
    assert!(cmd.end().is_err());
    assert_eq!(cmd.queue(), QueueType::Compute);
}

// ============================================================================
// COMMAND JOURNAL
// ============================================================================

#[test]
fn test_command_journal_order() {
    let device = MockGraphicsDevice::new();
    let tex = texture(&device, 4, 4);
    let mut cmd = device.create_command_list(QueueType::Graphics).unwrap();
    device.clear_journal();

    cmd.begin().unwrap();
    cmd.pipeline_barrier(&[], &[ImageBarrier::attachment_to_sampled(tex.clone())]).unwrap();
    cmd.draw(3, 0).unwrap();
    cmd.dispatch(4, 1, 1).unwrap();
    cmd.end().unwrap();

    let entries = device.entries();
    assert_eq!(entries.len(), 5);
    assert!(entries[0].ends_with(":begin"));
    assert!(entries[1].contains("ColorAttachment->ShaderReadOnly"));
    assert!(entries[2].ends_with(":draw 3"));
    assert!(entries[3].ends_with(":dispatch 4 1 1"));
    assert!(entries[4].ends_with(":end"));
}

#[test]
fn test_sampled_to_attachment_barrier_layouts() {
    let device = MockGraphicsDevice::new();
    let tex = texture(&device, 4, 4);
    let barrier = ImageBarrier::sampled_to_attachment(tex);
    assert_eq!(barrier.old_layout, ImageLayout::ShaderReadOnly);
    assert_eq!(barrier.new_layout, ImageLayout::ColorAttachment);
    assert_eq!(barrier.dst_stage, PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
}

#[test]
fn test_queue_families() {
    let split = MockGraphicsDevice::new();
    assert_ne!(
        split.queue_family_index(QueueType::Graphics),
        split.queue_family_index(QueueType::Compute)
    );

    let shared = MockGraphicsDevice::with_shared_queue();
    assert_eq!(
        shared.queue_family_index(QueueType::Graphics),
        shared.queue_family_index(QueueType::Compute)
    );
}

// ============================================================================
// SWAPCHAIN
// ============================================================================

#[test]
fn test_swapchain_acquire_rotates_images() {
    let device = MockGraphicsDevice::new();
    let mut swapchain = device.create_swapchain(800, 600, 3);

    let indices: Vec<AcquireOutcome> = (0..4).map(|_| swapchain.acquire_next_image().unwrap()).collect();
    assert_eq!(indices[0], AcquireOutcome::Acquired { index: 0, suboptimal: false });
    assert_eq!(indices[2], AcquireOutcome::Acquired { index: 2, suboptimal: false });
    assert_eq!(indices[3], AcquireOutcome::Acquired { index: 0, suboptimal: false });
}

#[test]
fn test_swapchain_failure_injection() {
    let device = MockGraphicsDevice::new();
    let mut swapchain = device.create_swapchain(800, 600, 2);
    let control = swapchain.control();
    control.acquire_out_of_date.store(1, Ordering::SeqCst);
    control.present_suboptimal.store(1, Ordering::SeqCst);

    assert_eq!(swapchain.acquire_next_image().unwrap(), AcquireOutcome::OutOfDate);
    assert!(matches!(swapchain.acquire_next_image().unwrap(), AcquireOutcome::Acquired { .. }));
    assert_eq!(swapchain.present(0).unwrap(), PresentOutcome::Suboptimal);
    assert_eq!(swapchain.present(0).unwrap(), PresentOutcome::Presented);
}

#[test]
fn test_swapchain_recreate_updates_extent() {
    let device = MockGraphicsDevice::new();
    let mut swapchain = device.create_swapchain(800, 600, 2);
    swapchain.recreate(1024, 768).unwrap();
    assert_eq!(swapchain.width(), 1024);
    assert_eq!(swapchain.height(), 768);
    assert_eq!(device.count("swapchain:recreate 1024x768"), 1);
}
