use super::*;
use std::cell::Cell;
use crate::graphics_device::{
    BindingGroupLayoutDesc, BindingResource, BindingType, Pipeline, ShaderStageFlags,
    mock_graphics_device::MockGraphicsDevice,
};
use crate::post_process::test_support::blit_pipeline;

fn uniform_pipeline(device: &MockGraphicsDevice) -> Arc<dyn Pipeline> {
    blit_pipeline(
        device,
        BindingGroupLayoutDesc::default().with(BindingType::UniformBuffer, ShaderStageFlags::VERTEX),
    )
}

fn write(ring: &mut UniformRing, device: &MockGraphicsDevice, pipeline: &Arc<dyn Pipeline>, slot: usize, binds: &Cell<u32>) {
    ring.write(device, slot, &[0u8; 64], |buffer| {
        binds.set(binds.get() + 1);
        device.create_binding_group(pipeline, 0, &[BindingResource::UniformBuffer(buffer.as_ref())])
    })
    .unwrap();
}

#[test]
fn test_slots_created_on_first_write() {
    let device = MockGraphicsDevice::new();
    let pipeline = uniform_pipeline(&device);
    let mut ring = UniformRing::new();
    let binds = Cell::new(0);

    assert!(ring.is_empty());
    write(&mut ring, &device, &pipeline, 0, &binds);
    write(&mut ring, &device, &pipeline, 1, &binds);
    write(&mut ring, &device, &pipeline, 0, &binds);
    write(&mut ring, &device, &pipeline, 1, &binds);

    assert_eq!(ring.len(), 2);
    assert_eq!(binds.get(), 2);
    assert_eq!(device.count("binding_group#"), 2);
    assert_eq!(device.count(":update 64"), 4);
}

#[test]
fn test_slots_own_distinct_buffers() {
    let device = MockGraphicsDevice::new();
    let pipeline = uniform_pipeline(&device);
    let mut ring = UniformRing::new();
    let binds = Cell::new(0);

    write(&mut ring, &device, &pipeline, 0, &binds);
    let first = ring.buffer().unwrap().clone();
    write(&mut ring, &device, &pipeline, 1, &binds);
    let second = ring.buffer().unwrap().clone();
    assert!(!Arc::ptr_eq(&first, &second));

    write(&mut ring, &device, &pipeline, 0, &binds);
    assert!(Arc::ptr_eq(ring.buffer().unwrap(), &first));
}

#[test]
fn test_group_before_write_fails() {
    let ring = UniformRing::new();
    assert!(ring.group().is_err());
    assert!(ring.buffer().is_none());
}

#[test]
fn test_sparse_slot_index() {
    let device = MockGraphicsDevice::new();
    let pipeline = uniform_pipeline(&device);
    let mut ring = UniformRing::new();
    let binds = Cell::new(0);

    write(&mut ring, &device, &pipeline, 2, &binds);
    assert_eq!(ring.len(), 1);
    assert!(ring.group().is_ok());
}

#[test]
fn test_clear_drops_buffers() {
    let device = MockGraphicsDevice::new();
    let pipeline = uniform_pipeline(&device);
    let mut ring = UniformRing::new();
    let binds = Cell::new(0);

    write(&mut ring, &device, &pipeline, 0, &binds);
    write(&mut ring, &device, &pipeline, 1, &binds);
    ring.clear();

    assert!(ring.is_empty());
    assert!(ring.group().is_err());
    let dropped = device.entries().iter().filter(|e| e.starts_with("buffer#") && e.ends_with(":drop")).count();
    assert_eq!(dropped, 2);
}

#[test]
fn test_failed_bind_leaves_slot_empty() {
    let device = MockGraphicsDevice::new();
    let mut ring = UniformRing::new();
    let result = ring.write(&device, 0, &[0u8; 16], |_| {
        Err(crate::error::Error::BackendError("no layout".to_string()))
    });
    assert!(result.is_err());
    assert!(ring.is_empty());
    assert!(ring.group().is_err());
}
