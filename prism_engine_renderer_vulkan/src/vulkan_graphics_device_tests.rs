use super::*;

fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties {
        queue_flags: flags,
        queue_count: 1,
        ..Default::default()
    }
}

fn graphics_compute() -> vk::QueueFlags {
    vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER
}

#[test]
fn test_single_family_serves_everything() {
    let families = [family(graphics_compute())];
    let selected = select_queue_families(&families, true, |_| true).unwrap();
    assert_eq!(selected, QueueFamilies { graphics: 0, compute: 0, present: 0 });
}

#[test]
fn test_dedicated_compute_family_when_preferred() {
    let families = [
        family(graphics_compute()),
        family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER),
    ];
    let selected = select_queue_families(&families, true, |_| true).unwrap();
    assert_eq!(selected.graphics, 0);
    assert_eq!(selected.compute, 1);
}

#[test]
fn test_dedicated_compute_ignored_when_not_preferred() {
    let families = [
        family(graphics_compute()),
        family(vk::QueueFlags::COMPUTE),
    ];
    let selected = select_queue_families(&families, false, |_| true).unwrap();
    assert_eq!(selected.compute, 0);
}

#[test]
fn test_transfer_only_family_is_not_compute() {
    let families = [
        family(graphics_compute()),
        family(vk::QueueFlags::TRANSFER),
    ];
    let selected = select_queue_families(&families, true, |_| true).unwrap();
    assert_eq!(selected.compute, 0);
}

#[test]
fn test_present_prefers_graphics_family() {
    let families = [family(vk::QueueFlags::COMPUTE), family(graphics_compute())];
    let selected = select_queue_families(&families, true, |_| true).unwrap();
    assert_eq!(selected.graphics, 1);
    assert_eq!(selected.present, 1);
}

#[test]
fn test_present_falls_back_to_other_family() {
    let families = [family(graphics_compute()), family(vk::QueueFlags::TRANSFER)];
    let selected = select_queue_families(&families, false, |index| index == 1).unwrap();
    assert_eq!(selected.graphics, 0);
    assert_eq!(selected.present, 1);
}

#[test]
fn test_no_graphics_family() {
    let families = [family(vk::QueueFlags::COMPUTE)];
    assert!(select_queue_families(&families, true, |_| true).is_none());
}

#[test]
fn test_no_present_support() {
    let families = [family(graphics_compute())];
    assert!(select_queue_families(&families, true, |_| false).is_none());
}

#[test]
fn test_empty_family_is_skipped() {
    let mut empty = family(graphics_compute());
    empty.queue_count = 0;
    let families = [empty, family(graphics_compute())];
    let selected = select_queue_families(&families, true, |_| true).unwrap();
    assert_eq!(selected.graphics, 1);
}

#[test]
fn test_unique_families_dedup() {
    let families = QueueFamilies { graphics: 0, compute: 2, present: 0 };
    assert_eq!(unique_families(&families), vec![0, 2]);

    let shared = QueueFamilies { graphics: 1, compute: 1, present: 1 };
    assert_eq!(unique_families(&shared), vec![1]);
}

#[test]
fn test_discrete_gpu_ranks_first() {
    assert!(device_rank(vk::PhysicalDeviceType::DISCRETE_GPU) < device_rank(vk::PhysicalDeviceType::INTEGRATED_GPU));
    assert!(device_rank(vk::PhysicalDeviceType::INTEGRATED_GPU) < device_rank(vk::PhysicalDeviceType::CPU));
}
