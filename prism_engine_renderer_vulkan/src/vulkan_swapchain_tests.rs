use super::*;

fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR {
        format,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }
}

fn capabilities(current: (u32, u32), min: (u32, u32), max: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        current_extent: vk::Extent2D { width: current.0, height: current.1 },
        min_image_extent: vk::Extent2D { width: min.0, height: min.1 },
        max_image_extent: vk::Extent2D { width: max.0, height: max.1 },
        ..Default::default()
    }
}

// ============================================================================
// SURFACE FORMAT
// ============================================================================

#[test]
fn test_prefers_bgra_srgb() {
    let available = [
        surface_format(vk::Format::R8G8B8A8_UNORM),
        surface_format(vk::Format::B8G8R8A8_UNORM),
        surface_format(vk::Format::B8G8R8A8_SRGB),
    ];
    let (chosen, format) = choose_surface_format(&available).unwrap();
    assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
    assert_eq!(format, TextureFormat::B8G8R8A8_SRGB);
}

#[test]
fn test_falls_back_to_bgra_unorm() {
    let available = [
        surface_format(vk::Format::R8G8B8A8_SRGB),
        surface_format(vk::Format::B8G8R8A8_UNORM),
    ];
    let (_, format) = choose_surface_format(&available).unwrap();
    assert_eq!(format, TextureFormat::B8G8R8A8_UNORM);
}

#[test]
fn test_falls_back_to_any_known_format() {
    let available = [
        surface_format(vk::Format::A2B10G10R10_UNORM_PACK32),
        surface_format(vk::Format::R8G8B8A8_UNORM),
    ];
    let (_, format) = choose_surface_format(&available).unwrap();
    assert_eq!(format, TextureFormat::R8G8B8A8_UNORM);
}

#[test]
fn test_no_known_format_is_unsupported() {
    let available = [surface_format(vk::Format::A2B10G10R10_UNORM_PACK32)];
    assert!(matches!(choose_surface_format(&available), Err(Error::UnsupportedFormat(_))));
    assert!(matches!(choose_surface_format(&[]), Err(Error::UnsupportedFormat(_))));
}

// ============================================================================
// PRESENT MODE
// ============================================================================

#[test]
fn test_supported_present_mode_is_kept() {
    let available = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
    assert_eq!(choose_present_mode(PresentMode::Mailbox, &available), vk::PresentModeKHR::MAILBOX);
}

#[test]
fn test_unsupported_present_mode_falls_back_to_fifo() {
    let available = [vk::PresentModeKHR::FIFO];
    assert_eq!(choose_present_mode(PresentMode::Immediate, &available), vk::PresentModeKHR::FIFO);
    assert_eq!(choose_present_mode(PresentMode::Mailbox, &available), vk::PresentModeKHR::FIFO);
}

// ============================================================================
// EXTENT AND IMAGE COUNT
// ============================================================================

#[test]
fn test_fixed_surface_extent_wins() {
    let caps = capabilities((1280, 720), (1, 1), (4096, 4096));
    assert_eq!(choose_extent(&caps, 800, 600), vk::Extent2D { width: 1280, height: 720 });
}

#[test]
fn test_free_extent_is_clamped() {
    let caps = capabilities((u32::MAX, u32::MAX), (64, 64), (2048, 1024));
    assert_eq!(choose_extent(&caps, 800, 600), vk::Extent2D { width: 800, height: 600 });
    assert_eq!(choose_extent(&caps, 4000, 4000), vk::Extent2D { width: 2048, height: 1024 });
    assert_eq!(choose_extent(&caps, 10, 10), vk::Extent2D { width: 64, height: 64 });
}

#[test]
fn test_image_count_respects_maximum() {
    let mut caps = vk::SurfaceCapabilitiesKHR { min_image_count: 2, max_image_count: 0, ..Default::default() };
    assert_eq!(choose_image_count(&caps), 3);

    caps.max_image_count = 2;
    assert_eq!(choose_image_count(&caps), 2);
}
