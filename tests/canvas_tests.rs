use dualscreen::core::{
    Canvas, Color, DisplayPipeline, HeadlessPipeline, Resolution, Target, VsyncClock,
};
use dualscreen::display::DisplayPair;
use glam::Vec2;

// ============================================================================
// Canvas Core Functionality Tests
// ============================================================================

#[test]
fn test_canvas_new() {
    let canvas = Canvas::new(Resolution::new(640, 480));
    assert_eq!(canvas.resolution(), Resolution::new(640, 480));
    assert_eq!(canvas.as_bytes().len(), 640 * 480 * 4);
    assert_eq!(canvas.pixel(0, 0), Some(Color::TRANSPARENT));
}

#[test]
fn test_canvas_clear_opaque() {
    let mut canvas = Canvas::new(Resolution::new(100, 100));
    canvas.clear(Color::rgba(255, 128, 64, 255));

    let bytes = canvas.as_bytes();

    // Verify first pixel
    assert_eq!(&bytes[0..4], &[255, 128, 64, 255]);

    // Verify middle pixel
    let mid_idx = (50 * 100 + 50) * 4;
    assert_eq!(&bytes[mid_idx..mid_idx + 4], &[255, 128, 64, 255]);

    // Verify last pixel
    let last_idx = (100 * 100 - 1) * 4;
    assert_eq!(&bytes[last_idx..last_idx + 4], &[255, 128, 64, 255]);
}

#[test]
fn test_pixel_out_of_bounds() {
    let canvas = Canvas::new(Resolution::new(10, 10));
    assert_eq!(canvas.pixel(10, 0), None);
    assert_eq!(canvas.pixel(0, 10), None);
}

#[test]
fn test_translucent_rect_blends() {
    let mut canvas = Canvas::new(Resolution::new(10, 10));
    canvas.clear(Color::WHITE);
    canvas.fill_rect(2, 2, 4, 4, Color::rgba(0, 0, 0, 128));

    let inside = canvas.pixel(3, 3).unwrap();
    assert!(inside.r > 100 && inside.r < 155);
    assert_eq!(inside.a, 255);
    assert_eq!(canvas.pixel(7, 7), Some(Color::WHITE));
}

#[test]
fn test_blit_clips_at_edges() {
    let sprite = vec![Color::WHITE; 4 * 4];
    let mut canvas = Canvas::new(Resolution::new(8, 8));
    canvas.clear(Color::BLACK);

    canvas.blit(&sprite, 4, Vec2::new(0.0, 0.0), 1.0);

    assert_eq!(canvas.pixel(0, 0), Some(Color::WHITE));
    assert_eq!(canvas.pixel(1, 1), Some(Color::WHITE));
    assert_eq!(canvas.pixel(2, 2), Some(Color::BLACK));
}

#[test]
fn test_overlay_steps_darken_monotonically() {
    let mut previous = u8::MAX;
    for level in (0..255u16).step_by(10) {
        let mut canvas = Canvas::new(Resolution::new(2, 2));
        canvas.clear(Color::WHITE);
        canvas.overlay(Color::BLACK, level as f32 / 255.0);

        let red = canvas.pixel(1, 1).unwrap().r;
        assert!(red <= previous, "level {level} brightened the frame");
        previous = red;
    }
    assert!(previous < 10);
}

// ============================================================================
// Headless presentation
// ============================================================================

fn headless_pair() -> DisplayPair {
    DisplayPair::new(
        Box::new(HeadlessPipeline::new(Target::Primary, Resolution::new(16, 9))),
        Box::new(HeadlessPipeline::new(Target::Secondary, Resolution::new(8, 5))),
        VsyncClock::unpaced(),
    )
    .unwrap()
}

#[test]
fn test_pair_renders_each_target_at_its_resolution() {
    let mut pair = headless_pair();

    pair.render(Target::Primary, |canvas| {
        assert_eq!(canvas.resolution(), Resolution::new(16, 9));
        canvas.clear(Color::WHITE);
    })
    .unwrap();
    pair.render(Target::Secondary, |canvas| {
        assert_eq!(canvas.resolution(), Resolution::new(8, 5));
    })
    .unwrap();
    pair.wait_for_sync();

    assert_eq!(pair.pipeline(Target::Primary).frame_count(), 1);
    assert_eq!(pair.pipeline(Target::Secondary).frame_count(), 1);
    assert!(!pair.is_first_frame());
}

#[test]
fn test_pair_outputs_toggle_together() {
    let mut pair = headless_pair();
    pair.render_blank().unwrap();
    pair.wait_for_sync();

    pair.set_outputs_enabled(true).unwrap();
    assert!(pair.pipeline(Target::Primary).is_enabled());
    assert!(pair.pipeline(Target::Secondary).is_enabled());

    pair.set_outputs_enabled(false).unwrap();
    assert!(!pair.pipeline(Target::Primary).is_enabled());
    assert!(!pair.pipeline(Target::Secondary).is_enabled());
}
