use super::*;

fn slot(x: f64, y: f64, w: f64, h: f64, target: (f64, f64)) -> SlotGeometry {
    SlotGeometry {
        slot_id: "main".to_string(),
        rect: Rect::new(x, y, x + w, y + h),
        width_px: w as u32,
        height_px: h as u32,
        target: Point::new(x + target.0, y + target.1),
        desired_face_ratio: Some(0.25),
        template_type: TemplateType::Sticker,
        min_zoom: 0.5,
        max_zoom: 2.5,
    }
}

fn feature(x: f64, y: f64, size: f64, w: f64, h: f64) -> AnchorObservation {
    AnchorObservation::Feature {
        point: Point::new(x, y),
        feature_size: size,
        photo_size: Size::new(w, h),
    }
}

fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "{a} vs {b}");
}

fn covers(p: &SlotPlacement, slot: &SlotGeometry, photo: Size) -> bool {
    let b = p.placed_bounds(photo);
    let eps = 1e-9;
    b.x0 <= slot.rect.x0 + eps
        && b.y0 <= slot.rect.y0 + eps
        && b.x1 >= slot.rect.x1 - eps
        && b.y1 >= slot.rect.y1 - eps
}

#[test]
fn face_anchor_lands_on_target() {
    let s = slot(100.0, 150.0, 600.0, 600.0, (300.0, 210.0));
    let obs = feature(512.0, 384.0, 140.0, 1024.0, 768.0);
    let p = solve(&s, &obs);

    assert_close(p.scale, 150.0 / 140.0, 1e-12);
    assert!(!p.zoom_clamped);
    assert!(p.full_coverage);
    assert_eq!(p.coverage_shift, Vec2::ZERO);

    let landed = p.map_point(Point::new(512.0, 384.0));
    assert_close(landed.x, 400.0, 1e-6);
    assert_close(landed.y, 360.0, 1e-6);

    assert_close(p.translate.x, -148.571_428_571, 1e-6);
    assert_close(p.translate.y, -51.428_571_428, 1e-6);
    let local = p.slot_local_translate(&s);
    assert_close(local.x, -248.571_428_571, 1e-6);
    assert_close(local.y, -201.428_571_428, 1e-6);
    assert!(covers(&p, &s, Size::new(1024.0, 768.0)));
}

#[test]
fn fit_to_slot_covers_and_centers() {
    let mut s = slot(0.0, 0.0, 300.0, 300.0, (150.0, 90.0));
    s.max_zoom = 3.0;
    let obs = AnchorObservation::FitToSlot {
        photo_size: Size::new(400.0, 200.0),
    };
    let p = solve(&s, &obs);
    assert_close(p.raw_scale, 1.5, 1e-12);
    assert_close(p.scale, 1.5, 1e-12);
    assert!(!p.zoom_clamped);
    assert_close(p.translate.x, -150.0, 1e-9);
    assert_close(p.translate.y, 0.0, 1e-9);
    assert!(covers(&p, &s, Size::new(400.0, 200.0)));
}

#[test]
fn fit_to_slot_clamped_by_max_zoom_reports_partial_coverage() {
    let mut s = slot(0.0, 0.0, 300.0, 300.0, (150.0, 90.0));
    s.max_zoom = 1.2;
    let obs = AnchorObservation::FitToSlot {
        photo_size: Size::new(400.0, 200.0),
    };
    let p = solve(&s, &obs);
    assert_close(p.raw_scale, 1.5, 1e-12);
    assert_close(p.scale, 1.2, 1e-12);
    assert!(p.zoom_clamped);
    assert!(!p.full_coverage);

    let b = p.placed_bounds(Size::new(400.0, 200.0));
    assert!(b.x0 <= 0.0 && b.x1 >= 300.0);
    assert!(b.y0 >= 0.0 && b.y1 <= 300.0);
    assert_close(b.center().y, 150.0, 1e-9);
}

#[test]
fn scale_always_within_zoom_bounds() {
    let s = slot(0.0, 0.0, 400.0, 400.0, (200.0, 120.0));
    for size in [1.0, 10.0, 40.0, 100.0, 1_000.0, 100_000.0] {
        let p = solve(&s, &feature(500.0, 500.0, size, 1000.0, 1000.0));
        assert!(p.scale >= s.min_zoom && p.scale <= s.max_zoom, "{}", p.scale);
        assert_eq!(p.zoom_clamped, p.raw_scale != p.scale);
    }
}

#[test]
fn coverage_shift_is_minimal_per_axis() {
    // Anchor near the photo's left edge would expose the slot's left side.
    let s = slot(0.0, 0.0, 200.0, 200.0, (100.0, 60.0));
    let obs = feature(20.0, 300.0, 50.0, 600.0, 600.0);
    let p = solve(&s, &obs);
    assert_close(p.scale, 1.0, 1e-12);
    assert_close(p.translate.x, 0.0, 1e-9);
    assert_close(p.coverage_shift.x, -80.0, 1e-9);
    assert_close(p.coverage_shift.y, 0.0, 1e-9);
    assert!(p.full_coverage);
    assert!(covers(&p, &s, Size::new(600.0, 600.0)));
}

#[test]
fn missing_ratio_frame_covers_but_keeps_anchor() {
    let mut s = slot(0.0, 0.0, 300.0, 300.0, (150.0, 100.0));
    s.desired_face_ratio = None;
    s.template_type = TemplateType::Frame;
    s.max_zoom = 3.0;
    let obs = feature(400.0, 200.0, 80.0, 800.0, 600.0);
    let p = solve(&s, &obs);
    assert_close(p.scale, 0.5, 1e-12);
    assert!(p.full_coverage);
    let landed = p.map_point(Point::new(400.0, 200.0));
    assert_close(landed.x, 150.0, 1e-9);
    assert_close(landed.y, 100.0, 1e-9);
}

#[test]
fn missing_ratio_sticker_fills_slot_height() {
    let mut s = slot(0.0, 0.0, 300.0, 300.0, (150.0, 100.0));
    s.desired_face_ratio = None;
    s.max_zoom = 3.0;
    let obs = feature(400.0, 200.0, 80.0, 800.0, 600.0);
    let p = solve(&s, &obs);
    assert_close(p.scale, STICKER_FILL_RATIO * 300.0 / 600.0, 1e-12);
    assert!(!p.zoom_clamped);
    assert!(!p.full_coverage);
    let landed = p.map_point(Point::new(400.0, 200.0));
    assert_close(landed.x, 150.0, 1e-9);
    assert_close(landed.y, 100.0, 1e-9);
}

#[test]
fn template_type_changes_ratioless_scale() {
    let mut sticker = slot(0.0, 0.0, 400.0, 400.0, (200.0, 120.0));
    sticker.desired_face_ratio = None;
    let mut frame = sticker.clone();
    frame.template_type = TemplateType::Frame;

    let obs = feature(300.0, 200.0, 90.0, 600.0, 450.0);
    let a = solve(&sticker, &obs);
    let b = solve(&frame, &obs);
    assert_close(a.scale, 0.8, 1e-12);
    assert_close(b.scale, 400.0 / 450.0, 1e-12);
    assert!(a.scale < b.scale);
}

#[test]
fn ratio_overrides_template_type() {
    let mut frame = slot(0.0, 0.0, 400.0, 400.0, (200.0, 120.0));
    frame.template_type = TemplateType::Frame;
    let sticker = slot(0.0, 0.0, 400.0, 400.0, (200.0, 120.0));
    let obs = feature(300.0, 200.0, 100.0, 600.0, 450.0);
    assert_eq!(solve(&frame, &obs).scale, solve(&sticker, &obs).scale);
    assert_close(solve(&frame, &obs).scale, 1.0, 1e-12);
}

#[test]
fn solve_is_deterministic() {
    let s = slot(10.0, 20.0, 333.0, 217.0, (111.0, 70.0));
    let obs = feature(123.4, 56.7, 33.3, 640.0, 480.0);
    assert_eq!(solve(&s, &obs), solve(&s, &obs));
}

#[test]
fn placement_serializes_camel_case() {
    let s = slot(0.0, 0.0, 100.0, 100.0, (50.0, 30.0));
    let p = solve(&s, &feature(50.0, 50.0, 25.0, 100.0, 100.0));
    let v = serde_json::to_value(&p).unwrap();
    assert_eq!(v["slotId"], "main");
    assert!(v["zoomClamped"].is_boolean());
    assert!(v["translate"]["x"].is_number());
}
