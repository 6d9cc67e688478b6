use super::*;

fn close(a: Point, b: Point) -> bool {
    (a - b).hypot() < 1e-9
}

#[test]
fn placement_scales_then_translates() {
    let a = placement(2.0, Vec2::new(10.0, -5.0));
    assert!(close(a * Point::new(3.0, 4.0), Point::new(16.0, 3.0)));
}

#[test]
fn mirror_flips_about_photo_center() {
    let m = mirror_x(100.0);
    assert!(close(m * Point::new(0.0, 7.0), Point::new(100.0, 7.0)));
    assert!(close(m * Point::new(30.0, 7.0), Point::new(70.0, 7.0)));
    assert!(close(m * (m * Point::new(12.5, 3.0)), Point::new(12.5, 3.0)));
}

#[test]
fn mirrored_placement_flips_before_scaling() {
    let a = photo_to_canvas(0.5, Vec2::new(1.0, 1.0), 40.0, true);
    assert!(close(a * Point::new(10.0, 0.0), Point::new(16.0, 1.0)));
    let plain = photo_to_canvas(0.5, Vec2::new(1.0, 1.0), 40.0, false);
    assert!(close(plain * Point::new(10.0, 0.0), Point::new(6.0, 1.0)));
}

#[test]
fn placed_bounds_matches_affine_corners() {
    let photo = Rect::new(0.0, 0.0, 400.0, 200.0);
    let r = placed_bounds(1.5, Vec2::new(-150.0, 0.0), photo);
    assert_eq!(r, Rect::new(-150.0, 0.0, 450.0, 300.0));
    assert_eq!(compose(Affine::IDENTITY, Affine::scale(2.0)), Affine::scale(2.0));
}
