use geoquiz::generate::boundary_questions;
use geoquiz::{
    Answer, DEMO_MAP_SURFACE, Draw, GestureOutcome, GestureTracker, MapProjection, MapSurface,
    Point, Rect, RegionHitTester, RegionIndex, SurfaceSize, ViewportController, demo_boundaries,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn full() -> Rect {
    Rect::new(0.0, 0.0, 1000.0, 800.0)
}

#[test]
fn zoom_to_half_and_back() {
    init_logging();
    let mut controller = ViewportController::new(full());

    let zoomed = controller.zoom_by(0.5, Some(Point::new(500.0, 400.0)));
    assert_eq!(zoomed, Rect::new(250.0, 200.0, 500.0, 400.0));
    assert!(controller.is_zoomed());

    assert_eq!(controller.reset_to_full_extent(), full());
    assert!(!controller.is_zoomed());
}

#[test]
fn random_navigation_stays_within_bounds() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(77);
    let mut controller = ViewportController::new(full());

    for step in 0..500 {
        let viewport = match rng.gen_range(0..4) {
            0 => {
                let focus = Point::new(rng.gen_range(-200.0..1200.0), rng.gen_range(-200.0..1000.0));
                controller.zoom_by(rng.gen_range(0.2..2.5), Some(focus))
            }
            1 => controller.zoom_by(rng.gen_range(0.2..2.5), None),
            2 => controller.pan(rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0)),
            _ => {
                if rng.gen_bool(0.1) {
                    controller.reset_to_full_extent()
                } else {
                    controller.pan(0.0, 0.0)
                }
            }
        };

        assert!(
            viewport.width >= 150.0 - 1e-9 && viewport.width <= 1000.0 + 1e-9,
            "step {step}: width {}",
            viewport.width
        );
        assert!(viewport.intersects(&full()), "step {step}: {viewport:?} left the map");
    }
}

#[test]
fn zoom_keeps_the_focus_in_place() {
    let mut controller = ViewportController::new(full());
    let focus = Point::new(300.0, 200.0);

    let before = controller.viewport();
    let after = controller.zoom_by(0.5, Some(focus));

    let relative = |rect: Rect| ((focus.x - rect.x) / rect.width, (focus.y - rect.y) / rect.height);
    let (bx, by) = relative(before);
    let (ax, ay) = relative(after);
    assert!((bx - ax).abs() < 1e-9);
    assert!((by - ay).abs() < 1e-9);
}

#[test]
fn ward_click_answers_a_boundary_question() {
    init_logging();
    let surface = MapSurface::from_json(DEMO_MAP_SURFACE).expect("demo calibration is valid");
    let boundaries = demo_boundaries();
    let tester = RegionHitTester::new(RegionIndex::projected(&boundaries, &surface.projection), true);
    let gestures = GestureTracker::new(SurfaceSize::new(1000.0, 1000.0));

    // center of the Sakai 北区 square
    let click = tester
        .hit(surface.project(34.58, 135.51), &gestures)
        .expect("click lands on a ward");
    assert_eq!(click.code, "27146");
    assert_eq!(click.name, "北区");

    let mut rng = StdRng::seed_from_u64(9);
    let questions = boundary_questions(&mut rng, &boundaries, Draw::new(boundaries.len()));
    let answer = Answer::from(click);

    for question in &questions {
        assert_eq!(
            question.is_correct(&answer),
            question.correct_answer_id == "27146",
            "only the Sakai ward accepts this click"
        );
    }
}

#[test]
fn release_after_a_drag_selects_nothing() {
    let surface = MapSurface::from_json(DEMO_MAP_SURFACE).expect("demo calibration is valid");
    let boundaries = demo_boundaries();
    let tester = RegionHitTester::new(RegionIndex::projected(&boundaries, &surface.projection), true);
    let mut viewport = ViewportController::new(surface.extent);
    viewport.zoom_by(0.5, None);
    let mut gestures = GestureTracker::new(SurfaceSize::new(1000.0, 1000.0));

    gestures.touch_start(&[Point::new(100.0, 100.0)]);
    assert!(gestures.touch_move(&[Point::new(180.0, 160.0)], &mut viewport));
    assert_eq!(
        gestures.touch_end(&[], 0.0, &mut viewport),
        Some(GestureOutcome::Gesture)
    );

    let target = surface.project(34.58, 135.51);
    assert_eq!(tester.hit(target, &gestures), None);

    gestures.touch_start(&[Point::new(500.0, 500.0)]);
    assert!(!gestures.gesture_in_progress());
    assert!(tester.hit(target, &gestures).is_some());
}

#[test]
fn ward_click_through_a_fitted_surface() {
    init_logging();
    let national = MapSurface::from_json(DEMO_MAP_SURFACE).expect("demo calibration is valid");
    let boundaries = demo_boundaries();
    let (south_west, north_east) = boundaries.bounds().expect("wards have outlines");
    let fitted = MapSurface {
        extent: national.extent,
        projection: MapProjection::fit(national.extent, south_west, north_east),
    };
    let tester = RegionHitTester::new(RegionIndex::projected(&boundaries, &fitted.projection), true);
    let mut viewport = ViewportController::new(fitted.extent);
    let gestures = GestureTracker::new(SurfaceSize::new(500.0, 500.0));

    let target = fitted.project(34.58, 135.51);
    assert!(fitted.extent.contains(target), "{target:?} is off the map");

    // screen position of the ward centre on a 500x500 element
    let to_screen = |viewport: Rect| {
        Point::new(
            (target.x - viewport.x) / viewport.width * 500.0,
            (target.y - viewport.y) / viewport.height * 500.0,
        )
    };
    let size = SurfaceSize::new(500.0, 500.0);

    let at = viewport.screen_to_map(to_screen(viewport.viewport()), size);
    let click = tester.hit(at, &gestures).expect("click lands on a ward");
    assert_eq!(click.code, "27146");

    let zoomed = viewport.zoom_by(0.5, Some(target));
    let at = viewport.screen_to_map(to_screen(zoomed), size);
    assert_eq!(tester.hit(at, &gestures).map(|click| click.code), Some("27146".to_string()));
}
