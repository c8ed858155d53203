use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roofshade::lowlevel::{difference_of, intersection_of, sweep_boundary};
use roofshade::{
    BuildingModel, ModelKind, ModelVariant, MultiPolygon, Point, Polygon, Precalculated, Structure,
};

const AREA_TOL: f64 = 1e-3;
/// Integer snapping leaves hairline slivers along slanted edges.
const SLIVER_TOL: f64 = 1e-2;

fn square_model() -> ModelKind {
    ModelKind::new(
        ModelVariant::Prismatic,
        Polygon::rect(0.0, 0.0, 20.0, 20.0),
        Point::new(1.0, 0.0),
        Point::new(0.0, 1.0),
    )
}

#[test]
fn square_example_areas() {
    let s = square_model().generate(5);
    assert_eq!(s.length(), 5);
    assert!((s.roof().area() - 400.0).abs() < AREA_TOL);
    assert!((s.projection().area() - 100.0).abs() < AREA_TOL);
    assert!((s.shade().area() - 175.0).abs() < AREA_TOL);

    let walls = s.projection().bbox();
    assert!((walls.min.x + 5.0).abs() < AREA_TOL);
    assert!(walls.max.x.abs() < AREA_TOL);
}

#[test]
fn generated_parts_do_not_overlap() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let x0: f64 = rng.random_range(-50.0..50.0);
        let y0: f64 = rng.random_range(-50.0..50.0);
        let w: f64 = rng.random_range(5.0..30.0);
        let h: f64 = rng.random_range(5.0..30.0);
        let angle: f64 = rng.random_range(0.0..std::f64::consts::TAU);
        let projection = Point::new(angle.cos(), angle.sin()) * 0.7;
        let shade = Point::new((angle + 2.0).cos(), (angle + 2.0).sin());
        let length: u32 = rng.random_range(1..25);

        let model = ModelKind::new(
            ModelVariant::Prismatic,
            Polygon::rect(x0, y0, x0 + w, y0 + h),
            projection,
            shade,
        );
        assert_parts_disjoint(&model.generate(length), AREA_TOL);
    }
}

fn assert_parts_disjoint(s: &Structure, tol: f64) {
    let roof_walls = intersection_of(s.roof(), s.projection()).unwrap();
    let walls_shade = intersection_of(s.projection(), s.shade()).unwrap();
    assert!(
        roof_walls.area() < tol,
        "roof/projection overlap {} at length {}",
        roof_walls.area(),
        s.length()
    );
    assert!(
        walls_shade.area() < tol,
        "projection/shade overlap {} at length {}",
        walls_shade.area(),
        s.length()
    );
}

fn rotated(coords: &[(f64, f64)], angle: f64) -> Polygon {
    let (sin, cos) = angle.sin_cos();
    let turned: Vec<(f64, f64)> = coords
        .iter()
        .map(|&(x, y)| (100.0 + x * cos - y * sin, 50.0 + x * sin + y * cos))
        .collect();
    Polygon::from_coords(&turned)
}

#[test]
fn concave_and_rotated_parts_do_not_overlap() {
    let l_shape = [
        (0.0, 0.0),
        (40.0, 0.0),
        (40.0, 15.0),
        (15.0, 15.0),
        (15.0, 35.0),
        (0.0, 35.0),
    ];
    let rect = [(0.0, 0.0), (25.0, 0.0), (25.0, 12.0), (0.0, 12.0)];
    let footprints = [
        Polygon::from_coords(&l_shape),
        rotated(&l_shape, 0.35),
        rotated(&l_shape, 2.2),
        rotated(&rect, 0.6),
        rotated(&rect, -1.1),
    ];
    let steps = [
        (Point::new(0.6, 0.6), Point::new(-0.8, 0.5)),
        (Point::new(-0.7, 0.3), Point::new(0.4, 0.9)),
        (Point::new(0.25, -0.9), Point::new(-0.6, -0.6)),
    ];
    for footprint in &footprints {
        for &(projection, shade) in &steps {
            let model = ModelKind::new(ModelVariant::Prismatic, footprint.clone(), projection, shade);
            for length in [1, 4, 13, 30] {
                let s = model.generate(length);
                assert!(!s.projection().is_empty());
                assert_parts_disjoint(&s, SLIVER_TOL);
            }
        }
    }
}

#[test]
fn generation_is_idempotent() {
    let model = square_model();
    assert_eq!(model.generate(9), model.generate(9));
    assert_ne!(model.generate(9), model.generate(10));
}

#[test]
fn concave_footprint_keeps_every_wall_component() {
    // U-shape opening upwards; walls swept to the right.
    let footprint = Polygon::from_coords(&[
        (0.0, 0.0),
        (30.0, 0.0),
        (30.0, 30.0),
        (20.0, 30.0),
        (20.0, 10.0),
        (10.0, 10.0),
        (10.0, 30.0),
        (0.0, 30.0),
    ]);
    let model = ModelKind::new(
        ModelVariant::Prismatic,
        footprint.clone(),
        Point::new(1.0, 0.0),
        Point::new(0.0, 1.0),
    );
    let s = model.generate(4);
    // left outer wall and the wall inside the notch
    assert!(s.projection().polygons().len() >= 2);
    let outside = difference_of(s.projection(), &MultiPolygon::from(footprint)).unwrap();
    assert!((outside.area() - s.projection().area()).abs() < AREA_TOL);
}

#[test]
fn boundary_sweep_of_zero_step_is_empty() {
    let square = Polygon::rect(0.0, 0.0, 10.0, 10.0);
    let swept = sweep_boundary(&square, Point::new(0.0, 0.0), 5.0).unwrap();
    assert!(swept.area() < AREA_TOL);
}

#[test]
fn cache_serves_the_same_structures() {
    let model = square_model();
    let cache = Precalculated::build(&model, 1, 12).unwrap();
    assert_eq!(cache.range(), 1..=12);
    for length in [1, 6, 12] {
        assert_eq!(cache.get(length), Some(&model.generate(length)));
    }
    assert!(cache.get(13).is_none());
}
