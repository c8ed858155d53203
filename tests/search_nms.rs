use nalgebra::Matrix3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roofshade::lowlevel::{for_each_pixel_inside, local_maxima};
use roofshade::search::{EstimationObserver, RoofCandidateEvent};
use roofshade::{ImageView, MultiPolygon, Point, Polygon, RoofEstimator, RoofSearchConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct CountingObserver {
    roofs: AtomicUsize,
}

impl EstimationObserver for CountingObserver {
    fn on_roof_candidate(&self, _event: &RoofCandidateEvent) {
        self.roofs.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn survivors_dominate_their_windows() {
    let (w, h) = (40, 30);
    let half = 3;
    let mut rng = StdRng::seed_from_u64(11);
    let data: Vec<f64> = (0..w * h).map(|_| rng.random_range(0.0..100.0)).collect();
    let view = ImageView::from_slice(&data, w, h).unwrap();
    let peaks = local_maxima(view, half);
    assert!(!peaks.is_empty());
    for peak in &peaks {
        for y in peak.y.saturating_sub(half)..=(peak.y + half).min(h - 1) {
            for x in peak.x.saturating_sub(half)..=(peak.x + half).min(w - 1) {
                assert!(data[y * w + x] <= peak.score);
            }
        }
    }
    assert!(peaks.windows(2).all(|p| p[0].score >= p[1].score));
}

#[test]
fn zero_surface_has_no_peaks() {
    let data = vec![0.0f64; 64];
    let view = ImageView::from_slice(&data, 8, 8).unwrap();
    assert!(local_maxima(view, 2).is_empty());
}

fn paint(data: &mut [u8], width: usize, height: usize, polygons: &MultiPolygon, value: u8) {
    for_each_pixel_inside(polygons, width, height, |x, y| data[y * width + x] = value);
}

#[test]
fn roof_search_recovers_displaced_roof() {
    let (w, h) = (100, 100);
    let footprint = Polygon::rect(40.0, 40.0, 60.0, 60.0);
    let mut data = vec![120u8; w * h];
    paint(
        &mut data,
        w,
        h,
        &MultiPolygon::from(footprint.translated(Point::new(3.0, 0.0))),
        230,
    );
    let tile = ImageView::from_slice(&data, w, h).unwrap();

    let observer = Arc::new(CountingObserver::default());
    let estimator = RoofEstimator::new(
        tile,
        None,
        Matrix3::identity(),
        Point::new(1.0, 0.0),
        Point::new(0.0, 1.0),
        RoofSearchConfig::default(),
    )
    .unwrap()
    .with_observer(observer.clone());
    assert_eq!(estimator.edges().width(), w);

    let search = estimator.locate(&footprint, Point::zeros(), 5, None).unwrap();
    assert!(!search.responses.is_empty());
    assert!(search.responses.len() <= 5);
    assert!(search
        .responses
        .windows(2)
        .all(|r| r[0].value >= r[1].value));
    assert!(observer.roofs.load(Ordering::Relaxed) > 0);

    let best = &search.responses[0];
    assert!((best.shift.x - 3.0).abs() <= 1.0, "shift {:?}", best.shift);
    assert!(best.shift.y.abs() <= 1.0, "shift {:?}", best.shift);
    assert!((best.deviation - best.shift.norm() / 20.0).abs() < 1e-9);
    assert!((best.footprint_world.area() - 400.0).abs() < 1e-6);
    assert_eq!(best.footprint_tile, footprint.translated(best.shift));

    let heat_max = search.heatmap.data().iter().copied().max();
    assert_eq!(heat_max, Some(255));
}

#[test]
fn locate_rejects_empty_footprints() {
    let data = vec![0u8; 32 * 32];
    let tile = ImageView::from_slice(&data, 32, 32).unwrap();
    let estimator = RoofEstimator::new(
        tile,
        None,
        Matrix3::identity(),
        Point::new(1.0, 0.0),
        Point::new(0.0, 1.0),
        RoofSearchConfig::default(),
    )
    .unwrap();
    let empty = Polygon::default();
    assert!(estimator.locate(&empty, Point::zeros(), 3, None).is_err());
}
