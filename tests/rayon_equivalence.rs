#![cfg(feature = "rayon")]

use nalgebra::Matrix3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roofshade::kernel::rayon::convolve_par;
use roofshade::lowlevel::{FirstDirectedDerivative, SparseKernel};
use roofshade::{
    BuildingModel, ImageView, ModelKind, ModelVariant, Point, Polygon, Precalculated,
    RoofEstimator, RoofSearchConfig,
};

fn noise(width: usize, height: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..width * height).map(|_| rng.random::<u8>()).collect()
}

#[test]
fn parallel_convolution_matches_sequential() {
    let (w, h) = (90, 70);
    let data = noise(w, h, 3);
    let view = ImageView::from_slice(&data, w, h).unwrap();
    let mask: Vec<u8> = (0..w * h).map(|i| (i % 7 != 0) as u8).collect();
    let mask_view = ImageView::from_slice(&mask, w, h).unwrap();
    let kernel = SparseKernel::rectangular(&FirstDirectedDerivative::new(0.8, 3.0, 0.5), 9, 9, 1e-4);

    assert_eq!(
        convolve_par(&kernel, view, None).unwrap(),
        kernel.convolve(view, None).unwrap()
    );
    assert_eq!(
        convolve_par(&kernel, view, Some(mask_view)).unwrap(),
        kernel.convolve(view, Some(mask_view)).unwrap()
    );
}

#[test]
fn parallel_cache_matches_direct_generation() {
    let model = ModelKind::new(
        ModelVariant::Prismatic,
        Polygon::rect(0.0, 0.0, 15.0, 25.0),
        Point::new(0.6, 0.8),
        Point::new(-1.0, 0.2),
    );
    let cache = Precalculated::build(&model, 3, 30).unwrap();
    for length in 3..=30 {
        assert_eq!(cache.get(length), Some(&model.generate(length)));
    }
}

#[test]
fn roof_search_is_deterministic() {
    let (w, h) = (80, 80);
    let data = noise(w, h, 9);
    let view = ImageView::from_slice(&data, w, h).unwrap();
    let footprint = Polygon::rect(30.0, 30.0, 45.0, 42.0);
    let run = || {
        RoofEstimator::new(
            view,
            None,
            Matrix3::identity(),
            Point::new(1.0, 0.5),
            Point::new(0.0, 1.0),
            RoofSearchConfig {
                max_length: 10.0,
                ..RoofSearchConfig::default()
            },
        )
        .unwrap()
        .locate(&footprint, Point::zeros(), 10, None)
        .unwrap()
    };
    assert_eq!(run(), run());
}
