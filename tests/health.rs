use approx::assert_relative_eq;
use canopy::health::{
    mask::rasterize, vari, zonal::zonal_statistics, GrowthTable, HealthClass, HealthClassifier, HeightExtractor,
    SegmentPolygon, ZonalResult,
};
use canopy::raster::Affine;
use ndarray::Array2;

/// Reference fill: count cells whose centre passes a ray-casting test.
fn reference_count(vertices: &[[f64; 2]], (rows, cols): (usize, usize)) -> usize {
    let inside = |px: f64, py: f64| {
        let mut odd = false;
        for i in 0..vertices.len() {
            let [ax, ay] = vertices[i];
            let [bx, by] = vertices[(i + 1) % vertices.len()];
            if (ay > py) != (by > py) && px < ax + (py - ay) * (bx - ax) / (by - ay) {
                odd = !odd;
            }
        }
        odd
    };
    (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (r, c)))
        .filter(|&(r, c)| inside(c as f64 + 0.5, r as f64 + 0.5))
        .count()
}

#[test]
fn classifier_example_from_the_growth_table() {
    let gsd = 0.02;
    let classifier = HealthClassifier::new(GrowthTable::default(), gsd).unwrap();
    let pixels = classifier.expected_pixels(12.0).round() as usize;

    let zonal = ZonalResult { pixel_count: pixels, vegetation_score: 0.6, height_meters: Some(8.0) };
    let classification = classifier.classify(&zonal);

    assert_eq!(classification.age_bracket.as_deref(), Some("5-10"));
    // (8/8 + 12/12 + 0.6) / 3 × 100 ≈ 86.7.
    assert_relative_eq!(HealthClassifier::score(&classifier.bracket(8.0).unwrap(), 8.0, pixels, 0.6), 86.666_666, epsilon = 1e-3);
    assert_eq!(classification.health_class, Some(HealthClass::Vigorous));
}

#[test]
fn missing_height_is_not_classified() {
    let classifier = HealthClassifier::new(GrowthTable::default(), 0.02).unwrap();
    let classification = classifier.classify(&ZonalResult { pixel_count: 500, vegetation_score: 0.9, height_meters: None });
    assert_eq!(classification.age_bracket, None);
    assert_eq!(classification.health_class, None);
}

#[test]
fn mask_matches_reference_fill() {
    let shapes: [&[[f64; 2]]; 4] = [
        &[[2.0, 3.0], [40.0, 5.5], [33.3, 37.2], [6.1, 29.8]],
        &[[20.0, 1.0], [38.0, 20.0], [20.0, 39.0], [2.0, 20.0]],
        &[[1.0, 1.0], [39.0, 1.0], [39.0, 39.0], [20.0, 10.0], [1.0, 39.0]],
        &[[10.25, 10.75], [30.5, 12.25], [12.0, 30.5]],
    ];
    for vertices in shapes {
        let mask = rasterize(vertices, (40, 40));
        let count = mask.iter().filter(|&&m| m).count();
        assert_eq!(count, reference_count(vertices, (40, 40)), "{vertices:?}");
    }
}

#[test]
fn vegetation_index_stays_in_unit_range() {
    let red = Array2::from_shape_fn((12, 9), |(r, c)| ((r * 31 + c * 17) % 256) as f64);
    let green = Array2::from_shape_fn((12, 9), |(r, c)| ((r * 13 + c * 29 + 40) % 256) as f64);
    let blue = Array2::from_shape_fn((12, 9), |(r, c)| ((r * 7 + c * 3 + 90) % 256) as f64);

    let index = vari::normalize(vari::vari(red.view(), green.view(), blue.view()).unwrap());
    assert!(index.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)));
    assert!(index.iter().any(|&v| v == 0.0));
    assert!(index.iter().any(|&v| v == 1.0));
}

#[test]
fn uniform_vegetation_index_falls_back_to_zero() {
    let band = Array2::from_elem((4, 4), 100.0);
    let raw = vari::vari(band.view(), band.view(), band.view()).unwrap();
    assert!(vari::normalize(raw.clone()).iter().all(|&v| v == 0.0));
    assert!(vari::normalize_strict(raw).is_err());
}

#[test]
fn zonal_score_averages_the_masked_index() {
    let index = Array2::from_shape_fn((10, 10), |(_, c)| if c < 5 { 1.0 } else { 0.0 });
    let polygon = SegmentPolygon::new(vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]]).unwrap();
    let zonal = zonal_statistics(&polygon, index.view());
    assert_eq!(zonal.pixel_count, 100);
    assert_relative_eq!(zonal.vegetation_score, 0.5, epsilon = 1e-9);
}

#[test]
fn height_is_bounded_by_the_masked_samples() {
    let transform = Affine::north_up(500_000.0, 9_300_000.0, 0.05, 0.05);
    let elevation = Array2::from_shape_fn((20, 20), |(r, c)| (r * 20 + c) as f64 * 0.01);
    let polygon = SegmentPolygon::new(vec![[2.0, 2.0], [12.0, 2.0], [12.0, 12.0], [2.0, 12.0]]).unwrap();

    let height = HeightExtractor::default().extract(&polygon, &transform, elevation.view(), &transform).unwrap();
    let mask = rasterize(polygon.vertices(), (20, 20));
    let masked: Vec<f64> = elevation.iter().zip(mask.iter()).filter(|(_, m)| **m).map(|(z, _)| *z).collect();
    let min = masked.iter().copied().fold(f64::INFINITY, f64::min);
    let max = masked.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!(min <= height && height <= max);

    let mut sorted = masked.clone();
    sorted.sort_by(|a, b| b.total_cmp(a));
    assert_relative_eq!(height, sorted[..10].iter().sum::<f64>() / 10.0, epsilon = 1e-9);
}
