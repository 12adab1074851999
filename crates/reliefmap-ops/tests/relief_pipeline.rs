//! Shading, contouring and colorizing a synthetic DEM end to end.

use approx::assert_relative_eq;
use image::RgbaImage;
use reliefmap_grid::{Grid, ParallelRowExecutor};
use reliefmap_ops::{
    ColorVisualization, Colorizer, ContourParams, GridOperator, IlluminatedContours, Shader, Slope,
};

fn hill(size: usize) -> Grid {
    let c = size as f32 / 2.0;
    let cells = (0..size * size)
        .map(|i| {
            let (x, y) = ((i % size) as f32 - c, (i / size) as f32 - c);
            800.0 * (-(x * x + y * y) / (size as f32 * 3.0)).exp()
        })
        .collect();
    Grid::from_vec(size, size, 30.0, cells)
        .expect("valid grid")
        .with_origin(600_000.0, 5_200_000.0)
}

#[test]
fn test_flat_three_by_three_shading() {
    let grid = Grid::filled(3, 3, 1.0, 10.0).expect("valid grid");
    let executor = ParallelRowExecutor::sequential().expect("pool");
    let shading = Shader::default().operate(&executor, &grid).expect("shade");
    // Flat normal (0, 0, 1) against a light 45° from the zenith.
    let expected = ((45f64.to_radians().cos() + 1.0) / 2.0 * 255.0) as f32;
    for &v in shading.cells() {
        assert_relative_eq!(v, expected, epsilon = 1e-4);
    }
}

#[test]
fn test_north_west_flank_is_lit() {
    let dem = hill(64);
    let executor = ParallelRowExecutor::new(4).expect("pool");
    let shading = Shader::default().operate(&executor, &dem).expect("shade");
    let north_west = shading.value(22, 22);
    let south_east = shading.value(42, 42);
    assert!(north_west > south_east, "{} <= {}", north_west, south_east);
}

#[test]
fn test_shaded_hypsometric_image() {
    let dem = hill(48);
    let executor = ParallelRowExecutor::new(3).expect("pool");
    let shading = Shader::default().operate(&executor, &dem).expect("shade");
    let colorizer = Colorizer::new(ColorVisualization::LocalHypsometricShading);
    let image = colorizer.colorize(&executor, &shading, &dem).expect("colorize");
    assert_eq!(image.dimensions(), (48, 48));
    assert!(image.pixels().all(|p| p[3] == 255));
}

#[test]
fn test_contours_over_continuous_backdrop() {
    let dem = hill(40);
    let executor = ParallelRowExecutor::new(2).expect("pool");
    let backdrop = Colorizer::new(ColorVisualization::Continuous)
        .colorize(&executor, &dem, &dem)
        .expect("colorize");
    let slope = Slope.operate(&executor, &dem).expect("slope");

    let contours = IlluminatedContours::new(ContourParams {
        interval: 50.0,
        shadow_width: 0.2,
        illuminated_width: 0.1,
        min_width: 0.05,
        ..ContourParams::default()
    })
    .expect("params");
    let mut image: RgbaImage = image::imageops::resize(
        &backdrop,
        80,
        80,
        image::imageops::FilterType::Nearest,
    );
    contours
        .render(&executor, &mut image, &dem, &slope, None)
        .expect("render");

    let lit = image.pixels().filter(|p| p[0] == 255).count();
    let dark = image.pixels().filter(|p| p[0] == 0).count();
    let untouched = image.pixels().filter(|p| p[0] == 128).count();
    assert!(lit > 0, "lines facing the light are white");
    assert!(dark > 0, "lines facing away are black");
    assert!(untouched > lit + dark, "most of the backdrop shows through");
}
