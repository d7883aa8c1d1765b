use adcmesh::raster::{MemoryRaster, PixelType, RasterInfo};
use adcmesh::{CoordinateSystem, GridData, GridDataOptions, Mesh, Method, Raster};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

const UTM: CoordinateSystem = CoordinateSystem {
    epsg: 26915,
    geographic: false,
};

/// A 1000 x 1000 raster of 1 m pixels filled with noise.
fn noisy_raster() -> Raster {
    let info = RasterInfo {
        nx: 1000,
        ny: 1000,
        xmin: 0.,
        ymax: 1000.,
        dx: 1.,
        dy: 1.,
        nodata: -9999.,
        pixel_type: PixelType::Float,
        coordinate_system: UTM,
    };
    let mut rng = rand::thread_rng();
    let values = (0..info.num_pixels()).map(|_| rng.gen::<f64>()).collect();
    Raster::new(MemoryRaster::new(info, values).unwrap())
}

fn interpolate(c: &mut Criterion) {
    let mut group = c.benchmark_group("Raster interpolation");
    group.sample_size(10);
    for n in [10, 50] {
        let mut mesh = Mesh::triangle_grid(0., 1000., 0., 1000., n, n).unwrap();
        mesh.set_coordinate_system(UTM);

        for method in [Method::Average, Method::Highest, Method::PlusTwoSigma] {
            let mut grid = GridData::new(&mesh, noisy_raster());
            grid.set_all_methods(method);
            group.bench_function(BenchmarkId::new(format!("{method:?}"), n), |b| {
                b.iter(|| grid.compute_values().unwrap());
            });
        }
    }
    group.finish();
}

fn directional_wind(c: &mut Criterion) {
    let mut mesh = Mesh::triangle_grid(0., 1000., 0., 1000., 20, 20).unwrap();
    mesh.set_coordinate_system(UTM);
    let mut grid = GridData::new(&mesh, noisy_raster()).with_options(GridDataOptions {
        wind_radius: 100.,
        ..Default::default()
    });

    c.bench_function("Directional wind", |b| {
        b.iter(|| grid.compute_directional_wind().unwrap());
    });
}

criterion_group!(benches, interpolate, directional_wind);
criterion_main!(benches);
