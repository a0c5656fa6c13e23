use criterion::{criterion_group, criterion_main, Criterion};
use ccd_camera::driver::{SimulatedConfig, SimulatedDriver};
use ccd_camera::{AcquisitionRequest, Roi, Session, DEFAULT_MAGIC};

pub fn benchmark_acquire(c: &mut Criterion) {
    let dims = [(256, 256), (512, 512), (1024, 1024)];
    let binnings = [1u32, 2, 4];

    for (width, height) in dims.iter() {
        let session = Session::new(SimulatedDriver::new(SimulatedConfig::with_dimensions(
            *width, *height,
        )));
        session.open(DEFAULT_MAGIC).unwrap();

        let mut group = c.benchmark_group(format!("acquire/{}x{}", width, height));
        for binning in binnings.iter() {
            let request = AcquisitionRequest::new(Roi::new(0, 0, *height, *width))
                .with_binning(*binning)
                .with_exposure(0.1);

            group.bench_with_input(format!("allocated-bin{}", binning), &request, |b, req| {
                b.iter(|| {
                    let buffer = session.acquire_allocated(req).unwrap();
                    session.release_buffer(buffer);
                })
            });

            let mut counts = vec![0i32; request.roi.binned(*binning).pixel_count()];
            group.bench_with_input(format!("into-bin{}", binning), &request, |b, req| {
                b.iter(|| session.acquire_into(req, &mut counts).unwrap())
            });
        }
        group.finish();
    }
}

criterion_group!(benches, benchmark_acquire);
criterion_main!(benches);
