// benches/augment_bench.rs
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::ptr;
use xrandr_split::fake::{FakeCrtc, FakeOutput, FakeRandr};
use xrandr_split::{IdSpace, RandrProvider, SplitLayer, SplitSignature};

/// `n` normal monitors with the ultra-wide one last, the worst case for the scan.
fn screen(n: u64) -> FakeRandr {
    let mut fake = FakeRandr::new();
    for i in 0..n {
        let crtc = 0x100 + i;
        let output = 0x200 + i;
        fake = fake
            .with_crtc(FakeCrtc::new(crtc, (i * 1920) as i32, 0, 1920, 1080))
            .with_output(FakeOutput::new(output, &format!("DP-{}", i), crtc, 530, 300));
    }
    fake.with_crtc(FakeCrtc::new(0x1ff, (n * 1920) as i32, 0, 3840, 1080))
        .with_output(FakeOutput::new(0x2ff, "DP-W", 0x1ff, 700, 200))
}

fn bench_augment_resources(c: &mut Criterion) {
    let mut group = c.benchmark_group("augment_resources");
    for n in [1u64, 4, 16] {
        let layer = SplitLayer::with_parts(
            screen(n),
            IdSpace::default(),
            SplitSignature::new(3840, 1080),
            255,
        );
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| unsafe {
                let res = layer.get_screen_resources(ptr::null_mut(), black_box(1));
                layer.provider().free_screen_resources(res);
            })
        });
    }
    group.finish();
}

fn bench_crtc_info(c: &mut Criterion) {
    let layer = SplitLayer::with_parts(
        screen(2),
        IdSpace::default(),
        SplitSignature::new(3840, 1080),
        255,
    );
    let virt = IdSpace::default().tag(0x1ff);
    c.bench_function("virtual_crtc_info", |b| {
        b.iter(|| unsafe {
            let info = layer.get_crtc_info(ptr::null_mut(), ptr::null_mut(), black_box(virt));
            layer.provider().free_crtc_info(info);
        })
    });
}

criterion_group!(benches, bench_augment_resources, bench_crtc_info);
criterion_main!(benches);
