use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sprite_dicing_host::abi::{
    BufferView, DiceFn, RawArtifacts, RawPrefs, RawResult, RawSourceSprite, RawTexture,
};
use sprite_dicing_host::marshal::MarshalledRequest;
use sprite_dicing_host::prelude::*;
use std::cell::RefCell;
use std::hint::black_box;

fn generate_sources(count: usize, min_size: u32, max_size: u32) -> Vec<SourceSprite> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let w = rng.gen_range(min_size..=max_size);
            let h = rng.gen_range(min_size..=max_size);
            let mut pixels = vec![0u8; (w * h * 4) as usize];
            rng.fill(pixels.as_mut_slice());
            SourceSprite::new(format!("tex_{}", i), w, h, pixels)
        })
        .collect()
}

thread_local! {
    static ATLASES: RefCell<Vec<RawTexture>> = const { RefCell::new(Vec::new()) };
}

/// Returns every source texture as an atlas so the copy-out path sees real pixel volume.
unsafe extern "C" fn echo_atlases(sprites: BufferView<RawSourceSprite>, _: RawPrefs) -> RawResult {
    let sources = unsafe { sprites.as_slice() };
    ATLASES.with(|a| {
        let mut a = a.borrow_mut();
        a.clear();
        a.extend(sources.iter().map(|s| s.texture));
        RawResult::success(RawArtifacts {
            atlases: BufferView::from_slice(&a),
            sprites: BufferView::empty(),
        })
    })
}

struct StubSource(DiceFn);

impl ModuleSource for StubSource {
    fn open(&self) -> Result<NativeModule, LoadError> {
        Ok(unsafe { NativeModule::from_entry(self.0) })
    }
    fn describe(&self) -> String {
        "bench stub".into()
    }
}

fn bench_marshal(c: &mut Criterion) {
    let mut group = c.benchmark_group("marshal");
    let prefs = DicingPrefs::default();

    for count in [16, 64, 256] {
        let sources = generate_sources(count, 16, 128);
        let bytes: usize = sources.iter().map(|s| s.pixels.len()).sum();
        group.throughput(Throughput::Bytes(bytes as u64));
        group.bench_with_input(BenchmarkId::new("build", count), &sources, |b, sources| {
            b.iter(|| black_box(MarshalledRequest::build(sources, &prefs)))
        });
    }

    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("roundtrip");
    let prefs = DicingPrefs::builder().trim_transparent(false).build();
    let loader = ModuleLoader::new(StubSource(echo_atlases));

    for count in [16, 64, 256] {
        let sources = generate_sources(count, 16, 128);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("dice_with", count), &sources, |b, sources| {
            b.iter(|| black_box(dice_with(&loader, sources, &prefs)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_marshal, bench_roundtrip);
criterion_main!(benches);
