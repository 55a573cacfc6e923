use sprite_dicing_host::abi::{BufferView, RawArtifacts, RawPrefs, RawResult, RawSourceSprite};
use sprite_dicing_host::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

unsafe extern "C" fn empty_dice(_: BufferView<RawSourceSprite>, _: RawPrefs) -> RawResult {
    RawResult::success(RawArtifacts {
        atlases: BufferView::empty(),
        sprites: BufferView::empty(),
    })
}

/// Source that counts open calls and can be told to fail.
struct CountingSource {
    opens: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
    delay: Duration,
}

impl CountingSource {
    fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let opens = Arc::new(AtomicUsize::new(0));
        let fail = Arc::new(AtomicBool::new(false));
        let src = Self {
            opens: opens.clone(),
            fail: fail.clone(),
            delay: Duration::ZERO,
        };
        (src, opens, fail)
    }
}

impl ModuleSource for CountingSource {
    fn open(&self) -> Result<NativeModule, LoadError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        if self.fail.load(Ordering::SeqCst) {
            return Err(LoadError::NotFound {
                path: "counting/sprite_dicing".into(),
            });
        }
        Ok(unsafe { NativeModule::from_entry(empty_dice) })
    }

    fn describe(&self) -> String {
        "counting source".into()
    }
}

#[test]
fn is_available_never_loads() {
    let (src, opens, _) = CountingSource::new();
    let loader = ModuleLoader::new(src);
    assert!(!loader.is_available());
    assert!(!loader.is_available());
    assert_eq!(opens.load(Ordering::SeqCst), 0);
    assert!(loader.module().is_none());
}

#[test]
fn ensure_loaded_is_idempotent() {
    let (src, opens, _) = CountingSource::new();
    let loader = ModuleLoader::new(src);
    for _ in 0..10 {
        assert!(loader.ensure_loaded());
    }
    assert_eq!(opens.load(Ordering::SeqCst), 1);
    assert_eq!(loader.load_attempts(), 1);
    assert!(loader.is_available());
    assert!(loader.module().is_some());
}

#[test]
fn failed_load_is_not_memoized() {
    let (src, opens, fail) = CountingSource::new();
    fail.store(true, Ordering::SeqCst);
    let loader = ModuleLoader::new(src);

    assert!(!loader.ensure_loaded());
    assert!(!loader.is_available());
    assert_eq!(opens.load(Ordering::SeqCst), 1);
    let reason = loader.last_error().expect("failure reason");
    assert!(reason.contains("not found"));

    // No automatic retry: only an explicit call tries again.
    assert!(!loader.is_available());
    assert_eq!(opens.load(Ordering::SeqCst), 1);

    fail.store(false, Ordering::SeqCst);
    assert!(loader.ensure_loaded());
    assert_eq!(opens.load(Ordering::SeqCst), 2);
    assert!(loader.last_error().is_none());
}

#[test]
fn concurrent_ensure_loaded_opens_once() {
    let (mut src, opens, _) = CountingSource::new();
    src.delay = Duration::from_millis(20);
    let loader = Arc::new(ModuleLoader::new(src));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let loader = loader.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                loader.ensure_loaded()
            })
        })
        .collect();
    for h in handles {
        assert!(h.join().expect("thread"));
    }
    assert_eq!(opens.load(Ordering::SeqCst), 1);
    assert!(loader.is_available());
}

#[test]
fn loaded_module_shares_one_handle() {
    let (src, _, _) = CountingSource::new();
    let loader = ModuleLoader::new(src);
    assert!(loader.ensure_loaded());
    let a = loader.module().expect("module");
    let b = loader.module().expect("module");
    assert!(Arc::ptr_eq(&a, &b));
    assert!(a.path().is_none());
    assert!(a.entry().is_ok());
}
