//! Loads the echo module as a real shared library from the cargo target directory.

use sprite_dicing_host::prelude::*;
use std::path::PathBuf;

/// Logical name of the built cdylib, without extension.
fn logical_name() -> String {
    format!("{}sprite_dicing", std::env::consts::DLL_PREFIX)
}

/// `target/<profile>/deps` holds the test binary; cargo writes the cdylib there and to its parent.
fn built_module() -> ModuleLocation {
    let exe = std::env::current_exe().expect("test executable path");
    let deps = exe.parent().expect("deps dir").to_path_buf();
    let candidates = [Some(deps.clone()), deps.parent().map(PathBuf::from)];
    for dir in candidates.into_iter().flatten() {
        let location = ModuleLocation::new(logical_name()).with_root(&dir);
        if location.library_path().is_ok_and(|p| p.exists()) {
            return location;
        }
    }
    panic!("echo cdylib not found next to {}", exe.display());
}

#[test]
fn library_source_loads_built_module() {
    let loader = ModuleLoader::from_config(&LoaderConfig::new(built_module()));
    assert!(!loader.is_available());
    assert!(loader.ensure_loaded(), "{:?}", loader.last_error());
    assert!(loader.is_available());

    let module = loader.module().expect("module");
    let path = module.path().expect("library path");
    assert!(path.is_absolute());
    assert!(module.entry().is_ok());
}

#[test]
fn loaded_library_round_trips_bytes() {
    let loader = ModuleLoader::from_config(&LoaderConfig::new(built_module()));
    let sources = vec![
        SourceSprite::new("first", 2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]),
        SourceSprite::new("nested/second", 1, 1, vec![9, 10, 11, 255]),
    ];
    let prefs = DicingPrefs::builder().trim_transparent(false).build();

    let out = dice_with(&loader, &sources, &prefs).expect("dice");
    assert_eq!(out.atlases.len(), 2);
    assert_eq!(out.atlases[0].pixels, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!((out.atlases[0].width, out.atlases[0].height), (2, 1));
    assert_eq!(out.atlases[1].pixels, vec![9, 10, 11, 255]);
    let ids: Vec<&str> = out.sprites.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["first", "nested/second"]);
    assert_eq!(out.sprites[1].indices, vec![0, 1, 2, 2, 3, 0]);

    // Second call through the cached handle re-resolves `dice` from the same library.
    let again = dice_with(&loader, &sources[1..], &prefs).expect("dice again");
    assert_eq!(again.atlases[0].pixels, vec![9, 10, 11, 255]);
    assert_eq!(loader.load_attempts(), 1);
}

#[test]
fn loaded_library_reports_native_error() {
    let loader = ModuleLoader::from_config(&LoaderConfig::new(built_module()));
    let prefs = DicingPrefs::builder().unit_size(0).build();
    match dice_with(&loader, &[], &prefs) {
        Err(DicingError::Native(msg)) => assert_eq!(msg, "Unit size can't be zero."),
        other => panic!("expected native error, got {other:?}"),
    }
}

/// Opens a library at a fixed path, bypassing extension resolution.
struct PathSource(PathBuf);

impl ModuleSource for PathSource {
    fn open(&self) -> Result<NativeModule, LoadError> {
        NativeModule::open(self.0.clone())
    }
    fn describe(&self) -> String {
        self.0.display().to_string()
    }
}

/// A system library that is present on the host and does not export `dice`.
fn library_without_dice() -> Option<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "windows") {
        &[r"C:\Windows\System32\kernel32.dll"]
    } else if cfg!(target_os = "linux") {
        &[
            "/lib/x86_64-linux-gnu/libz.so.1",
            "/usr/lib/x86_64-linux-gnu/libz.so.1",
            "/lib/x86_64-linux-gnu/libm.so.6",
            "/usr/lib/x86_64-linux-gnu/libm.so.6",
            "/lib/aarch64-linux-gnu/libm.so.6",
            "/usr/lib/aarch64-linux-gnu/libm.so.6",
            "/lib64/libm.so.6",
            "/usr/lib64/libm.so.6",
            "/usr/lib/libm.so.6",
        ]
    } else {
        &[]
    };
    candidates
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

#[test]
fn library_without_dice_symbol_is_rejected() {
    let Some(path) = library_without_dice() else {
        eprintln!("no system library without `dice` found; skipping");
        return;
    };

    match NativeModule::open(path.clone()) {
        Err(LoadError::MissingSymbol { path: p, symbol }) => {
            assert_eq!(p, path);
            assert_eq!(symbol, "dice");
        }
        other => panic!("expected missing symbol, got {other:?}"),
    }

    let loader = ModuleLoader::new(PathSource(path));
    assert!(!loader.ensure_loaded());
    assert!(!loader.is_available());
    assert!(loader.module().is_none());
    let reason = loader.last_error().expect("failure reason");
    assert!(reason.contains("symbol 'dice' not found"));

    let err = dice_with(&loader, &[], &DicingPrefs::default()).expect_err("unavailable");
    assert!(err.is_unavailable());
}
