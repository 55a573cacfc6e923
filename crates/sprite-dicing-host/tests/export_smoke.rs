use sprite_dicing_host::abi::{
    BufferView, RawArtifacts, RawPrefs, RawResult, RawSourceSprite, RawTexture,
};
use sprite_dicing_host::prelude::*;
use std::cell::RefCell;

thread_local! {
    static ATLASES: RefCell<Vec<RawTexture>> = const { RefCell::new(Vec::new()) };
}

unsafe extern "C" fn atlases_only(sprites: BufferView<RawSourceSprite>, _: RawPrefs) -> RawResult {
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

struct Stub;

impl ModuleSource for Stub {
    fn open(&self) -> Result<NativeModule, LoadError> {
        Ok(unsafe { NativeModule::from_entry(atlases_only) })
    }
    fn describe(&self) -> String {
        "atlas stub".into()
    }
}

#[test]
fn export_json_and_meta_smoke() {
    let loader = ModuleLoader::new(Stub);
    let prefs = DicingPrefs::builder().unit_size(16).build();
    let sources = vec![
        SourceSprite::new("a", 3, 2, vec![200; 3 * 2 * 4]),
        SourceSprite::new("b", 1, 1, vec![1, 2, 3, 4]),
    ];
    let out = dice_with(&loader, &sources, &prefs).expect("dice");

    let sprites = sprite_dicing_host::sprites_to_json(&out.sprites);
    assert_eq!(sprites.as_array().map(Vec::len), Some(0));

    let meta = sprite_dicing_host::artifacts_meta(&out, &prefs);
    let obj = meta.as_object().expect("object");
    assert!(obj.contains_key("app"));
    assert!(obj.contains_key("version"));
    assert_eq!(meta["atlases"][0]["width"], 3);
    assert_eq!(meta["atlases"][1]["height"], 1);
    assert_eq!(meta["prefs"]["unit_size"], 16);

    // Atlases decode into images of matching size.
    let img = out.atlases[0].to_image().expect("rgba image");
    assert_eq!(img.dimensions(), (3, 2));
    assert_eq!(img.get_pixel(2, 1).0, [200, 200, 200, 200]);
}

#[test]
fn artifacts_serde_round_trip() {
    let artifacts = Artifacts {
        atlases: vec![AtlasTexture {
            width: 1,
            height: 1,
            pixels: vec![9, 8, 7, 6],
        }],
        sprites: vec![DicedSprite {
            id: "x".into(),
            atlas_index: 0,
            vertices: vec![Vertex::new(0.0, 0.0)],
            uvs: vec![Uv::new(1.0, 1.0)],
            indices: vec![0, 0, 0],
            rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            pivot: Pivot::center(),
        }],
    };
    let text = serde_json::to_string(&artifacts).expect("serialize");
    let back: Artifacts = serde_json::from_str(&text).expect("deserialize");
    assert_eq!(back, artifacts);
}
