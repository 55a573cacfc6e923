use crate::config::DicingPrefs;
use crate::model::{Artifacts, DicedSprite};
use serde_json::{Value, json};

/// Serialize diced sprites as a JSON array, one object per sprite:
/// `{ id, atlas, vertices: [{x,y}], uvs: [{u,v}], indices, rect: {x,y,width,height}, pivot: {x,y} }`.
pub fn sprites_to_json(sprites: &[DicedSprite]) -> Value {
    let sprites_val = sprites
        .iter()
        .map(|s| {
            let vertices: Vec<Value> = s
                .vertices
                .iter()
                .map(|v| json!({"x": v.x, "y": v.y}))
                .collect();
            let uvs: Vec<Value> = s.uvs.iter().map(|uv| json!({"u": uv.u, "v": uv.v})).collect();
            let rect = json!({"x": s.rect.x, "y": s.rect.y, "width": s.rect.width, "height": s.rect.height});
            let pivot = json!({"x": s.pivot.x, "y": s.pivot.y});
            json!({
                "id": s.id,
                "atlas": s.atlas_index,
                "vertices": vertices,
                "uvs": uvs,
                "indices": s.indices,
                "rect": rect,
                "pivot": pivot,
            })
        })
        .collect::<Vec<_>>();
    Value::Array(sprites_val)
}

/// Atlas-level metadata: producing app, atlas sizes and the prefs the result was diced with.
/// Shape: `{ app, version, atlases: [{ index, width, height }], prefs }`.
pub fn artifacts_meta(artifacts: &Artifacts, prefs: &DicingPrefs) -> Value {
    let atlases = artifacts
        .atlases
        .iter()
        .enumerate()
        .map(|(index, a)| json!({"index": index, "width": a.width, "height": a.height}))
        .collect::<Vec<_>>();
    json!({
        "app": "sprite-dicing",
        "version": env!("CARGO_PKG_VERSION"),
        "atlases": atlases,
        "prefs": prefs,
    })
}
