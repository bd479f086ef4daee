use std::collections::BTreeMap;

use kurbo::{Point, Vec2};

use crate::{
    ease::Ease,
    error::ReenactResult,
    model::SceneMap,
    player::RenderMode,
    stage::{Node, NodeClass, NodeId, Prop, PropValue, Stage},
    transform::{Canvas, to_render_space},
};

pub const PROMOTE_SECS: f64 = 0.6;

const RASTER_Z: i32 = -100;

/// Extractor boundary: asset file paths keyed by scene and element id.
/// Absence of a path for an element is expected; that element simply never
/// promotes.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct AssetManifest {
    scenes: BTreeMap<String, BTreeMap<String, String>>,
}

impl AssetManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        scene_id: impl Into<String>,
        element_id: impl Into<String>,
        path: impl Into<String>,
    ) {
        self.scenes
            .entry(scene_id.into())
            .or_default()
            .insert(element_id.into(), path.into());
    }

    pub fn path(&self, scene_id: &str, element_id: &str) -> Option<&str> {
        self.scenes
            .get(scene_id)?
            .get(element_id)
            .map(String::as_str)
    }
}

/// Two co-located presentation layers for the active scene: the raster
/// screenshot and the editable asset layer built from extracted assets.
#[derive(Debug)]
pub struct LayerStack {
    mode: RenderMode,
    raster: Option<NodeId>,
    assets: BTreeMap<String, NodeId>, // element id -> node id
    promoted: bool,
}

impl LayerStack {
    /// Spawn the scene's layers. With `hidden` the nodes start at opacity 0
    /// and [`LayerStack::fade_in`] brings them to their resting opacities
    /// (used by scene switches).
    pub fn build(
        stage: &mut Stage,
        scene: &SceneMap,
        manifest: &AssetManifest,
        mode: RenderMode,
        canvas: Canvas,
        hidden: bool,
    ) -> ReenactResult<Self> {
        let promoted = mode == RenderMode::ReconstructedOnly;

        let raster = if mode.wants_raster() {
            let id = format!("scene:{}", scene.scene_id);
            stage.spawn(
                &id,
                Node::new(NodeClass::Raster, Point::ZERO)
                    .size(Vec2::new(
                        f64::from(canvas.width),
                        f64::from(canvas.height),
                    ))
                    .source(&scene.image_path)
                    .opacity(if hidden { 0.0 } else { 1.0 })
                    .z(RASTER_Z),
            )?;
            Some(id)
        } else {
            None
        };

        let mut assets = BTreeMap::new();
        if mode.wants_assets() {
            for el in &scene.elements {
                let Some(path) = manifest.path(&scene.scene_id, &el.id) else {
                    continue;
                };
                let id = format!("asset:{}", el.id);
                let rest = if promoted { 1.0 } else { 0.0 };
                stage.spawn(
                    &id,
                    Node::new(NodeClass::AssetVector, to_render_space(&el.geometry, canvas))
                        .size(Vec2::new(el.geometry.width, el.geometry.height))
                        .source(path)
                        .opacity(if hidden { 0.0 } else { rest })
                        .z(el.z_order),
                )?;
                assets.insert(el.id.clone(), id);
            }
        }

        Ok(Self {
            mode,
            raster,
            assets,
            promoted,
        })
    }

    pub fn promoted(&self) -> bool {
        self.promoted
    }

    pub fn has_asset(&self, element_id: &str) -> bool {
        self.assets.contains_key(element_id)
    }

    /// The node click/type feedback should target for this element: its
    /// asset node once promoted, otherwise `None` (overlay fallback).
    pub fn feedback_node(&self, element_id: &str) -> Option<&str> {
        if !self.promoted {
            return None;
        }
        self.assets.get(element_id).map(String::as_str)
    }

    /// One-shot crossfade screenshot -> assets. Idempotent; a no-op when
    /// already promoted or when the scene has no promotable assets.
    pub fn promote(&mut self, stage: &mut Stage) -> ReenactResult<()> {
        if self.promoted || self.assets.is_empty() {
            return Ok(());
        }

        if let Some(raster) = &self.raster {
            stage.animate(
                raster,
                Prop::Opacity,
                PropValue::Scalar(0.0),
                PROMOTE_SECS,
                Ease::InOutQuad,
            )?;
        }
        for id in self.assets.values() {
            stage.animate(
                id,
                Prop::Opacity,
                PropValue::Scalar(1.0),
                PROMOTE_SECS,
                Ease::InOutQuad,
            )?;
        }
        stage.advance(PROMOTE_SECS);
        self.promoted = true;
        Ok(())
    }

    /// Schedule every owned node to fade to zero. Does not advance; the
    /// caller joins this with the cursor/highlight fade of a scene switch.
    pub fn fade_out(&self, stage: &mut Stage, secs: f64) -> ReenactResult<()> {
        for id in self.node_ids() {
            stage.animate(&id, Prop::Opacity, PropValue::Scalar(0.0), secs, Ease::InOutQuad)?;
        }
        Ok(())
    }

    /// Schedule the hidden-built layers toward their resting opacities.
    /// Does not advance.
    pub fn fade_in(&self, stage: &mut Stage, secs: f64) -> ReenactResult<()> {
        if let Some(raster) = &self.raster {
            if !self.promoted {
                stage.animate(
                    raster,
                    Prop::Opacity,
                    PropValue::Scalar(1.0),
                    secs,
                    Ease::InOutQuad,
                )?;
            }
        }
        if self.promoted {
            for id in self.assets.values() {
                stage.animate(id, Prop::Opacity, PropValue::Scalar(1.0), secs, Ease::InOutQuad)?;
            }
        }
        Ok(())
    }

    /// Remove every owned node, draining the stack (used after a scene
    /// switch has faded the old scene out).
    pub fn despawn_all(&mut self, stage: &mut Stage) -> ReenactResult<()> {
        if let Some(raster) = self.raster.take() {
            stage.despawn(&raster)?;
        }
        for (_, id) in std::mem::take(&mut self.assets) {
            stage.despawn(&id)?;
        }
        Ok(())
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.raster
            .iter()
            .cloned()
            .chain(self.assets.values().cloned())
            .collect()
    }
}
