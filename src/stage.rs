use std::collections::BTreeMap;

use kurbo::{Point, Vec2};

use crate::{
    ease::Ease,
    error::{ReenactError, ReenactResult},
    palette::Rgba8,
};

pub type NodeId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum NodeClass {
    Cursor,
    Highlight,
    Ripple,
    TypedText,
    Raster,
    AssetVector,
}

/// One presentation-layer node. `position` is in render space (canvas
/// center origin); `size` is the node's unscaled extent in pixels.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Node {
    pub class: NodeClass,
    pub position: Point,
    pub size: Vec2,
    pub scale: f64,
    pub opacity: f64,
    pub color: Rgba8,
    pub text: String,
    /// Backing file for raster/vector nodes (imagePath or extracted asset).
    pub source: Option<String>,
    pub z: i32,
}

impl Node {
    pub fn new(class: NodeClass, position: Point) -> Self {
        Self {
            class,
            position,
            size: Vec2::ZERO,
            scale: 1.0,
            opacity: 1.0,
            color: Rgba8::opaque(0, 0, 0),
            text: String::new(),
            source: None,
            z: 0,
        }
    }

    pub fn size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn color(mut self, color: Rgba8) -> Self {
        self.color = color;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn z(mut self, z: i32) -> Self {
        self.z = z;
        self
    }

    fn get(&self, prop: Prop) -> PropValue {
        match prop {
            Prop::Position => PropValue::Point(self.position),
            Prop::Size => PropValue::Size(self.size),
            Prop::Scale => PropValue::Scalar(self.scale),
            Prop::Opacity => PropValue::Scalar(self.opacity),
            Prop::Color => PropValue::Color(self.color),
        }
    }

    fn put(&mut self, prop: Prop, value: &PropValue) -> ReenactResult<()> {
        match (prop, value) {
            (Prop::Position, PropValue::Point(p)) => self.position = *p,
            (Prop::Size, PropValue::Size(s)) => self.size = *s,
            (Prop::Scale, PropValue::Scalar(v)) => self.scale = *v,
            (Prop::Opacity, PropValue::Scalar(v)) => self.opacity = v.clamp(0.0, 1.0),
            (Prop::Color, PropValue::Color(c)) => self.color = *c,
            _ => {
                return Err(ReenactError::playback(format!(
                    "property {prop:?} cannot take value {value:?}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Prop {
    Position,
    Size,
    Scale,
    Opacity,
    Color,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub enum PropValue {
    Point(Point),
    Size(Vec2),
    Scalar(f64),
    Color(Rgba8),
}

/// One timed presentation-layer mutation. `at` is the virtual clock when the
/// mutation begins; `duration` is its animated span (0 for instant writes).
#[derive(Clone, Debug, serde::Serialize)]
pub struct Mutation {
    pub at: f64,
    pub duration: f64,
    pub kind: MutationKind,
}

#[derive(Clone, Debug, serde::Serialize)]
pub enum MutationKind {
    Spawn {
        node: NodeId,
        snapshot: Node,
    },
    Despawn {
        node: NodeId,
    },
    Animate {
        node: NodeId,
        prop: Prop,
        from: PropValue,
        to: PropValue,
        ease: Ease,
    },
    Set {
        node: NodeId,
        prop: Prop,
        value: PropValue,
    },
    SetText {
        node: NodeId,
        text: String,
    },
}

/// The layered presentation model the interpreter mutates, plus the ordered
/// mutation trace it leaves behind.
///
/// Time is cooperative: scheduling a mutation never advances the clock.
/// Sequential sub-animations call [`Stage::advance`] after each step;
/// join-all groups schedule everything at the same timestamp and advance by
/// the longest duration.
#[derive(Debug, Default)]
pub struct Stage {
    nodes: BTreeMap<NodeId, Node>,
    clock: f64,
    trace: Vec<Mutation>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.clock
    }

    /// The suspension point: advance virtual time. Negative and non-finite
    /// spans are treated as zero.
    pub fn advance(&mut self, secs: f64) {
        if secs.is_finite() && secs > 0.0 {
            self.clock += secs;
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn ids_with_class(&self, class: NodeClass) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.class == class)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn trace(&self) -> &[Mutation] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<Mutation> {
        self.trace
    }

    pub fn spawn(&mut self, id: impl Into<NodeId>, node: Node) -> ReenactResult<()> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(ReenactError::playback(format!(
                "node '{id}' already exists"
            )));
        }
        self.record(
            0.0,
            MutationKind::Spawn {
                node: id.clone(),
                snapshot: node.clone(),
            },
        );
        self.nodes.insert(id, node);
        Ok(())
    }

    pub fn despawn(&mut self, id: &str) -> ReenactResult<()> {
        if self.nodes.remove(id).is_none() {
            return Err(ReenactError::playback(format!("no node '{id}' to despawn")));
        }
        self.record(
            0.0,
            MutationKind::Despawn {
                node: id.to_string(),
            },
        );
        Ok(())
    }

    /// Schedule an eased property change starting now. The node's stored
    /// value becomes the animation's end value immediately; the trace keeps
    /// the from/to pair so a renderer can reproduce the in-between frames.
    pub fn animate(
        &mut self,
        id: &str,
        prop: Prop,
        to: PropValue,
        duration: f64,
        ease: Ease,
    ) -> ReenactResult<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| ReenactError::playback(format!("no node '{id}' to animate")))?;
        let from = node.get(prop);
        node.put(prop, &to)?;
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        self.record(
            duration,
            MutationKind::Animate {
                node: id.to_string(),
                prop,
                from,
                to,
                ease,
            },
        );
        Ok(())
    }

    /// Instant property write.
    pub fn set(&mut self, id: &str, prop: Prop, value: PropValue) -> ReenactResult<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| ReenactError::playback(format!("no node '{id}' to set")))?;
        node.put(prop, &value)?;
        self.record(
            0.0,
            MutationKind::Set {
                node: id.to_string(),
                prop,
                value,
            },
        );
        Ok(())
    }

    pub fn set_text(&mut self, id: &str, text: impl Into<String>) -> ReenactResult<()> {
        let text = text.into();
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| ReenactError::playback(format!("no node '{id}' for text")))?;
        node.text = text.clone();
        self.record(
            0.0,
            MutationKind::SetText {
                node: id.to_string(),
                text,
            },
        );
        Ok(())
    }

    fn record(&mut self, duration: f64, kind: MutationKind) {
        self.trace.push(Mutation {
            at: self.clock,
            duration,
            kind,
        });
    }
}
