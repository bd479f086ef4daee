//! Reusable visual feedback behaviors. Each primitive mutates the nodes it
//! is handed and advances the stage clock by its own span; none of them
//! touch interpreter-owned playback state.

use kurbo::{Point, Vec2};
use rand::Rng as _;
use rand::rngs::StdRng;

use crate::{
    ease::Ease,
    error::{ReenactError, ReenactResult},
    palette::Palette,
    stage::{Node, NodeClass, Prop, PropValue, Stage},
};

pub const CURSOR_ID: &str = "cursor";
pub const HIGHLIGHT_ID: &str = "highlight";
pub const RIPPLE_ID: &str = "ripple";
pub const GLOW_ID: &str = "glow";

pub const HIGHLIGHT_APPEAR_SECS: f64 = 0.18;
pub const HIGHLIGHT_PULSE_SECS: f64 = 0.22;
pub const HIGHLIGHT_FADE_SECS: f64 = 0.2;
const HIGHLIGHT_REST_OPACITY: f64 = 0.8;

pub const RIPPLE_SECS: f64 = 0.35;
const RIPPLE_START_DIAMETER: f64 = 14.0;
const RIPPLE_EXPAND_SCALE: f64 = 2.8;
const RIPPLE_START_OPACITY: f64 = 0.9;

pub const CURSOR_PRESS_OFFSET_PX: f64 = 3.0;
pub const CURSOR_PRESS_SCALE: f64 = 0.92;
const ASSET_PRESS_SCALE: f64 = 0.97;

const GLOW_SECS: f64 = 0.12;
const GLOW_OPACITY: f64 = 0.55;
const GLOW_PAD_PX: f64 = 6.0;

pub const TYPE_PAD_PX: f64 = 12.0;
pub const TYPE_SETTLE_SECS: f64 = 0.15;
const TYPE_JITTER_LO: f64 = 0.8;
const TYPE_JITTER_HI: f64 = 1.2;
const TYPE_BOB_PX: f64 = 2.0;

fn cursor_position(stage: &Stage) -> ReenactResult<Point> {
    stage
        .node(CURSOR_ID)
        .map(|n| n.position)
        .ok_or_else(|| ReenactError::playback("cursor node is missing"))
}

/// Show the highlight rectangle sized to the target element. Consumes
/// [`HIGHLIGHT_APPEAR_SECS`], so the box is fully visible before any cursor
/// motion that follows.
pub fn show_highlight(
    stage: &mut Stage,
    center: Point,
    size: Vec2,
    palette: &Palette,
) -> ReenactResult<()> {
    if stage.contains(HIGHLIGHT_ID) {
        // Stale box from an earlier move; replace rather than slide.
        stage.despawn(HIGHLIGHT_ID)?;
    }
    stage.spawn(
        HIGHLIGHT_ID,
        Node::new(NodeClass::Highlight, center)
            .size(size)
            .color(palette.highlight)
            .opacity(0.0)
            .z(900),
    )?;
    stage.animate(
        HIGHLIGHT_ID,
        Prop::Opacity,
        PropValue::Scalar(HIGHLIGHT_REST_OPACITY),
        HIGHLIGHT_APPEAR_SECS,
        Ease::OutQuad,
    )?;
    stage.advance(HIGHLIGHT_APPEAR_SECS);
    Ok(())
}

/// Arrival acknowledgment: opacity up, then back to rest.
pub fn pulse_highlight(stage: &mut Stage) -> ReenactResult<()> {
    if !stage.contains(HIGHLIGHT_ID) {
        return Ok(());
    }
    let half = HIGHLIGHT_PULSE_SECS / 2.0;
    stage.animate(
        HIGHLIGHT_ID,
        Prop::Opacity,
        PropValue::Scalar(1.0),
        half,
        Ease::InOutQuad,
    )?;
    stage.advance(half);
    stage.animate(
        HIGHLIGHT_ID,
        Prop::Opacity,
        PropValue::Scalar(HIGHLIGHT_REST_OPACITY),
        half,
        Ease::InOutQuad,
    )?;
    stage.advance(half);
    Ok(())
}

pub fn fade_highlight(stage: &mut Stage) -> ReenactResult<()> {
    if !stage.contains(HIGHLIGHT_ID) {
        return Ok(());
    }
    stage.animate(
        HIGHLIGHT_ID,
        Prop::Opacity,
        PropValue::Scalar(0.0),
        HIGHLIGHT_FADE_SECS,
        Ease::OutQuad,
    )?;
    stage.advance(HIGHLIGHT_FADE_SECS);
    stage.despawn(HIGHLIGHT_ID)
}

/// Ring expanding from the click point, fading out over a fixed short span.
pub fn ripple_at(stage: &mut Stage, point: Point, palette: &Palette) -> ReenactResult<()> {
    stage.spawn(
        RIPPLE_ID,
        Node::new(NodeClass::Ripple, point)
            .size(Vec2::new(RIPPLE_START_DIAMETER, RIPPLE_START_DIAMETER))
            .color(palette.ripple)
            .opacity(RIPPLE_START_OPACITY)
            .z(950),
    )?;
    // Expansion and fade run joined.
    stage.animate(
        RIPPLE_ID,
        Prop::Scale,
        PropValue::Scalar(RIPPLE_EXPAND_SCALE),
        RIPPLE_SECS,
        Ease::OutCubic,
    )?;
    stage.animate(
        RIPPLE_ID,
        Prop::Opacity,
        PropValue::Scalar(0.0),
        RIPPLE_SECS,
        Ease::OutQuad,
    )?;
    stage.advance(RIPPLE_SECS);
    stage.despawn(RIPPLE_ID)
}

/// Press: cursor dips and shrinks; a promoted asset node, when present,
/// scales down with it and gains a transient glow. All sub-animations start
/// together and the clock advances once (join-all).
pub fn press_cursor(
    stage: &mut Stage,
    asset_node: Option<&str>,
    palette: &Palette,
    secs: f64,
) -> ReenactResult<()> {
    let pos = cursor_position(stage)?;
    stage.animate(
        CURSOR_ID,
        Prop::Position,
        PropValue::Point(Point::new(pos.x, pos.y + CURSOR_PRESS_OFFSET_PX)),
        secs,
        Ease::InQuad,
    )?;
    stage.animate(
        CURSOR_ID,
        Prop::Scale,
        PropValue::Scalar(CURSOR_PRESS_SCALE),
        secs,
        Ease::InQuad,
    )?;

    if let Some(asset) = asset_node {
        stage.animate(
            asset,
            Prop::Scale,
            PropValue::Scalar(ASSET_PRESS_SCALE),
            secs,
            Ease::InQuad,
        )?;
        spawn_glow(stage, asset, palette)?;
        stage.animate(
            GLOW_ID,
            Prop::Opacity,
            PropValue::Scalar(GLOW_OPACITY),
            secs.min(GLOW_SECS),
            Ease::OutQuad,
        )?;
    }

    stage.advance(secs);
    Ok(())
}

/// Release: exact inverse of the press. Restores cursor position/scale to
/// the given rest values and retires the transient glow.
pub fn release_cursor(
    stage: &mut Stage,
    rest: Point,
    asset_node: Option<&str>,
    secs: f64,
) -> ReenactResult<()> {
    stage.animate(
        CURSOR_ID,
        Prop::Position,
        PropValue::Point(rest),
        secs,
        Ease::OutQuad,
    )?;
    stage.animate(CURSOR_ID, Prop::Scale, PropValue::Scalar(1.0), secs, Ease::OutQuad)?;

    if let Some(asset) = asset_node {
        stage.animate(asset, Prop::Scale, PropValue::Scalar(1.0), secs, Ease::OutQuad)?;
    }
    if stage.contains(GLOW_ID) {
        stage.animate(
            GLOW_ID,
            Prop::Opacity,
            PropValue::Scalar(0.0),
            secs,
            Ease::OutQuad,
        )?;
    }

    stage.advance(secs);
    if stage.contains(GLOW_ID) {
        stage.despawn(GLOW_ID)?;
    }
    Ok(())
}

/// Focus glow for a promoted asset node (used while typing).
pub fn glow_on(stage: &mut Stage, asset_node: &str, palette: &Palette) -> ReenactResult<()> {
    spawn_glow(stage, asset_node, palette)?;
    stage.animate(
        GLOW_ID,
        Prop::Opacity,
        PropValue::Scalar(GLOW_OPACITY),
        GLOW_SECS,
        Ease::OutQuad,
    )?;
    stage.advance(GLOW_SECS);
    Ok(())
}

pub fn glow_off(stage: &mut Stage) -> ReenactResult<()> {
    if !stage.contains(GLOW_ID) {
        return Ok(());
    }
    stage.animate(
        GLOW_ID,
        Prop::Opacity,
        PropValue::Scalar(0.0),
        GLOW_SECS,
        Ease::OutQuad,
    )?;
    stage.advance(GLOW_SECS);
    stage.despawn(GLOW_ID)
}

fn spawn_glow(stage: &mut Stage, asset_node: &str, palette: &Palette) -> ReenactResult<()> {
    if stage.contains(GLOW_ID) {
        return Ok(());
    }
    let (pos, size) = stage
        .node(asset_node)
        .map(|n| (n.position, n.size))
        .ok_or_else(|| ReenactError::playback(format!("no asset node '{asset_node}' to glow")))?;
    stage.spawn(
        GLOW_ID,
        Node::new(NodeClass::Highlight, pos)
            .size(size + Vec2::new(GLOW_PAD_PX * 2.0, GLOW_PAD_PX * 2.0))
            .color(palette.glow)
            .opacity(0.0)
            .z(910),
    )
}

/// Character-by-character reveal into a typed-text node anchored at the
/// target's left interior. Each increment is `duration / n` jittered by a
/// factor in [0.8, 1.2]; every third character the cursor bobs down and back
/// up instead of idling. Ends with a short settle pause.
///
/// Total elapsed time is advisory: the sum of jittered increments, not
/// exactly `duration`.
pub fn type_into(
    stage: &mut Stage,
    rng: &mut StdRng,
    node_id: &str,
    anchor: Point,
    text: &str,
    duration: f64,
    palette: &Palette,
) -> ReenactResult<()> {
    if stage.contains(node_id) {
        // Re-typing into the same field: re-anchor and clear.
        stage.set(node_id, Prop::Position, PropValue::Point(anchor))?;
        stage.set_text(node_id, "")?;
    } else {
        stage.spawn(
            node_id,
            Node::new(NodeClass::TypedText, anchor)
                .color(palette.typed_text)
                .z(920),
        )?;
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        stage.advance(TYPE_SETTLE_SECS);
        return Ok(());
    }

    let base = duration / chars.len() as f64;
    let mut prefix = String::with_capacity(text.len());
    for (i, ch) in chars.iter().enumerate() {
        prefix.push(*ch);
        stage.set_text(node_id, prefix.clone())?;

        let inc = base * rng.gen_range(TYPE_JITTER_LO..=TYPE_JITTER_HI);
        if (i + 1) % 3 == 0 {
            cursor_bob(stage, inc)?;
        } else {
            stage.advance(inc);
        }
    }

    stage.advance(TYPE_SETTLE_SECS);
    Ok(())
}

fn cursor_bob(stage: &mut Stage, span: f64) -> ReenactResult<()> {
    let pos = cursor_position(stage)?;
    let half = span / 2.0;
    stage.animate(
        CURSOR_ID,
        Prop::Position,
        PropValue::Point(Point::new(pos.x, pos.y + TYPE_BOB_PX)),
        half,
        Ease::InQuad,
    )?;
    stage.advance(half);
    stage.animate(
        CURSOR_ID,
        Prop::Position,
        PropValue::Point(pos),
        half,
        Ease::OutQuad,
    )?;
    stage.advance(half);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColorScheme, Theme};
    use crate::stage::MutationKind;
    use rand::SeedableRng as _;

    fn palette() -> Palette {
        Palette::from_scheme(&ColorScheme {
            primary: "#202124".to_string(),
            background: "#ffffff".to_string(),
            accent: "#1a73e8".to_string(),
            theme: Theme::Light,
        })
    }

    fn stage_with_cursor() -> Stage {
        let mut stage = Stage::new();
        stage
            .spawn(CURSOR_ID, Node::new(NodeClass::Cursor, Point::ZERO).z(1000))
            .unwrap();
        stage
    }

    #[test]
    fn highlight_lifecycle_spawns_and_despawns() {
        let mut stage = stage_with_cursor();
        let p = palette();
        show_highlight(&mut stage, Point::new(85.0, -130.0), Vec2::new(600.0, 40.0), &p).unwrap();
        assert!(stage.contains(HIGHLIGHT_ID));
        pulse_highlight(&mut stage).unwrap();
        fade_highlight(&mut stage).unwrap();
        assert!(!stage.contains(HIGHLIGHT_ID));
    }

    #[test]
    fn ripple_is_transient() {
        let mut stage = stage_with_cursor();
        let before = stage.now();
        ripple_at(&mut stage, Point::new(85.0, -130.0), &palette()).unwrap();
        assert!(!stage.contains(RIPPLE_ID));
        assert!((stage.now() - before - RIPPLE_SECS).abs() < 1e-9);
    }

    #[test]
    fn press_release_restores_cursor_exactly() {
        let mut stage = stage_with_cursor();
        let p = palette();
        let rest = Point::new(40.0, -10.0);
        stage
            .set(CURSOR_ID, Prop::Position, PropValue::Point(rest))
            .unwrap();

        press_cursor(&mut stage, None, &p, 0.08).unwrap();
        let pressed = stage.node(CURSOR_ID).unwrap();
        assert_eq!(pressed.scale, CURSOR_PRESS_SCALE);
        assert_eq!(pressed.position.y, rest.y + CURSOR_PRESS_OFFSET_PX);

        release_cursor(&mut stage, rest, None, 0.08).unwrap();
        let released = stage.node(CURSOR_ID).unwrap();
        assert_eq!(released.scale, 1.0);
        assert_eq!(released.position, rest);
    }

    #[test]
    fn typing_reveals_every_prefix_within_jitter_bounds() {
        let mut stage = stage_with_cursor();
        let mut rng = StdRng::seed_from_u64(7);
        let text = "Hello World";
        let start = stage.now();
        type_into(
            &mut stage,
            &mut rng,
            "typed:search",
            Point::new(-203.0, -130.0),
            text,
            2.0,
            &palette(),
        )
        .unwrap();

        let prefixes: Vec<&str> = stage
            .trace()
            .iter()
            .filter_map(|m| match &m.kind {
                MutationKind::SetText { text, .. } if !text.is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(prefixes.len(), text.chars().count());
        assert_eq!(*prefixes.last().unwrap(), text);
        for w in prefixes.windows(2) {
            assert!(w[1].starts_with(w[0]));
        }

        let elapsed = stage.now() - start - TYPE_SETTLE_SECS;
        assert!(elapsed >= 0.8 * 2.0 && elapsed <= 1.2 * 2.0);
        assert_eq!(stage.node("typed:search").unwrap().text, text);
    }

    #[test]
    fn typing_bobs_every_third_character() {
        let mut stage = stage_with_cursor();
        let mut rng = StdRng::seed_from_u64(1);
        type_into(
            &mut stage,
            &mut rng,
            "typed:f",
            Point::ZERO,
            "abcdef",
            1.0,
            &palette(),
        )
        .unwrap();

        let cursor_moves = stage
            .trace()
            .iter()
            .filter(|m| {
                matches!(
                    &m.kind,
                    MutationKind::Animate { node, prop: Prop::Position, .. } if node == CURSOR_ID
                )
            })
            .count();
        // 6 chars -> 2 bobs -> 4 cursor position animations (down+up each).
        assert_eq!(cursor_moves, 4);
        // Bob always returns to the resting height.
        assert_eq!(stage.node(CURSOR_ID).unwrap().position, Point::ZERO);
    }
}
