use std::collections::BTreeMap;

use kurbo::{Point, Vec2};
use rand::SeedableRng as _;
use rand::rngs::StdRng;

use crate::{
    ease::Ease,
    error::{ReenactError, ReenactResult},
    feedback::{self, CURSOR_ID, HIGHLIGHT_ID},
    layers::{AssetManifest, LayerStack},
    model::{Action, ActionKind, Storyboard, UIElement},
    palette::Palette,
    stage::{Mutation, Node, NodeClass, Prop, PropValue, Stage},
    transform::{Canvas, to_render_space, type_anchor},
};

/// Fraction of a click's duration spent in each of press and release.
const PRESS_FRACTION: f64 = 0.4;
const CURSOR_Z: i32 = 1000;

/// The rendering-mode strategy selected at construction time. One
/// parameterized interpreter serves all three presentations; the mode only
/// decides which layers exist and whether promotion can happen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    ScreenshotOnly,
    ReconstructedOnly,
    Hybrid,
}

impl RenderMode {
    pub fn wants_raster(self) -> bool {
        matches!(self, Self::ScreenshotOnly | Self::Hybrid)
    }

    pub fn wants_assets(self) -> bool {
        matches!(self, Self::ReconstructedOnly | Self::Hybrid)
    }
}

#[derive(Clone, Debug)]
pub struct PlayerOptions {
    pub canvas: Canvas,
    pub mode: RenderMode,
    /// Seed for typing jitter. `None` draws from entropy; the logical step
    /// trace is identical either way.
    pub seed: Option<u64>,
    /// How long the final frame is held after the last action.
    pub hold_secs: f64,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            mode: RenderMode::ScreenshotOnly,
            seed: None,
            hold_secs: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum PlayerState {
    Idle,
    Running,
    Dispatching,
    Finished,
}

/// One executed action in the logical trace: kind plus resolved target.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub kind: ActionKind,
    pub target: Option<String>,
}

/// A contained in-playback skip (resolution miss or unknown action kind).
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    pub action_index: usize,
    pub message: String,
}

/// Everything a run leaves behind: the timed mutation trace, the logical
/// step trace, contained diagnostics, and the total virtual duration.
#[derive(Debug, serde::Serialize)]
pub struct Playback {
    pub trace: Vec<Mutation>,
    pub steps: Vec<StepRecord>,
    pub diagnostics: Vec<Diagnostic>,
    pub duration_secs: f64,
}

/// Interpreter-owned state for the currently active scene, rebuilt on every
/// scene activation. The id -> element index avoids per-action scans.
struct ActiveScene {
    index: usize,
    lookup: BTreeMap<String, usize>,
    palette: Palette,
    stack: LayerStack,
}

/// Transient playback state; created at the start of a run, discarded at
/// the end.
struct Run {
    stage: Stage,
    rng: StdRng,
    active: ActiveScene,
    cursor_rest: Point,
    last_target: Option<String>,
}

impl Run {
    fn cursor_position(&self) -> ReenactResult<Point> {
        self.stage
            .node(CURSOR_ID)
            .map(|n| n.position)
            .ok_or_else(|| ReenactError::playback("cursor node is missing"))
    }
}

enum Dispatch {
    Done(Option<String>),
    Skipped(String),
}

/// The sequential timeline interpreter. Walks the action list in script
/// order, resolves targets against the active scene, and drives the stage.
pub struct Player<'a> {
    storyboard: &'a Storyboard,
    manifest: AssetManifest,
    opts: PlayerOptions,
    state: PlayerState,
}

impl<'a> Player<'a> {
    pub fn new(storyboard: &'a Storyboard, opts: PlayerOptions) -> Self {
        Self {
            storyboard,
            manifest: AssetManifest::new(),
            opts,
            state: PlayerState::Idle,
        }
    }

    /// Attach the Extractor's asset manifest (hybrid/reconstructed modes).
    pub fn with_assets(mut self, manifest: AssetManifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Play the whole storyboard. Structural scene problems fail fast;
    /// per-action resolution misses and unknown kinds are contained as
    /// diagnostics and never abort the run.
    #[tracing::instrument(skip_all, fields(actions = self.storyboard.actions.len()))]
    pub fn play(&mut self) -> ReenactResult<Playback> {
        self.storyboard.validate_scenes()?;

        let rng = match self.opts.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut stage = Stage::new();
        let active = self.activate(&mut stage, 0, false)?;
        stage.spawn(
            CURSOR_ID,
            Node::new(NodeClass::Cursor, Point::ZERO)
                .color(active.palette.cursor)
                .z(CURSOR_Z),
        )?;

        let mut run = Run {
            stage,
            rng,
            active,
            cursor_rest: Point::ZERO,
            last_target: None,
        };
        let mut steps = Vec::new();
        let mut diagnostics = Vec::new();

        self.state = PlayerState::Running;
        for (i, action) in self.storyboard.actions.iter().enumerate() {
            self.state = PlayerState::Dispatching;
            let outcome = match action.kind {
                ActionKind::CursorMove => self.do_cursor_move(&mut run, action)?,
                ActionKind::Click => self.do_click(&mut run, action)?,
                ActionKind::Type => self.do_type(&mut run, action)?,
                ActionKind::Wait => {
                    run.stage.advance(action.duration);
                    Dispatch::Done(None)
                }
                ActionKind::SwitchScene => self.do_switch_scene(&mut run, action)?,
                ActionKind::Unknown => Dispatch::Skipped("unknown action kind".to_string()),
            };
            match outcome {
                Dispatch::Done(target) => steps.push(StepRecord {
                    index: i,
                    kind: action.kind,
                    target,
                }),
                Dispatch::Skipped(message) => {
                    tracing::warn!(action = i, "skipping action: {message}");
                    diagnostics.push(Diagnostic {
                        action_index: i,
                        message,
                    });
                }
            }
            self.state = PlayerState::Running;
        }

        // Hold the final frame.
        run.stage.advance(self.opts.hold_secs);
        self.state = PlayerState::Finished;

        let duration_secs = run.stage.now();
        Ok(Playback {
            trace: run.stage.into_trace(),
            steps,
            diagnostics,
            duration_secs,
        })
    }

    fn activate(
        &self,
        stage: &mut Stage,
        index: usize,
        hidden: bool,
    ) -> ReenactResult<ActiveScene> {
        let scene = &self.storyboard.scenes[index];
        let lookup = scene
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        let palette = Palette::from_scheme(&scene.color_scheme);
        let stack = LayerStack::build(
            stage,
            scene,
            &self.manifest,
            self.opts.mode,
            self.opts.canvas,
            hidden,
        )?;
        Ok(ActiveScene {
            index,
            lookup,
            palette,
            stack,
        })
    }

    fn resolve<'s>(&'s self, active: &ActiveScene, id: &str) -> Option<&'s UIElement> {
        let scene = &self.storyboard.scenes[active.index];
        active.lookup.get(id).map(|&i| &scene.elements[i])
    }

    /// Click/type targets resolve fresh from the action's own id, falling
    /// back to the last cursor_move target.
    fn resolve_with_fallback<'s>(
        &'s self,
        run: &Run,
        action: &Action,
    ) -> Option<&'s UIElement> {
        action
            .target_element_id
            .as_deref()
            .and_then(|id| self.resolve(&run.active, id))
            .or_else(|| {
                run.last_target
                    .as_deref()
                    .and_then(|id| self.resolve(&run.active, id))
            })
    }

    fn do_cursor_move(&self, run: &mut Run, action: &Action) -> ReenactResult<Dispatch> {
        let Some(target_id) = action.target_element_id.as_deref() else {
            return Ok(Dispatch::Skipped(
                "cursor_move without targetElementId".to_string(),
            ));
        };
        let Some(el) = self.resolve(&run.active, target_id) else {
            return Ok(Dispatch::Skipped(format!(
                "target '{target_id}' not found in active scene '{}'",
                self.storyboard.scenes[run.active.index].scene_id
            )));
        };

        // First move onto a promotable target flips the hybrid layers.
        if self.opts.mode == RenderMode::Hybrid
            && !run.active.stack.promoted()
            && run.active.stack.has_asset(&el.id)
        {
            run.active.stack.promote(&mut run.stage)?;
        }

        let center = to_render_space(&el.geometry, self.opts.canvas);
        let size = Vec2::new(el.geometry.width, el.geometry.height);

        // Highlight first: "where we're going" lands before "getting there".
        feedback::show_highlight(&mut run.stage, center, size, &run.active.palette)?;
        run.stage.animate(
            CURSOR_ID,
            Prop::Position,
            PropValue::Point(center),
            action.duration,
            Ease::InOutCubic,
        )?;
        run.stage.advance(action.duration);
        feedback::pulse_highlight(&mut run.stage)?;

        run.cursor_rest = center;
        run.last_target = Some(el.id.clone());
        Ok(Dispatch::Done(Some(el.id.clone())))
    }

    fn do_click(&self, run: &mut Run, action: &Action) -> ReenactResult<Dispatch> {
        let Some(el) = self.resolve_with_fallback(run, action) else {
            return Ok(Dispatch::Skipped(
                "click target could not be resolved".to_string(),
            ));
        };
        let el_id = el.id.clone();
        let center = to_render_space(&el.geometry, self.opts.canvas);

        let span = action.duration * PRESS_FRACTION;
        // The cursor is always back at its resting point between actions.
        let rest = run.cursor_rest;
        let asset = run
            .active
            .stack
            .feedback_node(&el_id)
            .map(str::to_string);

        feedback::press_cursor(&mut run.stage, asset.as_deref(), &run.active.palette, span)?;
        feedback::ripple_at(&mut run.stage, center, &run.active.palette)?;
        feedback::release_cursor(&mut run.stage, rest, asset.as_deref(), span)?;
        feedback::fade_highlight(&mut run.stage)?;

        run.last_target = Some(el_id.clone());
        Ok(Dispatch::Done(Some(el_id)))
    }

    fn do_type(&self, run: &mut Run, action: &Action) -> ReenactResult<Dispatch> {
        let Some(el) = self.resolve_with_fallback(run, action) else {
            return Ok(Dispatch::Skipped(
                "type target could not be resolved".to_string(),
            ));
        };
        let Some(payload) = action.payload.as_deref() else {
            return Ok(Dispatch::Skipped(
                "type action without a text payload".to_string(),
            ));
        };
        let el_id = el.id.clone();
        let anchor = type_anchor(&el.geometry, self.opts.canvas, feedback::TYPE_PAD_PX);
        let asset = run
            .active
            .stack
            .feedback_node(&el_id)
            .map(str::to_string);

        if let Some(asset) = &asset {
            feedback::glow_on(&mut run.stage, asset, &run.active.palette)?;
        }
        let node_id = format!("typed:{el_id}");
        feedback::type_into(
            &mut run.stage,
            &mut run.rng,
            &node_id,
            anchor,
            payload,
            action.duration,
            &run.active.palette,
        )?;
        feedback::glow_off(&mut run.stage)?;

        run.last_target = Some(el_id.clone());
        Ok(Dispatch::Done(Some(el_id)))
    }

    fn do_switch_scene(&self, run: &mut Run, action: &Action) -> ReenactResult<Dispatch> {
        let Some(target) = action.payload.as_deref() else {
            return Ok(Dispatch::Skipped(
                "switch_scene without a sceneId payload".to_string(),
            ));
        };
        let Some(next) = self.storyboard.scene_index(target) else {
            return Ok(Dispatch::Skipped(format!(
                "switch_scene references unknown scene '{target}'"
            )));
        };

        let half = action.duration / 2.0;

        // Fade the outgoing scene, cursor and highlight together.
        run.active.stack.fade_out(&mut run.stage, half)?;
        run.stage.animate(
            CURSOR_ID,
            Prop::Opacity,
            PropValue::Scalar(0.0),
            half,
            Ease::InOutQuad,
        )?;
        if run.stage.contains(HIGHLIGHT_ID) {
            run.stage.animate(
                HIGHLIGHT_ID,
                Prop::Opacity,
                PropValue::Scalar(0.0),
                half,
                Ease::InOutQuad,
            )?;
        }
        run.stage.advance(half);

        // Swap: retire the old presentation, rebuild for the new scene.
        run.active.stack.despawn_all(&mut run.stage)?;
        if run.stage.contains(HIGHLIGHT_ID) {
            run.stage.despawn(HIGHLIGHT_ID)?;
        }
        for id in run.stage.ids_with_class(NodeClass::TypedText) {
            run.stage.despawn(&id)?;
        }
        run.active = self.activate(&mut run.stage, next, true)?;
        run.stage.set(
            CURSOR_ID,
            Prop::Color,
            PropValue::Color(run.active.palette.cursor),
        )?;

        // Fade the incoming scene and cursor in together.
        run.active.stack.fade_in(&mut run.stage, half)?;
        run.stage.animate(
            CURSOR_ID,
            Prop::Opacity,
            PropValue::Scalar(1.0),
            half,
            Ease::InOutQuad,
        )?;
        run.stage.advance(half);

        run.cursor_rest = run.cursor_position()?;
        run.last_target = None;
        Ok(Dispatch::Done(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Action, ActionKind, ColorScheme, ElementKind, Geometry, SceneMap, Theme, UIElement,
    };

    fn element(id: &str, kind: ElementKind, geometry: Geometry) -> UIElement {
        UIElement {
            id: id.to_string(),
            kind,
            description: id.to_string(),
            geometry,
            styling: None,
            content: None,
            parent_id: None,
            z_order: 0,
        }
    }

    fn scene(id: &str, accent: &str) -> SceneMap {
        SceneMap {
            scene_id: id.to_string(),
            image_path: format!("scenes/{id}.png"),
            color_scheme: ColorScheme {
                primary: "#202124".to_string(),
                background: "#ffffff".to_string(),
                accent: accent.to_string(),
                theme: Theme::Light,
            },
            elements: vec![
                element(
                    "search_input",
                    ElementKind::Input,
                    Geometry {
                        x: 745.0,
                        y: 390.0,
                        width: 600.0,
                        height: 40.0,
                    },
                ),
                element(
                    "go_button",
                    ElementKind::Button,
                    Geometry {
                        x: 900.0,
                        y: 500.0,
                        width: 120.0,
                        height: 44.0,
                    },
                ),
            ],
        }
    }

    fn action(kind: ActionKind, target: Option<&str>, payload: Option<&str>, d: f64) -> Action {
        Action {
            kind,
            target_element_id: target.map(str::to_string),
            payload: payload.map(str::to_string),
            duration: d,
        }
    }

    fn board(actions: Vec<Action>) -> Storyboard {
        Storyboard {
            scenes: vec![scene("home", "#1a73e8"), scene("results", "#e8711a")],
            actions,
        }
    }

    fn opts(seed: u64) -> PlayerOptions {
        PlayerOptions {
            seed: Some(seed),
            ..PlayerOptions::default()
        }
    }

    #[test]
    fn player_reaches_finished() {
        let b = board(vec![action(ActionKind::Wait, None, None, 0.5)]);
        let mut player = Player::new(&b, opts(1));
        assert_eq!(player.state(), PlayerState::Idle);
        player.play().unwrap();
        assert_eq!(player.state(), PlayerState::Finished);
    }

    #[test]
    fn cursor_ends_at_target_center() {
        let b = board(vec![action(
            ActionKind::CursorMove,
            Some("search_input"),
            None,
            1.0,
        )]);
        let pb = Player::new(&b, opts(1)).play().unwrap();
        let last_cursor_move = pb
            .trace
            .iter()
            .rev()
            .find_map(|m| match &m.kind {
                crate::stage::MutationKind::Animate {
                    node,
                    prop: Prop::Position,
                    to: PropValue::Point(p),
                    ..
                } if node == CURSOR_ID => Some(*p),
                _ => None,
            })
            .unwrap();
        assert_eq!(last_cursor_move, Point::new(85.0, -130.0));
    }

    #[test]
    fn resolution_miss_skips_and_continues() {
        let b = board(vec![
            action(ActionKind::CursorMove, Some("nope"), None, 1.0),
            action(ActionKind::CursorMove, Some("go_button"), None, 1.0),
        ]);
        let pb = Player::new(&b, opts(1)).play().unwrap();
        assert_eq!(pb.diagnostics.len(), 1);
        assert_eq!(pb.diagnostics[0].action_index, 0);
        assert_eq!(pb.steps.len(), 1);
        assert_eq!(pb.steps[0].target.as_deref(), Some("go_button"));
    }

    #[test]
    fn unknown_action_kind_is_skipped() {
        let b = board(vec![
            action(ActionKind::Unknown, None, None, 1.0),
            action(ActionKind::Wait, None, None, 0.1),
        ]);
        let pb = Player::new(&b, opts(1)).play().unwrap();
        assert_eq!(pb.diagnostics.len(), 1);
        assert_eq!(pb.steps.len(), 1);
        assert_eq!(pb.steps[0].kind, ActionKind::Wait);
    }

    #[test]
    fn unknown_switch_target_keeps_active_scene() {
        let b = board(vec![
            action(ActionKind::SwitchScene, None, Some("missing"), 1.0),
            action(ActionKind::CursorMove, Some("search_input"), None, 1.0),
        ]);
        let pb = Player::new(&b, opts(1)).play().unwrap();
        assert_eq!(pb.diagnostics.len(), 1);
        // The move still resolves against the first scene.
        assert_eq!(pb.steps.len(), 1);
        assert_eq!(pb.steps[0].target.as_deref(), Some("search_input"));
    }

    #[test]
    fn click_falls_back_to_last_move_target() {
        let b = board(vec![
            action(ActionKind::CursorMove, Some("go_button"), None, 1.0),
            action(ActionKind::Click, None, None, 0.2),
        ]);
        let pb = Player::new(&b, opts(1)).play().unwrap();
        assert_eq!(pb.diagnostics.len(), 0);
        assert_eq!(pb.steps[1].target.as_deref(), Some("go_button"));
    }

    #[test]
    fn logical_trace_is_replay_stable_across_seeds() {
        let b = board(vec![
            action(ActionKind::CursorMove, Some("search_input"), None, 1.0),
            action(ActionKind::Click, Some("search_input"), None, 0.2),
            action(ActionKind::Type, Some("search_input"), Some("Hello"), 2.0),
            action(ActionKind::SwitchScene, None, Some("results"), 1.0),
            action(ActionKind::CursorMove, Some("go_button"), None, 0.8),
        ]);
        let a = Player::new(&b, opts(11)).play().unwrap();
        let c = Player::new(&b, opts(99)).play().unwrap();
        assert_eq!(a.steps, c.steps);
        assert_eq!(a.diagnostics, c.diagnostics);
    }

    #[test]
    fn wait_adds_no_mutations() {
        let b = board(vec![action(ActionKind::Wait, None, None, 2.0)]);
        let pb = Player::new(&b, opts(1)).play().unwrap();
        // Spawns from scene activation and the cursor only.
        assert!(pb.trace.iter().all(|m| m.at == 0.0));
        // 2s wait + 1s final hold.
        assert_eq!(pb.duration_secs, 3.0);
    }

    #[test]
    fn scene_switch_rethemes_the_cursor() {
        let b = board(vec![action(
            ActionKind::SwitchScene,
            None,
            Some("results"),
            1.0,
        )]);
        let pb = Player::new(&b, opts(1)).play().unwrap();
        let retheme = pb.trace.iter().any(|m| {
            matches!(
                &m.kind,
                crate::stage::MutationKind::Set { node, prop: Prop::Color, .. }
                if node == CURSOR_ID
            )
        });
        assert!(retheme);
    }

    #[test]
    fn hybrid_promotes_on_first_move_onto_asset_backed_target() {
        let mut manifest = AssetManifest::new();
        manifest.insert("home", "go_button", "assets/home/go_button.svg");
        let b = board(vec![
            // No asset for the input: no promotion yet.
            action(ActionKind::CursorMove, Some("search_input"), None, 0.5),
            action(ActionKind::CursorMove, Some("go_button"), None, 0.5),
        ]);
        let pb = Player::new(
            &b,
            PlayerOptions {
                mode: RenderMode::Hybrid,
                seed: Some(1),
                ..PlayerOptions::default()
            },
        )
        .with_assets(manifest)
        .play()
        .unwrap();

        let promote_at = pb
            .trace
            .iter()
            .find_map(|m| match &m.kind {
                crate::stage::MutationKind::Animate {
                    node,
                    prop: Prop::Opacity,
                    to: PropValue::Scalar(v),
                    ..
                } if node == "asset:go_button" && *v == 1.0 => Some(m.at),
                _ => None,
            })
            .expect("promotion crossfade present");
        // Promotion happens during the second move, not the first.
        assert!(promote_at > 0.5);
    }
}
