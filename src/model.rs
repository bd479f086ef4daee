use std::collections::BTreeSet;

use crate::error::{ReenactError, ReenactResult};

/// Top-left-origin pixel rectangle in source-image space.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    pub fn validate(&self) -> ReenactResult<()> {
        let fields = [self.x, self.y, self.width, self.height];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(ReenactError::validation("geometry must be finite"));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(ReenactError::validation(
                "geometry width/height must be > 0",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Button,
    Input,
    Text,
    Image,
    Link,
    Icon,
    Logo,
    Container,
}

/// Per-element style overrides. Absence means "use theme default".
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Styling {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
}

/// One detected/declared interactive or visual region.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UIElement {
    pub id: String,
    pub kind: ElementKind,
    pub description: String,
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styling: Option<Styling>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub z_order: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

/// Scene-wide palette extracted from the screenshot; colors are hex strings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorScheme {
    pub primary: String,
    pub background: String,
    pub accent: String,
    pub theme: Theme,
}

/// Validated set of UI elements for one screenshot. Immutable after
/// validation; the interpreter only ever reads it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneMap {
    pub scene_id: String,
    pub image_path: String,
    pub color_scheme: ColorScheme,
    pub elements: Vec<UIElement>,
}

impl SceneMap {
    pub fn validate(&self) -> ReenactResult<()> {
        if self.scene_id.trim().is_empty() {
            return Err(ReenactError::validation("sceneId must be non-empty"));
        }
        if self.image_path.trim().is_empty() {
            return Err(ReenactError::validation(format!(
                "scene '{}' imagePath must be non-empty",
                self.scene_id
            )));
        }

        let mut ids = BTreeSet::new();
        for el in &self.elements {
            if el.id.trim().is_empty() {
                return Err(ReenactError::validation(format!(
                    "scene '{}' has an element with an empty id",
                    self.scene_id
                )));
            }
            if !ids.insert(el.id.as_str()) {
                return Err(ReenactError::validation(format!(
                    "scene '{}' has duplicate element id '{}'",
                    self.scene_id, el.id
                )));
            }
            el.geometry
                .validate()
                .map_err(|e| ReenactError::validation(format!("element '{}': {e}", el.id)))?;
        }

        for el in &self.elements {
            if let Some(parent) = &el.parent_id {
                if !ids.contains(parent.as_str()) {
                    return Err(ReenactError::validation(format!(
                        "element '{}' references missing parent '{}'",
                        el.id, parent
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn element(&self, id: &str) -> Option<&UIElement> {
        self.elements.iter().find(|e| e.id == id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CursorMove,
    Click,
    Type,
    Wait,
    SwitchScene,
    /// Tolerated at parse time; skipped with a diagnostic during playback.
    #[serde(other)]
    Unknown,
}

fn default_duration() -> f64 {
    1.0
}

/// One step of the action script.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_element_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default = "default_duration")]
    pub duration: f64,
}

/// The unit of replayability: scenes plus the ordered action script.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Storyboard {
    pub scenes: Vec<SceneMap>,
    pub actions: Vec<Action>,
}

impl Storyboard {
    /// Full pre-playback gate: structural scene checks plus a walk of the
    /// action list that resolves every reference against the scene active
    /// at that point. Fails before any playback starts.
    pub fn validate(&self) -> ReenactResult<()> {
        self.validate_scenes()?;

        let mut active = 0usize;
        let mut last_target: Option<&str> = None;
        for (i, action) in self.actions.iter().enumerate() {
            if !action.duration.is_finite() || action.duration < 0.0 {
                return Err(ReenactError::validation(format!(
                    "action {i}: duration must be a non-negative finite number"
                )));
            }

            match action.kind {
                ActionKind::CursorMove | ActionKind::Click | ActionKind::Type => {
                    // Clicks and types may omit the target and inherit the
                    // last cursor_move destination; a move never can.
                    let target = match (action.target_element_id.as_deref(), action.kind) {
                        (Some(t), _) => t,
                        (None, ActionKind::CursorMove) => {
                            return Err(ReenactError::validation(format!(
                                "action {i}: cursor_move requires targetElementId"
                            )));
                        }
                        (None, _) => last_target.ok_or_else(|| {
                            ReenactError::validation(format!(
                                "action {i} ({:?}): no targetElementId and no preceding cursor_move to inherit from",
                                action.kind
                            ))
                        })?,
                    };
                    if self.scenes[active].element(target).is_none() {
                        return Err(ReenactError::validation(format!(
                            "action {i}: target '{}' not found in active scene '{}'",
                            target, self.scenes[active].scene_id
                        )));
                    }
                    if action.kind == ActionKind::Type && action.payload.is_none() {
                        return Err(ReenactError::validation(format!(
                            "action {i}: type action requires a text payload"
                        )));
                    }
                    if action.kind == ActionKind::CursorMove {
                        last_target = Some(target);
                    }
                }
                ActionKind::SwitchScene => {
                    let target = action.payload.as_deref().ok_or_else(|| {
                        ReenactError::validation(format!(
                            "action {i}: switch_scene requires a sceneId payload"
                        ))
                    })?;
                    active = self.scene_index(target).ok_or_else(|| {
                        ReenactError::validation(format!(
                            "action {i}: switch_scene references unknown scene '{target}'"
                        ))
                    })?;
                    last_target = None;
                }
                ActionKind::Wait => {}
                // Skipped at playback; nothing to resolve here.
                ActionKind::Unknown => {}
            }
        }

        Ok(())
    }

    /// Structural scene checks only (non-empty, unique ids, sane geometry).
    /// The interpreter re-runs this cheap gate; per-action resolution misses
    /// past this point are contained as diagnostics, not errors.
    pub fn validate_scenes(&self) -> ReenactResult<()> {
        if self.scenes.is_empty() {
            return Err(ReenactError::validation(
                "storyboard must contain at least one scene",
            ));
        }
        let mut ids = BTreeSet::new();
        for scene in &self.scenes {
            scene.validate()?;
            if !ids.insert(scene.scene_id.as_str()) {
                return Err(ReenactError::validation(format!(
                    "duplicate sceneId '{}'",
                    scene.scene_id
                )));
            }
        }
        Ok(())
    }

    pub fn scene_index(&self, scene_id: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.scene_id == scene_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(id: &str, kind: ElementKind) -> UIElement {
        UIElement {
            id: id.to_string(),
            kind,
            description: format!("{id} element"),
            geometry: Geometry {
                x: 10.0,
                y: 20.0,
                width: 100.0,
                height: 40.0,
            },
            styling: None,
            content: None,
            parent_id: None,
            z_order: 0,
        }
    }

    fn scene(id: &str) -> SceneMap {
        SceneMap {
            scene_id: id.to_string(),
            image_path: format!("scenes/{id}.png"),
            color_scheme: ColorScheme {
                primary: "#1a73e8".to_string(),
                background: "#ffffff".to_string(),
                accent: "#1a73e8".to_string(),
                theme: Theme::Light,
            },
            elements: vec![
                element("search_input", ElementKind::Input),
                element("go_button", ElementKind::Button),
            ],
        }
    }

    fn board() -> Storyboard {
        Storyboard {
            scenes: vec![scene("home"), scene("results")],
            actions: vec![
                Action {
                    kind: ActionKind::CursorMove,
                    target_element_id: Some("search_input".to_string()),
                    payload: None,
                    duration: 1.0,
                },
                Action {
                    kind: ActionKind::SwitchScene,
                    target_element_id: None,
                    payload: Some("results".to_string()),
                    duration: 1.0,
                },
                Action {
                    kind: ActionKind::Click,
                    target_element_id: Some("go_button".to_string()),
                    payload: None,
                    duration: 0.2,
                },
            ],
        }
    }

    #[test]
    fn json_roundtrip_uses_wire_names() {
        let b = board();
        let s = serde_json::to_string(&b).unwrap();
        assert!(s.contains("\"sceneId\""));
        assert!(s.contains("\"imagePath\""));
        assert!(s.contains("\"targetElementId\""));
        assert!(s.contains("\"cursor_move\""));
        let de: Storyboard = serde_json::from_str(&s).unwrap();
        assert_eq!(de, b);
    }

    #[test]
    fn duration_defaults_to_one_second() {
        let a: Action = serde_json::from_str(r#"{"kind":"wait"}"#).unwrap();
        assert_eq!(a.duration, 1.0);
    }

    #[test]
    fn unknown_action_kind_is_tolerated() {
        let a: Action = serde_json::from_str(r#"{"kind":"hover","duration":0.5}"#).unwrap();
        assert_eq!(a.kind, ActionKind::Unknown);

        let mut b = board();
        b.actions.push(a);
        b.validate().unwrap();
    }

    #[test]
    fn validate_accepts_good_board() {
        board().validate().unwrap();
    }

    #[test]
    fn validate_rejects_duplicate_element_ids() {
        let mut b = board();
        let dup = b.scenes[0].elements[0].clone();
        b.scenes[0].elements.push(dup);
        assert!(b.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_size_geometry() {
        let mut b = board();
        b.scenes[0].elements[0].geometry.width = 0.0;
        assert!(b.validate().is_err());
    }

    #[test]
    fn validate_rejects_dangling_parent() {
        let mut b = board();
        b.scenes[0].elements[0].parent_id = Some("nope".to_string());
        assert!(b.validate().is_err());
    }

    #[test]
    fn validate_resolves_targets_against_the_active_scene() {
        let mut b = board();
        // After the switch to "results", the click target must resolve there.
        b.scenes[1].elements.retain(|e| e.id != "go_button");
        assert!(b.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_switch_target() {
        let mut b = board();
        b.actions[1].payload = Some("missing".to_string());
        assert!(b.validate().is_err());
    }

    #[test]
    fn click_without_target_inherits_the_last_move() {
        let bare_click = Action {
            kind: ActionKind::Click,
            target_element_id: None,
            payload: None,
            duration: 0.2,
        };

        let mut b = board();
        b.actions = vec![b.actions[0].clone(), bare_click.clone()];
        b.validate().unwrap();

        // A switch clears the inherited target.
        let mut b2 = board();
        b2.actions = vec![
            b2.actions[0].clone(),
            b2.actions[1].clone(),
            bare_click,
        ];
        assert!(b2.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_duration() {
        let mut b = board();
        b.actions[0].duration = -0.5;
        assert!(b.validate().is_err());
    }
}
