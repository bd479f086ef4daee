use crate::{
    error::{ReenactError, ReenactResult},
    model::{
        Action, ActionKind, ColorScheme, ElementKind, Geometry, SceneMap, Storyboard, Styling,
        Theme, UIElement,
    },
};

/// Programmatic storyboard construction. `build()` runs the full validation
/// gate, so a built storyboard is already playable.
pub struct StoryboardBuilder {
    scenes: Vec<SceneMap>,
    actions: Vec<Action>,
}

impl StoryboardBuilder {
    pub fn new() -> Self {
        Self {
            scenes: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn scene(mut self, scene: SceneMap) -> Self {
        self.scenes.push(scene);
        self
    }

    pub fn cursor_move(mut self, target: impl Into<String>, duration: f64) -> Self {
        self.actions.push(Action {
            kind: ActionKind::CursorMove,
            target_element_id: Some(target.into()),
            payload: None,
            duration,
        });
        self
    }

    pub fn click(mut self, target: impl Into<String>, duration: f64) -> Self {
        self.actions.push(Action {
            kind: ActionKind::Click,
            target_element_id: Some(target.into()),
            payload: None,
            duration,
        });
        self
    }

    pub fn type_text(
        mut self,
        target: impl Into<String>,
        text: impl Into<String>,
        duration: f64,
    ) -> Self {
        self.actions.push(Action {
            kind: ActionKind::Type,
            target_element_id: Some(target.into()),
            payload: Some(text.into()),
            duration,
        });
        self
    }

    pub fn wait(mut self, duration: f64) -> Self {
        self.actions.push(Action {
            kind: ActionKind::Wait,
            target_element_id: None,
            payload: None,
            duration,
        });
        self
    }

    pub fn switch_scene(mut self, scene_id: impl Into<String>, duration: f64) -> Self {
        self.actions.push(Action {
            kind: ActionKind::SwitchScene,
            target_element_id: None,
            payload: Some(scene_id.into()),
            duration,
        });
        self
    }

    pub fn build(self) -> ReenactResult<Storyboard> {
        let board = Storyboard {
            scenes: self.scenes,
            actions: self.actions,
        };
        board.validate()?;
        Ok(board)
    }
}

impl Default for StoryboardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SceneBuilder {
    scene_id: String,
    image_path: String,
    color_scheme: ColorScheme,
    elements: Vec<UIElement>,
}

impl SceneBuilder {
    pub fn new(scene_id: impl Into<String>, image_path: impl Into<String>) -> Self {
        Self {
            scene_id: scene_id.into(),
            image_path: image_path.into(),
            color_scheme: ColorScheme {
                primary: "#1f2937".to_string(),
                background: "#ffffff".to_string(),
                accent: "#1a73e8".to_string(),
                theme: Theme::Light,
            },
            elements: Vec::new(),
        }
    }

    pub fn color_scheme(mut self, scheme: ColorScheme) -> Self {
        self.color_scheme = scheme;
        self
    }

    pub fn element(mut self, element: UIElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn build(self) -> ReenactResult<SceneMap> {
        let scene = SceneMap {
            scene_id: self.scene_id,
            image_path: self.image_path,
            color_scheme: self.color_scheme,
            elements: self.elements,
        };
        scene.validate()?;
        Ok(scene)
    }
}

pub struct ElementBuilder {
    id: String,
    kind: ElementKind,
    description: String,
    geometry: Geometry,
    styling: Option<Styling>,
    content: Option<String>,
    parent_id: Option<String>,
    z_order: i32,
}

impl ElementBuilder {
    pub fn new(id: impl Into<String>, kind: ElementKind, geometry: Geometry) -> Self {
        let id = id.into();
        Self {
            description: id.clone(),
            id,
            kind,
            geometry,
            styling: None,
            content: None,
            parent_id: None,
            z_order: 0,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn styling(mut self, styling: Styling) -> Self {
        self.styling = Some(styling);
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn z_order(mut self, z: i32) -> Self {
        self.z_order = z;
        self
    }

    pub fn build(self) -> ReenactResult<UIElement> {
        if self.id.trim().is_empty() {
            return Err(ReenactError::validation("element id must be non-empty"));
        }
        self.geometry.validate()?;
        Ok(UIElement {
            id: self.id,
            kind: self.kind,
            description: self.description,
            geometry: self.geometry,
            styling: self.styling,
            content: self.content,
            parent_id: self.parent_id,
            z_order: self.z_order,
        })
    }
}
