#![forbid(unsafe_code)]

pub mod builder;
pub mod ease;
pub mod error;
pub mod feedback;
pub mod layers;
pub mod model;
pub mod palette;
pub mod player;
pub mod stage;
pub mod transform;

pub use builder::{ElementBuilder, SceneBuilder, StoryboardBuilder};
pub use ease::Ease;
pub use error::{ReenactError, ReenactResult};
pub use layers::AssetManifest;
pub use model::{Action, ActionKind, SceneMap, Storyboard, UIElement};
pub use palette::{Palette, Rgba8};
pub use player::{Playback, Player, PlayerOptions, RenderMode};
pub use stage::{Mutation, MutationKind, Stage};
pub use transform::Canvas;
