use super::behavior::Behavior;
use super::math::{Color, Vec3};
use slotmap::new_key_type;
use std::collections::HashMap;

new_key_type! {
    pub struct ModuleKey;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Cube,
    Sphere,
    Plane,
}

/// The concrete variant of a render module.
#[derive(Clone, Debug, PartialEq)]
pub enum ModuleKind {
    /// An invisible node that only carries a transform for its children.
    Group,
    Shape(Shape),
    Text {
        text: String,
        font: Option<String>,
        font_size: u32,
        antialias: bool,
    },
}

impl ModuleKind {
    pub fn text() -> Self {
        ModuleKind::Text {
            text: String::new(),
            font: None,
            font_size: 24,
            antialias: true,
        }
    }

    /// The name a module is created under, on the wire and in the registry.
    pub fn type_tag(&self) -> &'static str {
        match self {
            ModuleKind::Group => "Group",
            ModuleKind::Shape(Shape::Cube) => "Cube",
            ModuleKind::Shape(Shape::Sphere) => "Sphere",
            ModuleKind::Shape(Shape::Plane) => "Plane",
            ModuleKind::Text { .. } => "Text",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ModuleKind::Text { .. })
    }
}

/// One node of the render tree.
///
/// Modules are only mutated through [`super::RenderTree`], which mirrors every
/// change to the tree's relay targets.
pub struct RenderModule {
    pub(super) id: i32,
    pub(super) kind: ModuleKind,
    pub(super) position: Vec3,
    pub(super) rotation: Vec3,
    pub(super) scale: Vec3,
    pub(super) color: Color,
    pub(super) flags: HashMap<String, bool>,
    pub(super) ticks: u64,
    pub(super) done: bool,
    pub(super) initialized: bool,
    pub(super) parent: Option<ModuleKey>,
    pub(super) children: Vec<ModuleKey>,
    pub(super) behaviors: Vec<Box<dyn Behavior>>,
}

impl RenderModule {
    pub(super) fn new(id: i32, kind: ModuleKind) -> Self {
        Self {
            id,
            kind,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            color: Color::WHITE,
            flags: HashMap::new(),
            ticks: 0,
            done: false,
            initialized: false,
            parent: None,
            children: vec![],
            behaviors: vec![],
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn kind(&self) -> &ModuleKind {
        &self.kind
    }

    pub fn type_tag(&self) -> &'static str {
        self.kind.type_tag()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Unset flags read as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Number of frames this module has been rendered.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn parent(&self) -> Option<ModuleKey> {
        self.parent
    }

    pub fn children(&self) -> &[ModuleKey] {
        &self.children
    }

    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }
}

impl std::fmt::Debug for RenderModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderModule")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("position", &self.position)
            .field("color", &self.color)
            .field("done", &self.done)
            .field("children", &self.children.len())
            .field("behaviors", &self.behaviors.len())
            .finish()
    }
}
