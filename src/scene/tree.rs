use super::behavior::Behavior;
use super::command::Command;
use super::graphics::Graphics;
use super::math::{Color, Vec3};
use super::module::{ModuleKey, ModuleKind, RenderModule};
use super::protocol::{create_message, module_reply, TreeMessage};
use super::registry;
use super::relay::Relayer;
use rosc::OscMessage;
use slotmap::SlotMap;
use std::collections::HashMap;
use tracing::{debug, warn};

/// The replicated values of one module, used to compare a tree with its mirrors.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleSummary {
    pub id: i32,
    pub type_tag: &'static str,
    pub position: Vec3,
    pub color: Color,
}

/// A scene graph of render modules addressed by integer id.
///
/// Every mutation goes through the tree so it can be mirrored to the relayer as
/// the `/<id>/<command>` message that reproduces it on a remote tree.
pub struct RenderTree {
    modules: SlotMap<ModuleKey, RenderModule>,
    roots: Vec<ModuleKey>,
    ids: HashMap<i32, ModuleKey>,
    next_id: i32,
    pending_init: Vec<ModuleKey>,
    relayer: Relayer,
    commands: Vec<Command>,
    visited: Vec<ModuleKey>,
    elapsed: f32,
}

impl Default for RenderTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderTree {
    pub fn new() -> Self {
        Self::with_relayer(Relayer::new())
    }

    pub fn with_relayer(relayer: Relayer) -> Self {
        Self {
            modules: SlotMap::with_key(),
            roots: vec![],
            ids: HashMap::new(),
            next_id: 0,
            pending_init: vec![],
            relayer,
            commands: Vec::with_capacity(8),
            visited: vec![],
            elapsed: 0.0,
        }
    }

    /// Relay targets added here receive every mutation from now on.
    pub fn relayer_mut(&mut self) -> &mut Relayer {
        &mut self.relayer
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn roots(&self) -> &[ModuleKey] {
        &self.roots
    }

    /// Seconds of frame time rendered so far.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// The id the next local creation will get.
    pub fn next_id(&self) -> i32 {
        self.next_id
    }

    pub fn module(&self, key: ModuleKey) -> Option<&RenderModule> {
        self.modules.get(key)
    }

    /// Finds a module by id at any depth.
    pub fn find(&self, id: i32) -> Option<ModuleKey> {
        self.ids.get(&id).copied()
    }

    /// Creates a root module under the next free id.
    ///
    /// Returns `None` once the id space is used up; ids are never reused.
    pub fn create_module(&mut self, kind: ModuleKind) -> Option<ModuleKey> {
        let id = self.next_id;
        let Some(next) = id.checked_add(1) else {
            warn!(id, "module ids exhausted");
            return None;
        };
        self.next_id = next;
        Some(self.insert(id, kind))
    }

    /// Creates a registered variant under a forced id, as a mirror does on `/create`.
    ///
    /// Unknown type tags, ids already in use and ids outside `0..i32::MAX` are ignored.
    pub fn create_with_id(&mut self, type_tag: &str, id: i32) -> Option<ModuleKey> {
        if !(0..i32::MAX).contains(&id) {
            debug!(id, "module id out of range");
            return None;
        }
        if self.ids.contains_key(&id) {
            debug!(id, "module already exists");
            return None;
        }
        let Some(kind) = registry::create(type_tag) else {
            debug!(type_tag, "unknown module type");
            return None;
        };
        self.next_id = self.next_id.max(id + 1);
        Some(self.insert(id, kind))
    }

    fn insert(&mut self, id: i32, kind: ModuleKind) -> ModuleKey {
        let type_tag = kind.type_tag();
        let key = self.modules.insert(RenderModule::new(id, kind));
        self.roots.push(key);
        self.ids.insert(id, key);
        self.pending_init.push(key);
        self.relayer.send(&create_message(type_tag, id));
        debug!(id, type_tag, "created module");
        key
    }

    /// Moves `child` under `parent`, detaching it from wherever it was.
    ///
    /// Returns false if either module is missing or the move would create a cycle.
    pub fn add_child(&mut self, parent: ModuleKey, child: ModuleKey) -> bool {
        if !self.modules.contains_key(parent) || !self.modules.contains_key(child) {
            return false;
        }
        let mut ancestor = Some(parent);
        while let Some(key) = ancestor {
            if key == child {
                debug!("refusing to parent a module under its own subtree");
                return false;
            }
            ancestor = self.modules[key].parent;
        }

        self.detach(child);
        self.modules[child].parent = Some(parent);
        self.modules[parent].children.push(child);

        let child_id = self.modules[child].id;
        let parent_id = self.modules[parent].id;
        self.relayer.send(&Command::AddChild(child_id).to_osc(parent_id));
        true
    }

    fn detach(&mut self, key: ModuleKey) {
        match self.modules.get_mut(key).and_then(|m| m.parent.take()) {
            Some(parent) => {
                if let Some(parent) = self.modules.get_mut(parent) {
                    parent.children.retain(|c| *c != key);
                }
            }
            None => self.roots.retain(|r| *r != key),
        }
    }

    /// Attaches a behavior and runs its `init` against the module's current state.
    pub fn add_behavior(&mut self, key: ModuleKey, behavior: impl Behavior + 'static) -> bool {
        let Some(module) = self.modules.get(key) else {
            return false;
        };
        let mut behavior: Box<dyn Behavior> = Box::new(behavior);
        let mut commands = std::mem::take(&mut self.commands);
        behavior.init(module, &mut commands);
        for command in commands.drain(..) {
            self.apply(key, command);
        }
        self.commands = commands;

        match self.modules.get_mut(key) {
            Some(module) => {
                module.behaviors.push(behavior);
                true
            }
            None => false,
        }
    }

    pub fn set_position(&mut self, key: ModuleKey, position: Vec3) -> bool {
        self.apply(key, Command::SetPosition(position))
    }

    pub fn set_rotation(&mut self, key: ModuleKey, rotation: Vec3) -> bool {
        self.apply(key, Command::SetRotation(rotation))
    }

    pub fn set_scale(&mut self, key: ModuleKey, scale: Vec3) -> bool {
        self.apply(key, Command::SetScale(scale))
    }

    pub fn set_color(&mut self, key: ModuleKey, color: Color) -> bool {
        self.apply(
            key,
            Command::SetColor {
                rgb: [color.r, color.g, color.b],
                alpha: Some(color.a),
            },
        )
    }

    pub fn set_flag(&mut self, key: ModuleKey, name: &str, value: bool) -> bool {
        self.apply(
            key,
            Command::SetFlag {
                name: name.to_owned(),
                value,
            },
        )
    }

    pub fn set_text(&mut self, key: ModuleKey, text: &str) -> bool {
        self.apply(key, Command::SetText(text.to_owned()))
    }

    pub fn load_font(&mut self, key: ModuleKey, path: &str, size: u32, antialias: bool) -> bool {
        self.apply(
            key,
            Command::LoadFont {
                path: path.to_owned(),
                size,
                antialias,
            },
        )
    }

    pub fn set_font_size(&mut self, key: ModuleKey, size: u32) -> bool {
        self.apply(key, Command::SetFontSize(size))
    }

    /// Flags the module for removal at the end of the next render.
    pub fn mark_done(&mut self, key: ModuleKey) -> bool {
        self.apply(key, Command::Done)
    }

    /// Removes the module and its subtree now.
    pub fn destroy(&mut self, key: ModuleKey) -> bool {
        self.apply(key, Command::Destroy)
    }

    /// Applies one command to a module and replicates it.
    ///
    /// Returns false when the module is gone or the command does not apply to it.
    pub fn apply(&mut self, key: ModuleKey, command: Command) -> bool {
        let Some(module) = self.modules.get_mut(key) else {
            return false;
        };
        if !command.supported_by(&module.kind) {
            debug!(id = module.id, command = command.name(), type_tag = module.type_tag(), "unsupported command");
            return false;
        }
        let id = module.id;
        let replicated = match command {
            Command::AddChild(child_id) => {
                return match self.ids.get(&child_id).copied() {
                    Some(child) => self.add_child(key, child),
                    None => {
                        debug!(id, child_id, "addChild with unknown child");
                        false
                    }
                };
            }
            Command::Destroy => {
                self.remove(key);
                return true;
            }
            Command::Done => {
                module.done = true;
                return true;
            }
            Command::SetPosition(p) => {
                module.position = p;
                Command::SetPosition(p)
            }
            Command::SetRotation(r) => {
                module.rotation = r;
                Command::SetRotation(r)
            }
            Command::SetScale(s) => {
                module.scale = s;
                Command::SetScale(s)
            }
            Command::SetColor { rgb, alpha } => {
                let [r, g, b] = rgb;
                let alpha = alpha.unwrap_or(module.color.a);
                module.color = Color::rgba(r, g, b, alpha);
                Command::SetColor {
                    rgb,
                    alpha: Some(alpha),
                }
            }
            Command::SetFlag { name, value } => {
                module.flags.insert(name.clone(), value);
                Command::SetFlag { name, value }
            }
            Command::SetText(new_text) => {
                if let ModuleKind::Text { text, .. } = &mut module.kind {
                    text.clone_from(&new_text);
                }
                Command::SetText(new_text)
            }
            Command::LoadFont { path, size, antialias } => {
                if let ModuleKind::Text {
                    font,
                    font_size,
                    antialias: aa,
                    ..
                } = &mut module.kind
                {
                    *font = Some(path.clone());
                    *font_size = size;
                    *aa = antialias;
                }
                Command::LoadFont { path, size, antialias }
            }
            Command::SetFontSize(size) => {
                if let ModuleKind::Text { font_size, .. } = &mut module.kind {
                    *font_size = size;
                }
                Command::SetFontSize(size)
            }
        };
        self.relayer.send(&replicated.to_osc(id));
        true
    }

    /// Applies a command addressed by module id. Unknown ids are ignored.
    pub fn execute_command(&mut self, id: i32, command: Command) -> bool {
        match self.find(id) {
            Some(key) => self.apply(key, command),
            None => {
                debug!(id, command = command.name(), "command for unknown module");
                false
            }
        }
    }

    /// Applies a decoded protocol message, returning any replies to send back.
    pub fn handle_message(&mut self, message: TreeMessage) -> Vec<OscMessage> {
        match message {
            TreeMessage::Create { type_tag, id } => {
                self.create_with_id(&type_tag, id);
                vec![]
            }
            TreeMessage::Command { id, command } => {
                self.execute_command(id, command);
                vec![]
            }
            TreeMessage::ListModules { .. } => self.list_modules(),
        }
    }

    /// One `/module` reply per module, parents before their children.
    pub fn list_modules(&self) -> Vec<OscMessage> {
        self.depth_first().map(|key| module_reply(&self.modules[key])).collect()
    }

    fn depth_first(&self) -> impl Iterator<Item = ModuleKey> + '_ {
        let mut stack: Vec<ModuleKey> = self.roots.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let key = stack.pop()?;
            if let Some(module) = self.modules.get(key) {
                stack.extend(module.children.iter().rev());
            }
            Some(key)
        })
    }

    fn remove(&mut self, key: ModuleKey) {
        let Some(id) = self.modules.get(key).map(|m| m.id) else {
            return;
        };
        self.detach(key);
        self.relayer.send(&Command::Destroy.to_osc(id));

        let mut stack = vec![key];
        while let Some(key) = stack.pop() {
            if let Some(module) = self.modules.remove(key) {
                self.ids.remove(&module.id);
                stack.extend(module.children);
            }
        }
        debug!(id, "removed module");
    }

    /// Renders one frame.
    ///
    /// Newly created modules are initialised first. Then every module not done
    /// is drawn depth first at its accumulated translation, its behaviors are
    /// ticked, and finally every done module is removed.
    pub fn render(&mut self, graphics: &mut dyn Graphics, dt: f32) {
        self.elapsed += dt;

        for key in std::mem::take(&mut self.pending_init) {
            if let Some(module) = self.modules.get_mut(key) {
                graphics.init_module(module);
                module.initialized = true;
            }
        }

        let mut visited = std::mem::take(&mut self.visited);
        visited.clear();
        let mut stack: Vec<(ModuleKey, Vec3)> = self.roots.iter().rev().map(|&key| (key, Vec3::ZERO)).collect();
        while let Some((key, origin)) = stack.pop() {
            let Some(module) = self.modules.get_mut(key) else {
                continue;
            };
            if module.done {
                continue;
            }
            module.ticks += 1;
            let origin = origin + module.position;
            graphics.draw(module, origin);
            visited.push(key);
            stack.extend(module.children.iter().rev().map(|&child| (child, origin)));
        }

        for &key in &visited {
            self.tick_behaviors(key);
        }
        self.visited = visited;

        let done: Vec<ModuleKey> = self
            .modules
            .iter()
            .filter(|(_, module)| module.done)
            .map(|(key, _)| key)
            .collect();
        for key in done {
            self.remove(key);
        }
    }

    fn tick_behaviors(&mut self, key: ModuleKey) {
        let Some(module) = self.modules.get_mut(key) else {
            return;
        };
        if module.behaviors.is_empty() {
            return;
        }
        let mut behaviors = std::mem::take(&mut module.behaviors);
        let mut commands = std::mem::take(&mut self.commands);
        for behavior in behaviors.iter_mut() {
            let Some(module) = self.modules.get(key) else {
                break;
            };
            behavior.tick(module, &mut commands);
            for command in commands.drain(..) {
                self.apply(key, command);
            }
        }
        self.commands = commands;

        behaviors.retain(|behavior| !behavior.done());
        if let Some(module) = self.modules.get_mut(key) {
            module.behaviors = behaviors;
        }
    }

    /// Replicated state of every module, sorted by id.
    pub fn summaries(&self) -> Vec<ModuleSummary> {
        let mut summaries: Vec<ModuleSummary> = self
            .modules
            .values()
            .map(|m| ModuleSummary {
                id: m.id,
                type_tag: m.type_tag(),
                position: m.position,
                color: m.color,
            })
            .collect();
        summaries.sort_by_key(|s| s.id);
        summaries
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::osc::{message, Arg};
    use crate::scene::behavior::{FadeIn, FadeOut, Sink, Timeout};
    use crate::scene::graphics::NullGraphics;
    use crate::scene::module::Shape;
    use crate::scene::protocol::{CREATE, LIST_MODULES, MODULE_COMMAND};
    use std::net::SocketAddr;
    use std::sync::mpsc;

    fn from() -> SocketAddr {
        "127.0.0.1:4000".parse().unwrap()
    }

    fn relayed() -> (RenderTree, mpsc::Receiver<OscMessage>) {
        let (tx, rx) = mpsc::channel();
        let mut tree = RenderTree::new();
        tree.relayer_mut().add_target(tx);
        (tree, rx)
    }

    fn replay(mirror: &mut RenderTree, rx: &mpsc::Receiver<OscMessage>) -> usize {
        let mut count = 0;
        for msg in rx.try_iter() {
            let decoded = TreeMessage::decode(&msg, from());
            assert!(decoded.is_some(), "undecodable relay message {msg:?}");
            if let Some(decoded) = decoded {
                mirror.handle_message(decoded);
            }
            count += 1;
        }
        count
    }

    #[derive(Default)]
    struct Recorder {
        inits: Vec<i32>,
        draws: Vec<(i32, Vec3)>,
    }

    impl Graphics for Recorder {
        fn init_module(&mut self, module: &RenderModule) {
            self.inits.push(module.id());
        }

        fn draw(&mut self, module: &RenderModule, origin: Vec3) {
            self.draws.push((module.id(), origin));
        }
    }

    #[test]
    fn test_local_creation_is_monotonic_and_replicated() {
        let (mut tree, rx) = relayed();
        let a = tree.create_module(ModuleKind::Group).unwrap();
        let b = tree.create_module(ModuleKind::Shape(Shape::Cube)).unwrap();
        assert_eq!(tree.module(a).unwrap().id(), 0);
        assert_eq!(tree.module(b).unwrap().id(), 1);
        assert_eq!(tree.roots(), &[a, b]);

        tree.destroy(a);
        let c = tree.create_module(ModuleKind::Group).unwrap();
        assert_eq!(tree.module(c).unwrap().id(), 2, "ids are never reused");

        let addrs: Vec<String> = rx.try_iter().map(|m| m.addr).collect();
        assert_eq!(addrs, ["/create", "/create", "/0/destroy", "/create"]);
    }

    #[test]
    fn test_mutators_replicate_by_id() {
        let (mut tree, rx) = relayed();
        let key = tree.create_module(ModuleKind::Shape(Shape::Sphere)).unwrap();
        rx.try_iter().count();

        tree.set_position(key, Vec3::new(1.0, 2.0, 3.0));
        tree.set_flag(key, "wire", true);
        let msgs: Vec<OscMessage> = rx.try_iter().collect();
        assert_eq!(
            msgs,
            vec![
                message(
                    "/0/setPosition",
                    &[Arg::Float(1.0), Arg::Float(2.0), Arg::Float(3.0)]
                ),
                message("/0/setFlag", &[Arg::from("wire"), Arg::Int(1)]),
            ]
        );
        assert!(tree.module(key).unwrap().flag("wire"));
    }

    #[test]
    fn test_color_without_alpha_keeps_alpha() {
        let (mut tree, rx) = relayed();
        let key = tree.create_module(ModuleKind::Group).unwrap();
        tree.set_color(key, Color::WHITE.with_alpha(0.5));
        tree.execute_command(0, Command::parse("setColor", &[Arg::Float(0.2)]).unwrap());
        assert_eq!(tree.module(key).unwrap().color(), Color::rgba(0.2, 0.2, 0.2, 0.5));

        let last = rx.try_iter().last().unwrap();
        assert_eq!(last.args.len(), 4, "replicated colors always carry alpha");
    }

    #[test]
    fn test_both_command_forms_give_same_color() {
        let mut tree = RenderTree::new();
        let a = tree.create_module(ModuleKind::Group).unwrap();
        let b = tree.create_module(ModuleKind::Group).unwrap();

        let generic = message(
            MODULE_COMMAND,
            &[Arg::Int(0), Arg::from("setColor"), Arg::from("1"), Arg::from("0"), Arg::from("0")],
        );
        let direct = message("/1/setColor", &[Arg::Float(1.0), Arg::Float(0.0), Arg::Float(0.0)]);
        for msg in [generic, direct] {
            tree.handle_message(TreeMessage::decode(&msg, from()).unwrap());
        }

        assert_eq!(tree.module(a).unwrap().color(), Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(tree.module(a).unwrap().color(), tree.module(b).unwrap().color());
    }

    #[test]
    fn test_mirror_replay_matches_source() {
        let (mut source, rx) = relayed();
        let group = source.create_module(ModuleKind::Group).unwrap();
        let cube = source.create_module(ModuleKind::Shape(Shape::Cube)).unwrap();
        let label = source.create_module(ModuleKind::text()).unwrap();
        let doomed = source.create_module(ModuleKind::Shape(Shape::Plane)).unwrap();
        source.add_child(group, cube);
        source.set_position(group, Vec3::new(0.0, 1.0, 0.0));
        source.set_position(cube, Vec3::new(2.0, 0.0, -1.0));
        source.set_color(cube, Color::rgba(0.1, 0.2, 0.3, 0.9));
        source.set_text(label, "hello");
        source.add_behavior(label, FadeIn::new(3));
        source.add_behavior(cube, Sink::z(4, -2.0));
        source.add_behavior(doomed, FadeOut::new(2, 1));

        let mut graphics = NullGraphics;
        for _ in 0..6 {
            source.render(&mut graphics, 1.0 / 60.0);
        }
        assert_eq!(source.find(3), None, "faded module is gone");
        assert_eq!(source.module(label).unwrap().behavior_count(), 0);
        assert_eq!(source.module(cube).unwrap().behavior_count(), 0);

        let mut mirror = RenderTree::new();
        assert!(replay(&mut mirror, &rx) > 0);
        assert_eq!(mirror.summaries(), source.summaries());
        assert_eq!(mirror.module(mirror.find(1).unwrap()).unwrap().parent(), mirror.find(0));
    }

    #[test]
    fn test_fade_out_removes_module_after_frames() {
        let (mut tree, rx) = relayed();
        let key = tree.create_module(ModuleKind::Shape(Shape::Cube)).unwrap();
        tree.add_behavior(key, FadeOut::new(100, 0));
        let mut graphics = NullGraphics;
        for _ in 0..99 {
            tree.render(&mut graphics, 0.01);
        }
        let alpha = tree.module(key).unwrap().color().a;
        assert!(alpha > 0.0 && alpha < 0.02);

        tree.render(&mut graphics, 0.01);
        assert!(tree.module(key).is_none());
        assert!(tree.is_empty());
        assert_eq!(rx.try_iter().last().unwrap().addr, "/0/destroy");
    }

    #[test]
    fn test_timeout_removes_module() {
        let mut tree = RenderTree::new();
        let key = tree.create_module(ModuleKind::Group).unwrap();
        tree.add_behavior(key, Timeout::new(50));
        let mut graphics = NullGraphics;
        for _ in 0..49 {
            tree.render(&mut graphics, 0.01);
        }
        assert!(tree.module(key).is_some());
        tree.render(&mut graphics, 0.01);
        assert!(tree.module(key).is_none());
    }

    #[test]
    fn test_remote_create_forces_id_and_advances_counter() {
        let (mut mirror, rx) = relayed();
        let key = mirror.create_with_id("Sphere", 41).unwrap();
        assert_eq!(mirror.module(key).unwrap().type_tag(), "Sphere");
        assert_eq!(mirror.next_id(), 42);

        assert_eq!(mirror.create_with_id("Cube", 41), None, "duplicate id");
        assert_eq!(mirror.create_with_id("Teapot", 50), None, "unknown type");
        assert_eq!(mirror.len(), 1);

        let local = mirror.create_module(ModuleKind::Group).unwrap();
        assert_eq!(mirror.module(local).unwrap().id(), 42);

        let first = rx.try_recv().unwrap();
        assert_eq!(first, create_message("Sphere", 41), "creation is relayed onward");
    }

    #[test]
    fn test_lower_remote_id_keeps_counter() {
        let mut tree = RenderTree::new();
        for _ in 0..5 {
            tree.create_module(ModuleKind::Group).unwrap();
        }
        tree.create_with_id("Cube", 2_000);
        tree.create_with_id("Cube", 7);
        assert_eq!(tree.next_id(), 2_001);
    }

    #[test]
    fn test_id_counter_never_reuses_or_overflows() {
        let mut tree = RenderTree::new();
        let wire = message(CREATE, &[Arg::from("Cube"), Arg::Int(i32::MAX)]);
        assert!(TreeMessage::decode(&wire, from()).is_none());
        assert!(tree.create_with_id("Cube", i32::MAX).is_none());
        tree.handle_message(TreeMessage::Create {
            type_tag: "Cube".into(),
            id: i32::MAX,
        });
        assert!(tree.is_empty());

        let remote = tree.create_with_id("Cube", i32::MAX - 2).unwrap();
        assert_eq!(tree.next_id(), i32::MAX - 1);
        let last = tree.create_module(ModuleKind::Group).unwrap();
        assert_eq!(tree.module(last).unwrap().id(), i32::MAX - 1);
        assert!(tree.create_module(ModuleKind::Group).is_none());
        assert!(tree.create_module(ModuleKind::Group).is_none());

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.find(i32::MAX - 2), Some(remote));
        assert_eq!(tree.find(i32::MAX - 1), Some(last));
    }

    #[test]
    fn test_add_child_moves_and_rejects_cycles() {
        let mut tree = RenderTree::new();
        let a = tree.create_module(ModuleKind::Group).unwrap();
        let b = tree.create_module(ModuleKind::Group).unwrap();
        let c = tree.create_module(ModuleKind::Group).unwrap();

        assert!(tree.add_child(a, b));
        assert!(tree.add_child(b, c));
        assert_eq!(tree.roots(), &[a]);
        assert!(!tree.add_child(c, a), "a would become its own ancestor");
        assert!(!tree.add_child(a, a));

        assert!(tree.add_child(a, c));
        assert_eq!(tree.module(a).unwrap().children(), &[b, c]);
        assert!(tree.module(b).unwrap().children().is_empty());
        assert_eq!(tree.module(c).unwrap().parent(), Some(a));
    }

    #[test]
    fn test_children_draw_at_accumulated_translation() {
        let mut tree = RenderTree::new();
        let parent = tree.create_module(ModuleKind::Group).unwrap();
        let child = tree.create_module(ModuleKind::Shape(Shape::Cube)).unwrap();
        tree.add_child(parent, child);
        tree.set_position(parent, Vec3::new(1.0, 0.0, 0.0));
        tree.set_scale(parent, Vec3::splat(3.0));
        tree.set_position(child, Vec3::new(0.0, 2.0, 0.0));

        let mut recorder = Recorder::default();
        tree.render(&mut recorder, 0.0);
        tree.render(&mut recorder, 0.0);
        assert_eq!(recorder.inits, vec![0, 1], "init runs once");
        assert_eq!(
            recorder.draws[..2],
            [(0, Vec3::new(1.0, 0.0, 0.0)), (1, Vec3::new(1.0, 2.0, 0.0))]
        );
        assert!(tree.module(child).unwrap().is_initialized());
        assert_eq!(tree.module(child).unwrap().ticks(), 2);
    }

    #[test]
    fn test_done_child_removed_parent_persists() {
        let (mut tree, rx) = relayed();
        let parent = tree.create_module(ModuleKind::Group).unwrap();
        let child = tree.create_module(ModuleKind::Group).unwrap();
        tree.add_child(parent, child);
        tree.execute_command(1, Command::Done);
        rx.try_iter().count();
        assert!(tree.module(child).is_some(), "done waits for the next render");

        let mut recorder = Recorder::default();
        tree.render(&mut recorder, 0.0);
        assert!(tree.module(child).is_none());
        assert!(tree.module(parent).unwrap().children().is_empty());
        assert_eq!(recorder.draws.len(), 1);
        let addrs: Vec<String> = rx.try_iter().map(|m| m.addr).collect();
        assert_eq!(addrs, ["/1/destroy"]);
    }

    #[test]
    fn test_destroy_removes_subtree() {
        let mut tree = RenderTree::new();
        let parent = tree.create_module(ModuleKind::Group).unwrap();
        let child = tree.create_module(ModuleKind::Group).unwrap();
        tree.add_child(parent, child);
        tree.execute_command(0, Command::Destroy);
        assert!(tree.is_empty());
        assert_eq!(tree.find(1), None);
        assert!(!tree.set_position(child, Vec3::ONE));
    }

    #[test]
    fn test_malformed_and_unknown_are_ignored() {
        let mut tree = RenderTree::new();
        let group = tree.create_module(ModuleKind::Group).unwrap();
        let label = tree.create_module(ModuleKind::text()).unwrap();

        assert!(!tree.execute_command(99, Command::Done));
        assert!(!tree.set_text(group, "nope"));
        assert!(!tree.execute_command(0, Command::AddChild(99)));
        assert!(tree.load_font(label, "mono.ttf", 18, false));
        assert!(tree.set_font_size(label, 20));
        assert!(tree.set_text(label, "hi"));
        assert_eq!(
            tree.module(label).unwrap().kind(),
            &ModuleKind::Text {
                text: "hi".into(),
                font: Some("mono.ttf".into()),
                font_size: 20,
                antialias: false,
            }
        );
    }

    #[test]
    fn test_list_modules_replies_per_module() {
        let mut tree = RenderTree::new();
        let group = tree.create_module(ModuleKind::Group).unwrap();
        let cube = tree.create_module(ModuleKind::Shape(Shape::Cube)).unwrap();
        tree.create_module(ModuleKind::Shape(Shape::Plane)).unwrap();
        tree.add_child(group, cube);
        tree.set_position(cube, Vec3::new(4.0, 5.0, 6.0));

        let request = TreeMessage::decode(&message(LIST_MODULES, &[Arg::Int(7000)]), from()).unwrap();
        let replies = tree.handle_message(request);
        assert_eq!(replies.len(), 3);
        assert_eq!(
            replies[1],
            message(
                "/module",
                &[
                    Arg::Int(1),
                    Arg::from("Cube"),
                    Arg::Float(4.0),
                    Arg::Float(5.0),
                    Arg::Float(6.0)
                ]
            )
        );
    }

    #[test]
    fn test_multi_hop_relay() {
        let (mut master, to_first) = relayed();
        let (mut first, to_second) = relayed();
        let mut second = RenderTree::new();

        let key = master.create_module(ModuleKind::Shape(Shape::Cube)).unwrap();
        master.set_color(key, Color::grey(0.25));
        master.set_position(key, Vec3::new(0.0, 0.0, -3.0));

        replay(&mut first, &to_first);
        replay(&mut second, &to_second);
        assert_eq!(second.summaries(), master.summaries());

        master.destroy(key);
        replay(&mut first, &to_first);
        replay(&mut second, &to_second);
        assert!(first.is_empty());
        assert!(second.is_empty());
    }
}
