use super::command::Command;
use super::math::{Axis, Vec3};
use super::module::RenderModule;

/// A time-limited animation attached to one module.
///
/// Behaviors never hold on to their module. Each call receives the module's
/// current state and pushes the mutations it wants applied into `out`; the tree
/// applies (and replicates) them.
pub trait Behavior: Send {
    /// Captures the module's state when the behavior is attached.
    fn init(&mut self, _module: &RenderModule, _out: &mut Vec<Command>) {}

    /// Advances one frame.
    fn tick(&mut self, module: &RenderModule, out: &mut Vec<Command>);

    /// Once true the behavior is detached and dropped.
    fn done(&self) -> bool;
}

fn alpha_command(module: &RenderModule, alpha: f32) -> Command {
    let color = module.color();
    Command::SetColor {
        rgb: [color.r, color.g, color.b],
        alpha: Some(alpha),
    }
}

/// Marks the module done after a fixed number of frames.
#[derive(Clone, Debug)]
pub struct Timeout {
    frames: u32,
    elapsed: u32,
}

impl Timeout {
    pub fn new(frames: u32) -> Self {
        Self {
            frames: frames.max(1),
            elapsed: 0,
        }
    }
}

impl Behavior for Timeout {
    fn tick(&mut self, _module: &RenderModule, out: &mut Vec<Command>) {
        self.elapsed += 1;
        if self.elapsed >= self.frames {
            out.push(Command::Done);
        }
    }

    fn done(&self) -> bool {
        self.elapsed >= self.frames
    }
}

/// Waits `delay` frames, then fades alpha linearly to zero over `frames` frames
/// and marks the module done.
#[derive(Clone, Debug)]
pub struct FadeOut {
    frames: u32,
    delay: u32,
    elapsed: u32,
    initial: f32,
}

impl FadeOut {
    pub fn new(frames: u32, delay: u32) -> Self {
        Self {
            frames: frames.max(1),
            delay,
            elapsed: 0,
            initial: 1.0,
        }
    }

    fn step(&self) -> u32 {
        self.elapsed.saturating_sub(self.delay)
    }
}

impl Behavior for FadeOut {
    fn init(&mut self, module: &RenderModule, _out: &mut Vec<Command>) {
        self.initial = module.color().a;
    }

    fn tick(&mut self, module: &RenderModule, out: &mut Vec<Command>) {
        if self.done() {
            return;
        }
        self.elapsed += 1;
        let step = self.step();
        if step == 0 {
            return;
        }
        let alpha = self.initial * (1.0 - step as f32 / self.frames as f32);
        out.push(alpha_command(module, alpha));
        if step >= self.frames {
            out.push(Command::Done);
        }
    }

    fn done(&self) -> bool {
        self.step() >= self.frames
    }
}

/// Raises alpha linearly from zero back to the module's alpha at attach time.
#[derive(Clone, Debug)]
pub struct FadeIn {
    frames: u32,
    step: u32,
    target: f32,
}

impl FadeIn {
    pub fn new(frames: u32) -> Self {
        Self {
            frames: frames.max(1),
            step: 0,
            target: 1.0,
        }
    }
}

impl Behavior for FadeIn {
    fn init(&mut self, module: &RenderModule, out: &mut Vec<Command>) {
        self.target = module.color().a;
        out.push(alpha_command(module, 0.0));
    }

    fn tick(&mut self, module: &RenderModule, out: &mut Vec<Command>) {
        if self.done() {
            return;
        }
        self.step += 1;
        out.push(alpha_command(module, self.target * self.step as f32 / self.frames as f32));
    }

    fn done(&self) -> bool {
        self.step >= self.frames
    }
}

/// Moves the module along one axis by `distance` over `frames` frames, counted
/// from the module's frame count at attach time.
#[derive(Clone, Debug)]
pub struct Sink {
    axis: Axis,
    frames: u32,
    distance: f32,
    start_tick: u64,
    base: f32,
    finished: bool,
}

impl Sink {
    pub fn new(axis: Axis, frames: u32, distance: f32) -> Self {
        Self {
            axis,
            frames: frames.max(1),
            distance,
            start_tick: 0,
            base: 0.0,
            finished: false,
        }
    }

    /// Sinks along z.
    pub fn z(frames: u32, distance: f32) -> Self {
        Self::new(Axis::Z, frames, distance)
    }

    /// Sinks along y.
    pub fn y(frames: u32, distance: f32) -> Self {
        Self::new(Axis::Y, frames, distance)
    }
}

impl Behavior for Sink {
    fn init(&mut self, module: &RenderModule, _out: &mut Vec<Command>) {
        self.start_tick = module.ticks();
        self.base = module.position().get(self.axis);
    }

    fn tick(&mut self, module: &RenderModule, out: &mut Vec<Command>) {
        if self.finished {
            return;
        }
        let elapsed = module.ticks().saturating_sub(self.start_tick).min(self.frames as u64);
        let offset = self.distance * elapsed as f32 / self.frames as f32;
        let position: Vec3 = module.position().with(self.axis, self.base + offset);
        out.push(Command::SetPosition(position));
        self.finished = elapsed >= self.frames as u64;
    }

    fn done(&self) -> bool {
        self.finished
    }
}
