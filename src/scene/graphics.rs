use super::math::Vec3;
use super::module::{ModuleKind, RenderModule};
use tracing::trace;

/// The drawing backend a render tree draws into.
pub trait Graphics {
    /// Called once, on the first render after a module is created.
    fn init_module(&mut self, _module: &RenderModule) {}

    /// Draws one module at `origin`, its accumulated world translation.
    fn draw(&mut self, module: &RenderModule, origin: Vec3);
}

/// Draws nothing. Used by headless relays.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullGraphics;

impl Graphics for NullGraphics {
    fn draw(&mut self, _module: &RenderModule, _origin: Vec3) {}
}

/// Logs every draw at trace level.
#[derive(Clone, Debug, Default)]
pub struct TraceGraphics {
    draws: u64,
}

impl TraceGraphics {
    pub fn draws(&self) -> u64 {
        self.draws
    }
}

impl Graphics for TraceGraphics {
    fn init_module(&mut self, module: &RenderModule) {
        trace!(id = module.id(), kind = module.type_tag(), "init");
    }

    fn draw(&mut self, module: &RenderModule, origin: Vec3) {
        self.draws += 1;
        match module.kind() {
            ModuleKind::Group => {}
            ModuleKind::Text { text, .. } => trace!(id = module.id(), ?origin, %text, "draw text"),
            ModuleKind::Shape(shape) => {
                trace!(id = module.id(), ?shape, ?origin, color = ?module.color(), "draw shape")
            }
        }
    }
}
