//! A replicated scene graph.
//!
//! A [`RenderTree`] owns every [`RenderModule`] and mirrors each mutation to its
//! [`Relayer`] as an OSC message, so a remote tree fed those messages through
//! [`RenderTree::handle_message`] converges to the same state.

pub use self::behavior::{Behavior, FadeIn, FadeOut, Sink, Timeout};
pub use self::command::Command;
pub use self::graphics::{Graphics, NullGraphics, TraceGraphics};
pub use self::math::{Axis, Color, Vec3};
pub use self::module::{ModuleKey, ModuleKind, RenderModule, Shape};
pub use self::protocol::TreeMessage;
pub use self::relay::{RelayTarget, Relayer, UdpTarget};
pub use self::tree::{ModuleSummary, RenderTree};

mod behavior;
mod command;
mod graphics;
mod math;
mod module;
pub mod protocol;
pub mod registry;
mod relay;
mod tree;
