use super::command::Command;
use super::module::RenderModule;
use crate::osc::{args_of, message, Arg};
use rosc::OscMessage;
use std::net::SocketAddr;

pub const CREATE: &str = "/create";
pub const MODULE_COMMAND: &str = "/moduleCommand";
pub const LIST_MODULES: &str = "/listModules";
pub const MODULE_REPLY: &str = "/module";

/// A decoded scene protocol message.
#[derive(Clone, Debug, PartialEq)]
pub enum TreeMessage {
    /// Instantiate a registered variant under a forced id.
    Create { type_tag: String, id: i32 },
    Command { id: i32, command: Command },
    /// Enumerate all modules back to `reply_to`.
    ListModules { reply_to: SocketAddr },
}

impl TreeMessage {
    /// Decodes an incoming message received from `from`.
    ///
    /// `/moduleCommand (id, name, args...)` and `/<id>/<name> args...` decode to
    /// the same [`TreeMessage::Command`]. Anything malformed yields `None`.
    pub fn decode(msg: &OscMessage, from: SocketAddr) -> Option<Self> {
        let args = args_of(msg);
        match msg.addr.as_str() {
            CREATE => match args.as_slice() {
                [type_tag, id, ..] => Some(TreeMessage::Create {
                    type_tag: type_tag.as_str()?.to_owned(),
                    id: id.as_i32().filter(|id| (0..i32::MAX).contains(id))?,
                }),
                _ => None,
            },
            MODULE_COMMAND => match args.as_slice() {
                [id, name, rest @ ..] => Some(TreeMessage::Command {
                    id: id.as_i32()?,
                    command: Command::parse(name.as_str()?, rest)?,
                }),
                _ => None,
            },
            LIST_MODULES => {
                let port = args.first()?.as_i32().and_then(|p| u16::try_from(p).ok())?;
                Some(TreeMessage::ListModules {
                    reply_to: SocketAddr::new(from.ip(), port),
                })
            }
            addr => {
                let (id, name) = addr.strip_prefix('/')?.split_once('/')?;
                Some(TreeMessage::Command {
                    id: id.parse().ok()?,
                    command: Command::parse(name, &args)?,
                })
            }
        }
    }

    /// Encodes the message in its canonical form. Commands use the direct address.
    pub fn encode(&self) -> OscMessage {
        match self {
            TreeMessage::Create { type_tag, id } => create_message(type_tag, *id),
            TreeMessage::Command { id, command } => command.to_osc(*id),
            TreeMessage::ListModules { reply_to } => message(LIST_MODULES, &[Arg::Int(reply_to.port() as i32)]),
        }
    }
}

pub fn create_message(type_tag: &str, id: i32) -> OscMessage {
    message(CREATE, &[Arg::from(type_tag), Arg::Int(id)])
}

/// The `/module (id, type, x, y, z)` reply describing one module.
pub fn module_reply(module: &RenderModule) -> OscMessage {
    let p = module.position();
    message(
        MODULE_REPLY,
        &[
            Arg::Int(module.id()),
            Arg::from(module.type_tag()),
            Arg::Float(p.x),
            Arg::Float(p.y),
            Arg::Float(p.z),
        ],
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scene::math::Vec3;

    fn from() -> SocketAddr {
        "10.0.0.7:5000".parse().unwrap()
    }

    fn decode(addr: &str, args: &[Arg]) -> Option<TreeMessage> {
        TreeMessage::decode(&message(addr, args), from())
    }

    #[test]
    fn test_both_command_forms_agree() {
        let generic = decode(
            MODULE_COMMAND,
            &[Arg::Int(4), Arg::from("setColor"), Arg::from("1"), Arg::from("0"), Arg::from("0")],
        );
        let direct = decode("/4/setColor", &[Arg::Float(1.0), Arg::Float(0.0), Arg::Float(0.0)]);
        assert!(generic.is_some());
        assert_eq!(generic, direct);
    }

    #[test]
    fn test_create_and_list() {
        assert_eq!(
            decode(CREATE, &[Arg::from("Cube"), Arg::Int(12)]),
            Some(TreeMessage::Create {
                type_tag: "Cube".into(),
                id: 12
            })
        );
        assert_eq!(decode(CREATE, &[Arg::from("Cube"), Arg::Int(-1)]), None);
        assert_eq!(decode(CREATE, &[Arg::from("Cube"), Arg::Int(i32::MAX)]), None);
        assert_eq!(decode(CREATE, &[Arg::Int(12)]), None);
        assert_eq!(
            decode(LIST_MODULES, &[Arg::Int(7000)]),
            Some(TreeMessage::ListModules {
                reply_to: "10.0.0.7:7000".parse().unwrap()
            })
        );
        assert_eq!(decode(LIST_MODULES, &[]), None);
    }

    #[test]
    fn test_malformed_addresses() {
        assert_eq!(decode("/x/setPosition", &vec![Arg::Float(0.0); 3]), None);
        assert_eq!(decode("/4", &[]), None);
        assert_eq!(decode("/4/spin", &[]), None);
        assert_eq!(decode("/4/setPosition", &[Arg::Float(1.0)]), None);
        assert_eq!(decode(MODULE_COMMAND, &[Arg::Int(4)]), None);
    }

    #[test]
    fn test_encode_decodes_back() {
        let msg = TreeMessage::Command {
            id: 9,
            command: Command::SetPosition(Vec3::new(1.0, 2.0, 3.0)),
        };
        assert_eq!(TreeMessage::decode(&msg.encode(), from()), Some(msg));
    }
}
