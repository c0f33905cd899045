use super::math::Vec3;
use super::module::ModuleKind;
use crate::osc::{message, Arg};
use itertools::Itertools;
use rosc::OscMessage;

/// A mutation addressed to one module, as sent over the wire.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    SetPosition(Vec3),
    SetRotation(Vec3),
    SetScale(Vec3),
    /// Missing alpha keeps the module's current alpha.
    SetColor { rgb: [f32; 3], alpha: Option<f32> },
    SetFlag { name: String, value: bool },
    SetText(String),
    LoadFont { path: String, size: u32, antialias: bool },
    SetFontSize(u32),
    AddChild(i32),
    /// Marks the module for removal on the next render.
    Done,
    /// Removes the module immediately.
    Destroy,
}

fn floats(args: &[Arg]) -> Option<Vec<f32>> {
    args.iter().map(Arg::as_f32).collect()
}

fn vec3(args: &[Arg]) -> Option<Vec3> {
    let (x, y, z) = floats(args)?.into_iter().collect_tuple()?;
    Some(Vec3::new(x, y, z))
}

fn positive(arg: &Arg) -> Option<u32> {
    u32::try_from(arg.as_i32()?).ok().filter(|size| *size > 0)
}

impl Command {
    /// Decodes a command from its wire name and arguments.
    ///
    /// Returns `None` for unknown names and for arguments of the wrong arity or type.
    pub fn parse(name: &str, args: &[Arg]) -> Option<Self> {
        let command = match name {
            "setPosition" => Command::SetPosition(vec3(args)?),
            "setRotation" => Command::SetRotation(vec3(args)?),
            "setScale" => match floats(args)?.as_slice() {
                &[s] => Command::SetScale(Vec3::splat(s)),
                &[x, y, z] => Command::SetScale(Vec3::new(x, y, z)),
                _ => return None,
            },
            "setColor" => match floats(args)?.as_slice() {
                &[v] => Command::SetColor {
                    rgb: [v; 3],
                    alpha: None,
                },
                &[r, g, b] => Command::SetColor {
                    rgb: [r, g, b],
                    alpha: None,
                },
                &[r, g, b, a] => Command::SetColor {
                    rgb: [r, g, b],
                    alpha: Some(a),
                },
                _ => return None,
            },
            "setFlag" => match args {
                [name, value] => Command::SetFlag {
                    name: name.as_str()?.to_owned(),
                    value: value.as_i32()? != 0,
                },
                _ => return None,
            },
            "setText" => match args {
                [text] => Command::SetText(text.as_str()?.to_owned()),
                _ => return None,
            },
            "loadFont" => match args {
                [path, size] => Command::LoadFont {
                    path: path.as_str()?.to_owned(),
                    size: positive(size)?,
                    antialias: true,
                },
                [path, size, aa] => Command::LoadFont {
                    path: path.as_str()?.to_owned(),
                    size: positive(size)?,
                    antialias: aa.as_i32()? != 0,
                },
                _ => return None,
            },
            "setFontSize" => match args {
                [size] => Command::SetFontSize(positive(size)?),
                _ => return None,
            },
            "addChild" => match args {
                [child] => Command::AddChild(child.as_i32()?),
                _ => return None,
            },
            "done" => Command::Done,
            "destroy" => Command::Destroy,
            _ => return None,
        };
        Some(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::SetPosition(_) => "setPosition",
            Command::SetRotation(_) => "setRotation",
            Command::SetScale(_) => "setScale",
            Command::SetColor { .. } => "setColor",
            Command::SetFlag { .. } => "setFlag",
            Command::SetText(_) => "setText",
            Command::LoadFont { .. } => "loadFont",
            Command::SetFontSize(_) => "setFontSize",
            Command::AddChild(_) => "addChild",
            Command::Done => "done",
            Command::Destroy => "destroy",
        }
    }

    pub fn args(&self) -> Vec<Arg> {
        let vector = |v: Vec3| -> Vec<Arg> { v.to_array().into_iter().map(Arg::Float).collect() };
        match self {
            Command::SetPosition(v) | Command::SetRotation(v) | Command::SetScale(v) => vector(*v),
            Command::SetColor { rgb, alpha } => rgb.iter().chain(alpha).copied().map(Arg::Float).collect(),
            Command::SetFlag { name, value } => vec![Arg::from(name.as_str()), Arg::Int(*value as i32)],
            Command::SetText(text) => vec![Arg::from(text.as_str())],
            Command::LoadFont { path, size, antialias } => {
                vec![Arg::from(path.as_str()), Arg::Int(*size as i32), Arg::Int(*antialias as i32)]
            }
            Command::SetFontSize(size) => vec![Arg::Int(*size as i32)],
            Command::AddChild(child) => vec![Arg::Int(*child)],
            Command::Done | Command::Destroy => vec![],
        }
    }

    /// Whether a module of `kind` understands this command.
    pub fn supported_by(&self, kind: &ModuleKind) -> bool {
        match self {
            Command::SetText(_) | Command::LoadFont { .. } | Command::SetFontSize(_) => kind.is_text(),
            _ => true,
        }
    }

    /// Encodes the command in its direct `/<id>/<command>` form.
    pub fn to_osc(&self, id: i32) -> OscMessage {
        message(format!("/{id}/{}", self.name()), &self.args())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::osc::args_of;

    fn float_args(values: &[f32]) -> Vec<Arg> {
        values.iter().copied().map(Arg::Float).collect()
    }

    #[test]
    fn test_vector_arity() {
        assert_eq!(
            Command::parse("setPosition", &float_args(&[1.0, 2.0, 3.0])),
            Some(Command::SetPosition(Vec3::new(1.0, 2.0, 3.0)))
        );
        assert_eq!(Command::parse("setPosition", &float_args(&[1.0, 2.0])), None);
        assert_eq!(Command::parse("setRotation", &float_args(&[1.0, 2.0, 3.0, 4.0])), None);
        assert_eq!(
            Command::parse("setScale", &float_args(&[2.0])),
            Some(Command::SetScale(Vec3::splat(2.0)))
        );
        assert_eq!(Command::parse("setScale", &float_args(&[2.0, 1.0])), None);
    }

    #[test]
    fn test_color_forms() {
        assert_eq!(
            Command::parse("setColor", &[Arg::from("1"), Arg::from("0"), Arg::from("0")]),
            Some(Command::SetColor {
                rgb: [1.0, 0.0, 0.0],
                alpha: None
            })
        );
        assert_eq!(
            Command::parse("setColor", &float_args(&[0.5])),
            Some(Command::SetColor {
                rgb: [0.5; 3],
                alpha: None
            })
        );
        assert_eq!(
            Command::parse("setColor", &float_args(&[0.1, 0.2, 0.3, 0.4])),
            Some(Command::SetColor {
                rgb: [0.1, 0.2, 0.3],
                alpha: Some(0.4)
            })
        );
        assert_eq!(Command::parse("setColor", &float_args(&[0.1, 0.2])), None);
        assert_eq!(Command::parse("setColor", &[Arg::from("red")]), None);
    }

    #[test]
    fn test_other_commands() {
        assert_eq!(
            Command::parse("setFlag", &[Arg::from("visible"), Arg::Int(0)]),
            Some(Command::SetFlag {
                name: "visible".into(),
                value: false
            })
        );
        assert_eq!(
            Command::parse("loadFont", &[Arg::from("mono.ttf"), Arg::Int(18)]),
            Some(Command::LoadFont {
                path: "mono.ttf".into(),
                size: 18,
                antialias: true
            })
        );
        assert_eq!(Command::parse("setFontSize", &[Arg::Int(0)]), None);
        assert_eq!(Command::parse("addChild", &[Arg::Int(4)]), Some(Command::AddChild(4)));
        assert_eq!(Command::parse("destroy", &[Arg::Int(1)]), Some(Command::Destroy));
        assert_eq!(Command::parse("explode", &[]), None);
    }

    #[test]
    fn test_text_commands_need_text_modules() {
        let command = Command::SetText("hi".into());
        assert!(command.supported_by(&ModuleKind::text()));
        assert!(!command.supported_by(&ModuleKind::Group));
        assert!(Command::Done.supported_by(&ModuleKind::Group));
    }

    #[test]
    fn test_wire_form_parses_back() {
        let commands = [
            Command::SetPosition(Vec3::new(0.5, -1.0, 2.0)),
            Command::SetColor {
                rgb: [1.0, 0.5, 0.0],
                alpha: Some(0.25),
            },
            Command::SetFlag {
                name: "wire".into(),
                value: true,
            },
            Command::LoadFont {
                path: "a.ttf".into(),
                size: 12,
                antialias: false,
            },
            Command::Destroy,
        ];
        for command in commands {
            let msg = command.to_osc(17);
            assert_eq!(msg.addr, format!("/17/{}", command.name()));
            assert_eq!(Command::parse(command.name(), &args_of(&msg)), Some(command));
        }
    }
}
