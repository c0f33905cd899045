use super::module::{ModuleKind, Shape};
use std::{
    collections::HashMap,
    sync::{OnceLock, PoisonError, RwLock},
};

/// Builds a fresh module of one variant.
pub type Factory = fn() -> ModuleKind;

fn registry() -> &'static RwLock<HashMap<String, Factory>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, Factory>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let builtins: [(&str, Factory); 5] = [
            ("Group", || ModuleKind::Group),
            ("Cube", || ModuleKind::Shape(Shape::Cube)),
            ("Sphere", || ModuleKind::Shape(Shape::Sphere)),
            ("Plane", || ModuleKind::Shape(Shape::Plane)),
            ("Text", ModuleKind::text),
        ];
        RwLock::new(builtins.into_iter().map(|(name, f)| (name.to_owned(), f)).collect())
    })
}

/// Makes `name` creatable through `/create`, replacing any earlier factory of that name.
pub fn register(name: &str, factory: Factory) {
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name.to_owned(), factory);
}

/// Instantiates the variant registered under `name`.
pub fn create(name: &str) -> Option<ModuleKind> {
    let factory = registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .copied()?;
    Some(factory())
}

/// Registered names, sorted.
pub fn registered() -> Vec<String> {
    let mut names: Vec<String> = registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_builtins_match_type_tags() {
        for name in ["Group", "Cube", "Sphere", "Plane", "Text"] {
            let kind = create(name).unwrap();
            assert_eq!(kind.type_tag(), name);
        }
        assert_eq!(create("Teapot"), None);
    }

    #[test]
    fn test_register_alias() {
        register("Box", || ModuleKind::Shape(Shape::Cube));
        assert_eq!(create("Box"), Some(ModuleKind::Shape(Shape::Cube)));
        assert!(registered().contains(&"Box".to_owned()));
    }
}
