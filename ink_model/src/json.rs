//! Loader for the compiled ink JSON format.
//!
//! Containers are JSON arrays whose last element is either `null` or a
//! metadata object (`#n` name, `#f` flags, any other key a named child).
//! Content items are encoded positionally; see [`Ink::from_json_str`].

use serde_json::{Map, Value};

use crate::container::{
    Assignment, ChoicePoint, Content, ContainerId, ContainerTree, ControlCommand, Divert, ListInit,
    Operator, VariablePointer,
};
use crate::error::LoadError;
use crate::list::{ListCatalog, ListDefinitions};
use crate::path::Path;

/// Modifier keys that qualify another key in the same object.
const MODIFIER_KEYS: &[&str] = &["c", "var", "exArgs", "ci", "flg", "re", "origins"];

/// A compiled story: the immutable container tree plus its list definitions.
#[derive(Debug, Clone)]
pub struct Ink {
    pub version: u32,
    pub tree: ContainerTree,
    pub list_definitions: ListDefinitions,
}

impl Ink {
    /// Wrap an already-built tree.
    pub fn new(tree: ContainerTree, list_definitions: ListDefinitions) -> Self {
        Self {
            version: 0,
            tree,
            list_definitions,
        }
    }

    /// Parse compiled JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(value)
    }

    /// Decode an already-parsed JSON document.
    pub fn from_json_value(value: Value) -> Result<Self, LoadError> {
        let Value::Object(mut document) = value else {
            return Err(LoadError::InvalidContainer(
                "top level must be an object".into(),
            ));
        };

        let version = document
            .get("inkVersion")
            .and_then(Value::as_u64)
            .ok_or(LoadError::MissingField("inkVersion"))? as u32;
        let root = document
            .remove("root")
            .ok_or(LoadError::MissingField("root"))?;
        let list_definitions = match document.remove("listDefs") {
            Some(definitions) => serde_json::from_value(definitions)?,
            None => ListDefinitions::default(),
        };

        let mut tree = ContainerTree::new();
        let root_id = tree.root();
        load_container(&mut tree, root_id, &root)?;

        tracing::debug!(
            version,
            containers = tree.container_count(),
            lists = list_definitions.len(),
            "Loaded compiled story"
        );

        Ok(Self {
            version,
            tree,
            list_definitions,
        })
    }

    /// Realize every list definition.
    pub fn list_catalog(&self) -> ListCatalog {
        self.list_definitions.derive_items()
    }
}

fn load_container(tree: &mut ContainerTree, id: ContainerId, value: &Value) -> Result<(), LoadError> {
    let array = value
        .as_array()
        .ok_or_else(|| LoadError::InvalidContainer(format!("expected an array, found {value}")))?;
    let (metadata, body) = array
        .split_last()
        .ok_or_else(|| LoadError::InvalidContainer("container array is empty".into()))?;

    for item in body {
        load_content(tree, id, item)?;
    }

    match metadata {
        Value::Null => Ok(()),
        Value::Object(metadata) => load_metadata(tree, id, metadata),
        other => Err(LoadError::InvalidContainer(format!(
            "final element must be null or an object, found {other}"
        ))),
    }
}

fn load_metadata(
    tree: &mut ContainerTree,
    id: ContainerId,
    metadata: &Map<String, Value>,
) -> Result<(), LoadError> {
    for (key, value) in metadata {
        match key.as_str() {
            "#n" => {
                let name = value
                    .as_str()
                    .ok_or_else(|| LoadError::InvalidContainer(format!("bad name {value}")))?;
                tree.set_name(id, name);
            }
            "#f" => {
                let flags = value
                    .as_u64()
                    .ok_or_else(|| LoadError::InvalidContainer(format!("bad flags {value}")))?;
                tree.set_flags(id, flags as u8);
            }
            name => {
                let child = tree.add_named_child(id, name);
                load_container(tree, child, value)?;
            }
        }
    }
    Ok(())
}

fn load_content(tree: &mut ContainerTree, id: ContainerId, value: &Value) -> Result<(), LoadError> {
    let content = match value {
        Value::Array(_) => {
            let child = tree.add_container(id, None);
            return load_container(tree, child, value);
        }
        Value::String(token) => parse_token(token)?,
        Value::Number(number) => match number.as_i64() {
            Some(int) => Content::Int(int),
            None => {
                let float = number
                    .as_f64()
                    .ok_or_else(|| LoadError::InvalidContent(number.to_string()))?;
                parse_float(float)
            }
        },
        Value::Bool(flag) => Content::Bool(*flag),
        Value::Object(object) => parse_object(object)?,
        Value::Null => return Err(LoadError::InvalidContent("null".into())),
    };
    tree.push_content(id, content);
    Ok(())
}

/// Whole numbers lose their int/float distinction on the wire.
fn parse_float(float: f64) -> Content {
    if float.fract() == 0.0 && float >= i64::MIN as f64 && float <= i64::MAX as f64 {
        Content::Int(float as i64)
    } else {
        Content::Float(float)
    }
}

fn parse_token(token: &str) -> Result<Content, LoadError> {
    if let Some(text) = token.strip_prefix('^') {
        return Ok(Content::Text(text.to_owned()));
    }
    if token == "\n" {
        return Ok(Content::Text("\n".to_owned()));
    }
    if let Some(command) = ControlCommand::from_token(token) {
        return Ok(Content::Command(command));
    }
    if let Some(operator) = Operator::from_token(token) {
        return Ok(Content::Operator(operator));
    }
    Err(LoadError::InvalidContent(format!("unknown token {token:?}")))
}

fn parse_object(object: &Map<String, Value>) -> Result<Content, LoadError> {
    if let Some(unknown) = object.keys().find(|key| !is_known_key(key)) {
        return Err(LoadError::InvalidContent(format!("unknown key {unknown:?}")));
    }

    let conditional = bool_modifier(object, "c");

    let content = if let Some(target) = object.get("^->") {
        Content::DivertTarget(path_of(target)?)
    } else if let Some(name) = object.get("^var") {
        let context_index = object.get("ci").and_then(Value::as_i64).unwrap_or(-1);
        Content::VariablePointer(VariablePointer {
            name: string_of(name)?,
            context_index,
        })
    } else if let Some(target) = object.get("->") {
        if bool_modifier(object, "var") {
            Content::VariableDivert {
                name: string_of(target)?,
                conditional,
            }
        } else {
            Content::Divert(divert_of(target, conditional)?)
        }
    } else if let Some(target) = object.get("f()") {
        Content::FunctionDivert(divert_of(target, conditional)?)
    } else if let Some(target) = object.get("->t->") {
        Content::TunnelDivert(divert_of(target, conditional)?)
    } else if let Some(target) = object.get("x()") {
        let args = object.get("exArgs").and_then(Value::as_u64).unwrap_or(0) as usize;
        Content::ExternalFunction {
            divert: divert_of(target, conditional)?,
            args,
        }
    } else if let Some(target) = object.get("*") {
        let flags = object.get("flg").and_then(Value::as_u64).unwrap_or(0) as u8;
        Content::ChoicePoint(ChoicePoint::new(path_of(target)?).with_flags(flags))
    } else if let Some(name) = object.get("VAR?") {
        Content::VariableRef(string_of(name)?)
    } else if let Some(name) = object.get("temp=") {
        Content::TempAssign(assignment_of(object, name)?)
    } else if let Some(name) = object.get("VAR=") {
        Content::GlobalAssign(assignment_of(object, name)?)
    } else if let Some(target) = object.get("CNT?") {
        Content::ReadCount(path_of(target)?)
    } else if let Some(items) = object.get("list") {
        Content::ListInit(list_init_of(object, items)?)
    } else {
        return Err(LoadError::InvalidContent(format!(
            "object has no content key: {}",
            Value::Object(object.clone())
        )));
    };

    Ok(content)
}

fn is_known_key(key: &str) -> bool {
    matches!(
        key,
        "^->" | "^var" | "->" | "f()" | "->t->" | "x()" | "*" | "VAR?" | "temp=" | "VAR=" | "CNT?"
            | "list"
    ) || MODIFIER_KEYS.contains(&key)
}

fn bool_modifier(object: &Map<String, Value>, key: &str) -> bool {
    object.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn string_of(value: &Value) -> Result<String, LoadError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| LoadError::InvalidContent(format!("expected a string, found {value}")))
}

fn path_of(value: &Value) -> Result<Path, LoadError> {
    string_of(value).map(Path::from)
}

fn divert_of(value: &Value, conditional: bool) -> Result<Divert, LoadError> {
    Ok(Divert {
        path: path_of(value)?,
        conditional,
    })
}

fn assignment_of(object: &Map<String, Value>, name: &Value) -> Result<Assignment, LoadError> {
    Ok(Assignment {
        name: string_of(name)?,
        reassign: bool_modifier(object, "re"),
    })
}

fn list_init_of(object: &Map<String, Value>, items: &Value) -> Result<ListInit, LoadError> {
    let items: Vec<String> = items
        .as_object()
        .ok_or_else(|| LoadError::InvalidContent(format!("bad list literal {items}")))?
        .keys()
        .cloned()
        .collect();
    let origins: Vec<String> = match object.get("origins") {
        Some(Value::Array(origins)) => origins.iter().map(string_of).collect::<Result<_, _>>()?,
        Some(other) => {
            return Err(LoadError::InvalidContent(format!("bad list origins {other}")));
        }
        None => Vec::new(),
    };
    Ok(ListInit { items, origins })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Address, ParentPosition, GLOBAL_DECLARATIONS};

    const EASY: &str = r##"{"inkVersion":21,"root":[["^Once upon a time...","\n",["ev",{"^->":"0.2.$r1"},{"temp=":"$r"},"str",{"->":".^.s"},[{"#n":"$r1"}],"/str","/ev",{"*":"0.c-0","flg":18},{"s":["^There were two choices.",{"->":"$r","var":true},null]}],["ev",{"^->":"0.3.$r1"},{"temp=":"$r"},"str",{"->":".^.s"},[{"#n":"$r1"}],"/str","/ev",{"*":"0.c-1","flg":18},{"s":["^There were four lines of content.",{"->":"$r","var":true},null]}],{"c-0":["ev",{"^->":"0.c-0.$r2"},"/ev",{"temp=":"$r"},{"->":"0.2.s"},[{"#n":"$r2"}],"\n",{"->":"0.g-0"},{"#f":5}],"c-1":["ev",{"^->":"0.c-1.$r2"},"/ev",{"temp=":"$r"},{"->":"0.3.s"},[{"#n":"$r2"}],"\n",{"->":"0.g-0"},{"#f":5}],"g-0":["^They lived happily ever after.","\n","end",["done",{"#f":5,"#n":"g-1"}],{"#f":5}]}],"done",{"#f":1}],"listDefs":{}}"##;

    #[test]
    fn test_load_container_tree() {
        let ink = Ink::from_json_str(EASY).unwrap();
        let tree = &ink.tree;
        let root = tree.root();

        assert_eq!(ink.version, 21);
        assert_eq!(tree[root].len(), 2);
        assert!(tree[root].flags.record_visits());
        assert_eq!(
            tree[root].contents[1],
            Content::Command(ControlCommand::Done)
        );

        let main = tree.first_content_container().unwrap();
        assert_eq!(tree[main].contents[0], Content::Text("Once upon a time...".into()));
        assert_eq!(tree[main].contents[1], Content::Text("\n".into()));

        let choice = tree.named_child(main, "c-0").unwrap();
        assert_eq!(tree[choice].flags.0, 5);
        assert_eq!(tree[choice].position_in_parent(), ParentPosition::EndOfNamedChild);
    }

    #[test]
    fn test_resolve_loaded_paths() {
        let ink = Ink::from_json_str(EASY).unwrap();
        let tree = &ink.tree;
        let main = tree.first_content_container().unwrap();

        let marker = tree.resolve(&"0.2.$r1".into(), main).unwrap();
        assert_eq!(tree[marker.container].name.as_deref(), Some("$r1"));
        assert_eq!(tree[marker.container].position_in_parent(), ParentPosition::Index(5));

        let gather = tree.resolve(&"0.g-0".into(), main).unwrap();
        let end = tree.resolve(&"0.g-0.g-1".into(), main).unwrap();
        assert_eq!(tree.parent(end.container), Some(gather.container));
    }

    #[test]
    fn test_object_encodings() {
        let json = r#"{"inkVersion":21,"root":[[
            {"->":"knot","c":true},
            {"->":"$r","var":true},
            {"f()":"fn"},
            {"->t->":"tunnel"},
            {"x()":"Hello","exArgs":1},
            {"*":"0.c-0","flg":20},
            {"^var":"x","ci":0},
            {"VAR?":"x"},
            {"VAR=":"x","re":true},
            {"temp=":"y"},
            {"CNT?":".^"},
            {"list":{"a.one":1},"origins":["b"]},
            null],
            {"global decl":["ev",1,{"VAR=":"x"},"/ev","end",null]}]}"#;
        let ink = Ink::from_json_str(json).unwrap();
        let tree = &ink.tree;
        let main = tree.first_content_container().unwrap();
        let contents = &tree[main].contents;

        assert_eq!(contents[0], Content::Divert(Divert::new("knot").conditional()));
        assert_eq!(
            contents[1],
            Content::VariableDivert {
                name: "$r".into(),
                conditional: false
            }
        );
        assert_eq!(contents[2], Content::FunctionDivert(Divert::new("fn")));
        assert_eq!(contents[3], Content::TunnelDivert(Divert::new("tunnel")));
        assert_eq!(
            contents[4],
            Content::ExternalFunction {
                divert: Divert::new("Hello"),
                args: 1
            }
        );
        assert_eq!(contents[5], Content::ChoicePoint(ChoicePoint::new("0.c-0").with_flags(20)));
        assert_eq!(
            contents[6],
            Content::VariablePointer(VariablePointer {
                name: "x".into(),
                context_index: 0
            })
        );
        assert_eq!(contents[7], Content::VariableRef("x".into()));
        assert_eq!(contents[8], Content::GlobalAssign(Assignment::new("x").reassign()));
        assert_eq!(contents[9], Content::TempAssign(Assignment::new("y")));
        assert_eq!(contents[10], Content::ReadCount(".^".into()));
        assert_eq!(
            contents[11],
            Content::ListInit(ListInit {
                items: vec!["a.one".into()],
                origins: vec!["b".into()]
            })
        );

        let globals = tree.named_child(tree.root(), GLOBAL_DECLARATIONS).unwrap();
        assert_eq!(tree.content_at(Address::new(globals, 1)), Some(&Content::Int(1)));
    }

    #[test]
    fn test_numbers_reconstruct_ints() {
        let json = r#"{"inkVersion":21,"root":[[1, 2.0, 2.5, -3, null], null]}"#;
        let ink = Ink::from_json_str(json).unwrap();
        let main = ink.tree.first_content_container().unwrap();

        assert_eq!(
            ink.tree[main].contents,
            vec![Content::Int(1), Content::Int(2), Content::Float(2.5), Content::Int(-3)]
        );
    }

    #[test]
    fn test_list_definitions() {
        let json = r#"{"inkVersion":21,"root":[[null],null],"listDefs":{"kettleState":{"cold":1,"boiling":2,"recently_boiled":3}}}"#;
        let ink = Ink::from_json_str(json).unwrap();

        assert_eq!(ink.list_definitions.get("kettleState").unwrap()["cold"], 1);
        let catalog = ink.list_catalog();
        assert_eq!(catalog.universe("kettleState").unwrap().count(), 3);
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(matches!(
            Ink::from_json_str(r#"{"root":[null]}"#),
            Err(LoadError::MissingField("inkVersion"))
        ));
        assert!(matches!(
            Ink::from_json_str(r#"{"inkVersion":21,"root":[["florb",null],null]}"#),
            Err(LoadError::InvalidContent(_))
        ));
        assert!(matches!(
            Ink::from_json_str(r#"{"inkVersion":21,"root":[[{"?!":1},null],null]}"#),
            Err(LoadError::InvalidContent(_))
        ));
        assert!(matches!(
            Ink::from_json_str(r#"{"inkVersion":21,"root":[]}"#),
            Err(LoadError::InvalidContainer(_))
        ));
        assert!(matches!(Ink::from_json_str("not json"), Err(LoadError::Json(_))));
    }
}
