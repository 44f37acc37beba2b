//! End-to-end compiles through `Session` over an in-memory file set:
//! imports, inheritance, variables and batch behaviour together.

use mscript_core::{AbstractNode, ErrorKind, InMemoryProvider, ObjectNode, Session};
use std::path::Path;

fn session(files: &[(&str, &str)]) -> Session {
    let provider = files
        .iter()
        .fold(InMemoryProvider::default(), |p, (path, text)| p.with_file(path, *text));
    Session::with_provider(provider)
}

fn object<'a>(nodes: &'a [AbstractNode], name: &str) -> &'a ObjectNode {
    nodes
        .iter()
        .filter_map(AbstractNode::as_object)
        .find(|o| o.name() == Some(name))
        .unwrap_or_else(|| panic!("no object named {}", name))
}

fn texts<'a>(obj: &'a ObjectNode, prop: &str) -> Vec<&'a str> {
    obj.property(prop)
        .unwrap_or_else(|| panic!("no property {}", prop))
        .texts()
}

fn contains_variables(nodes: &[AbstractNode]) -> bool {
    nodes.iter().any(|n| match n {
        AbstractNode::VariableAccess(_) | AbstractNode::Import(_) => true,
        AbstractNode::Object(o) => contains_variables(&o.values) || contains_variables(&o.children),
        AbstractNode::Property(p) => contains_variables(&p.values),
        AbstractNode::Atom(_) => false,
    })
}

const COMMON: &str = r#"
// shared definitions
abstract material TexturedBase
{
    set $filter trilinear
    technique
    {
        pass
        {
            texture_unit tex_*
            {
                filtering $filter
                tex_address_mode wrap
            }
        }
    }
}

material Opaque
{
    receive_shadows on
    technique
    {
        pass
        {
            depth_write on
        }
        pass
        {
            scene_blend add
        }
    }
}
"#;

const ROCK: &str = r#"
import * from "lib/common.material"

set $tint "0.5 0.4 0.3"

material Rock : TexturedBase
{
    technique
    {
        pass
        {
            diffuse $tint 1
            texture_unit tex_diffuse
            {
                texture rock_d.png
            }
            texture_unit tex_normal
            {
                texture rock_n.png
            }
        }
    }
}

material Layered : Opaque
{
    receive_shadows off
    technique
    {
        pass
        {
        }
        pass
        {
            depth_write off
        }
    }
}
"#;

#[test]
fn full_pipeline_resolves_imports_inheritance_and_variables() {
    let mut s = session(&[
        ("/proj/lib/common.material", COMMON),
        ("/proj/rock.material", ROCK),
    ]);
    let out = s.compile_file(Path::new("/proj/rock.material")).unwrap();
    assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    assert!(!contains_variables(&out.nodes));
    assert_eq!(out.nodes.len(), 2);

    let rock = object(&out.nodes, "Rock");
    let pass = rock.objects().next().unwrap().objects().next().unwrap();
    assert_eq!(texts(pass, "diffuse"), vec!["0.5", "0.4", "0.3", "1"]);

    // The wildcard unit from the base applies to both named units and does
    // not appear on its own.
    let units: Vec<&ObjectNode> = pass.objects().collect();
    let names: Vec<Option<&str>> = units.iter().map(|u| u.name()).collect();
    assert_eq!(names, vec![Some("tex_diffuse"), Some("tex_normal")]);
    for unit in &units {
        // Inherited variables resolve in the derived object's scope.
        assert_eq!(texts(unit, "filtering"), vec!["trilinear"]);
        assert_eq!(texts(unit, "tex_address_mode"), vec!["wrap"]);
    }
    assert_eq!(texts(units[1], "texture"), vec!["rock_n.png"]);
}

#[test]
fn positional_passes_and_own_values() {
    let mut s = session(&[
        ("/proj/lib/common.material", COMMON),
        ("/proj/rock.material", ROCK),
    ]);
    let out = s.compile_file(Path::new("/proj/rock.material")).unwrap();
    let layered = object(&out.nodes, "Layered");

    // Inherited first, own last: the object's own value is the effective one.
    assert_eq!(texts(layered, "receive_shadows"), vec!["off"]);
    let all: Vec<Vec<&str>> = layered.properties("receive_shadows").map(|p| p.texts()).collect();
    assert_eq!(all, vec![vec!["on"], vec!["off"]]);

    let passes: Vec<&ObjectNode> = layered.objects().next().unwrap().objects().collect();
    assert_eq!(passes.len(), 2);
    assert_eq!(texts(passes[0], "depth_write"), vec!["on"]);
    assert_eq!(texts(passes[1], "scene_blend"), vec!["add"]);
    assert_eq!(texts(passes[1], "depth_write"), vec!["off"]);
}

#[test]
fn shared_import_is_parsed_once_per_session() {
    let mut s = session(&[
        ("/proj/lib/common.material", COMMON),
        ("/proj/a.material", "import Opaque from lib/common.material\nmaterial A : Opaque {\n}\n"),
        ("/proj/b.material", "import * from lib/common.material\nmaterial B : Opaque {\n}\n"),
    ]);
    let report = s.compile_batch(&["/proj/a.material", "/proj/b.material"]);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(s.imports().parse_count(), 1);
    for file in &report.files {
        let out = file.outcome.as_ref().unwrap();
        let obj = out.nodes[0].as_object().unwrap();
        assert_eq!(texts(obj, "receive_shadows"), vec!["on"]);
    }
}

#[test]
fn undefined_variable_fails_only_its_file() {
    let mut s = session(&[
        ("/proj/good.material", "material Good {\n lighting on\n}\n"),
        ("/proj/bad.material", "material Bad {\n diffuse $undefined\n}\n"),
        ("/proj/after.material", "material After {\n lighting off\n}\n"),
    ]);
    let report = s.compile_batch(&[
        "/proj/good.material",
        "/proj/bad.material",
        "/proj/after.material",
    ]);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);

    let good = report.files[0].outcome.as_ref().unwrap();
    assert_eq!(texts(object(&good.nodes, "Good"), "lighting"), vec!["on"]);

    let err = report.files[1].outcome.as_ref().unwrap_err();
    assert_eq!(err.kind, ErrorKind::UndefinedVariable);
    assert_eq!(err.token, "$undefined");
    assert_eq!(err.line, 2);

    let after = report.files[2].outcome.as_ref().unwrap();
    assert_eq!(texts(object(&after.nodes, "After"), "lighting"), vec!["off"]);
}

#[test]
fn nested_abstract_objects_are_dropped_before_handoff() {
    let mut s = session(&[]);
    let out = s
        .compile_source(
            "set $x on\nmaterial M {\n abstract pass P {\n  lighting $x\n }\n technique {\n }\n}\n",
            "nested.material",
            Path::new("/proj"),
        )
        .unwrap();
    assert!(!contains_variables(&out.nodes));
    let m = object(&out.nodes, "M");
    let classes: Vec<&str> = m.objects().map(|o| o.class_name.as_str()).collect();
    assert_eq!(classes, vec!["technique"]);

    let mut s = session(&[]).keep_abstract(true);
    let out = s
        .compile_source(
            "material M {\n abstract pass P {\n }\n}\n",
            "nested.material",
            Path::new("/proj"),
        )
        .unwrap();
    assert!(object(&out.nodes, "M").objects().next().is_some_and(|p| p.is_abstract));
}

#[test]
fn soft_errors_are_warnings() {
    let mut s = session(&[(
        "/proj/m.material",
        "material M : Missing {\n lighting off\n}\n",
    )]);
    let out = s.compile_file(Path::new("/proj/m.material")).unwrap();
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].kind, ErrorKind::ObjectBaseNotFound);
    assert!(!out.warnings[0].is_fatal());
    assert_eq!(texts(object(&out.nodes, "M"), "lighting"), vec!["off"]);
}

#[test]
fn lexical_and_parse_errors_are_fatal() {
    let mut s = session(&[
        ("/proj/quote.material", "material M {\n texture \"open.png\n}\n"),
        ("/proj/brace.material", "material M {\n lighting off\n"),
        ("/proj/import.material", "import * from\n"),
    ]);
    let err = s.compile_file(Path::new("/proj/quote.material")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnterminatedQuote);
    assert_eq!(err.line, 2);

    let err = s.compile_file(Path::new("/proj/brace.material")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnexpectedToken);

    let err = s.compile_file(Path::new("/proj/import.material")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ImportSourceExpected);
}

#[test]
fn comments_and_quotes_survive_the_pipeline() {
    let mut s = session(&[(
        "/proj/c.material",
        "/* header */\nmaterial \"Quoted Name\" // trailing\n{\n texture \"dir/a \\\"b\\\".png\"\n}\n",
    )]);
    let out = s.compile_file(Path::new("/proj/c.material")).unwrap();
    let m = object(&out.nodes, "Quoted Name");
    assert_eq!(texts(m, "texture"), vec!["dir/a \"b\".png"]);
}
