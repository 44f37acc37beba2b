//! Pass 2: inheritance overlay.
//!
//! Each object with bases receives their content, base by base in listed
//! order. Object members are matched against the destination's own child
//! objects (by name, by wildcard, then by position among unnamed objects)
//! and overlaid recursively; unmatched ones are copied in. Non-object
//! members are queued in `overrides` and moved to the front of the
//! destination's children once its whole subtree is processed, so the
//! destination's own properties come after inherited ones.

use crate::ast::{AbstractNode, ObjectNode};
use crate::error::{CompileError, ErrorKind};
use crate::glob;

// ──────────────────────────────────────────────
// Base lookup
// ──────────────────────────────────────────────

/// Where bases are looked up: the file's own top-level objects first, then
/// the session import table.
struct BaseIndex<'a> {
    names: &'a [Option<String>],
    /// Snapshot of each top-level object once fully processed.
    finished: &'a [Option<ObjectNode>],
    imports: &'a [AbstractNode],
}

impl<'a> BaseIndex<'a> {
    fn lookup(&self, name: &str) -> Result<&'a ObjectNode, &'static str> {
        if let Some(i) = self.names.iter().position(|n| n.as_deref() == Some(name)) {
            // Processing follows base dependencies, so a local base that
            // is not finished yet is part of a cycle.
            return self.finished[i].as_ref().ok_or("cyclic inheritance");
        }
        self.imports
            .iter()
            .filter_map(AbstractNode::as_object)
            .find(|o| o.name() == Some(name))
            .ok_or("no object with this name is defined or imported")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Pending,
    InProgress,
    Done,
}

fn collect_bases<'a>(obj: &'a ObjectNode, out: &mut Vec<&'a str>) {
    out.extend(obj.bases.iter().map(String::as_str));
    for child in obj.objects() {
        collect_bases(child, out);
    }
}

fn visit(i: usize, deps: &[Vec<usize>], marks: &mut [Mark], order: &mut Vec<usize>) {
    if marks[i] != Mark::Pending {
        return;
    }
    marks[i] = Mark::InProgress;
    for &j in &deps[i] {
        visit(j, deps, marks, order);
    }
    marks[i] = Mark::Done;
    order.push(i);
}

/// Apply inheritance to every object in `nodes`, a file's top-level forest.
/// Unresolvable bases and duplicate overrides are reported into `warnings`
/// and otherwise skipped.
#[tracing::instrument(skip_all, fields(nodes = nodes.len()))]
pub fn process_objects(
    nodes: &mut [AbstractNode],
    imports: &[AbstractNode],
    warnings: &mut Vec<CompileError>,
) {
    let names: Vec<Option<String>> = nodes
        .iter()
        .map(|n| n.as_object().and_then(|o| o.name.clone()))
        .collect();
    let local = |name: &str| names.iter().position(|n| n.as_deref() == Some(name));

    let deps: Vec<Vec<usize>> = nodes
        .iter()
        .map(|n| {
            let mut bases = Vec::new();
            if let Some(o) = n.as_object() {
                collect_bases(o, &mut bases);
            }
            bases.into_iter().filter_map(|b| local(b)).collect()
        })
        .collect();

    let mut marks = vec![Mark::Pending; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());
    for i in 0..nodes.len() {
        visit(i, &deps, &mut marks, &mut order);
    }

    let mut finished: Vec<Option<ObjectNode>> = vec![None; nodes.len()];
    for i in order {
        let Some(obj) = nodes[i].as_object_mut() else {
            continue;
        };
        let index = BaseIndex {
            names: &names,
            finished: &finished,
            imports,
        };
        process_object(obj, &index, warnings);
        let snapshot = obj.clone();
        finished[i] = Some(snapshot);
    }
}

fn process_object(obj: &mut ObjectNode, index: &BaseIndex<'_>, warnings: &mut Vec<CompileError>) {
    for base in obj.bases.clone() {
        match index.lookup(&base) {
            Ok(src) => overlay(src, obj, warnings),
            Err(reason) => {
                let err = CompileError::new(ErrorKind::ObjectBaseNotFound, &base, &obj.file, obj.line)
                    .with_detail(reason);
                tracing::warn!(%err, "skipping base");
                warnings.push(err);
            }
        }
    }

    for child in obj.children.iter_mut() {
        if let Some(c) = child.as_object_mut() {
            process_object(c, index, warnings);
        }
    }

    if !obj.overrides.is_empty() {
        let mut children = std::mem::take(&mut obj.overrides);
        children.append(&mut obj.children);
        obj.children = children;
    }
}

// ──────────────────────────────────────────────
// Overlay
// ──────────────────────────────────────────────

/// Per destination child bookkeeping for the positional pass.
#[derive(Debug, Clone, Copy)]
struct Slot {
    claimed: bool,
    /// Lowest base candidate index this child may pair with by position.
    min_index: usize,
}

/// Overlay `src` onto `dest`. `dest`'s own content is never replaced.
fn overlay(src: &ObjectNode, dest: &mut ObjectNode, warnings: &mut Vec<CompileError>) {
    for (k, v) in &src.env {
        dest.env.entry(k.clone()).or_insert_with(|| v.clone());
    }

    let mut candidates: Vec<&ObjectNode> = Vec::new();
    for child in &src.children {
        match child {
            AbstractNode::Object(o) => candidates.push(o),
            other => dest.overrides.push(other.detached()),
        }
    }
    if candidates.is_empty() {
        return;
    }

    // Destination positions paired with each candidate. Only wildcard
    // candidates may hold more than one.
    let mut claims: Vec<Vec<usize>> = vec![Vec::new(); candidates.len()];
    let mut children: Vec<AbstractNode> = Vec::with_capacity(dest.children.len());
    let mut slots: Vec<Slot> = Vec::with_capacity(dest.children.len());
    let mut max_index = 0usize;

    // Name pass. Destination children whose name contains `*` are replaced by one
    // renamed copy per candidate they match, so the vector is rebuilt.
    for child in std::mem::take(&mut dest.children) {
        let node = match child {
            AbstractNode::Object(o) => o,
            other => {
                children.push(other);
                slots.push(Slot {
                    claimed: true,
                    min_index: 0,
                });
                continue;
            }
        };
        let min_index = max_index;
        let dest_name = node.name_or_empty();
        if dest_name.is_empty() {
            children.push(AbstractNode::Object(node));
            slots.push(Slot {
                claimed: false,
                min_index,
            });
            continue;
        }

        let dest_wild = dest_name.contains('*');
        let pos = children.len();
        let mut claimed = false;

        for (j, cand) in candidates.iter().enumerate() {
            if cand.class_name != node.class_name {
                continue;
            }
            let cand_name = cand.name_or_empty();
            let cand_wild = glob::is_pattern(cand_name);

            if dest_wild {
                let hit = glob::matches(dest_name, cand_name)
                    || (dest_name == "*" && cand_name.is_empty());
                if !hit {
                    continue;
                }
                if !claims[j].is_empty() {
                    duplicate(&node, warnings);
                    continue;
                }
                let mut copy = node.clone();
                copy.name = cand.name.clone();
                claims[j].push(children.len());
                children.push(AbstractNode::Object(copy));
                slots.push(Slot {
                    claimed: true,
                    min_index: j,
                });
                max_index = max_index.max(j);
                continue;
            }

            let exact = cand_name == dest_name;
            if !exact && !(cand_wild && glob::matches(cand_name, dest_name)) {
                continue;
            }
            if exact && !claims[j].is_empty() {
                duplicate(&node, warnings);
            } else {
                claims[j].push(pos);
                claimed = true;
                max_index = max_index.max(j);
            }
            break;
        }

        if !dest_wild {
            children.push(AbstractNode::Object(node));
            slots.push(Slot { claimed, min_index });
        }
    }

    // Positional pass: unnamed, unclaimed objects pair in order with the
    // next unnamed, unclaimed candidate of the same class.
    for (pos, slot) in slots.iter().enumerate() {
        if slot.claimed {
            continue;
        }
        let Some(node) = children[pos].as_object() else {
            continue;
        };
        if !node.name_or_empty().is_empty() {
            continue;
        }
        let found = (slot.min_index..candidates.len()).find(|&j| {
            claims[j].is_empty()
                && candidates[j].name_or_empty().is_empty()
                && candidates[j].class_name == node.class_name
        });
        if let Some(j) = found {
            claims[j].push(pos);
        }
    }

    // Overlay paired candidates; copy the rest in after the most recently
    // paired destination child, keeping base order.
    let mut before: Vec<Vec<AbstractNode>> = children.iter().map(|_| Vec::new()).collect();
    let mut tail: Vec<AbstractNode> = Vec::new();
    let mut insert_at = 0usize;
    for (j, cand) in candidates.iter().enumerate() {
        match claims[j].last() {
            None => {
                let copy = AbstractNode::Object(cand.detached());
                match before.get_mut(insert_at) {
                    Some(slot) => slot.push(copy),
                    None => tail.push(copy),
                }
            }
            Some(&last) => {
                for &pos in &claims[j] {
                    if let Some(d) = children[pos].as_object_mut() {
                        overlay(cand, d, warnings);
                    }
                }
                insert_at = last + 1;
            }
        }
    }

    dest.children = before
        .into_iter()
        .zip(children)
        .flat_map(|(mut added, own)| {
            added.push(own);
            added
        })
        .chain(tail)
        .collect();
}

fn duplicate(node: &ObjectNode, warnings: &mut Vec<CompileError>) {
    let err = CompileError::new(ErrorKind::DuplicateOverride, &node.class_name, &node.file, node.line)
        .with_detail(format!(
            "'{}' is already overridden by an earlier object",
            node.name_or_empty()
        ));
    tracing::warn!(%err, "ignoring override");
    warnings.push(err);
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Env;
    use crate::compile::build_tree;
    use crate::ids::IdTable;

    fn resolve(src: &str) -> (Vec<AbstractNode>, Vec<CompileError>) {
        let ids = IdTable::builtin();
        let mut globals = Env::new();
        let mut nodes = build_tree(src, "test.material", &ids, &mut globals).unwrap();
        let mut warnings = Vec::new();
        process_objects(&mut nodes, &[], &mut warnings);
        (nodes, warnings)
    }

    fn top<'a>(nodes: &'a [AbstractNode], name: &str) -> &'a ObjectNode {
        nodes
            .iter()
            .filter_map(AbstractNode::as_object)
            .find(|o| o.name() == Some(name))
            .expect("object")
    }

    fn child_names(obj: &ObjectNode) -> Vec<Option<&str>> {
        obj.objects().map(ObjectNode::name).collect()
    }

    fn prop_value<'a>(obj: &'a ObjectNode, name: &str) -> Vec<&'a str> {
        obj.property(name).map(|p| p.texts()).unwrap_or_default()
    }

    #[test]
    fn base_wildcard_fans_out_over_matching_children() {
        let (nodes, warnings) = resolve(
            "material Base {\n texture_unit tex_*\n {\n  texture_alias a\n }\n}\n\
             material D : Base {\n texture_unit tex_1\n {\n }\n texture_unit tex_2 {\n }\n}\n",
        );
        assert!(warnings.is_empty());
        let d = top(&nodes, "D");
        assert_eq!(child_names(d), vec![Some("tex_1"), Some("tex_2")]);
        for unit in d.objects() {
            assert_eq!(prop_value(unit, "texture_alias"), vec!["a"]);
        }
    }

    #[test]
    fn destination_wildcard_copies_per_matching_base_child() {
        let (nodes, _) = resolve(
            "material Base {\n texture_unit diffuse {\n  texture_alias d\n }\n texture_unit normal {\n  texture_alias n\n }\n}\n\
             material D : Base {\n texture_unit * {\n  filtering trilinear\n }\n}\n",
        );
        let d = top(&nodes, "D");
        assert_eq!(child_names(d), vec![Some("diffuse"), Some("normal")]);
        let units: Vec<&ObjectNode> = d.objects().collect();
        assert_eq!(prop_value(units[0], "texture_alias"), vec!["d"]);
        assert_eq!(prop_value(units[1], "texture_alias"), vec!["n"]);
        assert_eq!(prop_value(units[1], "filtering"), vec!["trilinear"]);
    }

    #[test]
    fn question_mark_in_destination_name_is_literal() {
        let (nodes, _) = resolve(
            "material Base {\n texture_unit a1b {\n  texture_alias one\n }\n}\n\
             material D : Base {\n texture_unit a?b {\n  texture_alias own\n }\n}\n",
        );
        let d = top(&nodes, "D");
        assert_eq!(child_names(d), vec![Some("a1b"), Some("a?b")]);
        let units: Vec<&ObjectNode> = d.objects().collect();
        assert_eq!(prop_value(units[0], "texture_alias"), vec!["one"]);
        assert_eq!(prop_value(units[1], "texture_alias"), vec!["own"]);
    }

    #[test]
    fn unnamed_children_pair_by_position() {
        let (nodes, _) = resolve(
            "material Base {\n technique {\n  pass {\n   scene_blend add\n  }\n  pass {\n   scene_blend modulate\n  }\n }\n}\n\
             material D : Base {\n technique {\n  pass {\n  }\n  pass {\n  }\n }\n}\n",
        );
        let technique = top(&nodes, "D").objects().next().unwrap();
        let passes: Vec<&ObjectNode> = technique.objects().collect();
        assert_eq!(passes.len(), 2);
        assert_eq!(prop_value(passes[0], "scene_blend"), vec!["add"]);
        assert_eq!(prop_value(passes[1], "scene_blend"), vec!["modulate"]);
    }

    #[test]
    fn later_base_wins_and_own_value_is_kept() {
        let (nodes, _) = resolve(
            "material A {\n p 1\n}\nmaterial B {\n p 2\n}\n\
             material C : A B {\n}\nmaterial E : A B {\n p 3\n}\n",
        );
        assert_eq!(prop_value(top(&nodes, "C"), "p"), vec!["2"]);
        let e = top(&nodes, "E");
        assert_eq!(prop_value(e, "p"), vec!["3"]);
        let all: Vec<Vec<&str>> = e.properties("p").map(|p| p.texts()).collect();
        assert_eq!(all, vec![vec!["1"], vec!["2"], vec!["3"]]);
    }

    #[test]
    fn unclaimed_base_children_insert_after_last_pair() {
        let (nodes, _) = resolve(
            "material Base {\n technique A {\n }\n technique B {\n }\n technique C {\n }\n}\n\
             material D : Base {\n technique X {\n }\n technique B {\n }\n technique Y {\n }\n}\n",
        );
        let d = top(&nodes, "D");
        assert_eq!(
            child_names(d),
            vec![Some("A"), Some("X"), Some("B"), Some("C"), Some("Y")]
        );
    }

    #[test]
    fn missing_base_is_soft() {
        let (nodes, warnings) = resolve("material M : Nope {\n lighting off\n}\nmaterial N {}\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, ErrorKind::ObjectBaseNotFound);
        assert_eq!(warnings[0].token, "Nope");
        assert_eq!(prop_value(top(&nodes, "M"), "lighting"), vec!["off"]);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn bases_are_processed_before_their_users() {
        let (nodes, warnings) = resolve(
            "material D : C {\n}\nmaterial C : B {\n}\nmaterial B {\n depth_write off\n}\n",
        );
        assert!(warnings.is_empty());
        assert_eq!(prop_value(top(&nodes, "D"), "depth_write"), vec!["off"]);
        // Output order is unchanged.
        let order: Vec<Option<&str>> = nodes.iter().filter_map(|n| n.as_object()).map(|o| o.name()).collect();
        assert_eq!(order, vec![Some("D"), Some("C"), Some("B")]);
    }

    #[test]
    fn inheritance_cycles_are_soft() {
        let (nodes, warnings) = resolve("material A : B {\n a 1\n}\nmaterial B : A {\n b 1\n}\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].detail.as_deref(), Some("cyclic inheritance"));
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn second_exact_claim_is_a_duplicate_override() {
        let (nodes, warnings) = resolve(
            "material Base {\n pass P {\n  lighting off\n }\n}\n\
             material D : Base {\n pass P {\n }\n pass P {\n }\n}\n",
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, ErrorKind::DuplicateOverride);
        let passes: Vec<&ObjectNode> = top(&nodes, "D").objects().collect();
        assert_eq!(passes.len(), 2);
        assert_eq!(prop_value(passes[0], "lighting"), vec!["off"]);
        assert!(passes[1].property("lighting").is_none());
    }

    #[test]
    fn environment_merge_keeps_destination_values() {
        let (nodes, _) = resolve(
            "material Base {\n set $c 1\n set $only_base x\n}\nmaterial D : Base {\n set $c 2\n}\n",
        );
        let d = top(&nodes, "D");
        assert_eq!(d.env.get("$c").map(String::as_str), Some("2"));
        assert_eq!(d.env.get("$only_base").map(String::as_str), Some("x"));
    }

    #[test]
    fn copied_children_do_not_inherit_twice() {
        let (nodes, warnings) = resolve(
            "material Shared {\n lighting off\n}\n\
             material Base {\n pass P : Shared {\n }\n}\n\
             material D : Base {\n}\n",
        );
        assert!(warnings.is_empty());
        let pass = top(&nodes, "D").objects().next().unwrap();
        assert_eq!(pass.properties("lighting").count(), 1);
        assert!(pass.bases.is_empty());
    }

    #[test]
    fn imported_bases_are_found_after_local_ones() {
        let ids = IdTable::builtin();
        let mut globals = Env::new();
        let imported = build_tree("material Base {\n p imported\n}\n", "lib.material", &ids, &mut globals).unwrap();
        let mut nodes = build_tree(
            "material D : Base {\n}\nmaterial Local : Base {\n}\nmaterial Base {\n p local\n}\n",
            "test.material",
            &ids,
            &mut globals,
        )
        .unwrap();
        let mut warnings = Vec::new();
        process_objects(&mut nodes, &imported, &mut warnings);
        assert_eq!(prop_value(top(&nodes, "D"), "p"), vec!["local"]);

        let mut only_import = build_tree("material D : Base {\n}\n", "t2.material", &ids, &mut globals).unwrap();
        process_objects(&mut only_import, &imported, &mut warnings);
        assert_eq!(prop_value(top(&only_import, "D"), "p"), vec!["imported"]);
        assert!(warnings.is_empty());
    }
}
