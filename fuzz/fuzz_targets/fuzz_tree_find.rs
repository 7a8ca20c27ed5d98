//! Fuzz target for tree construction and path lookup.
//!
//! Builds a tree from arbitrary operations, then resolves arbitrary paths.
//! Builder errors are fine. Panics are not, and every node the builders
//! accepted must be found again through its own path.

#![no_main]

use arbitrary::Arbitrary;
use cs_tree::NodeTree;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Path { parent: u8, name: String },
    Value { parent: u8, name: String, value: String },
    KeyValues { parent: u8, name: String },
    List { parent: u8, name: String },
    Attribute { node: u8, key: String, value: String },
}

#[derive(Debug, Arbitrary)]
struct Input {
    ops: Vec<Op>,
    lookups: Vec<String>,
}

fuzz_target!(|input: Input| {
    let Ok(mut tree) = NodeTree::new("root") else {
        return;
    };
    let mut ids = vec![tree.root()];
    let pick = |ids: &[cs_tree::NodeId], i: u8| ids[i as usize % ids.len()];

    for op in input.ops.iter().take(64) {
        let added = match op {
            Op::Path { parent, name } => tree.add_path(pick(&ids, *parent), name),
            Op::Value {
                parent,
                name,
                value,
            } => tree.add_value(pick(&ids, *parent), name, value.as_str()),
            Op::KeyValues { parent, name } => tree.add_key_values(pick(&ids, *parent), name),
            Op::List { parent, name } => tree.add_list(pick(&ids, *parent), name),
            Op::Attribute { node, key, value } => {
                let _ = tree.set_attribute(pick(&ids, *node), key, value.as_str());
                continue;
            }
        };
        if let Ok(id) = added {
            ids.push(id);
        }
    }

    for id in &ids {
        let Some(node) = tree.view(*id) else {
            continue;
        };
        let path = node.path();
        let found = tree
            .root_ref()
            .find(&path)
            .expect("every attached node is reachable by its path");
        assert_eq!(found.path(), path);
    }

    for lookup in input.lookups.iter().take(16) {
        let _ = tree.root_ref().find(lookup);
    }
});
