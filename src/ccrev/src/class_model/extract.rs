//! Recognition of factory calls and descriptor normalization

use std::collections::HashSet;

use super::{ClassModel, PropertyValue, LIFECYCLE_METHODS};
use crate::script::{Literal, Node, ObjectEntry, SyntaxTree};

/// Finds `Namespace.Factory({...})` calls anywhere in a tree
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    factory_name: Option<String>,
}

impl Extractor {
    /// Accept any `Namespace.Factory` callee
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept only callees whose second segment is `factory_name`
    pub fn with_factory(factory_name: impl Into<String>) -> Self {
        Self {
            factory_name: Some(factory_name.into()),
        }
    }

    pub fn extract(&self, tree: &SyntaxTree) -> Vec<ClassModel> {
        let mut models = Vec::new();
        self.extract_into(tree, &mut models);
        models
    }

    /// Append models in traversal order, outer declarations first
    pub fn extract_into(&self, tree: &SyntaxTree, models: &mut Vec<ClassModel>) {
        tree.walk(&mut |node| {
            if let Some(model) = self.recognize(node) {
                tracing::debug!("found class declaration {}", model.display_name());
                models.push(model);
            }
        });
    }

    fn recognize(&self, node: &Node) -> Option<ClassModel> {
        let Node::Call { callee, arguments } = node else {
            return None;
        };
        let chain = callee.member_chain()?;
        let [namespace, factory] = chain.as_slice() else {
            return None;
        };
        if self
            .factory_name
            .as_deref()
            .is_some_and(|wanted| wanted != *factory)
        {
            return None;
        }
        let [Node::Object { entries }] = arguments.as_slice() else {
            return None;
        };

        Some(describe(format!("{}.{}", namespace, factory), entries))
    }
}

fn describe(factory: String, entries: &[ObjectEntry]) -> ClassModel {
    let mut model = ClassModel::new(factory);
    // Names declared in a `properties` block; these win over class members
    let mut declared = HashSet::new();

    for entry in entries {
        let Some(key) = entry.key.name() else {
            continue;
        };

        match (key, &entry.value) {
            (
                "name",
                Node::Literal {
                    value: Literal::String(name),
                },
            ) => model.name = Some(name.clone()),
            ("name", other) => {
                tracing::debug!("ignoring non-string class name ({})", other.kind());
            }
            ("extends", base) => match base.member_chain() {
                Some(chain) => model.extends = Some(chain.join(".")),
                None => tracing::debug!("ignoring unsupported base class ({})", base.kind()),
            },
            ("properties", Node::Object { entries }) => {
                for nested in entries {
                    if let Some(name) = nested.key.name() {
                        if !declared.contains(name) && model.properties.get(name).is_some() {
                            tracing::warn!(
                                "{}: property {} replaces a class member of the same name",
                                model.display_name(),
                                name
                            );
                        }
                        declared.insert(name.to_string());
                        model.properties.insert(name, classify(&nested.value));
                    }
                }
            }
            // Lifecycle methods are implied by regeneration, so they are not recorded
            (key, Node::Function(_)) if LIFECYCLE_METHODS.contains(&key) => {}
            (key, _) if declared.contains(key) => {
                tracing::warn!(
                    "{}: class member {} shadowed by a property of the same name",
                    model.display_name(),
                    key
                );
            }
            (key, value) => model.properties.insert(key, classify(value)),
        }
    }

    model
}

/// Classify a value node by its structural shape
pub fn classify(node: &Node) -> PropertyValue {
    match node {
        Node::Literal { value } => PropertyValue::Literal(value.clone()),
        Node::Object { entries } => PropertyValue::Object(
            entries
                .iter()
                .filter_map(|e| Some((e.key.name()?.to_string(), classify(&e.value))))
                .collect(),
        ),
        Node::Array { elements } => {
            PropertyValue::Array(elements.iter().flatten().map(classify).collect())
        }
        Node::Function(_) => PropertyValue::FunctionMarker,
        Node::Identifier { name } => PropertyValue::Identifier(name.clone()),
        Node::Member { .. } => match node.member_chain() {
            Some(chain) => PropertyValue::MemberPath(chain.join(".")),
            None => PropertyValue::Opaque(node.kind().to_string()),
        },
        other => PropertyValue::Opaque(other.kind().to_string()),
    }
}
