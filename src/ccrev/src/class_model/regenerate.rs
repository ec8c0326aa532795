//! Source text for class models

use super::{ClassModel, PropertyValue, LIFECYCLE_METHODS};
use crate::script::{format_number, Literal};

/// Serializes [`ClassModel`]s back to script source.
///
/// Output layout: `name`, `extends`, a `properties` block holding every
/// non-function entry, one empty stub per function entry, then the
/// `onLoad`, `start` and `update(dt)` lifecycle stubs. Functions named like
/// a lifecycle method stay in the `properties` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regenerator {
    unit: String,
}

impl Default for Regenerator {
    fn default() -> Self {
        Self::spaces(4)
    }
}

impl Regenerator {
    /// Indent each level with `unit`
    pub fn new(unit: impl Into<String>) -> Self {
        Self { unit: unit.into() }
    }

    pub fn spaces(width: usize) -> Self {
        Self::new(" ".repeat(width))
    }

    pub fn tabs() -> Self {
        Self::new("\t")
    }

    pub fn regenerate(&self, model: &ClassModel) -> String {
        let pad = &self.unit;

        let mut header = Vec::new();
        if let Some(name) = &model.name {
            header.push(format!("{}name: {}", pad, quote(name)));
        }
        if let Some(base) = &model.extends {
            header.push(format!("{}extends: {}", pad, base));
        }

        let mut sections = Vec::new();
        if !header.is_empty() {
            sections.push(header.join(",\n"));
        }

        let (methods, data): (Vec<_>, Vec<_>) = model
            .properties
            .iter()
            .partition(|(k, v)| v.is_function() && !LIFECYCLE_METHODS.contains(k));
        if !data.is_empty() {
            let entries: Vec<String> = data
                .iter()
                .map(|(k, v)| format!("{}{}: {}", pad.repeat(2), key(k), self.value(v, 2)))
                .collect();
            sections.push(format!(
                "{}properties: {{\n{}\n{}}}",
                pad,
                entries.join(",\n"),
                pad
            ));
        }

        for (k, _) in methods {
            sections.push(format!("{}{}: function () {{}}", pad, key(k)));
        }

        sections.push(format!("{}onLoad: function () {{}}", pad));
        sections.push(format!("{}start: function () {{}}", pad));
        sections.push(format!("{}update: function (dt) {{}}", pad));

        format!("{}({{\n{}\n}});\n", model.factory, sections.join(",\n\n"))
    }

    /// Literal text of a value nested `depth` levels deep
    fn value(&self, value: &PropertyValue, depth: usize) -> String {
        match value {
            PropertyValue::Literal(literal) => scalar(literal),
            PropertyValue::Object(map) if map.is_empty() => "{}".to_string(),
            PropertyValue::Object(map) => {
                let inner = self.unit.repeat(depth + 1);
                let entries: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{}{}: {}", inner, key(k), self.value(v, depth + 1)))
                    .collect();
                format!("{{\n{}\n{}}}", entries.join(",\n"), self.unit.repeat(depth))
            }
            PropertyValue::Array(items) if items.is_empty() => "[]".to_string(),
            PropertyValue::Array(items) => {
                let inner = self.unit.repeat(depth + 1);
                let items: Vec<String> = items
                    .iter()
                    .map(|v| format!("{}{}", inner, self.value(v, depth + 1)))
                    .collect();
                format!("[\n{}\n{}]", items.join(",\n"), self.unit.repeat(depth))
            }
            PropertyValue::FunctionMarker => "function () {}".to_string(),
            PropertyValue::MemberPath(path) => path.clone(),
            PropertyValue::Identifier(name) => name.clone(),
            // Unknown syntax cannot be reproduced
            PropertyValue::Opaque(kind) => format!("null /* {} */", kind),
        }
    }
}

fn scalar(literal: &Literal) -> String {
    match literal {
        Literal::String(s) => quote(s),
        // `Infinity` would read back as an identifier
        Literal::Number(n) if n.is_infinite() => {
            let text = if *n > 0.0 { "1e999" } else { "-1e999" };
            text.to_string()
        }
        Literal::Number(n) => format_number(*n),
        Literal::Bool(b) => b.to_string(),
        Literal::Null => "null".to_string(),
    }
}

fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Property name, quoted unless it is a plain identifier
fn key(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if plain {
        name.to_string()
    } else {
        quote(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_model::{Extractor, PropertyMap};
    use crate::script::{LiteParser, ScriptParser};

    fn reextract(source: &str) -> ClassModel {
        let tree = LiteParser::new().parse(source).expect("regenerated source parses");
        let mut models = Extractor::new().extract(&tree);
        assert_eq!(models.len(), 1, "{}", source);
        models.remove(0)
    }

    fn sample_model() -> ClassModel {
        let mut target = PropertyMap::new();
        target.insert("default", PropertyValue::Literal(Literal::Null));
        target.insert("type", PropertyValue::MemberPath("cc.Node".into()));
        target.insert(
            "tooltip",
            PropertyValue::Literal(Literal::String("say \"hi\"\n".into())),
        );

        let mut model = ClassModel::new("cc.Class");
        model.name = Some("Player".into());
        model.extends = Some("cc.Component".into());
        model
            .properties
            .insert("speed", PropertyValue::Literal(Literal::Number(-2.5)));
        model
            .properties
            .insert("alive", PropertyValue::Literal(Literal::Bool(false)));
        model.properties.insert("target", PropertyValue::Object(target));
        model.properties.insert(
            "path",
            PropertyValue::Array(vec![
                PropertyValue::Literal(Literal::Number(1.0)),
                PropertyValue::Array(Vec::new()),
                PropertyValue::Object(PropertyMap::new()),
                PropertyValue::FunctionMarker,
            ]),
        );
        model
            .properties
            .insert("owner", PropertyValue::Identifier("player".into()));
        model.properties.insert("fire", PropertyValue::FunctionMarker);
        model
            .properties
            .insert("hyphen-key", PropertyValue::Literal(Literal::Null));
        model
    }

    #[test]
    fn test_layout() {
        let mut model = ClassModel::new("cc.Class");
        model.name = Some("Foo".into());
        model.extends = Some("cc.Component".into());
        model
            .properties
            .insert("speed", PropertyValue::Literal(Literal::Number(5.0)));
        model.properties.insert("jump", PropertyValue::FunctionMarker);

        let expected = "cc.Class({
    name: \"Foo\",
    extends: cc.Component,

    properties: {
        speed: 5
    },

    jump: function () {},

    onLoad: function () {},

    start: function () {},

    update: function (dt) {}
});
";
        assert_eq!(Regenerator::default().regenerate(&model), expected);
    }

    #[test]
    fn test_empty_model_has_only_stubs() {
        let source = Regenerator::spaces(2).regenerate(&ClassModel::new("cc.Class"));
        assert_eq!(
            source,
            "cc.Class({\n  onLoad: function () {},\n\n  start: function () {},\n\n  update: function (dt) {}\n});\n"
        );
        assert!(!source.contains("properties"));
    }

    #[test]
    fn test_regenerate_then_extract_is_identity() {
        let model = sample_model();
        for regenerator in [Regenerator::default(), Regenerator::tabs(), Regenerator::spaces(1)] {
            assert_eq!(reextract(&regenerator.regenerate(&model)), model);
        }
    }

    #[test]
    fn test_extract_regenerate_extract_is_stable() {
        let source = r#"cc.Class({
            name: 'Door',
            extends: cc.Component,
            properties: { open: !1, angle: 90, hinge: { default: null, type: cc.Node } },
            toggle: function () { this.open = !this.open; },
            onLoad: function () { this.toggle(); },
            update: function (dt) {}
        });"#;
        let first = reextract(source);
        let second = reextract(&regenerate_default(&first));
        assert_eq!(first, second);
    }

    #[test]
    fn test_lifecycle_named_entries_survive_regeneration() {
        let source = r#"cc.Class({
            properties: { start: function () {}, update: 2, hp: 1 },
            hp: function () {},
            jump: function () {}
        });"#;
        let first = reextract(source);
        assert_eq!(first.properties.len(), 4);
        let text = regenerate_default(&first);
        assert!(text.contains("        start: function () {}"));
        assert_eq!(reextract(&text), first);
    }

    #[test]
    fn test_overflowing_numbers_stay_numeric() {
        let first = reextract("cc.Class({ properties: { far: 1e400, near: -1e400 } })");
        assert_eq!(
            first.properties.get("far"),
            Some(&PropertyValue::Literal(Literal::Number(f64::INFINITY)))
        );
        let text = regenerate_default(&first);
        assert!(text.contains("far: 1e999"));
        assert!(text.contains("near: -1e999"));
        assert_eq!(reextract(&text), first);
    }

    fn regenerate_default(model: &ClassModel) -> String {
        Regenerator::default().regenerate(model)
    }

    #[test]
    fn test_opaque_values_are_commented() {
        let mut model = ClassModel::new("cc.Class");
        model
            .properties
            .insert("sum", PropertyValue::Opaque("BinaryExpression".into()));
        let source = Regenerator::default().regenerate(&model);
        assert!(source.contains("sum: null /* BinaryExpression */"));
    }

    #[test]
    fn test_key_quoting() {
        assert_eq!(key("speed"), "speed");
        assert_eq!(key("$el_2"), "$el_2");
        assert_eq!(key("2d"), "\"2d\"");
        assert_eq!(key("a-b"), "\"a-b\"");
        assert_eq!(key(""), "\"\"");
    }
}
