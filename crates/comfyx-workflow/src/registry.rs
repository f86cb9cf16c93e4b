//! Node definitions reported by the job engine's `/object_info` endpoint.

use std::collections::{BTreeMap, BTreeSet};

use comfyx_core::graph::WidgetValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::TRACING_TARGET_REGISTRY;

/// Type name used for inputs that take one of a fixed list of options.
pub const COMBO_TYPE: &str = "COMBO";

/// Category reported for definitions without one.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A declared input of a node class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInput {
    /// Input name.
    pub name: String,
    /// Declared type, [`COMBO_TYPE`] for option lists.
    pub type_name: String,
    /// Whether the input appears under `required`.
    pub required: bool,
    /// Default widget value, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<WidgetValue>,
    /// Allowed values of a combo input.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// A declared output of a node class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOutput {
    /// Output name, falling back to the type name.
    pub name: String,
    /// Declared type.
    pub type_name: String,
}

/// Definition of a node class available on the job engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Class identifier used as `class_type`.
    pub class_name: String,
    /// Human readable name.
    pub display_name: String,
    /// Menu category, possibly empty.
    pub category: String,
    /// Free-form description.
    pub description: String,
    /// Required inputs first, then optional ones.
    pub inputs: Vec<NodeInput>,
    /// Outputs in slot order.
    pub outputs: Vec<NodeOutput>,
    /// Whether the node produces job outputs (save, preview).
    pub is_output_node: bool,
}

impl NodeDefinition {
    /// Parses a single `/object_info` entry, keeping whatever can be read.
    pub fn from_object_info(class_name: &str, info: &Value) -> Self {
        let text = |key: &str| info.get(key).and_then(Value::as_str).map(str::to_owned);

        let mut inputs = Vec::new();
        if let Some(input) = info.get("input") {
            for (section, required) in [("required", true), ("optional", false)] {
                if let Some(entries) = input.get(section).and_then(Value::as_object) {
                    inputs.extend(parse_inputs(entries, required));
                }
            }
        }

        Self {
            class_name: class_name.to_owned(),
            display_name: text("display_name")
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| class_name.to_owned()),
            category: text("category").unwrap_or_default(),
            description: text("description").unwrap_or_default(),
            inputs,
            outputs: parse_outputs(info),
            is_output_node: info
                .get("output_node")
                .and_then(Value::as_bool)
                .unwrap_or_default(),
        }
    }

    /// Returns a declared input by name.
    pub fn input(&self, name: &str) -> Option<&NodeInput> {
        self.inputs.iter().find(|input| input.name == name)
    }

    /// Returns the category, or [`UNCATEGORIZED`] when empty.
    pub fn category_or_default(&self) -> &str {
        if self.category.is_empty() {
            UNCATEGORIZED
        } else {
            &self.category
        }
    }

    fn matches(&self, needle: &str) -> bool {
        [&self.class_name, &self.display_name, &self.category]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

fn parse_inputs(entries: &Map<String, Value>, required: bool) -> impl Iterator<Item = NodeInput> {
    entries.iter().map(move |(name, spec)| {
        let (type_name, options) = match spec.get(0) {
            Some(Value::String(type_name)) => (type_name.clone(), Vec::new()),
            Some(Value::Array(options)) => (
                COMBO_TYPE.to_owned(),
                options
                    .iter()
                    .map(|option| match option {
                        Value::String(option) => option.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            _ => (comfyx_core::graph::ANY_TYPE.to_owned(), Vec::new()),
        };
        let default = spec
            .get(1)
            .and_then(|config| config.get("default"))
            .and_then(WidgetValue::from_json);

        NodeInput {
            name: name.clone(),
            type_name,
            required,
            default,
            options,
        }
    })
}

fn parse_outputs(info: &Value) -> Vec<NodeOutput> {
    let Some(types) = info.get("output").and_then(Value::as_array) else {
        return Vec::new();
    };
    let names = info.get("output_name").and_then(Value::as_array);

    types
        .iter()
        .enumerate()
        .map(|(slot, type_name)| {
            let type_name = type_name.as_str().unwrap_or(comfyx_core::graph::ANY_TYPE);
            let name = names
                .and_then(|names| names.get(slot))
                .and_then(Value::as_str)
                .unwrap_or(type_name);
            NodeOutput {
                name: name.to_owned(),
                type_name: type_name.to_owned(),
            }
        })
        .collect()
}

/// Catalogue of node classes, ordered by class name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeRegistry {
    definitions: BTreeMap<String, NodeDefinition>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the full `/object_info` response.
    ///
    /// A non-object response yields an empty registry; non-object entries
    /// are skipped.
    pub fn from_object_info(object_info: &Value) -> Self {
        let Some(entries) = object_info.as_object() else {
            tracing::warn!(
                target: TRACING_TARGET_REGISTRY,
                "object info response is not an object"
            );
            return Self::new();
        };

        let definitions: BTreeMap<_, _> = entries
            .iter()
            .filter(|(_, info)| info.is_object())
            .map(|(class_name, info)| {
                let definition = NodeDefinition::from_object_info(class_name, info);
                (class_name.clone(), definition)
            })
            .collect();

        tracing::debug!(
            target: TRACING_TARGET_REGISTRY,
            definition_count = definitions.len(),
            skipped = entries.len() - definitions.len(),
            "parsed node registry"
        );

        Self { definitions }
    }

    /// Adds or replaces a definition.
    pub fn insert(&mut self, definition: NodeDefinition) {
        self.definitions
            .insert(definition.class_name.clone(), definition);
    }

    /// Returns a definition by class name.
    pub fn get(&self, class_name: &str) -> Option<&NodeDefinition> {
        self.definitions.get(class_name)
    }

    /// Case-insensitive search over class name, display name and category.
    ///
    /// An empty query returns every definition.
    pub fn search(&self, query: &str) -> Vec<&NodeDefinition> {
        let needle = query.trim().to_lowercase();
        self.definitions
            .values()
            .filter(|definition| needle.is_empty() || definition.matches(&needle))
            .collect()
    }

    /// Returns the number of definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Iterates definitions in class name order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeDefinition> {
        self.definitions.values()
    }

    /// Returns the distinct categories, with [`UNCATEGORIZED`] for empty ones.
    pub fn categories(&self) -> BTreeSet<&str> {
        self.definitions
            .values()
            .map(NodeDefinition::category_or_default)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object_info() -> Value {
        json!({
            "KSampler": {
                "display_name": "KSampler",
                "category": "sampling",
                "description": "Denoises a latent.",
                "input": {
                    "required": {
                        "model": ["MODEL"],
                        "seed": ["INT", {"default": 0, "min": 0}],
                        "sampler_name": [["euler", "dpmpp_2m"], {"default": "euler"}]
                    },
                    "optional": {
                        "denoise": ["FLOAT", {"default": 1.0}]
                    }
                },
                "output": ["LATENT"],
                "output_node": false
            },
            "SaveImage": {
                "display_name": "Save Image",
                "category": "image",
                "input": {"required": {"images": ["IMAGE"]}},
                "output": [],
                "output_node": true
            },
            "CheckpointLoaderSimple": {
                "input": {"required": {"ckpt_name": [["a.safetensors"]]}},
                "output": ["MODEL", "CLIP", "VAE"],
                "output_name": ["MODEL", "CLIP"]
            },
            "broken": 7
        })
    }

    #[test]
    fn test_from_object_info() {
        let registry = NodeRegistry::from_object_info(&object_info());
        assert_eq!(registry.len(), 3);

        let sampler = registry.get("KSampler").unwrap();
        assert_eq!(sampler.inputs.len(), 4);
        assert_eq!(sampler.input("seed").unwrap().default, Some(WidgetValue::Integer(0)));
        assert!(sampler.input("model").unwrap().required);
        assert!(!sampler.input("denoise").unwrap().required);

        let sampler_name = sampler.input("sampler_name").unwrap();
        assert_eq!(sampler_name.type_name, COMBO_TYPE);
        assert_eq!(sampler_name.options, vec!["euler", "dpmpp_2m"]);

        assert_eq!(sampler.outputs[0].name, "LATENT");
        assert!(registry.get("SaveImage").unwrap().is_output_node);
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let registry = NodeRegistry::from_object_info(&object_info());
        let loader = registry.get("CheckpointLoaderSimple").unwrap();
        assert_eq!(loader.display_name, "CheckpointLoaderSimple");
        assert_eq!(loader.category_or_default(), UNCATEGORIZED);

        let names: Vec<_> = loader.outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["MODEL", "CLIP", "VAE"]);
    }

    #[test]
    fn test_search_and_categories() {
        let registry = NodeRegistry::from_object_info(&object_info());
        let found: Vec<_> = registry.search("SAVE").iter().map(|d| d.class_name.as_str()).collect();
        assert_eq!(found, ["SaveImage"]);
        assert_eq!(registry.search("").len(), 3);
        assert_eq!(registry.search("sampling").len(), 1);

        let categories: Vec<_> = registry.categories().into_iter().collect();
        assert_eq!(categories, [UNCATEGORIZED, "image", "sampling"]);
    }

    #[test]
    fn test_non_object_response() {
        assert!(NodeRegistry::from_object_info(&json!([1, 2])).is_empty());
    }
}
