//! System prompts and workflow request wrapping.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

use comfyx_workflow::{NodeDefinition, NodeRegistry};

use crate::{Error, Result, TRACING_TARGET_PROMPT};

/// Built-in system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are ComfyX AI assistant. You help users create ComfyUI workflows. \
When the user describes an image generation task, create a ComfyUI workflow in JSON API format. \
Each node in the workflow should have a unique string ID as the key, and contain \
\"class_type\", \"inputs\", and optionally \"_meta\" with a \"title\" field. \
Connect nodes by referencing other node IDs in the format [\"node_id\", output_index]. \
Always use standard ComfyUI node class names. \
If the user asks a general question, answer helpfully without generating a workflow.";

/// Assembles the prompts sent to a chat provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    base_prompt: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    /// Creates a builder using [`DEFAULT_SYSTEM_PROMPT`].
    pub fn new() -> Self {
        Self {
            base_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
        }
    }

    /// Creates a builder with a custom base prompt.
    ///
    /// A blank prompt falls back to the default.
    pub fn with_base_prompt(prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Self::new();
        }

        Self {
            base_prompt: prompt.to_owned(),
        }
    }

    /// Loads the base prompt from a file.
    ///
    /// An empty file falls back to the default; an unreadable one is an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::PromptFile {
            path: path.to_owned(),
            source,
        })?;

        if content.trim().is_empty() {
            tracing::debug!(
                target: TRACING_TARGET_PROMPT,
                path = %path.display(),
                "system prompt file is empty, using built-in prompt"
            );
            return Ok(Self::new());
        }

        tracing::debug!(
            target: TRACING_TARGET_PROMPT,
            path = %path.display(),
            "loaded system prompt"
        );
        Ok(Self::with_base_prompt(content))
    }

    /// Returns the base prompt.
    pub fn base_prompt(&self) -> &str {
        &self.base_prompt
    }

    /// Builds the system prompt, listing the available node classes when a
    /// non-empty registry is given.
    ///
    /// Classes are grouped by category; categories and classes are sorted,
    /// and classes without a category are listed under `Uncategorized`.
    pub fn system_prompt(&self, registry: Option<&NodeRegistry>) -> String {
        let mut prompt = self.base_prompt.clone();
        let Some(registry) = registry.filter(|registry| !registry.is_empty()) else {
            return prompt;
        };

        let mut groups: BTreeMap<&str, Vec<&NodeDefinition>> = BTreeMap::new();
        for definition in registry.iter() {
            groups
                .entry(definition.category_or_default())
                .or_default()
                .push(definition);
        }

        prompt.push_str("\n\n## Available ComfyUI Nodes\n\n");
        prompt.push_str(
            "Below are the node class names available on the connected ComfyUI server, \
             grouped by category. Use only these class names when building workflows.\n\n",
        );

        for (category, mut definitions) in groups {
            definitions.sort_by(|a, b| a.class_name.cmp(&b.class_name));
            let _ = writeln!(prompt, "### {category}");
            for definition in definitions {
                let display = &definition.display_name;
                if display.trim().is_empty() || display == &definition.class_name {
                    let _ = writeln!(prompt, "- {}", definition.class_name);
                } else {
                    let _ = writeln!(prompt, "- {} ({display})", definition.class_name);
                }
            }
            prompt.push('\n');
        }

        tracing::debug!(
            target: TRACING_TARGET_PROMPT,
            definition_count = registry.len(),
            prompt_chars = prompt.len(),
            "built system prompt with node catalogue"
        );
        prompt
    }

    /// Wraps a natural-language request with the rules for a workflow reply.
    pub fn workflow_request(user_request: &str) -> String {
        format!(
            "Please generate a ComfyUI workflow in API format JSON based on the following request.\n\
             \n\
             Requirements:\n\
             1. Output ONLY valid JSON in a ```json code block.\n\
             2. Each node must have a unique string ID as the key (e.g. \"1\", \"2\", \"3\").\n\
             3. Each node must contain \"class_type\" and \"inputs\".\n\
             4. Node connections use the format [\"source_node_id\", output_index].\n\
             5. Include a \"_meta\" object with a \"title\" field for each node.\n\
             6. Use only standard ComfyUI node class names.\n\
             \n\
             User request:\n\
             {user_request}\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use serde_json::json;

    use super::*;

    fn registry() -> NodeRegistry {
        NodeRegistry::from_object_info(&json!({
            "KSampler": {"display_name": "KSampler", "category": "sampling"},
            "CheckpointLoaderSimple": {"display_name": "Load Checkpoint", "category": "loaders"},
            "VAELoader": {"display_name": "Load VAE", "category": "loaders"},
            "MysteryNode": {}
        }))
    }

    #[test]
    fn test_system_prompt_without_registry() {
        let builder = PromptBuilder::new();
        assert_eq!(builder.system_prompt(None), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(
            builder.system_prompt(Some(&NodeRegistry::new())),
            DEFAULT_SYSTEM_PROMPT
        );
    }

    #[test]
    fn test_system_prompt_catalogue() {
        let prompt = PromptBuilder::with_base_prompt("base").system_prompt(Some(&registry()));
        let expected = "base\n\n## Available ComfyUI Nodes\n\n\
            Below are the node class names available on the connected ComfyUI server, \
            grouped by category. Use only these class names when building workflows.\n\n\
            ### Uncategorized\n- MysteryNode\n\n\
            ### loaders\n- CheckpointLoaderSimple (Load Checkpoint)\n- VAELoader (Load VAE)\n\n\
            ### sampling\n- KSampler\n\n";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn test_workflow_request() {
        let request = PromptBuilder::workflow_request("a cat");
        assert!(request.starts_with("Please generate a ComfyUI workflow"));
        assert!(request.contains("1. Output ONLY valid JSON in a ```json code block.\n"));
        assert!(request.contains("6. Use only standard ComfyUI node class names.\n"));
        assert!(request.ends_with("User request:\na cat\n"));
    }

    #[test]
    fn test_blank_base_prompt_falls_back() {
        assert_eq!(PromptBuilder::with_base_prompt("  \n"), PromptBuilder::new());
        assert_eq!(PromptBuilder::with_base_prompt(" hi ").base_prompt(), "hi");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  custom prompt  ").unwrap();
        let builder = PromptBuilder::from_file(file.path()).unwrap();
        assert_eq!(builder.base_prompt(), "custom prompt");

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(PromptBuilder::from_file(empty.path()).unwrap(), PromptBuilder::new());

        let err = PromptBuilder::from_file("/nonexistent/comfyx/prompt.txt").unwrap_err();
        assert!(matches!(err, Error::PromptFile { .. }));
    }
}
