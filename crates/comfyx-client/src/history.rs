//! Job identifiers and the `/history` response model.

use std::collections::BTreeMap;

use derive_more::{Debug, Display, From, Into};
use serde::{Deserialize, Serialize};

/// Identifier assigned by the job engine to a queued prompt.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("{_0}")]
#[display("{_0}")]
#[serde(transparent)]
pub struct PromptId(String);

impl PromptId {
    /// Creates a prompt ID.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PromptId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn default_image_type() -> String {
    "output".to_owned()
}

/// Reference to an image stored by the job engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    /// File name within the folder.
    pub filename: String,
    /// Sub-folder, empty for the folder root.
    #[serde(default)]
    pub subfolder: String,
    /// Storage folder: `output`, `input` or `temp`.
    #[serde(rename = "type", default = "default_image_type")]
    pub folder_type: String,
}

impl ImageRef {
    /// Creates a reference to an image in the output folder root.
    pub fn output(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            subfolder: String::new(),
            folder_type: default_image_type(),
        }
    }

    /// Query parameters for `/view`.
    pub fn query(&self) -> [(&'static str, &str); 3] {
        [
            ("filename", self.filename.as_str()),
            ("subfolder", self.subfolder.as_str()),
            ("type", self.folder_type.as_str()),
        ]
    }
}

/// Outputs produced by a single node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeOutputs {
    /// Images written by the node.
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// History entry of one prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptHistory {
    /// Outputs keyed by node id.
    #[serde(default)]
    pub outputs: BTreeMap<String, NodeOutputs>,
}

impl PromptHistory {
    /// Iterates over every image of every node.
    pub fn images(&self) -> impl Iterator<Item = &ImageRef> {
        self.outputs.values().flat_map(|outputs| outputs.images.iter())
    }
}

/// Response of `/history/{prompt_id}`, keyed by prompt id.
///
/// The job engine answers with an empty object until the prompt finishes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(BTreeMap<String, PromptHistory>);

impl History {
    /// Returns the entry of a prompt.
    pub fn get(&self, prompt_id: &PromptId) -> Option<&PromptHistory> {
        self.0.get(prompt_id.as_str())
    }

    /// Returns whether the prompt has finished.
    pub fn contains(&self, prompt_id: &PromptId) -> bool {
        self.0.contains_key(prompt_id.as_str())
    }

    /// Returns the images produced by a prompt.
    pub fn images(&self, prompt_id: &PromptId) -> Vec<&ImageRef> {
        self.get(prompt_id)
            .map(|entry| entry.images().collect())
            .unwrap_or_default()
    }

    /// Returns whether no prompt is recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_history_images() {
        let history: History = serde_json::from_value(json!({
            "abc": {
                "outputs": {
                    "9": {"images": [
                        {"filename": "out_00001_.png", "subfolder": "", "type": "output"},
                        {"filename": "out_00002_.png"}
                    ]},
                    "12": {"text": ["ignored"]}
                },
                "status": {"completed": true}
            }
        }))
        .unwrap();

        let prompt_id = PromptId::new("abc");
        assert!(history.contains(&prompt_id));

        let images = history.images(&prompt_id);
        assert_eq!(images.len(), 2);
        assert_eq!(images[1], &ImageRef::output("out_00002_.png"));
        assert!(history.images(&PromptId::new("missing")).is_empty());
    }

    #[test]
    fn test_empty_history() {
        let history: History = serde_json::from_value(json!({})).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_image_query() {
        let image = ImageRef {
            filename: "a.png".into(),
            subfolder: "batch".into(),
            folder_type: "temp".into(),
        };
        assert_eq!(
            image.query(),
            [("filename", "a.png"), ("subfolder", "batch"), ("type", "temp")]
        );
    }
}
