//! Reading documents and converting them for submission.

use std::path::Path;

use anyhow::Context;
use serde_json::Value;
use tokio::io::AsyncReadExt;

use crate::config::InputArgs;

/// Reads the whole input, from stdin when the path is `-`.
pub async fn read_input(args: &InputArgs) -> anyhow::Result<String> {
    read_path(&args.path).await
}

async fn read_path(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("failed to read stdin")?;
        return Ok(text);
    }

    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Converts workflow text in either form to an execution-form document.
pub fn execution_workflow(text: &str) -> anyhow::Result<Value> {
    let converted = comfyx_workflow::convert_workflow(text)
        .context("input is not a workflow that can be converted to the execution form")?;
    serde_json::from_str(&converted).context("converted workflow is not valid json")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_read_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"1\": {{}}}}").unwrap();
        assert_eq!(read_path(file.path()).await.unwrap(), r#"{"1": {}}"#);

        let err = read_path(Path::new("/nonexistent/comfyx.json")).await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/comfyx.json"));
    }

    #[test]
    fn test_execution_workflow() {
        let editor = json!({
            "nodes": [{"id": 1, "type": "SaveImage", "inputs": []}],
            "links": []
        });
        let workflow = execution_workflow(&editor.to_string()).unwrap();
        assert_eq!(workflow, json!({"1": {"class_type": "SaveImage", "inputs": {}}}));

        assert!(execution_workflow("not json").is_err());
    }
}
