//! Listing node definitions.

use anyhow::Context;
use comfyx_client::{ComfyClient, ComfyConfig};
use comfyx_workflow::NodeDefinition;

use crate::config::NodesArgs;

/// `nodes`: prints the node classes installed on the job engine.
pub async fn list(config: &ComfyConfig, args: &NodesArgs) -> anyhow::Result<()> {
    let client = ComfyClient::new(config.clone()).context("invalid job engine configuration")?;
    let registry = client
        .object_info()
        .await
        .context("failed to fetch node definitions")?;

    let definitions: Vec<&NodeDefinition> = match args.query.as_deref() {
        Some(query) => registry.search(query),
        None => registry.iter().collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    for definition in definitions {
        println!("{}", summary_line(definition));
    }
    Ok(())
}

fn summary_line(definition: &NodeDefinition) -> String {
    format!(
        "{}\t{}\t{}",
        definition.class_name,
        definition.display_name,
        definition.category_or_default()
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_summary_line() {
        let definition = NodeDefinition::from_object_info(
            "CheckpointLoaderSimple",
            &json!({"display_name": "Load Checkpoint", "category": "loaders"}),
        );
        assert_eq!(
            summary_line(&definition),
            "CheckpointLoaderSimple\tLoad Checkpoint\tloaders"
        );

        let bare = NodeDefinition::from_object_info("Mystery", &json!({}));
        assert_eq!(summary_line(&bare), "Mystery\tMystery\tUncategorized");
    }
}
