//! Subcommand handlers
//!
//! Each handler returns the process exit code. Failures are logged and
//! reported on stderr; only `invoke` writes to stdout.

use crate::cli::commands::InvokeArgs;
use crate::config::{site_configuration_from_env, PipelineConfig};
use crate::pipeline::{PipelineController, PipelineResponse};
use crate::process::TokioProcessRunner;
use crate::publish::{FsObjectStore, ObjectStore, S3ObjectStore};
use crate::trigger::TriggerEvent;
use anyhow::{Context, Result};
use lambda_runtime::{service_fn, LambdaEvent};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

pub async fn handle_serve() -> i32 {
    match serve().await {
        Ok(()) => 0,
        Err(e) => {
            error!("Function runtime stopped: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

async fn serve() -> Result<()> {
    let config = PipelineConfig::from_env().context("Failed to load pipeline configuration")?;
    info!(
        bucket = %config.destination_bucket,
        extractor = %config.extractor,
        "Starting function runtime"
    );

    let store: Arc<dyn ObjectStore> =
        Arc::new(S3ObjectStore::from_env(config.s3_endpoint_url.as_deref()).await);
    let controller = Arc::new(config.create_controller(store, Arc::new(TokioProcessRunner::new())));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<TriggerEvent>| {
        let controller = Arc::clone(&controller);
        async move {
            info!(request_id = %event.context.request_id, "Received upload notification");
            controller
                .handle_event(&event.payload)
                .await
                .map_err(lambda_runtime::Error::from)
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
    .context("Function runtime failed")
}

pub async fn handle_invoke(args: &InvokeArgs) -> i32 {
    let result = async {
        let config =
            PipelineConfig::from_env().context("Failed to load pipeline configuration")?;
        invoke_event(&config, &args.event, args.local_store.as_deref()).await
    }
    .await;

    match result {
        Ok(response) => match serde_json::to_string_pretty(&response) {
            Ok(json) => {
                println!("{}", json);
                0
            }
            Err(e) => {
                eprintln!("Error: failed to serialize response: {}", e);
                1
            }
        },
        Err(e) => {
            error!("Invocation failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

/// Runs the pipeline once for the notification stored at `event_path`.
///
/// With `local_store`, buckets are subdirectories of that directory.
pub async fn invoke_event(
    config: &PipelineConfig,
    event_path: &Path,
    local_store: Option<&Path>,
) -> Result<PipelineResponse> {
    let raw = fs::read_to_string(event_path)
        .with_context(|| format!("Failed to read event file {}", event_path.display()))?;
    let event: TriggerEvent = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse event file {}", event_path.display()))?;

    let store: Arc<dyn ObjectStore> = match local_store {
        Some(root) => {
            info!(root = %root.display(), "Using local object store");
            Arc::new(FsObjectStore::new(root))
        }
        None => Arc::new(S3ObjectStore::from_env(config.s3_endpoint_url.as_deref()).await),
    };

    let controller: PipelineController =
        config.create_controller(store, Arc::new(TokioProcessRunner::new()));
    let response = controller.handle_event(&event).await?;
    Ok(response)
}

pub fn handle_render_config() -> i32 {
    let rendered = site_configuration_from_env()
        .context("Failed to load site configuration")
        .and_then(|site| site.render().context("Failed to render site configuration"));

    match rendered {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::env;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn site_zip() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        writer.start_file("package.json", options).unwrap();
        writer.write_all(br#"{"name":"admin-site"}"#).unwrap();
        writer.start_file("build.sh", options).unwrap();
        writer
            .write_all(b"mkdir -p dist\ncp src/environments/environment.prod.ts dist/env.js\necho '<html></html>' > dist/index.html\n")
            .unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn local_config(scratch: &Path) -> PipelineConfig {
        let vars: HashMap<&str, String> = [
            ("BUCKET_NAME", "site-bucket".to_string()),
            ("SITE_API_URL", "https://api.example.com".to_string()),
            ("SITE_PIPELINE_INSTALL_COMMAND", String::new()),
            ("SITE_PIPELINE_BUILD_COMMAND", "sh build.sh".to_string()),
            ("SITE_PIPELINE_SCRATCH_DIR", scratch.display().to_string()),
        ]
        .into_iter()
        .collect();
        PipelineConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_event_against_local_store() {
        let temp_dir = TempDir::new().unwrap();
        let buckets = temp_dir.path().join("buckets");
        let scratch = temp_dir.path().join("scratch");
        fs::create_dir_all(buckets.join("source-code-bucket/AdminSite")).unwrap();
        fs::create_dir_all(&scratch).unwrap();
        fs::write(buckets.join("source-code-bucket/AdminSite/src.zip"), site_zip()).unwrap();

        let event_path = temp_dir.path().join("event.json");
        let event = TriggerEvent::single("source-code-bucket", "AdminSite/src.zip");
        fs::write(&event_path, serde_json::to_vec(&event).unwrap()).unwrap();

        let config = local_config(&scratch);
        let response = invoke_event(&config, &event_path, Some(&buckets)).await.unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body.published, 2);

        let published = fs::read_to_string(buckets.join("site-bucket/env.js")).unwrap();
        assert!(published.starts_with("export const environment = "));
        assert!(buckets.join("site-bucket/index.html").is_file());
        assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_invoke_event_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = local_config(temp_dir.path());

        let result = invoke_event(
            &config,
            &temp_dir.path().join("missing.json"),
            Some(temp_dir.path()),
        )
        .await;

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Failed to read event file"));
    }

    #[tokio::test]
    async fn test_invoke_event_without_records() {
        let temp_dir = TempDir::new().unwrap();
        let event_path = temp_dir.path().join("event.json");
        fs::write(&event_path, r#"{"Records":[]}"#).unwrap();
        let config = local_config(temp_dir.path());

        let result = invoke_event(&config, &event_path, Some(temp_dir.path())).await;
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_render_config_exit_codes() {
        env::remove_var("SITE_CONFIG");
        env::remove_var("SITE_API_URL");
        assert_eq!(handle_render_config(), 1);

        env::set_var("SITE_API_URL", "https://api.example.com");
        assert_eq!(handle_render_config(), 0);
        env::remove_var("SITE_API_URL");
    }
}
