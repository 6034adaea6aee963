use std::path::Path;

use anyhow::Result;
use pageforge_core::{slugify, JobStatus};
use pageforge_engine::{
    Engine, GenerationOptions, HttpPublishBackend, PublishMetadata,
};

use super::{spawn_progress_printer, write_document};

#[allow(clippy::too_many_arguments)]
pub async fn run(
    engine: &Engine,
    prompt: &str,
    variants: usize,
    image_url: Option<String>,
    clone_mode: bool,
    out: &Path,
    publish: bool,
) -> Result<()> {
    let options = GenerationOptions {
        variant_count: variants,
        reference_image: image_url,
        style_kit: None,
        clone_mode,
    };

    let printer = spawn_progress_printer(engine);
    let session_id = engine.generate(prompt, &options).await?;
    printer.abort();

    let snapshot = engine.snapshot();
    let session = snapshot
        .session(&session_id)
        .ok_or_else(|| anyhow::anyhow!("session {session_id} missing after generation"))?;

    let mut first_complete = None;
    for (i, artifact) in session.artifacts.iter().enumerate() {
        match artifact.status {
            JobStatus::Complete => {
                let stem = format!("variant-{}-{}", i + 1, slugify(&artifact.style_label));
                let path = write_document(out, &stem, &artifact.content)?;
                println!("✓ {} → {}", artifact.style_label, path.display());
                first_complete.get_or_insert(artifact.clone());
            },
            JobStatus::Error => println!("✗ {} failed", artifact.style_label),
            JobStatus::Pending | JobStatus::Streaming => {
                println!("? {} did not settle", artifact.style_label);
            },
        }
    }

    if publish {
        let Some(artifact) = first_complete else {
            anyhow::bail!("nothing to publish: no variant completed");
        };
        let backend = HttpPublishBackend::new(
            std::env::var("PAGEFORGE_PUBLISH_KEY")
                .map_err(|_| anyhow::anyhow!("PAGEFORGE_PUBLISH_KEY must be set to publish"))?,
            std::env::var("PAGEFORGE_PUBLISH_URL")
                .map_err(|_| anyhow::anyhow!("PAGEFORGE_PUBLISH_URL must be set to publish"))?,
        )?;
        let metadata = PublishMetadata { title: prompt.to_owned(), description: None };
        let info = engine.publish(&backend, &session_id, &artifact.id, &metadata).await?;
        println!("published {} → {}", artifact.style_label, info.url);
    }

    println!("session {session_id}");
    Ok(())
}
