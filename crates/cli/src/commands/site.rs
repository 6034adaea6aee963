use std::path::Path;

use anyhow::Result;
use pageforge_core::JobStatus;
use pageforge_engine::{Engine, GenerationOptions};

use super::{spawn_progress_printer, write_document};

pub async fn run(
    engine: &Engine,
    prompt: &str,
    pages: &[String],
    image_url: Option<String>,
    out: &Path,
) -> Result<()> {
    let options = GenerationOptions { reference_image: image_url, ..GenerationOptions::default() };

    let printer = spawn_progress_printer(engine);
    let session_id = engine.generate_site(prompt, pages, &options).await?;
    printer.abort();

    let snapshot = engine.snapshot();
    let site = snapshot
        .session(&session_id)
        .and_then(|s| s.site.as_ref())
        .ok_or_else(|| anyhow::anyhow!("site {session_id} missing after generation"))?;

    for page in &site.pages {
        match page.status {
            JobStatus::Complete => {
                let path = write_document(out, &page.slug, &page.content)?;
                println!("✓ {} → {}", page.name, path.display());
            },
            JobStatus::Error => println!("✗ {} failed", page.name),
            JobStatus::Pending | JobStatus::Streaming => {
                println!("? {} did not settle", page.name);
            },
        }
    }

    println!("session {session_id}");
    Ok(())
}
