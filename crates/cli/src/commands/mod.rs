pub mod generate;
pub mod inspect;
pub mod site;

use std::path::Path;

use anyhow::Result;
use pageforge_engine::{Engine, EngineState};
use std::sync::Arc;

/// Print live per-job progress while a generation runs.
///
/// Watches state snapshots and reports byte counts and status changes;
/// exits when the watch channel closes.
pub fn spawn_progress_printer(engine: &Engine) -> tokio::task::JoinHandle<()> {
    let mut rx = engine.subscribe();
    tokio::spawn(async move {
        let mut last_report: Vec<String> = Vec::new();
        while rx.changed().await.is_ok() {
            let snapshot: Arc<EngineState> = rx.borrow_and_update().clone();
            let mut report = Vec::new();
            for session in &snapshot.sessions {
                for artifact in &session.artifacts {
                    report.push(format!(
                        "  {} [{}] {} bytes",
                        artifact.style_label,
                        artifact.status,
                        artifact.content.len()
                    ));
                }
                if let Some(site) = &session.site {
                    for page in &site.pages {
                        report.push(format!(
                            "  {} [{}] {} bytes",
                            page.name,
                            page.status,
                            page.content.len()
                        ));
                    }
                }
            }
            if report != last_report {
                eprintln!("{}", report.join("\n"));
                last_report = report;
            }
        }
    })
}

pub fn write_document(dir: &Path, file_stem: &str, content: &str) -> Result<std::path::PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{file_stem}.html"));
    std::fs::write(&path, content)?;
    Ok(path)
}
