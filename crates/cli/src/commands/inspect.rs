use anyhow::Result;
use pageforge_core::GenerationMode;
use pageforge_storage::{SqliteStore, StateStore};

pub async fn sessions(store: &SqliteStore) -> Result<()> {
    let sessions = store.load_sessions().await?;
    if sessions.is_empty() {
        println!("no sessions");
        return Ok(());
    }
    for session in sessions {
        let summary = match session.mode {
            GenerationMode::Single => format!("{} variants", session.artifacts.len()),
            GenerationMode::Site => format!(
                "site, {} pages",
                session.site.as_ref().map_or(0, |s| s.pages.len())
            ),
        };
        println!(
            "{}  {}  {}  {}",
            session.id,
            session.created_at.format("%Y-%m-%d %H:%M"),
            summary,
            session.prompt
        );
        for artifact in &session.artifacts {
            println!("    {}  [{}]  {}", artifact.id, artifact.status, artifact.style_label);
        }
        if let Some(site) = &session.site {
            for page in &site.pages {
                let home = if page.is_home { " (home)" } else { "" };
                println!("    {}  [{}]  {}{}", page.id, page.status, page.name, home);
            }
        }
    }
    Ok(())
}

pub async fn versions(store: &SqliteStore, artifact_id: &str) -> Result<()> {
    let entries = store.version_entries(artifact_id).await?;
    if entries.is_empty() {
        println!("no versions recorded for {artifact_id}");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{}  {}  {}  {} bytes",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.label,
            entry.content.len()
        );
    }
    Ok(())
}

pub async fn draft(store: &SqliteStore, discard: bool) -> Result<()> {
    if discard {
        store.clear_draft().await?;
        println!("draft discarded");
        return Ok(());
    }
    match store.load_draft().await? {
        Some(draft) => {
            println!("saved {}", draft.saved_at.format("%Y-%m-%d %H:%M:%S"));
            if draft.site_mode {
                println!("site pages: {}", draft.page_names.join(", "));
            }
            println!("{}", draft.prompt);
        },
        None => println!("no draft"),
    }
    Ok(())
}
