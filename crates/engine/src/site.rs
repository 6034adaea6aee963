//! Site mode: sequential multi-page generation.
//!
//! Pages are generated one at a time, strictly in order. Concurrency would
//! be faster, but a later page's prompt embeds the finished home page as
//! its style reference, and that reference cannot exist until the home
//! job has settled. Throughput is deliberately traded for guaranteed
//! style consistency.

use std::sync::Arc;

use pageforge_core::{
    slugify, ForgeError, GenerationMode, JobStatus, Result, Session, Site, SitePage,
    HOME_EXCERPT_MAX_LEN,
};
use pageforge_llm::{CompletionRequest, CompletionService};
use uuid::Uuid;

use crate::job::{Job, JobTarget};
use crate::pipeline::GenerationOptions;
use crate::prompts;
use crate::scheduler::RetryPolicy;
use crate::state::{StoreEvent, StoreHandle};

/// Generate a complete site. Returns the new session's id.
pub(crate) async fn generate_site(
    service: Arc<dyn CompletionService>,
    store: &StoreHandle,
    policy: &RetryPolicy,
    prompt: &str,
    page_names: &[String],
    options: &GenerationOptions,
) -> Result<String> {
    if page_names.is_empty() {
        return Err(ForgeError::InvalidInput("a site needs at least one page".to_owned()));
    }
    let session_id = Uuid::new_v4().to_string();
    let site = Site::from_page_names(page_names, || Uuid::new_v4().to_string());
    let pages = site.pages.clone();

    store.send(StoreEvent::SessionCreated(Session {
        id: session_id.clone(),
        prompt: prompt.to_owned(),
        created_at: chrono::Utc::now(),
        mode: GenerationMode::Site,
        artifacts: vec![],
        site: Some(site),
    }));
    tracing::info!(%session_id, pages = pages.len(), "site generation started");

    let mut home_content: Option<String> = None;
    for page in &pages {
        let reference = home_content.as_deref().map(|c| excerpt(c, HOME_EXCERPT_MAX_LEN));
        let outcome = run_page_job(
            &service, store, policy, &session_id, prompt, page, &pages, reference, options,
        )
        .await;
        if page.is_home {
            if outcome.status == JobStatus::Complete {
                home_content = Some(outcome.content);
            } else {
                // Remaining pages still generate, just without a style
                // reference to match.
                tracing::warn!(%session_id, "home page failed; later pages lose style reference");
            }
        }
    }

    store.flush().await;
    Ok(session_id)
}

/// Add one page to an existing site, using the finished home page as the
/// style reference. Already-complete pages are never touched.
pub(crate) async fn add_page(
    service: Arc<dyn CompletionService>,
    store: &StoreHandle,
    policy: &RetryPolicy,
    session_id: &str,
    name: &str,
    options: &GenerationOptions,
) -> Result<String> {
    let snapshot = store.snapshot();
    let session = snapshot
        .session(session_id)
        .ok_or_else(|| ForgeError::NotFound(format!("session {session_id}")))?;
    let site =
        session.site.as_ref().ok_or_else(|| {
            ForgeError::InvalidInput("session is not in site mode".to_owned())
        })?;

    let page = SitePage {
        id: Uuid::new_v4().to_string(),
        name: name.to_owned(),
        slug: slugify(name),
        content: String::new(),
        status: JobStatus::Pending,
        is_home: false,
    };
    let mut all_pages = site.pages.clone();
    all_pages.push(page.clone());

    let reference = site
        .home()
        .filter(|home| home.status == JobStatus::Complete)
        .map(|home| excerpt(&home.content, HOME_EXCERPT_MAX_LEN));

    let prompt = session.prompt.clone();
    store.send(StoreEvent::PageAdded { session_id: session_id.to_owned(), page: page.clone() });
    run_page_job(&service, store, policy, session_id, &prompt, &page, &all_pages, reference, options)
        .await;

    store.flush().await;
    Ok(page.id)
}

#[allow(clippy::too_many_arguments)]
async fn run_page_job(
    service: &Arc<dyn CompletionService>,
    store: &StoreHandle,
    policy: &RetryPolicy,
    session_id: &str,
    prompt: &str,
    page: &SitePage,
    all_pages: &[SitePage],
    home_excerpt: Option<String>,
    options: &GenerationOptions,
) -> crate::job::JobOutcome {
    let job = Job::new(
        JobTarget::Page { session_id: session_id.to_owned(), page_id: page.id.clone() },
        CompletionRequest::text(prompts::site_page_prompt(
            prompt,
            page,
            all_pages,
            home_excerpt.as_deref(),
            options,
        ))
        .with_image(options.reference_image.clone()),
    );
    job.run(service.as_ref(), store, policy).await
}

/// Truncate at a char boundary.
fn excerpt(content: &str, max_len: usize) -> String {
    if content.len() <= max_len {
        return content.to_owned();
    }
    let mut end = max_len;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    content[..end].to_owned()
}
