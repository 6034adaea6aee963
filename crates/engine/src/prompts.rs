//! Prompt construction for every call the engine issues.

use pageforge_core::SitePage;

use crate::pipeline::GenerationOptions;

pub(crate) fn style_decision_prompt(user_prompt: &str, n: usize) -> String {
    format!(
        r#"Propose exactly {n} visually distinct design styles for this request.

Request: {user_prompt}

Each style must be a short human-readable label (2-4 words) describing a
distinct visual direction, e.g. "Warm Rustic" or "Modern Minimal".

Return JSON: {{"styles": ["...", "..."]}}"#
    )
}

pub(crate) fn variant_prompt(
    user_prompt: &str,
    style: &str,
    options: &GenerationOptions,
) -> String {
    let mut prompt = format!(
        r#"Generate a complete, self-contained HTML document for this request.

Request: {user_prompt}

Visual style: {style}. Commit fully to this direction; the other variants
cover different styles.

Output only the HTML document, starting with <!DOCTYPE html>."#
    );
    push_shared_context(&mut prompt, options);
    prompt
}

pub(crate) fn refine_prompt(current_content: &str, instruction: &str) -> String {
    format!(
        r#"Revise the HTML document below according to the instruction.
Keep everything not covered by the instruction unchanged.

Instruction: {instruction}

Current document:
{current_content}

Output only the full revised HTML document, starting with <!DOCTYPE html>."#
    )
}

pub(crate) fn site_page_prompt(
    user_prompt: &str,
    page: &SitePage,
    all_pages: &[SitePage],
    home_excerpt: Option<&str>,
    options: &GenerationOptions,
) -> String {
    let nav_list = all_pages
        .iter()
        .map(|p| format!("- {} (/{}.html)", p.name, p.slug))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        r#"Generate the "{page_name}" page of a multi-page site.

Site request: {user_prompt}

The site has these pages; link between them with the exact paths shown:
{nav_list}

Output only the HTML document, starting with <!DOCTYPE html>."#,
        page_name = page.name,
    );

    if let Some(excerpt) = home_excerpt {
        prompt.push_str(&format!(
            "\n\nMatch the visual style of the finished home page exactly \
             (colors, fonts, spacing, header/footer). Home page for reference:\n{excerpt}"
        ));
    }
    push_shared_context(&mut prompt, options);
    prompt
}

fn push_shared_context(prompt: &mut String, options: &GenerationOptions) {
    if let Some(kit) = &options.style_kit {
        if !kit.colors.is_empty() {
            prompt.push_str(&format!("\n\nBrand colors to use: {}.", kit.colors.join(", ")));
        }
        if !kit.fonts.is_empty() {
            prompt.push_str(&format!("\nBrand fonts to use: {}.", kit.fonts.join(", ")));
        }
    }
    if options.clone_mode {
        prompt.push_str(
            "\n\nClone mode: replicate the attached reference as closely as possible \
             instead of designing freely.",
        );
    } else if options.reference_image.is_some() {
        prompt.push_str("\n\nUse the attached image as loose visual inspiration.");
    }
}
