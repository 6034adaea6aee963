use serde::{Deserialize, Serialize};

use crate::JobStatus;

/// Multi-page generation unit. Exactly one page has `is_home = true`;
/// it is generated first and serves as the style reference for every
/// other page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub pages: Vec<SitePage>,
}

impl Site {
    /// Build a site skeleton from page names. The first name becomes the
    /// home page.
    #[must_use]
    pub fn from_page_names(names: &[String], mut next_id: impl FnMut() -> String) -> Self {
        let pages = names
            .iter()
            .enumerate()
            .map(|(i, name)| SitePage {
                id: next_id(),
                name: name.clone(),
                slug: slugify(name),
                content: String::new(),
                status: JobStatus::Pending,
                is_home: i == 0,
            })
            .collect();
        Self { pages }
    }

    #[must_use]
    pub fn home(&self) -> Option<&SitePage> {
        self.pages.iter().find(|p| p.is_home)
    }

    #[must_use]
    pub fn page(&self, id: &str) -> Option<&SitePage> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Whether every page has settled successfully.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.pages.is_empty() && self.pages.iter().all(|p| p.status == JobStatus::Complete)
    }
}

/// One page within a site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitePage {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub content: String,
    pub status: JobStatus,
    pub is_home: bool,
}

/// Lowercase URL-safe slug: alphanumerics kept, runs of anything else
/// collapsed to single hyphens, edges trimmed.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut prev_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("About Us"), "about-us");
        assert_eq!(slugify("  Contact!  "), "contact");
        assert_eq!(slugify("FAQ & Pricing"), "faq-pricing");
    }

    #[test]
    fn first_page_is_home() {
        let names = vec!["Home".to_owned(), "About".to_owned()];
        let mut n = 0;
        let site = Site::from_page_names(&names, || {
            n += 1;
            format!("page-{n}")
        });
        assert!(site.pages[0].is_home);
        assert!(!site.pages[1].is_home);
        assert_eq!(site.home().unwrap().name, "Home");
    }
}
