//! Point-to-point protocol with the sandboxed preview frame.
//!
//! A closed tagged union of message kinds, validated at the boundary
//! before anything trusts it. The engine only routes messages to the
//! owning artifact or page by id; it never interprets rendered content.

use std::sync::OnceLock;

use pageforge_core::{ForgeError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FrameMessage {
    /// Outbound: hot-swap one embedded image.
    #[serde(rename = "UPDATE_IMAGE")]
    UpdateImage { img_id: String, src: String },
    /// Inbound: the user clicked an image inside rendered content.
    #[serde(rename = "IMAGE_CLICK")]
    ImageClick { artifact_id: String, img_id: String },
    /// Inbound: rendered content requested in-site navigation.
    #[serde(rename = "SITE_NAVIGATE")]
    SiteNavigate { page_id: String },
}

/// What the engine resolved an inbound message to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameAction {
    ImageSelected { artifact_id: String, img_id: String },
    Navigate { page_id: String },
}

/// Validate raw frame JSON into a known message kind.
pub fn decode_frame_message(raw: &str) -> Result<FrameMessage> {
    serde_json::from_str(raw)
        .map_err(|e| ForgeError::Frame(format!("unrecognized frame message: {e}")))
}

/// Replace the `src` of the image tag carrying the given id.
///
/// Returns `None` when no image with that id exists in the content.
pub(crate) fn replace_image_src(content: &str, img_id: &str, src: &str) -> Option<String> {
    static IMG_TAG: OnceLock<Regex> = OnceLock::new();
    let tag_re = IMG_TAG.get_or_init(|| {
        Regex::new(r"<img\b[^>]*>").unwrap_or_else(|e| panic!("invalid img regex: {e}"))
    });
    let id_re = Regex::new(&format!(r#"\bid\s*=\s*["']{}["']"#, regex::escape(img_id)))
        .unwrap_or_else(|e| panic!("invalid id regex: {e}"));
    static SRC_ATTR: OnceLock<Regex> = OnceLock::new();
    let src_re = SRC_ATTR.get_or_init(|| {
        Regex::new(r#"\bsrc\s*=\s*("[^"]*"|'[^']*')"#)
            .unwrap_or_else(|e| panic!("invalid src regex: {e}"))
    });

    for m in tag_re.find_iter(content) {
        let tag = m.as_str();
        if !id_re.is_match(tag) {
            continue;
        }
        let new_tag = if src_re.is_match(tag) {
            src_re.replace(tag, format!(r#"src="{src}""#).as_str()).into_owned()
        } else {
            // No src attribute yet: insert one before the closing bracket.
            let insert_at = tag.len() - if tag.ends_with("/>") { 2 } else { 1 };
            format!("{} src=\"{src}\"{}", &tag[..insert_at].trim_end(), &tag[insert_at..])
        };
        let mut updated = String::with_capacity(content.len() + src.len());
        updated.push_str(&content[..m.start()]);
        updated.push_str(&new_tag);
        updated.push_str(&content[m.end()..]);
        return Some(updated);
    }
    None
}
