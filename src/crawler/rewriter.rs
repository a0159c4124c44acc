//! Resource URL rewriting for cached pages
//!
//! Images and scripts on a cached copy would otherwise resolve against the
//! proxy. Their `src` and `srcset` values are made absolute against the page's
//! origin:
//! - A value starting with `https` is left alone
//! - Anything else gets `https://{base}` prepended, with a `/` in between
//!   unless the value is empty or already starts with one

use lol_html::errors::RewritingError;
use lol_html::{element, rewrite_str, RewriteStrSettings};
use thiserror::Error;

/// Elements and attributes that are rewritten
const REWRITE_TARGETS: [(&str, &str); 3] = [
    ("img[src]", "src"),
    ("img[srcset]", "srcset"),
    ("script[src]", "src"),
];

/// The page could not be rewritten; callers keep the original body
#[derive(Debug, Error)]
#[error("Target page is not modified: {0}")]
pub struct RewriteError(#[from] RewritingError);

/// Absolute form of one attribute value, or `None` if it is already absolute
///
/// # Example
///
/// ```
/// use crawl_cache::crawler::absolutize;
///
/// assert_eq!(
///     absolutize("img/logo.png", "example.com").as_deref(),
///     Some("https://example.com/img/logo.png")
/// );
/// assert_eq!(absolutize("https://cdn.example.com/a.js", "example.com"), None);
/// ```
pub fn absolutize(value: &str, base: &str) -> Option<String> {
    if value.starts_with("https") {
        return None;
    }

    let mut absolute = format!("https://{}", base);
    if !value.is_empty() && !value.starts_with('/') {
        absolute.push('/');
    }
    absolute.push_str(value);
    Some(absolute)
}

/// Rewrites `img` and `script` resource URLs in `html` against `base`
///
/// `base` is the requested URL without scheme, e.g. `example.com/a`. Markup
/// the streaming parser finds ambiguous is rewritten on a best-effort basis.
pub fn rewrite_html(html: &str, base: &str) -> Result<String, RewriteError> {
    rewrite_html_with(html, base, false)
}

/// Like [`rewrite_html`], but with `strict` set, ambiguous markup fails the
/// whole page with a [`RewriteError`]
pub fn rewrite_html_with(html: &str, base: &str, strict: bool) -> Result<String, RewriteError> {
    let element_content_handlers = REWRITE_TARGETS
        .iter()
        .map(|&(selector, attr)| {
            element!(selector, move |el| {
                if let Some(value) = el.get_attribute(attr) {
                    if let Some(absolute) = absolutize(&value, base) {
                        el.set_attribute(attr, &absolute)?;
                    }
                }
                Ok(())
            })
        })
        .collect::<Vec<_>>();

    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers,
            strict,
            ..RewriteStrSettings::default()
        },
    )?;
    Ok(rewritten)
}
