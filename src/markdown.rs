//! Markdown rendering of OCR responses.
//!
//! Everything here is a pure `&OcrResponse → String` transformation; file
//! writing lives in [`crate::output`]. Two shapes are produced:
//!
//! * **Per page**: a page's Markdown exactly as the API returned it, with
//!   image placeholders optionally inlined.
//! * **Single document**: a `# title`, an optional metadata block, then
//!   every page under `## Page N` in ascending index order, joined by the
//!   configured [`PageSeparator`](crate::config::PageSeparator).

use crate::config::MarkdownOptions;
use crate::response::{DocumentMetadata, OcrImage, OcrPage, OcrResponse};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::{NoExpand, Regex};
use tracing::debug;

/// Title used when neither metadata nor a file name provides one.
pub const DEFAULT_TITLE: &str = "Document";

/// Pick the document title.
///
/// Order: metadata title, then `fallback_stem` (when `title_from_filename`),
/// then [`DEFAULT_TITLE`].
pub fn resolve_title(
    metadata: Option<&DocumentMetadata>,
    fallback_stem: Option<&str>,
    title_from_filename: bool,
) -> String {
    if let Some(t) = metadata.and_then(DocumentMetadata::title) {
        return t.to_string();
    }
    if title_from_filename {
        if let Some(stem) = fallback_stem.filter(|s| !s.is_empty()) {
            return stem.to_string();
        }
    }
    DEFAULT_TITLE.to_string()
}

/// Content of a single page, with images inlined when requested.
pub fn render_page(page: &OcrPage, options: &MarkdownOptions) -> String {
    if options.include_images {
        inline_images(&page.markdown, &page.images)
    } else {
        page.markdown.clone()
    }
}

/// Concatenate every page into one document under `title`.
pub fn render_document(response: &OcrResponse, title: &str, options: &MarkdownOptions) -> String {
    let mut out = format!("# {}\n\n", title);

    if let Some(ref meta) = response.metadata {
        out.push_str(&format_metadata_block(meta));
    }

    for (i, page) in response.pages_in_order().into_iter().enumerate() {
        let page_num = page.index + 1;
        if i > 0 {
            out.push_str(&options.page_separator.render(page_num));
        }
        out.push_str(&format!("## Page {}\n\n", page_num));
        out.push_str(&render_page(page, options));
    }

    // Page content is kept verbatim; only the document's tail is normalised.
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out.push('\n');
    out
}

/// `## Document Metadata` section; empty unless author or creation date is known.
fn format_metadata_block(meta: &DocumentMetadata) -> String {
    if meta.author().is_none() && meta.creation_date().is_none() {
        return String::new();
    }

    let mut block = String::from("## Document Metadata\n\n");
    if let Some(a) = meta.author() {
        block.push_str(&format!("**Author:** {}\n\n", a));
    }
    if let Some(d) = meta.creation_date() {
        block.push_str(&format!("**Creation Date:** {}\n\n", d));
    }
    if let Some(n) = meta.page_count.filter(|&n| n > 0) {
        block.push_str(&format!("**Page Count:** {}\n\n", n));
    }
    block
}

// ── Image inlining ───────────────────────────────────────────────────────

/// Replace `![id](id)` placeholders with base64 data URIs.
///
/// Only images that carry a payload are substituted. Placeholders whose id
/// has no matching image (or an image without data) are left as they are.
pub fn inline_images(content: &str, images: &[OcrImage]) -> String {
    let mut out = content.to_string();

    for img in images {
        let Some(payload) = img.image_base64.as_deref().filter(|p| !p.is_empty()) else {
            continue;
        };
        let escaped = regex::escape(&img.id);
        let pattern = format!(r"!\[{escaped}\]\({escaped}\)");
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                debug!("Skipping image {}: {}", img.id, e);
                continue;
            }
        };
        let replacement = format!("![{}]({})", img.id, data_uri(&img.id, payload));
        out = re.replace_all(&out, NoExpand(&replacement)).into_owned();
    }

    out
}

/// Wrap a payload as a data URI unless it already is one.
pub fn data_uri(id: &str, payload: &str) -> String {
    if payload.starts_with("data:") {
        payload.to_string()
    } else {
        format!("data:{};base64,{}", guess_mime(id, payload), payload)
    }
}

/// Infer a MIME type from the id's extension, then from magic bytes.
fn guess_mime(id: &str, payload: &str) -> &'static str {
    let ext = id.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => return "image/jpeg",
        Some("png") => return "image/png",
        Some("gif") => return "image/gif",
        Some("webp") => return "image/webp",
        _ => {}
    }

    // 16 base64 chars decode to 12 bytes, enough for every signature below.
    let head: String = payload.chars().take(16).collect();
    match STANDARD.decode(head.as_bytes()) {
        Ok(bytes) if bytes.starts_with(&[0x89, b'P', b'N', b'G']) => "image/png",
        Ok(bytes) if bytes.starts_with(b"GIF8") => "image/gif",
        Ok(bytes) if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" => {
            "image/webp"
        }
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSeparator;

    fn page(index: usize, md: &str) -> OcrPage {
        OcrPage {
            index,
            markdown: md.to_string(),
            ..Default::default()
        }
    }

    fn image(id: &str, payload: Option<&str>) -> OcrImage {
        OcrImage {
            id: id.to_string(),
            image_base64: payload.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn title_prefers_metadata() {
        let meta = DocumentMetadata {
            title: Some("Annual Report".into()),
            ..Default::default()
        };
        assert_eq!(resolve_title(Some(&meta), Some("file"), true), "Annual Report");
        assert_eq!(resolve_title(None, Some("file"), true), "file");
        assert_eq!(resolve_title(None, Some("file"), false), "Document");
        assert_eq!(resolve_title(None, None, true), "Document");
    }

    #[test]
    fn document_orders_pages_by_index() {
        let resp = OcrResponse {
            pages: vec![page(2, "third"), page(0, "first"), page(1, "second")],
            ..Default::default()
        };
        let md = render_document(&resp, "T", &MarkdownOptions::default());
        let a = md.find("first").unwrap();
        let b = md.find("second").unwrap();
        let c = md.find("third").unwrap();
        assert!(a < b && b < c, "got: {md}");
        assert!(md.starts_with("# T\n\n## Page 1\n\nfirst"));
        assert_eq!(md.matches("\n\n---\n\n").count(), 2);
        assert!(md.ends_with("third\n"));
    }

    #[test]
    fn document_without_page_breaks() {
        let resp = OcrResponse {
            pages: vec![page(0, "a"), page(1, "b")],
            ..Default::default()
        };
        let opts = MarkdownOptions {
            page_separator: PageSeparator::None,
            ..Default::default()
        };
        let md = render_document(&resp, "T", &opts);
        assert_eq!(md, "# T\n\n## Page 1\n\na\n\n## Page 2\n\nb\n");
    }

    #[test]
    fn document_keeps_trailing_whitespace_inside_pages() {
        let resp = OcrResponse {
            pages: vec![
                page(0, "code:\n\n    indented\n    "),
                page(1, "hard break  "),
                page(2, "last\n\n\n"),
            ],
            ..Default::default()
        };
        let md = render_document(&resp, "T", &MarkdownOptions::default());
        assert_eq!(
            md,
            "# T\n\n## Page 1\n\ncode:\n\n    indented\n    \n\n---\n\n\
             ## Page 2\n\nhard break  \n\n---\n\n\
             ## Page 3\n\nlast\n"
        );
    }

    #[test]
    fn metadata_block_rendered_when_author_present() {
        let resp = OcrResponse {
            pages: vec![page(0, "body")],
            metadata: Some(DocumentMetadata {
                author: Some("Ada".into()),
                creation_date: Some("2024-01-01".into()),
                page_count: Some(1),
                ..Default::default()
            }),
            ..Default::default()
        };
        let md = render_document(&resp, "T", &MarkdownOptions::default());
        assert!(md.contains("## Document Metadata"));
        assert!(md.contains("**Author:** Ada"));
        assert!(md.contains("**Creation Date:** 2024-01-01"));
        assert!(md.contains("**Page Count:** 1"));
    }

    #[test]
    fn metadata_block_skipped_with_only_page_count() {
        let meta = DocumentMetadata {
            page_count: Some(3),
            ..Default::default()
        };
        assert_eq!(format_metadata_block(&meta), "");
    }

    #[test]
    fn inline_replaces_known_and_keeps_unknown() {
        let content = "![img-0.jpeg](img-0.jpeg)\ntext\n![img-1.jpeg](img-1.jpeg)\n![img-0.jpeg](img-0.jpeg)";
        let images = vec![image("img-0.jpeg", Some("QUJD"))];
        let out = inline_images(content, &images);
        assert_eq!(
            out.matches("![img-0.jpeg](data:image/jpeg;base64,QUJD)").count(),
            2
        );
        assert!(out.contains("![img-1.jpeg](img-1.jpeg)"));
    }

    #[test]
    fn inline_keeps_existing_data_uri() {
        let images = vec![image("x.png", Some("data:image/png;base64,AAAA"))];
        let out = inline_images("![x.png](x.png)", &images);
        assert_eq!(out, "![x.png](data:image/png;base64,AAAA)");
    }

    #[test]
    fn inline_skips_images_without_payload() {
        let images = vec![image("img-0.jpeg", None), image("img-1.jpeg", Some(""))];
        let content = "![img-0.jpeg](img-0.jpeg) ![img-1.jpeg](img-1.jpeg)";
        assert_eq!(inline_images(content, &images), content);
    }

    #[test]
    fn inline_escapes_regex_metacharacters() {
        let images = vec![image("fig(1)+.png", Some("AAAA"))];
        let out = inline_images("![fig(1)+.png](fig(1)+.png) ![fig1.png](fig1.png)", &images);
        assert!(out.starts_with("![fig(1)+.png](data:image/png;base64,AAAA)"));
        assert!(out.ends_with("![fig1.png](fig1.png)"));
    }

    #[test]
    fn render_page_respects_include_images() {
        let p = OcrPage {
            index: 0,
            markdown: "![a.jpeg](a.jpeg)".into(),
            images: vec![image("a.jpeg", Some("QUJD"))],
            dimensions: None,
        };
        let off = MarkdownOptions::default();
        assert_eq!(render_page(&p, &off), "![a.jpeg](a.jpeg)");
        let on = MarkdownOptions {
            include_images: true,
            ..Default::default()
        };
        assert!(render_page(&p, &on).contains("base64,QUJD"));
    }

    #[test]
    fn mime_sniffed_from_payload() {
        let png = STANDARD.encode([0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0]);
        assert!(data_uri("img-0", &png).starts_with("data:image/png;base64,"));
        let gif = STANDARD.encode(b"GIF89a\0\0\0\0\0\0");
        assert!(data_uri("img-0", &gif).starts_with("data:image/gif;base64,"));
        assert!(data_uri("img-0", "garbage!").starts_with("data:image/jpeg;base64,"));
    }
}
