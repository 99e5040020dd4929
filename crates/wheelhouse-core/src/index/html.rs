//! Page rendering. Pure functions of the grouped index, so identical input
//! always renders identical bytes.

use super::{IndexEntry, IndexOptions, PackageIndex};
use std::fmt::Write;
use wheelhouse_schema::PackageName;

/// Escape text for use in element content and double-quoted attributes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Link target for an artifact: `{base_url}/{filename}`, or the bare
/// filename when no base URL is configured.
pub fn artifact_href(base_url: Option<&str>, filename: &str) -> String {
    match base_url {
        Some(base) => format!("{}/{filename}", base.trim_end_matches('/')),
        None => filename.to_string(),
    }
}

/// The per-package listing page.
pub fn render_package_page(
    name: &PackageName,
    entries: &[IndexEntry],
    base_url: Option<&str>,
) -> String {
    let name = escape(name.as_str());
    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    page.push_str("<meta name=\"pypi:repository-version\" content=\"1.0\">\n");
    let _ = writeln!(page, "<title>Links for {name}</title>");
    page.push_str("</head>\n<body>\n");
    let _ = writeln!(page, "<h1>Links for {name}</h1>");

    for entry in entries {
        let href = escape(&artifact_href(base_url, &entry.filename));
        let _ = write!(page, "<a href=\"{href}\"");
        if let Some(digest) = &entry.metadata_digest {
            let integrity = digest.integrity();
            let _ = write!(
                page,
                " data-dist-info-metadata=\"{integrity}\" data-core-metadata=\"{integrity}\""
            );
        }
        let _ = writeln!(page, ">{}</a><br>", escape(&entry.filename));
    }

    page.push_str("</body>\n</html>\n");
    page
}

/// The human-readable landing page at the namespace root.
pub fn render_landing_page(index: &PackageIndex, options: &IndexOptions) -> String {
    let title = escape(&options.title);
    let index_url = options
        .index_url
        .as_deref()
        .map_or_else(|| "&lt;index-url&gt;".to_string(), escape);

    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(page, "<title>{title}</title>");
    page.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n</head>\n",
    );
    page.push_str("<body>\n<main>\n");
    let _ = writeln!(page, "<h1>{title}</h1>");
    page.push_str(
        "<p>This is a <strong>PEP 503 \"simple\" Python package index</strong> for use with <code>pip</code>.</p>\n<hr>\n",
    );

    page.push_str("<p>To install a package from this index:</p>\n<pre><code>pip install \\\n");
    page.push_str("  --disable-pip-version-check \\\n");
    for tag in index.platform_tags().iter().filter(|t| t.as_str() != "any") {
        let _ = writeln!(page, "  --platform={} \\", escape(tag));
    }
    page.push_str("  --only-binary=:all: \\\n");
    let _ = writeln!(page, "  --extra-index-url {index_url} \\");
    page.push_str("  --target . &lt;package&gt;\n</code></pre>\n");

    if !index.platform_tags().is_empty() {
        page.push_str("<p>Platform tags:</p>\n<ul>\n");
        for tag in index.platform_tags() {
            let _ = writeln!(page, "<li><code>{}</code></li>", escape(tag));
        }
        page.push_str("</ul>\n");
    }

    page.push_str("<p>Available packages:</p>\n<ul>\n");
    for name in index.package_names() {
        let name = escape(name.as_str());
        let _ = writeln!(page, "<li><a href=\"{name}/\">{name}</a></li>");
    }
    page.push_str("</ul>\n");

    let _ = writeln!(
        page,
        "<footer>\n<p>{} packages · {} files</p>\n</footer>",
        index.package_count(),
        index.artifact_count()
    );
    page.push_str("</main>\n</body>\n</html>\n");
    page
}
