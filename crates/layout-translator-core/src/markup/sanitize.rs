//! Constrained rendering of model-generated HTML.
//!
//! Model output is untrusted. Only an allowlisted subset of tags, attributes
//! and inline CSS properties survives; everything else is unwrapped or
//! dropped. The renderer is total: any input (including a half-received
//! stream) produces balanced markup.

use once_cell::sync::Lazy;
use regex::Regex;

/// Stand-in for every image the model emits.
pub const IMAGE_PLACEHOLDER: &str = "<div style=\"background:#f8fafc; border: 1px dashed #cbd5e1; padding:1rem; text-align:center; margin: 1rem 0; color: #94a3b8; font-size: 0.8rem; border-radius: 6px;\">[Image/Figure]</div>";

#[allow(clippy::unwrap_used)]
static RE_IMG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap());

#[allow(clippy::unwrap_used)]
static RE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<(/?)([A-Za-z][A-Za-z0-9]*)((?:[^>"']|"[^"]*"|'[^']*')*?)(/?)>"#).unwrap()
});

#[allow(clippy::unwrap_used)]
static RE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .unwrap()
});

#[allow(clippy::unwrap_used)]
static RE_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(?:[A-Za-z][A-Za-z0-9]{1,31}|#[0-9]{1,7}|#[xX][0-9A-Fa-f]{1,6});").unwrap()
});

const ALLOWED_TAGS: &[&str] = &[
    "div", "span", "p", "br", "hr", "h1", "h2", "h3", "h4", "h5", "h6", "strong", "b", "em",
    "i", "u", "s", "sub", "sup", "small", "mark", "blockquote", "pre", "code", "ul", "ol", "li",
    "dl", "dt", "dd", "table", "thead", "tbody", "tfoot", "tr", "th", "td", "caption",
    "colgroup", "col", "section", "article", "header", "footer", "main", "aside", "figure",
    "figcaption",
];

const VOID_TAGS: &[&str] = &["br", "hr", "col"];

/// Dropped together with everything inside them.
const DROPPED_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template", "title", "head",
    "svg", "math", "textarea", "select", "button", "canvas", "video", "audio",
];

const ALLOWED_ATTRS: &[&str] = &[
    "style", "title", "dir", "lang", "align", "valign", "colspan", "rowspan", "span", "width",
    "border", "cellpadding", "cellspacing",
];

const ALLOWED_CSS: &[&str] = &[
    "color", "background", "background-color", "border", "border-top", "border-right",
    "border-bottom", "border-left", "border-color", "border-style", "border-width",
    "border-radius", "border-collapse", "border-spacing", "padding", "padding-top",
    "padding-right", "padding-bottom", "padding-left", "margin", "margin-top", "margin-right",
    "margin-bottom", "margin-left", "text-align", "text-decoration", "text-transform",
    "text-indent", "vertical-align", "font", "font-family", "font-size", "font-weight",
    "font-style", "font-variant", "line-height", "letter-spacing", "word-spacing",
    "white-space", "width", "max-width", "min-width", "height", "min-height", "display",
    "grid-template-columns", "grid-template-rows", "grid-column", "grid-row", "gap",
    "column-gap", "row-gap", "columns", "column-count", "column-rule", "flex",
    "flex-direction", "flex-wrap", "justify-content", "align-items", "align-self", "float",
    "clear", "list-style", "list-style-type", "opacity", "direction", "word-break",
    "overflow-wrap", "table-layout", "box-sizing",
];

const FORBIDDEN_CSS_VALUES: &[&str] = &["url(", "expression", "javascript:", "@import", "\\", "<"];

/// Replace every `<img>` element, whatever its attributes, with the placeholder block.
pub fn replace_images(html: &str) -> String {
    RE_IMG.replace_all(html, IMAGE_PLACEHOLDER).into_owned()
}

/// Render untrusted HTML restricted to the vetted subset.
pub fn render_constrained(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut open: Vec<&'static str> = Vec::new();
    let mut i = 0;

    while i < html.len() {
        let rest = &html[i..];
        let Some(lt) = rest.find('<') else {
            push_text(&mut out, rest);
            break;
        };
        push_text(&mut out, &rest[..lt]);
        i += lt;
        let rest = &html[i..];

        // Comments, doctypes and processing instructions
        if rest.starts_with("<!--") {
            match rest.find("-->") {
                Some(end) => i += end + 3,
                None => break,
            }
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            match rest.find('>') {
                Some(end) => i += end + 1,
                None => break,
            }
            continue;
        }

        let Some(caps) = RE_TAG.captures(rest) else {
            if is_incomplete_tag(rest) {
                // Tail of a stream that stopped mid-tag
                break;
            }
            out.push_str("&lt;");
            i += 1;
            continue;
        };

        let tag_len = caps.get(0).map_or(1, |m| m.end());
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        let attrs = caps.get(3).map_or("", |m| m.as_str());
        let self_closing = !caps[4].is_empty();
        i += tag_len;

        if DROPPED_WITH_CONTENT.contains(&name.as_str()) {
            if !closing && !self_closing {
                match find_close_tag(&html[i..], &name) {
                    Some(skip) => i += skip,
                    None => break,
                }
            }
            continue;
        }

        let Some(tag) = ALLOWED_TAGS.iter().copied().find(|t| *t == name) else {
            // Unknown tags are unwrapped; their content stays
            continue;
        };

        if closing {
            if let Some(pos) = open.iter().rposition(|t| *t == tag) {
                for inner in open.drain(pos..).rev() {
                    push_close(&mut out, inner);
                }
            }
            continue;
        }

        out.push('<');
        out.push_str(tag);
        push_attrs(&mut out, attrs);
        out.push('>');

        if VOID_TAGS.contains(&tag) {
            continue;
        }
        if self_closing {
            push_close(&mut out, tag);
        } else {
            open.push(tag);
        }
    }

    for tag in open.into_iter().rev() {
        push_close(&mut out, tag);
    }
    out
}

/// Image replacement followed by constrained rendering.
///
/// The output never contains an `<img` element.
pub fn render_translation(html: &str) -> String {
    render_constrained(&replace_images(html))
}

fn is_incomplete_tag(rest: &str) -> bool {
    let mut chars = rest.chars().skip(1);
    let starts_like_tag = match chars.next() {
        None => true,
        Some('/') => chars.next().is_none_or(|c| c.is_ascii_alphabetic()),
        Some(c) => c.is_ascii_alphabetic(),
    };
    starts_like_tag && !rest.contains('>')
}

/// Byte offset just past `</name ...>`, if present.
fn find_close_tag(rest: &str, name: &str) -> Option<usize> {
    let lower = rest.to_ascii_lowercase();
    let needle = format!("</{name}");
    let start = lower.find(&needle)?;
    let end = lower[start..].find('>')?;
    Some(start + end + 1)
}

fn push_close(out: &mut String, tag: &str) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn push_text(out: &mut String, text: &str) {
    for (idx, ch) in text.char_indices() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' if !RE_ENTITY.is_match(&text[idx..]) => out.push_str("&amp;"),
            _ => out.push(ch),
        }
    }
}

fn push_attrs(out: &mut String, attrs: &str) {
    for caps in RE_ATTR.captures_iter(attrs) {
        let name = caps[1].to_ascii_lowercase();
        if !ALLOWED_ATTRS.contains(&name.as_str()) {
            continue;
        }
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());

        let value = match name.as_str() {
            "style" => filter_style(value),
            "colspan" | "rowspan" | "span" | "border" | "cellpadding" | "cellspacing" => {
                value.trim().parse::<u16>().map(|n| n.to_string()).unwrap_or_default()
            }
            _ => value.to_string(),
        };
        if value.is_empty() {
            continue;
        }

        out.push(' ');
        out.push_str(&name);
        out.push_str("=\"");
        push_attr_value(out, &value);
        out.push('"');
    }
}

fn push_attr_value(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

/// Keep only allowlisted CSS declarations with inert values.
fn filter_style(style: &str) -> String {
    let declarations: Vec<String> = style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim();
            if value.is_empty() || !ALLOWED_CSS.contains(&prop.as_str()) {
                return None;
            }
            let lower = value.to_ascii_lowercase();
            if FORBIDDEN_CSS_VALUES.iter().any(|bad| lower.contains(bad)) {
                return None;
            }
            Some(format!("{prop}: {value}"))
        })
        .collect();
    declarations.join("; ")
}
