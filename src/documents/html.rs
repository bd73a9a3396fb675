//! Plain-text rendering of fetched web pages.

/// Elements dropped together with everything inside them.
const SKIPPED_ELEMENTS: &[&str] = &[
    "head", "script", "style", "noscript", "nav", "header", "footer",
];

/// Elements that start a new line in the text output.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "main", "blockquote", "pre", "table", "ul", "ol",
];

fn tag_name(tag_body: &str) -> &str {
    let body = tag_body.trim_start_matches('/');
    let end = body
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(body.len());
    &body[..end]
}

/// Visible text of `html`: tags removed, non-content elements skipped,
/// entities decoded, each line trimmed and blank lines dropped.
pub fn html_to_text(html: &str) -> String {
    // ASCII lowercasing keeps byte offsets identical to `html`.
    let lower = html.to_ascii_lowercase();
    let mut text = String::with_capacity(html.len() / 2);
    let mut i = 0;

    while i < html.len() {
        if lower.as_bytes()[i] != b'<' {
            let next_tag = lower[i..].find('<').map(|p| i + p).unwrap_or(html.len());
            text.push_str(&html[i..next_tag]);
            i = next_tag;
            continue;
        }

        if lower[i..].starts_with("<!--") {
            i = lower[i..]
                .find("-->")
                .map(|p| i + p + 3)
                .unwrap_or(html.len());
            continue;
        }

        let body_end = lower[i..].find('>').map(|p| i + p).unwrap_or(html.len());
        let tag_body = &lower[i + 1..body_end];
        let name = tag_name(tag_body);
        let is_closing = tag_body.starts_with('/');
        let self_closing = tag_body.ends_with('/');
        i = (body_end + 1).min(html.len());

        if !is_closing && !self_closing && SKIPPED_ELEMENTS.contains(&name) {
            let closing = format!("</{}", name);
            i = match lower[i..].find(&closing) {
                Some(p) => {
                    let after = i + p;
                    lower[after..]
                        .find('>')
                        .map(|q| after + q + 1)
                        .unwrap_or(html.len())
                }
                None => html.len(),
            };
            continue;
        }

        if BLOCK_ELEMENTS.contains(&name) {
            text.push('\n');
        }
    }

    decode_entities(&text)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decodes the named XML/HTML entities we meet in practice plus numeric
/// character references. Unknown entities are left as written.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&candidate[1..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &candidate[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_chrome_and_scripts_are_removed() {
        let html = r#"<html><head><title>Shop</title><style>p{}</style></head>
<body>
  <header><h1>Brand</h1></header>
  <nav><a href="/">Home</a></nav>
  <main><p>Returns are free.</p><script>track()</script><p>Ask  us anything.</p></main>
  <footer>(c) 2024</footer>
</body></html>"#;

        assert_eq!(html_to_text(html), "Returns are free.\nAsk  us anything.");
    }

    #[test]
    fn head_is_not_confused_with_header() {
        let html = "<body><header>top</header><p>kept</p></body>";
        assert_eq!(html_to_text(html), "kept");
    }

    #[test]
    fn comments_and_entities() {
        let html = "<p>Fish &amp; chips<!-- hidden --> &lt;3 &#233;t&#xE9;</p>";
        assert_eq!(html_to_text(html), "Fish & chips <3 été");
    }

    #[test]
    fn unknown_entities_are_kept_verbatim() {
        assert_eq!(decode_entities("AT&T &bogus; &amp"), "AT&T &bogus; &amp");
    }

    #[test]
    fn multibyte_text_survives() {
        assert_eq!(html_to_text("<div>日本語</div><div>テキスト</div>"), "日本語\nテキスト");
    }
}
