//! The `html` step: include markup, resolving `<img src>` to emitted assets.

use regex::Regex;

use crate::{Error, Result};

const IMG_SRC: &str = r#"(?i)(<img\b[^>]*?\ssrc\s*=\s*)(?:"([^"]*)"|'([^']*)')"#;

/// Rewrite every `<img src>` through `resolve`.
///
/// `resolve` returns `None` to leave a reference as written.
pub fn rewrite_image_sources<F>(html: &str, mut resolve: F) -> Result<String>
where
    F: FnMut(&str) -> Result<Option<String>>,
{
    let pattern = Regex::new(IMG_SRC).map_err(|e| Error::transform("html", "<img> pattern", e))?;

    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for caps in pattern.captures_iter(html) {
        let (Some(whole), Some(prefix)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let (src, quote) = match (caps.get(2), caps.get(3)) {
            (Some(src), _) => (src.as_str(), '"'),
            (None, Some(src)) => (src.as_str(), '\''),
            (None, None) => continue,
        };
        let Some(resolved) = resolve(src)? else {
            continue;
        };

        out.push_str(&html[last..whole.start()]);
        out.push_str(prefix.as_str());
        out.push(quote);
        out.push_str(&resolved);
        out.push(quote);
        last = whole.end();
    }
    out.push_str(&html[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_double_and_single_quoted_sources() {
        let html = r#"<p><img class="logo" src="./images/a.png"> <IMG alt='b' src='images/b.jpg'/></p>"#;
        let out = rewrite_image_sources(html, |src| {
            Ok(Some(format!("out/{}", src.trim_start_matches("./"))))
        })
        .unwrap();
        assert_eq!(
            out,
            r#"<p><img class="logo" src="out/images/a.png"> <IMG alt='b' src='out/images/b.jpg'/></p>"#
        );
    }

    #[test]
    fn unresolved_references_are_left_alone() {
        let html = r#"<img src="https://example.com/a.png"><img data-src="./x.png">"#;
        let mut calls = 0;
        let out = rewrite_image_sources(html, |_| {
            calls += 1;
            Ok(None)
        })
        .unwrap();
        assert_eq!(out, html);
        assert_eq!(calls, 1);
    }

    #[test]
    fn resolver_errors_propagate() {
        let result = rewrite_image_sources(r#"<img src="gone.png">"#, |src| {
            Err(Error::Resolution {
                specifier: src.to_string(),
                importer: "index.html".to_string(),
            })
        });
        assert!(result.is_err());
    }
}
