use crate::Blob;

/// Inline-vs-attachment decision plus the MIME type to serve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    pub inline: bool,
    pub mime_type: String,
}

impl Disposition {
    /// `Content-Disposition` header value for `filename`.
    ///
    /// Non-ASCII names get an ASCII fallback in `filename` plus an RFC 5987
    /// `filename*` parameter.
    pub fn header_value(&self, filename: &str) -> String {
        let kind = if self.inline { "inline" } else { "attachment" };
        let fallback: String = filename
            .chars()
            .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
            .collect();
        let quoted = fallback.replace('\\', "\\\\").replace('"', "\\\"");

        if filename.is_ascii() && fallback == filename {
            format!("{}; filename=\"{}\"", kind, quoted)
        } else {
            format!(
                "{}; filename=\"{}\"; filename*=UTF-8''{}",
                kind,
                quoted,
                urlencoding::encode(filename)
            )
        }
    }
}

/// Decides disposition from a configured allow-list of browser-renderable types.
#[derive(Debug, Clone)]
pub struct ContentNegotiator {
    inline_types: Vec<String>,
}

impl ContentNegotiator {
    /// Patterns are exact types (`application/pdf`) or wildcards (`image/*`).
    pub fn new<I, S>(inline_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inline_types: inline_types
                .into_iter()
                .map(|t| t.into().trim().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn decide(&self, blob: &dyn Blob, inline_override: Option<bool>) -> Disposition {
        let mime_type = blob.mime_type().to_string();
        let inline = inline_override.unwrap_or_else(|| self.is_inline_type(&mime_type));
        Disposition { inline, mime_type }
    }

    pub fn is_inline_type(&self, mime_type: &str) -> bool {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let Some((top, _)) = essence.split_once('/') else {
            return false;
        };

        self.inline_types.iter().any(|pattern| match pattern.strip_suffix("/*") {
            Some(prefix) => prefix == top,
            None => *pattern == essence,
        })
    }
}
