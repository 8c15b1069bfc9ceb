use crate::{ByteRange, Disposition, Outcome};

/// Transport-neutral description of the response for a download attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub content_disposition: Option<String>,
    pub content_range: Option<String>,
    pub accept_ranges: bool,
}

impl ResponseHead {
    fn status_only(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            content_length: None,
            content_disposition: None,
            content_range: None,
            accept_ranges: false,
        }
    }

    /// 200 with the whole blob
    pub fn full(disposition: &Disposition, filename: &str, total_length: u64) -> Self {
        Self {
            status: 200,
            content_type: Some(disposition.mime_type.clone()),
            content_length: Some(total_length),
            content_disposition: Some(disposition.header_value(filename)),
            content_range: None,
            accept_ranges: true,
        }
    }

    /// 206 with `Content-Range: bytes {start}-{end}/{total}`
    pub fn partial(disposition: &Disposition, filename: &str, range: &ByteRange, total_length: u64) -> Self {
        Self {
            status: 206,
            content_type: Some(disposition.mime_type.clone()),
            content_length: Some(range.length()),
            content_disposition: Some(disposition.header_value(filename)),
            content_range: Some(range.content_range(total_length)),
            accept_ranges: true,
        }
    }

    /// 416 with `Content-Range: bytes */{total}`
    pub fn range_not_satisfiable(total_length: u64) -> Self {
        Self {
            content_range: Some(format!("bytes */{}", total_length)),
            accept_ranges: true,
            ..Self::status_only(416)
        }
    }

    pub fn not_found() -> Self {
        Self::status_only(404)
    }

    pub fn forbidden() -> Self {
        Self::status_only(403)
    }

    /// Head for a failed outcome; `None` for `IoError`, which aborts
    /// without a well-formed response.
    pub fn for_failure(outcome: Outcome, total_length: Option<u64>) -> Option<Self> {
        match outcome {
            Outcome::NotFound => Some(Self::not_found()),
            Outcome::Forbidden => Some(Self::forbidden()),
            Outcome::RangeNotSatisfiable => Some(Self::range_not_satisfiable(total_length.unwrap_or(0))),
            Outcome::Completed | Outcome::IoError => None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disposition() -> Disposition {
        Disposition {
            inline: true,
            mime_type: "image/png".into(),
        }
    }

    #[test]
    fn test_partial_head() {
        let range = ByteRange::new(200, 299).unwrap();
        let head = ResponseHead::partial(&disposition(), "a.png", &range, 1000);

        assert_eq!(head.status, 206);
        assert_eq!(head.content_length, Some(100));
        assert_eq!(head.content_range.as_deref(), Some("bytes 200-299/1000"));
        assert_eq!(head.content_disposition.as_deref(), Some("inline; filename=\"a.png\""));
        assert!(head.accept_ranges);
    }

    #[test]
    fn test_full_head() {
        let head = ResponseHead::full(&disposition(), "a.png", 1000);
        assert_eq!(head.status, 200);
        assert_eq!(head.content_length, Some(1000));
        assert_eq!(head.content_range, None);
        assert_eq!(head.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_failure_heads() {
        assert_eq!(ResponseHead::for_failure(Outcome::NotFound, None).unwrap().status, 404);
        assert_eq!(ResponseHead::for_failure(Outcome::Forbidden, Some(10)).unwrap().status, 403);

        let unsatisfiable = ResponseHead::for_failure(Outcome::RangeNotSatisfiable, Some(1000)).unwrap();
        assert_eq!(unsatisfiable.status, 416);
        assert_eq!(unsatisfiable.content_range.as_deref(), Some("bytes */1000"));

        assert!(ResponseHead::for_failure(Outcome::IoError, Some(1000)).is_none());
        assert!(ResponseHead::for_failure(Outcome::Completed, Some(1000)).is_none());
    }
}
