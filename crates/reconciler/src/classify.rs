//! Line grammars for extracting `(bucket, key)` pairs from log lines.
//!
//! Classification is pure: it borrows from the raw line bytes and never
//! fails. Lines that do not fit a grammar are simply unmatched, since input
//! logs are third-party and heterogeneous. Keys stay raw bytes, so two keys
//! that differ only in bytes that are not valid UTF-8 stay distinct.

use tracing::debug;

/// Marker preceding `bucket/key` in access-log request paths.
pub const GET_MARKER: &[u8] = b"/get/";

/// Names under the marker starting with this prefix are proxy-internal.
const INTERNAL_PREFIX: u8 = b'p';

/// Split on the first `/`, empty parts allowed.
fn split_first_slash(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let mut parts = line.splitn(2, |&b| b == b'/');
    Some((parts.next()?, parts.next()?))
}

/// Bytes following the first `/get/` marker, if any.
fn after_marker(line: &[u8]) -> Option<&[u8]> {
    let start = line
        .windows(GET_MARKER.len())
        .position(|window| window == GET_MARKER)?;
    line.get(start.checked_add(GET_MARKER.len())?..)
}

/// Split `bucket/key` on the first `/`.
///
/// Both parts must be non-empty. The key keeps everything after the first
/// `/` verbatim, including further slashes and trailing text.
#[must_use]
pub fn classify_slash(line: &[u8]) -> Option<(&[u8], &[u8])> {
    split_first_slash(line).filter(|(bucket, key)| !bucket.is_empty() && !key.is_empty())
}

/// Extract `bucket/key` following the single `/get/` marker of a request line.
///
/// Discarded when the marker is absent or occurs more than once, when the
/// segment after the marker starts with `p` (internal names), or when that
/// segment has no `/`. Either side of that `/` may be empty.
#[must_use]
pub fn classify_url_path(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let rest = after_marker(line)?;
    if after_marker(rest).is_some() {
        return None;
    }

    if rest.first() == Some(&INTERNAL_PREFIX) {
        debug!(name = %String::from_utf8_lossy(rest), "Discarding internal name");
        return None;
    }

    split_first_slash(rest)
}

/// Parse a size listing line: `bucket/key<whitespace>size`.
///
/// The size is the last whitespace-separated token and must be an unsigned
/// decimal; the remainder uses the slash grammar.
#[must_use]
pub fn classify_size_listing(line: &[u8]) -> Option<(&[u8], &[u8], u64)> {
    let mut fields = line.trim_ascii_end().rsplitn(2, u8::is_ascii_whitespace);
    let size = std::str::from_utf8(fields.next()?).ok()?.parse::<u64>().ok()?;
    let (bucket, key) = classify_slash(fields.next()?.trim_ascii_end())?;
    Some((bucket, key, size))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_slash_splits_on_first_separator() {
        assert_eq!(classify_slash(b"alpha/foo"), Some((&b"alpha"[..], &b"foo"[..])));
        assert_eq!(
            classify_slash(b"alpha/dir/sub/file.png"),
            Some((&b"alpha"[..], &b"dir/sub/file.png"[..]))
        );
    }

    #[test]
    fn test_slash_keeps_key_verbatim() {
        assert_eq!(classify_slash(b"alpha/ foo "), Some((&b"alpha"[..], &b" foo "[..])));
        assert_eq!(classify_slash(b"alpha/\xff"), Some((&b"alpha"[..], &b"\xff"[..])));
    }

    #[test]
    fn test_slash_rejects_missing_parts() {
        assert_eq!(classify_slash(b"alpha"), None);
        assert_eq!(classify_slash(b"alpha/"), None);
        assert_eq!(classify_slash(b"/foo"), None);
        assert_eq!(classify_slash(b""), None);
    }

    #[test]
    fn test_url_path_extracts_bucket_and_key() {
        assert_eq!(
            classify_url_path(b"http://host/get/alpha/myfile.png"),
            Some((&b"alpha"[..], &b"myfile.png"[..]))
        );
    }

    #[test]
    fn test_url_path_inside_access_log_line() {
        let line = br#"10.0.0.1 - - [12/Mar/2015:10:00:01] "GET /get/media/2015/cat.jpg HTTP/1.1" 200 512"#;
        assert_eq!(
            classify_url_path(line),
            Some((&b"media"[..], &br#"2015/cat.jpg HTTP/1.1" 200 512"#[..]))
        );
    }

    #[test]
    fn test_url_path_requires_marker() {
        assert_eq!(classify_url_path(b"http://host/upload/alpha/myfile.png"), None);
        assert_eq!(classify_url_path(b"alpha/myfile.png"), None);
    }

    #[test]
    fn test_url_path_discards_internal_names() {
        assert_eq!(classify_url_path(b"http://host/get/p123abc/somefile"), None);
        assert_eq!(classify_url_path(b"http://host/get/photos/somefile"), None);
    }

    #[test]
    fn test_url_path_rejects_repeated_marker() {
        assert_eq!(classify_url_path(b"/get/alpha/get/beta/file"), None);
        assert_eq!(classify_url_path(b"/get/alpha/x/get/y"), None);
    }

    #[test]
    fn test_url_path_requires_second_slash() {
        assert_eq!(classify_url_path(b"http://host/get/alpha"), None);
        assert_eq!(classify_url_path(b"http://host/get/"), None);
    }

    #[test]
    fn test_url_path_accepts_empty_parts() {
        assert_eq!(
            classify_url_path(b"http://host/get/alpha/"),
            Some((&b"alpha"[..], &b""[..]))
        );
        assert_eq!(
            classify_url_path(b"http://host/get//file"),
            Some((&b""[..], &b"file"[..]))
        );
    }

    #[test]
    fn test_url_path_keeps_invalid_utf8_keys_distinct() {
        let first = classify_url_path(b"/get/alpha/\xff");
        let second = classify_url_path(b"/get/alpha/\xfe");
        assert_eq!(first, Some((&b"alpha"[..], &b"\xff"[..])));
        assert_ne!(first, second);
    }

    #[test]
    fn test_size_listing() {
        assert_eq!(
            classify_size_listing(b"alpha/foo.png\t1024"),
            Some((&b"alpha"[..], &b"foo.png"[..], 1024))
        );
        assert_eq!(
            classify_size_listing(b"alpha/dir/foo.png   77  "),
            Some((&b"alpha"[..], &b"dir/foo.png"[..], 77))
        );
    }

    #[test]
    fn test_size_listing_rejects_bad_size() {
        assert_eq!(classify_size_listing(b"alpha/foo.png"), None);
        assert_eq!(classify_size_listing(b"alpha/foo.png -5"), None);
        assert_eq!(classify_size_listing(b"alpha/foo.png 1k"), None);
        assert_eq!(classify_size_listing(b"alpha 10"), None);
    }

    proptest! {
        #[test]
        fn prop_slash_roundtrips_bucket_and_key(
            bucket in "[a-z0-9_.-]{1,16}",
            key in "[ -~]{1,40}",
        ) {
            let line = format!("{bucket}/{key}");
            prop_assert_eq!(
                classify_slash(line.as_bytes()),
                Some((bucket.as_bytes(), key.as_bytes()))
            );
        }

        #[test]
        fn prop_url_path_without_marker_never_matches(line in "[ -~]{0,80}") {
            prop_assume!(!line.contains("/get/"));
            prop_assert_eq!(classify_url_path(line.as_bytes()), None);
        }

        #[test]
        fn prop_url_path_internal_prefix_never_matches(
            host in "[a-z]{1,10}",
            rest in "[a-z0-9/]{0,30}",
        ) {
            let line = format!("http://{host}/get/p{rest}");
            prop_assert_eq!(classify_url_path(line.as_bytes()), None);
        }
    }
}
