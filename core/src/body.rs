//! Body extraction: isolate the textual body of an RFC 5322-style message,
//! walk MIME part boundaries, decode quoted-printable content, strip markup
//! and normalize the result for keyword matching.

use std::sync::LazyLock;

use regex::Regex;

use crate::structs::NormalizedBody;

static BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)boundary="?([^";\r\n]+)"?"#).unwrap());
static TEXT_PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)content-type:\s*text/plain").unwrap());
static TEXT_HTML: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)content-type:\s*text/html").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static HSPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Splits a raw message at the first blank-line sequence separating headers
/// from body. Returns the header section and, when a separator exists, the
/// body remainder. With no separator the whole message doubles as both.
pub(crate) fn split_headers_body(raw: &str) -> (&str, Option<&str>) {
    let crlf = raw.find("\r\n\r\n");
    let lf = raw.find("\n\n");
    match (crlf, lf) {
        (Some(c), Some(l)) if c <= l => (&raw[..c], Some(&raw[c + 4..])),
        (Some(c), None) => (&raw[..c], Some(&raw[c + 4..])),
        (_, Some(l)) => (&raw[..l], Some(&raw[l + 2..])),
        (None, None) => (raw, None),
    }
}

/// Extracts the normalized plaintext body of a raw message.
///
/// Follows a fixed pipeline: header/body split (degenerate whole-message
/// fallback), MIME part selection when a `boundary` parameter is declared,
/// best-effort HTML tag stripping for html-typed parts, quoted-printable
/// decoding, and final normalization (line endings, a minimal entity set,
/// horizontal whitespace collapse, lowercase). The result is deterministic:
/// the same message always yields an identical `NormalizedBody`.
pub fn extract_body(raw: &str) -> NormalizedBody {
    let (headers, body) = split_headers_body(raw);
    let header_separator_found = body.is_some();
    let body = body.unwrap_or(raw);

    let (part, is_html) = select_text_part(headers, body);
    let text = if is_html { TAG.replace_all(&part, " ").into_owned() } else { part };
    let text = decode_quoted_printable(&text);
    let text = normalize(&text);

    NormalizedBody { text, header_separator_found }
}

/// Picks the textual MIME part of the body.
///
/// When the headers declare a `boundary` parameter the body is split on
/// `--<boundary>` markers and parts are scanned in order: the first
/// `text/plain` part wins, then the first `text/html` part, then the first
/// part of any type as a last resort. Without a boundary the whole remainder
/// is one implicit part, html-typed when the top-level headers declare
/// `text/html`. The second element of the return value is true when the
/// chosen part is html-typed.
fn select_text_part(headers: &str, body: &str) -> (String, bool) {
    let Some(caps) = BOUNDARY.captures(headers) else {
        // Single-part message: honor a top-level html content type so its
        // tags get stripped like any other html part.
        return (body.to_string(), TEXT_HTML.is_match(headers));
    };
    let marker = format!("--{}", caps[1].trim());

    let mut first_part: Option<String> = None;
    let mut first_html: Option<String> = None;

    // Index 0 is the preamble before the first marker; skip it.
    for part in body.split(marker.as_str()).skip(1) {
        // The piece after the closing `--<boundary>--` marker is epilogue.
        if part.starts_with("--") {
            continue;
        }
        let (part_headers, content) = match split_headers_body(part) {
            (h, Some(c)) => (h, c),
            (_, None) => ("", part),
        };
        if TEXT_PLAIN.is_match(part_headers) {
            return (content.to_string(), false);
        }
        if first_html.is_none() && TEXT_HTML.is_match(part_headers) {
            first_html = Some(content.to_string());
        }
        if first_part.is_none() {
            first_part = Some(content.to_string());
        }
    }

    match (first_html, first_part) {
        (Some(html), _) => (html, true),
        (None, Some(any)) => (any, false),
        (None, None) => (body.to_string(), false),
    }
}

/// Decodes quoted-printable content.
///
/// Soft line breaks (`=` immediately before a line ending) are removed
/// entirely; `=XY` escapes with two hex digits become the corresponding
/// byte. Malformed escapes are left verbatim rather than treated as errors.
fn decode_quoted_printable(input: &str) -> String {
    let unfolded = input.replace("=\r\n", "").replace("=\n", "");
    let bytes = unfolded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'=' && i + 2 < bytes.len() {
            let hi = (bytes[i + 1] as char).to_digit(16);
            let lo = (bytes[i + 2] as char).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Final normalization: unified line endings, the minimal entity set the
/// verifier cares about, collapsed horizontal whitespace, lowercase.
fn normalize(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    // `&amp;` last, so `&amp;lt;` decodes to the literal `&lt;`.
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&");
    let text = HSPACE.replace_all(&text, " ");
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_single_part_message() {
        let raw = "From: a@b.com\r\nSubject: x\r\n\r\nHello World";
        let body = extract_body(raw);
        assert!(body.header_separator_found);
        assert_eq!(body.text, "hello world");
    }

    #[test]
    fn whole_message_fallback_without_separator() {
        let raw = "just some text without any header block";
        let body = extract_body(raw);
        assert!(!body.header_separator_found);
        assert_eq!(body.text, raw);
    }

    #[test]
    fn quoted_printable_round_trip() {
        let encoded = "the invoice total is =E2=82=AC100 =3D a lot";
        assert_eq!(
            decode_quoted_printable(encoded),
            "the invoice total is €100 = a lot"
        );
    }

    #[test]
    fn soft_line_breaks_are_removed() {
        assert_eq!(decode_quoted_printable("confi=\r\ndential"), "confidential");
        assert_eq!(decode_quoted_printable("confi=\ndential"), "confidential");
    }

    #[test]
    fn malformed_escapes_are_left_verbatim() {
        assert_eq!(decode_quoted_printable("50=ZZ off =4"), "50=ZZ off =4");
    }

    #[test]
    fn multipart_prefers_text_plain() {
        let raw = concat!(
            "Content-Type: multipart/alternative; boundary=\"XYZ\"\r\n",
            "\r\n",
            "--XYZ\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<b>HTML variant</b>\r\n",
            "--XYZ\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "Plain Variant\r\n",
            "--XYZ--\r\n",
        );
        let body = extract_body(raw);
        assert_eq!(body.text, "plain variant");
    }

    #[test]
    fn html_only_multipart_is_tag_stripped() {
        let raw = concat!(
            "Content-Type: multipart/alternative; boundary=XYZ\n",
            "\n",
            "--XYZ\n",
            "Content-Type: text/html; charset=utf-8\n",
            "\n",
            "<p>The <b>fraud</b> was &quot;confidential&quot;</p>\n",
            "--XYZ--\n",
        );
        let body = extract_body(raw);
        assert_eq!(body.text, "the fraud was \"confidential\"");
    }

    #[test]
    fn tag_stripping_tolerates_unbalanced_markup() {
        let raw = "Content-Type: text/html\n\n<div class=broken >text<";
        // The trailing `<` never closes; it stays put instead of erroring.
        let body = extract_body(raw);
        assert_eq!(body.text, "text<");
    }

    #[test]
    fn single_part_html_message_is_tag_stripped() {
        let raw = "Content-Type: text/html; charset=utf-8\n\n<b>fraud</b> inside";
        assert_eq!(extract_body(raw).text, "fraud inside");
    }

    #[test]
    fn multipart_without_text_parts_falls_back_to_the_first_part() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=\"XYZ\"\n",
            "\n",
            "--XYZ\n",
            "Content-Type: application/octet-stream\n",
            "\n",
            "Opaque Payload\n",
            "--XYZ\n",
            "Content-Type: application/json\n",
            "\n",
            "{\"k\": 1}\n",
            "--XYZ--\n",
        );
        let body = extract_body(raw);
        assert_eq!(body.text, "opaque payload");
    }

    #[test]
    fn declared_boundary_matching_nothing_falls_back_to_the_whole_body() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=\"nowhere\"\n",
            "\n",
            "Plain Fallback Text",
        );
        let body = extract_body(raw);
        assert_eq!(body.text, "plain fallback text");
    }

    #[test]
    fn entities_and_nbsp_are_decoded() {
        let raw = "Subject: x\n\nfish&nbsp;&amp;&nbsp;chips &lt;today&gt;";
        assert_eq!(extract_body(raw).text, "fish & chips <today>");
    }

    #[test]
    fn horizontal_whitespace_is_collapsed() {
        let raw = "Subject: x\n\nspaced\t\t  out    words";
        assert_eq!(extract_body(raw).text, "spaced out words");
    }

    #[test]
    fn extraction_is_idempotent() {
        let raw = concat!(
            "From: a@b.com\r\n",
            "Content-Type: multipart/mixed; boundary=\"b1\"\r\n",
            "\r\n",
            "--b1\r\n",
            "Content-Type: text/plain\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "The secret code is =41=42=43 and the rest follows he=\r\nre.\r\n",
            "--b1--\r\n",
        );
        let first = extract_body(raw);
        let second = extract_body(raw);
        assert_eq!(first, second);
        assert!(first.text.contains("the secret code is abc"));
        assert!(first.text.contains("here."));
    }

    #[test]
    fn no_boundary_markers_survive_extraction() {
        let raw = concat!(
            "Content-Type: multipart/alternative; boundary=ZZZ\n",
            "\n",
            "--ZZZ\n",
            "Content-Type: text/plain\n",
            "\n",
            "visible content\n",
            "--ZZZ--\n",
        );
        let body = extract_body(raw);
        assert!(!body.text.contains("zzz"));
        assert_eq!(body.text, "visible content");
    }
}
