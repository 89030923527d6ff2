//! Header scanning: extract a candidate sending domain from raw message
//! headers with an ordered list of heuristics, stopping at the first match.

use std::sync::LazyLock;

use regex::Regex;

use crate::body::split_headers_body;
use crate::structs::ParsedHeaders;

/// `From: Display Name <local@domain>`: the domain sits after the last `@`
/// on the line, up to the closing angle bracket.
static FROM_ANGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^from:[^\r\n]*@([^>\s]+)>").unwrap());

/// Bare `From: local@domain`, no angle brackets.
static FROM_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^from:[^\r\n]*@([^>\s;,]+)").unwrap());

/// `DKIM-Signature:` header `d=` tag, terminated by `;` or whitespace.
static DKIM_D_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^dkim-signature:[^\r\n]*?[;\s]d=([^;\s]+)").unwrap());

/// Scans the message headers for a sending domain.
///
/// Strategies run in strict priority order and the scanner stops at the
/// first success: angle-bracketed `From:`, bare `From:`, then the
/// `DKIM-Signature:` `d=` tag. Folded header lines are joined before
/// matching so multi-line headers behave as single logical lines. A message
/// with no usable domain yields a `ParsedHeaders` with both fields absent;
/// this function never fails.
pub fn scan_headers(raw: &str) -> ParsedHeaders {
    let (header_section, _) = split_headers_body(raw);
    let headers = unfold(header_section);

    let strategies: [(&Regex, bool); 3] =
        [(&FROM_ANGLE, true), (&FROM_BARE, true), (&DKIM_D_TAG, false)];

    for (pattern, is_from) in strategies {
        if let Some(caps) = pattern.captures(&headers) {
            // Bare address lines can carry sentence punctuation after the
            // domain, e.g. `From: a@b.com.`
            let domain = caps[1]
                .trim()
                .trim_end_matches(&['.', ',', ';', ':'][..])
                .to_ascii_lowercase();
            if domain.is_empty() {
                continue;
            }
            tracing::debug!(%domain, from_header = is_from, "extracted sending domain");
            return if is_from {
                ParsedHeaders { from_domain: Some(domain), dkim_domain: None }
            } else {
                ParsedHeaders { from_domain: None, dkim_domain: Some(domain) }
            };
        }
    }

    tracing::debug!("no sending domain found in headers");
    ParsedHeaders::default()
}

/// Joins RFC 5322 folded continuation lines so each header occupies one
/// physical line.
fn unfold(headers: &str) -> String {
    static FOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n[ \t]+").unwrap());
    FOLD.replace_all(headers, " ").into_owned()
}
