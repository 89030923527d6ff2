//! Verification coordinator: the strict gate that decides whether a claim
//! attempt is plausible before any proof is generated or funds move.

use serde::{Deserialize, Serialize};

use crate::body::extract_body;
use crate::headers::scan_headers;
use crate::keywords::match_keywords;
use crate::structs::MatchResult;

/// A recoverable condition discovered during verification. These are verdict
/// diagnostics, not fatal errors: the coordinator always returns a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum VerificationFailure {
    #[error("no usable sending domain found in headers")]
    DomainNotFound,
    #[error("extracted domain {extracted} does not match required domain {required}")]
    DomainMismatch { extracted: String, required: String },
    #[error("required keywords missing from body: {0:?}")]
    KeywordsMissing(Vec<String>),
    #[error("no header/body boundary found and the body is essentially empty")]
    MalformedEmail,
}

/// The structured pass/fail result of running the verifier against one email
/// and one bounty's requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    pub domain_matches: bool,
    pub extracted_domain: Option<String>,
    pub match_result: MatchResult,
    pub failures: Vec<VerificationFailure>,
}

impl VerificationVerdict {
    /// Overall success: the domain matched and no required keyword is
    /// missing. `MalformedEmail` is advisory and does not by itself fail a
    /// verdict whose domain and keywords check out.
    pub fn passed(&self) -> bool {
        self.domain_matches && self.match_result.missing.is_empty()
    }
}

/// Runs the full pre-submission check: header scan, body extraction, keyword
/// match, domain comparison.
///
/// Domain comparison is case-insensitive exact equality; subdomains never
/// match (`mail.bigbank.com` does not satisfy `bigbank.com`). An empty
/// keyword requirement yields an empty match result and does not affect
/// pass/fail. Malformed input never makes this function fail: absent or
/// empty states represent the failure causes.
pub fn verify(raw: &str, required_domain: &str, required_keywords: &[String]) -> VerificationVerdict {
    let headers = scan_headers(raw);
    let body = extract_body(raw);
    let match_result = match_keywords(&body, required_keywords);

    let extracted_domain = headers.domain().map(str::to_string);
    let required = required_domain.trim().to_lowercase();
    let domain_matches = extracted_domain.as_deref() == Some(required.as_str());

    let mut failures = Vec::new();
    match &extracted_domain {
        None => failures.push(VerificationFailure::DomainNotFound),
        Some(extracted) if !domain_matches => failures.push(VerificationFailure::DomainMismatch {
            extracted: extracted.clone(),
            required,
        }),
        Some(_) => {}
    }
    if !match_result.missing.is_empty() {
        failures.push(VerificationFailure::KeywordsMissing(match_result.missing.clone()));
    }
    if !body.header_separator_found && body.text.trim().is_empty() {
        failures.push(VerificationFailure::MalformedEmail);
    }

    tracing::debug!(
        domain_matches,
        extracted = extracted_domain.as_deref().unwrap_or("<none>"),
        found = match_result.found.len(),
        missing = match_result.missing.len(),
        "verification verdict computed"
    );

    VerificationVerdict { domain_matches, extracted_domain, match_result, failures }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn matching_domain_without_keywords_passes() {
        let verdict = verify("From: a@b.com\n\nhello", "b.com", &[]);
        assert!(verdict.passed());
        assert!(verdict.domain_matches);
        assert_eq!(verdict.extracted_domain.as_deref(), Some("b.com"));
        assert_eq!(verdict.match_result, MatchResult::default());
        assert!(verdict.failures.is_empty());
    }

    #[test]
    fn domain_mismatch_fails_regardless_of_keywords() {
        let verdict = verify("From: a@b.com\n\nfraud everywhere", "c.com", &keywords(&["fraud"]));
        assert!(!verdict.passed());
        assert!(!verdict.domain_matches);
        assert_eq!(verdict.match_result.found, vec!["fraud"]);
        assert!(verdict.failures.contains(&VerificationFailure::DomainMismatch {
            extracted: "b.com".into(),
            required: "c.com".into(),
        }));
    }

    #[test]
    fn domain_comparison_is_case_insensitive() {
        let verdict = verify("From: a@BigBank.COM\n\nx", "BIGBANK.com", &[]);
        assert!(verdict.passed());
    }

    #[test]
    fn subdomains_never_match() {
        let verdict = verify("From: a@mail.bigbank.com\n\nx", "bigbank.com", &[]);
        assert!(!verdict.passed());
    }

    #[test]
    fn missing_keywords_are_reported_verbatim() {
        let verdict = verify(
            "From: a@b.com\n\nthe fraud was confidential",
            "b.com",
            &keywords(&["fraud", "secret"]),
        );
        assert!(!verdict.passed());
        assert_eq!(verdict.match_result.found, vec!["fraud"]);
        assert_eq!(verdict.match_result.missing, vec!["secret"]);
        assert!(verdict
            .failures
            .contains(&VerificationFailure::KeywordsMissing(vec!["secret".into()])));
    }

    #[test]
    fn absent_domain_yields_domain_not_found() {
        let verdict = verify("Subject: nothing\n\nbody text", "b.com", &[]);
        assert!(!verdict.passed());
        assert_eq!(verdict.extracted_domain, None);
        assert!(verdict.failures.contains(&VerificationFailure::DomainNotFound));
    }

    #[test]
    fn empty_message_is_flagged_malformed() {
        let verdict = verify("", "b.com", &[]);
        assert!(!verdict.passed());
        assert!(verdict.failures.contains(&VerificationFailure::MalformedEmail));
    }

    #[test]
    fn dkim_domain_satisfies_the_requirement() {
        let verdict = verify(
            "DKIM-Signature: v=1; a=rsa-sha256; d=domain.tld; s=x;\n\nbody",
            "domain.tld",
            &[],
        );
        assert!(verdict.passed());
        assert_eq!(verdict.extracted_domain.as_deref(), Some("domain.tld"));
    }
}
