//! Keyword matching against a normalized body, and the keccak commitments
//! the escrow contract compares keyword sets with.

use alloy_primitives::{keccak256, B256};

use crate::structs::{MatchResult, NormalizedBody};

/// Classifies every required keyword as found or missing.
///
/// Each keyword is lowercased and trimmed, then tested for plain substring
/// containment in the normalized body. Substring containment (rather than
/// whole-word matching) is the documented policy: `"secret"` also matches
/// inside `"secretary"`. Input ordering is preserved in both lists and the
/// keyword strings are carried verbatim.
pub fn match_keywords(body: &NormalizedBody, required: &[String]) -> MatchResult {
    let mut result = MatchResult::default();
    for keyword in required {
        let needle = keyword.trim().to_lowercase();
        if !needle.is_empty() && body.text.contains(&needle) {
            result.found.push(keyword.clone());
        } else {
            result.missing.push(keyword.clone());
        }
    }
    result
}

/// Canonical on-chain commitment of a single keyword: keccak-256 of the
/// lowercased, trimmed string. Pure and total over any input.
pub fn keyword_hash(keyword: &str) -> B256 {
    keccak256(keyword.trim().to_lowercase().as_bytes())
}

/// Maps matched keywords to their commitments, preserving order.
pub fn keyword_hashes(found: &[String]) -> Vec<B256> {
    found.iter().map(|k| keyword_hash(k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(text: &str) -> NormalizedBody {
        NormalizedBody { text: text.to_string(), header_separator_found: true }
    }

    fn req(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let result = match_keywords(&body("this contains secret data"), &req(&["Secret"]));
        assert_eq!(result.found, vec!["Secret"]);
        assert!(result.missing.is_empty());
    }

    #[test]
    fn substring_policy_matches_inside_longer_words() {
        let result = match_keywords(&body("ask the secretary"), &req(&["secret"]));
        assert_eq!(result.found, vec!["secret"]);
    }

    #[test]
    fn found_and_missing_partition_the_requirement() {
        let result = match_keywords(
            &body("the fraud was confidential"),
            &req(&["fraud", "secret", "confidential"]),
        );
        assert_eq!(result.found, vec!["fraud", "confidential"]);
        assert_eq!(result.missing, vec!["secret"]);
    }

    #[test]
    fn keywords_are_trimmed_before_matching() {
        let result = match_keywords(&body("wire transfer pending"), &req(&["  transfer "]));
        assert_eq!(result.found, vec!["  transfer "]);
    }

    #[test]
    fn empty_requirement_yields_empty_result() {
        let result = match_keywords(&body("anything"), &[]);
        assert_eq!(result, MatchResult::default());
    }

    #[test]
    fn hash_canonicalizes_case_and_whitespace() {
        assert_eq!(keyword_hash(" Fraud "), keyword_hash("fraud"));
        assert_ne!(keyword_hash("fraud"), keyword_hash("secret"));
    }

    #[test]
    fn hashes_preserve_order() {
        let found = req(&["fraud", "confidential"]);
        let hashes = keyword_hashes(&found);
        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes[0], keyword_hash("fraud"));
        assert_eq!(hashes[1], keyword_hash("confidential"));
    }
}
