use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

/// Candidate sending domains extracted from the raw message headers.
///
/// Each field is a lowercase, trimmed ASCII domain or `None`. The `From:`
/// header heuristics populate `from_domain`; the `DKIM-Signature:` `d=` tag
/// populates `dkim_domain` only when no `From:` heuristic succeeded.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedHeaders {
    pub from_domain: Option<String>,
    pub dkim_domain: Option<String>,
}

impl ParsedHeaders {
    /// The domain downstream checks compare against, `From:` taking
    /// precedence over DKIM.
    pub fn domain(&self) -> Option<&str> {
        self.from_domain.as_deref().or(self.dkim_domain.as_deref())
    }
}

/// Lowercase, whitespace-normalized plaintext derived from the raw message.
///
/// Contains no MIME boundary markers, no raw quoted-printable escapes and no
/// HTML tags. `header_separator_found` is false when the message had no
/// blank-line header/body split and the whole message was treated as body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedBody {
    pub text: String,
    pub header_separator_found: bool,
}

/// Classification of a bounty's required keywords against a normalized body.
///
/// `found` and `missing` partition the requirement list and preserve its
/// original ordering; keyword strings are carried verbatim.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub found: Vec<String>,
    pub missing: Vec<String>,
}

/// Fixed-shape Groth16 proof tuple consumed by the escrow contract's
/// `submitProof` entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPayload {
    pub pi_a: [U256; 2],
    pub pi_b: [[U256; 2]; 2],
    pub pi_c: [U256; 2],
    pub public_signals: Vec<U256>,
}

/// Everything the on-chain submission call needs: the proof tuple, the
/// domain the verifier extracted and the keccak commitments of the matched
/// keywords.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofSubmission {
    pub payload: ProofPayload,
    pub extracted_domain: String,
    pub keyword_hashes: Vec<B256>,
}

/// Lifecycle states of a bounty escrow, mirroring the on-chain contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BountyStatus {
    Open,
    PendingClaim,
    Claimed,
    Expired,
    Disputed,
    Cancelled,
}

impl BountyStatus {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Open),
            1 => Some(Self::PendingClaim),
            2 => Some(Self::Claimed),
            3 => Some(Self::Expired),
            4 => Some(Self::Disputed),
            5 => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for BountyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Open => "OPEN",
            Self::PendingClaim => "PENDING_CLAIM",
            Self::Claimed => "CLAIMED",
            Self::Expired => "EXPIRED",
            Self::Disputed => "DISPUTED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}
