//! Pre-submission email verifier for the mailbounty platform.
//!
//! A claimant proves possession of an email from a bounty's required domain
//! (optionally containing required keywords) before any proof is generated
//! or funds move. This crate holds the deterministic verifier that gates the
//! expensive steps: header scanning, body extraction and normalization,
//! keyword matching, verdict assembly, and shaping of the proof payload the
//! escrow contract consumes.

pub mod body;
pub mod headers;
pub mod keywords;
pub mod proof;
pub mod structs;
pub mod verify;

pub use body::extract_body;
pub use headers::scan_headers;
pub use keywords::{keyword_hash, keyword_hashes, match_keywords};
pub use proof::{
    shape_payload, test_payload, Blueprint, BlueprintRegistry, ProofError, ProofMode,
    ProofService, ProofSession, Prover, ProverProof,
};
pub use structs::{
    BountyStatus, MatchResult, NormalizedBody, ParsedHeaders, ProofPayload, ProofSubmission,
};
pub use verify::{verify, VerificationFailure, VerificationVerdict};
