//! Proof payload construction: synthesize a placeholder payload in test
//! mode, or delegate to the external proving collaborator in real mode and
//! reshape its output into the tuple the escrow contract consumes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::{keccak256, U256};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::structs::ProofPayload;

/// Errors produced while building a proof payload. Parsing-stage conditions
/// never reach this type; only the proof path fails hard.
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    /// Real-mode proof requested for a domain with no configured blueprint.
    /// Raised before the expensive collaborator call is made.
    #[error("no blueprint configured for domain {0}")]
    BlueprintUnavailable(String),
    /// The collaborator's own verification rejected the proof.
    #[error("prover reported the generated proof as invalid")]
    ProofInvalid,
    /// A numeric field in the collaborator's proof object could not be
    /// parsed as a 256-bit integer.
    #[error("malformed numeric field in prover output: {0:?}")]
    MalformedProof(String),
    /// A proof request for this session is already in flight.
    #[error("a proof generation request is already in flight for this session")]
    ProofInFlight,
    /// Network or service failure from the external collaborator.
    #[error("proof service error: {0}")]
    Service(#[from] anyhow::Error),
}

/// External configuration mapping a required domain to the blueprint id that
/// proves it. Passed in by the caller, never read from ambient state.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlueprintRegistry(HashMap<String, String>);

impl BlueprintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, domain: impl Into<String>, blueprint: impl Into<String>) {
        self.0.insert(domain.into().trim().to_lowercase(), blueprint.into());
    }

    /// Case-insensitive lookup. The map is bounded and small, so a scan is
    /// fine and tolerates non-normalized keys from config files.
    pub fn blueprint_for(&self, domain: &str) -> Option<&str> {
        let needle = domain.trim();
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(needle))
            .map(|(_, id)| id.as_str())
    }
}

impl FromIterator<(String, String)> for BlueprintRegistry {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (domain, blueprint) in iter {
            registry.insert(domain, blueprint);
        }
        registry
    }
}

/// Groth16 components of a proof as returned by the collaborator, numeric
/// fields as decimal (or 0x-hex) strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofData {
    pub pi_a: [String; 2],
    pub pi_b: [[String; 2]; 2],
    pub pi_c: [String; 2],
}

/// The opaque proof object produced by the external proving service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProverProof {
    #[serde(rename = "proofData")]
    pub proof_data: ProofData,
    #[serde(rename = "publicOutputs")]
    pub public_outputs: Vec<String>,
}

/// A prover instantiated from a blueprint. `generate_proof` is the one
/// long-running (10-60 s) suspension point in the system.
#[async_trait]
pub trait Prover: Send + Sync {
    async fn generate_proof(&self, raw_email: &str) -> Result<ProverProof>;
}

/// A loaded circuit blueprint for one email provider's signing conventions.
#[async_trait]
pub trait Blueprint: Send + Sync {
    fn id(&self) -> &str;
    fn create_prover(&self) -> Box<dyn Prover>;
    async fn verify_proof(&self, proof: &ProverProof) -> Result<bool>;
}

/// The hosted proof-generation service, treated as opaque: this crate only
/// shapes its input and output.
#[async_trait]
pub trait ProofService: Send + Sync {
    async fn load_blueprint(&self, id: &str) -> Result<Box<dyn Blueprint>>;
}

/// How the payload is produced, selected by the caller.
pub enum ProofMode<'a> {
    /// Deterministically synthesized placeholder payload, structurally valid
    /// but cryptographically meaningless. Exercises the end-to-end
    /// submission flow without real proving cost.
    Test,
    /// Delegate to the external collaborator, resolving the blueprint for
    /// the domain from the supplied registry first.
    Real { service: &'a dyn ProofService, registry: &'a BlueprintRegistry },
}

/// One verification session's proof-building entry point.
///
/// Admits at most one in-flight proof generation at a time; a concurrent
/// attempt fails with [`ProofError::ProofInFlight`]. The slot is released
/// when the request completes or its future is dropped (cancellation).
#[derive(Debug, Default)]
pub struct ProofSession {
    in_flight: AtomicBool,
}

impl ProofSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn generate(
        &self,
        mode: ProofMode<'_>,
        domain: &str,
        raw_email: &str,
    ) -> Result<ProofPayload, ProofError> {
        let _slot = self.acquire()?;
        match mode {
            ProofMode::Test => Ok(test_payload(raw_email, domain)),
            ProofMode::Real { service, registry } => {
                real_payload(service, registry, domain, raw_email).await
            }
        }
    }

    fn acquire(&self) -> Result<InFlightSlot<'_>, ProofError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ProofError::ProofInFlight)?;
        Ok(InFlightSlot(&self.in_flight))
    }
}

struct InFlightSlot<'a>(&'a AtomicBool);

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Synthesizes the placeholder payload: fixed integers for the proof points
/// and public signals built from a hash of the domain plus a per-attempt
/// nullifier seed (email fragment + timestamp).
pub fn test_payload(raw_email: &str, domain: &str) -> ProofPayload {
    let domain_hash = keccak256(domain.as_bytes());
    let nullifier_hash = keccak256(nullifier_seed(raw_email).as_bytes());

    ProofPayload {
        pi_a: [U256::from(1u64), U256::from(2u64)],
        pi_b: [
            [U256::from(3u64), U256::from(4u64)],
            [U256::from(5u64), U256::from(6u64)],
        ],
        pi_c: [U256::from(7u64), U256::from(8u64)],
        public_signals: vec![
            U256::from_be_bytes(domain_hash.0),
            U256::from_be_bytes(nullifier_hash.0),
        ],
    }
}

/// Nullifier seed: a fragment of the email content plus the current unix
/// timestamp in milliseconds, so every submission attempt gets a fresh one.
fn nullifier_seed(raw_email: &str) -> String {
    let fragment: String = raw_email.chars().take(64).collect();
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("{fragment}{millis}")
}

/// Real-mode path: validate the blueprint exists, delegate to the
/// collaborator, insist on a valid proof, then reshape its output.
async fn real_payload(
    service: &dyn ProofService,
    registry: &BlueprintRegistry,
    domain: &str,
    raw_email: &str,
) -> Result<ProofPayload, ProofError> {
    let blueprint_id = registry
        .blueprint_for(domain)
        .ok_or_else(|| ProofError::BlueprintUnavailable(domain.to_string()))?;

    let blueprint = service.load_blueprint(blueprint_id).await?;
    let prover = blueprint.create_prover();

    tracing::info!(blueprint = blueprint.id(), "generating proof, this can take 10-60 seconds");
    let proof = prover.generate_proof(raw_email).await?;

    if !blueprint.verify_proof(&proof).await? {
        return Err(ProofError::ProofInvalid);
    }

    shape_payload(&proof)
}

/// Reshapes the collaborator's string-numeric proof object into the fixed
/// tuple the contract expects, converting every field to `U256`.
pub fn shape_payload(proof: &ProverProof) -> Result<ProofPayload, ProofError> {
    let d = &proof.proof_data;
    Ok(ProofPayload {
        pi_a: [parse_uint(&d.pi_a[0])?, parse_uint(&d.pi_a[1])?],
        pi_b: [
            [parse_uint(&d.pi_b[0][0])?, parse_uint(&d.pi_b[0][1])?],
            [parse_uint(&d.pi_b[1][0])?, parse_uint(&d.pi_b[1][1])?],
        ],
        pi_c: [parse_uint(&d.pi_c[0])?, parse_uint(&d.pi_c[1])?],
        public_signals: proof
            .public_outputs
            .iter()
            .map(|s| parse_uint(s))
            .collect::<Result<_, _>>()?,
    })
}

fn parse_uint(value: &str) -> Result<U256, ProofError> {
    let trimmed = value.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(trimmed, 10),
    };
    parsed.map_err(|_| ProofError::MalformedProof(value.to_string()))
}
