//! HTTP client for the hosted proof-generation service. The service is
//! opaque to the verifier: this module only moves raw email text in and the
//! string-numeric proof object out.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use mailbounty_core::{Blueprint, ProofService, Prover, ProverProof};
use serde::Deserialize;
use url::Url;

/// Client for the remote proving relayer.
#[derive(Debug, Clone)]
pub struct RemoteProofService {
    client: reqwest::Client,
    base_url: Url,
}

impl RemoteProofService {
    pub fn new(base_url: Url) -> Self {
        Self { client: reqwest::Client::new(), base_url }
    }
}

#[derive(Debug, Deserialize)]
struct BlueprintMeta {
    slug: String,
}

#[async_trait]
impl ProofService for RemoteProofService {
    async fn load_blueprint(&self, id: &str) -> Result<Box<dyn Blueprint>> {
        let url = self.base_url.join(&format!("blueprint/{id}"))?;
        let meta: BlueprintMeta = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("failed to reach proof service: {}", e))?
            .error_for_status()
            .map_err(|e| anyhow!("blueprint lookup failed: {}", e))?
            .json()
            .await
            .map_err(|e| anyhow!("invalid blueprint metadata: {}", e))?;

        tracing::debug!(slug = %meta.slug, "blueprint loaded");
        Ok(Box::new(RemoteBlueprint {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            slug: meta.slug,
        }))
    }
}

struct RemoteBlueprint {
    client: reqwest::Client,
    base_url: Url,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    valid: bool,
}

#[async_trait]
impl Blueprint for RemoteBlueprint {
    fn id(&self) -> &str {
        &self.slug
    }

    fn create_prover(&self) -> Box<dyn Prover> {
        Box::new(RemoteProver {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            blueprint: self.slug.clone(),
        })
    }

    async fn verify_proof(&self, proof: &ProverProof) -> Result<bool> {
        let url = self.base_url.join("verify")?;
        let response: VerifyResponse = self
            .client
            .post(url)
            .json(&serde_json::json!({ "blueprintId": self.slug, "proof": proof }))
            .send()
            .await
            .map_err(|e| anyhow!("failed to reach proof service: {}", e))?
            .error_for_status()
            .map_err(|e| anyhow!("proof verification request failed: {}", e))?
            .json()
            .await
            .map_err(|e| anyhow!("invalid verification response: {}", e))?;
        Ok(response.valid)
    }
}

struct RemoteProver {
    client: reqwest::Client,
    base_url: Url,
    blueprint: String,
}

#[async_trait]
impl Prover for RemoteProver {
    async fn generate_proof(&self, raw_email: &str) -> Result<ProverProof> {
        let url = self.base_url.join("prove")?;
        let proof: ProverProof = self
            .client
            .post(url)
            .json(&serde_json::json!({ "blueprintId": self.blueprint, "email": raw_email }))
            .send()
            .await
            .map_err(|e| anyhow!("failed to reach proof service: {}", e))?
            .error_for_status()
            .map_err(|e| anyhow!("proof generation failed: {}", e))?
            .json()
            .await
            .map_err(|e| anyhow!("invalid proof response: {}", e))?;
        Ok(proof)
    }
}
