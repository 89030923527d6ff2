use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use mailbounty_core::{
    keyword_hashes, verify, BlueprintRegistry, BountyStatus, ProofMode, ProofPayload,
    ProofSession, ProofSubmission,
};
use url::Url;

mod prover;

use prover::RemoteProofService;

/// Verify a claim email against a bounty's requirements and, on success,
/// produce the contract-ready proof submission.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the raw email file (.eml).
    #[clap(short, long)]
    email_path: PathBuf,
    /// The bounty's required sending domain.
    #[clap(short, long)]
    domain: String,
    /// A required keyword; repeat the flag for each keyword.
    #[clap(short, long = "keyword")]
    keywords: Vec<String>,
    /// Current on-chain status of the bounty, as read from the escrow
    /// contract (0=OPEN .. 5=CANCELLED). Submission requires OPEN.
    #[clap(long)]
    bounty_status: Option<u8>,
    /// Generate a real ZK proof via the hosted proving service instead of a
    /// simulated test payload.
    #[clap(long)]
    real: bool,
    /// JSON file mapping required domains to blueprint ids (real mode).
    #[clap(long, env = "BLUEPRINT_CONFIG")]
    blueprints: Option<PathBuf>,
    /// Base URL of the hosted proving service (real mode).
    #[clap(long, env = "PROVER_URL")]
    prover_url: Option<Url>,
    /// Where to write the contract-ready submission JSON.
    #[clap(short, long, default_value = "submission.json")]
    out: PathBuf,
}

fn read_email_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read email file {}", path.display()))?;
    // Email text is expected to be UTF-8; invalid sequences are replaced
    // rather than rejected.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_blueprint_registry(path: &Path) -> Result<BlueprintRegistry> {
    let file = File::open(path)
        .with_context(|| format!("failed to open blueprint config {}", path.display()))?;
    let registry: BlueprintRegistry =
        serde_json::from_reader(file).context("failed to parse blueprint config")?;
    Ok(registry)
}

/// Renders the proof tuple as the decimal-string JSON the escrow contract's
/// `submitProof` call consumes.
fn payload_json(payload: &ProofPayload) -> serde_json::Value {
    let pair = |a: &[alloy_primitives::U256; 2]| {
        serde_json::json!([a[0].to_string(), a[1].to_string()])
    };
    serde_json::json!({
        "pi_a": pair(&payload.pi_a),
        "pi_b": [pair(&payload.pi_b[0]), pair(&payload.pi_b[1])],
        "pi_c": pair(&payload.pi_c),
        "publicSignals": payload.public_signals.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment variables from {:?}", path),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => bail!("failed to load .env file: {}", e),
    }
    let args = Args::parse();

    if let Some(raw_status) = args.bounty_status {
        let status = BountyStatus::from_u8(raw_status)
            .ok_or_else(|| anyhow!("unknown bounty status {}", raw_status))?;
        if status != BountyStatus::Open {
            bail!("bounty is {}, proofs can only be submitted while it is OPEN", status);
        }
    }

    let raw_email = read_email_file(&args.email_path)?;
    tracing::info!(
        path = %args.email_path.display(),
        bytes = raw_email.len(),
        "email loaded"
    );

    // The cheap, deterministic gate: no proof is attempted and no
    // transaction is prepared unless the email plausibly satisfies the
    // bounty.
    let verdict = verify(&raw_email, &args.domain, &args.keywords);
    if !verdict.match_result.found.is_empty() {
        tracing::info!(found = ?verdict.match_result.found, "keywords present");
    }
    if !verdict.passed() {
        for failure in &verdict.failures {
            tracing::warn!("{}", failure);
        }
        bail!(
            "email does not satisfy the bounty requirements: {}",
            verdict
                .failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        );
    }
    let extracted_domain = verdict
        .extracted_domain
        .clone()
        .ok_or_else(|| anyhow!("verdict passed without an extracted domain"))?;
    tracing::info!(domain = %extracted_domain, "verification passed");

    let session = ProofSession::new();
    let payload = if args.real {
        let registry_path = args
            .blueprints
            .as_deref()
            .ok_or_else(|| anyhow!("--blueprints is required in real mode"))?;
        let prover_url = args
            .prover_url
            .clone()
            .ok_or_else(|| anyhow!("--prover-url is required in real mode"))?;
        let registry = read_blueprint_registry(registry_path)?;
        let service = RemoteProofService::new(prover_url);
        session
            .generate(
                ProofMode::Real { service: &service, registry: &registry },
                &extracted_domain,
                &raw_email,
            )
            .await?
    } else {
        tracing::info!("test mode: synthesizing placeholder proof payload");
        session
            .generate(ProofMode::Test, &extracted_domain, &raw_email)
            .await?
    };

    let submission = ProofSubmission {
        payload,
        extracted_domain: extracted_domain.clone(),
        keyword_hashes: keyword_hashes(&verdict.match_result.found),
    };

    // Save data in a format ready for smart contract consumption.
    let submission_json = serde_json::json!({
        "proof": payload_json(&submission.payload),
        "extractedDomain": submission.extracted_domain,
        "keywordHashes": submission
            .keyword_hashes
            .iter()
            .map(|h| format!("0x{}", hex::encode(h)))
            .collect::<Vec<_>>(),
    });

    let mut file = File::create(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    serde_json::to_writer_pretty(&mut file, &submission_json)?;

    tracing::info!("Submission data saved to {}", args.out.display());
    Ok(())
}
