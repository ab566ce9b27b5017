//! AgenticTrust CLI (`atrust`).
//!
//! Inspect the credential policy table and well-known brands, run the fraud
//! policy engine against an issuer record, and manage the file-backed issuer
//! and agent repositories.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use agentic_trust::index::{AgentRepository, IssuerRepository};
use agentic_trust::issuer::{Agent, Issuer, IssuerQuery, IssuerType};
use agentic_trust::policy::{
    BrandRegistry, CredentialType, FraudPolicyEngine, PolicyTable, RiskAssessment,
};
use agentic_trust::storage::{default_store_dir, FileAgentRepository, FileIssuerRepository};

// ── Directory helpers ─────────────────────────────────────────────────────────

fn store_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    explicit
        .or_else(default_store_dir)
        .ok_or_else(|| anyhow!("no --store given and HOME is not set"))
}

// ── Input helpers ─────────────────────────────────────────────────────────────

/// Read a JSON document given inline (`{...}`) or as a file path.
fn read_json_arg(arg: &str) -> Result<String> {
    if arg.trim_start().starts_with('{') {
        return Ok(arg.to_string());
    }
    std::fs::read_to_string(arg).with_context(|| format!("failed to read {arg}"))
}

fn parse_issuer(arg: &str) -> Result<Issuer> {
    let json = read_json_arg(arg)?;
    let issuer: Issuer = serde_json::from_str(&json).context("invalid issuer JSON")?;
    issuer.validate()?;
    Ok(issuer)
}

fn parse_agent(arg: &str) -> Result<Agent> {
    let json = read_json_arg(arg)?;
    let agent: Agent = serde_json::from_str(&json).context("invalid agent JSON")?;
    agent.validate()?;
    Ok(agent)
}

fn load_engine(policy_file: Option<&Path>, lenient: bool) -> Result<FraudPolicyEngine> {
    let policies = match policy_file {
        Some(path) => PolicyTable::load(path, lenient)
            .with_context(|| format!("failed to load policy table {}", path.display()))?,
        None => PolicyTable::builtin(),
    };
    Ok(FraudPolicyEngine::new(policies, BrandRegistry::builtin()))
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// AgenticTrust CLI: inspect credential policy, assess issuers, and manage
/// the issuer registry.
#[derive(Parser, Debug)]
#[command(
    name = "atrust",
    about = "AgenticTrust CLI",
    version,
    long_about = "atrust: AgenticTrust CLI\n\nInspect credential policy and well-known brands, assess issuers,\nand manage the local issuer and agent registry."
)]
struct Cli {
    /// JSON policy table to use instead of the built-in one
    #[arg(long, global = true)]
    policy_file: Option<PathBuf>,

    /// Accept a policy table that leaves credential types uncovered
    #[arg(long, global = true)]
    lenient: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assess an issuer for a credential type
    Assess {
        /// Issuer record: inline JSON or a path to a JSON file
        #[arg(long)]
        issuer: String,

        /// Credential type (e.g. MEDICAL_RECORD)
        #[arg(long)]
        credential_type: CredentialType,
    },

    /// List every credential type policy
    Policies,

    /// Show the policy for one credential type
    Policy {
        /// Credential type (e.g. KYC_LEVEL_1)
        credential_type: CredentialType,
    },

    /// List the well-known brands
    Brands,

    /// Check whether a name matches a well-known brand
    BrandCheck {
        /// Claimed brand name
        name: String,
    },

    /// Manage issuer records
    Issuer {
        #[command(subcommand)]
        subcommand: IssuerCommands,
    },

    /// Manage agent records
    Agent {
        #[command(subcommand)]
        subcommand: AgentCommands,
    },
}

#[derive(Subcommand, Debug)]
enum IssuerCommands {
    /// Add or replace an issuer record
    Add {
        /// Issuer record: inline JSON or a path to a JSON file
        issuer: String,

        /// Registry directory (default: ~/.agentic-trust)
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Show an issuer record
    Show {
        did: String,

        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// List issuer records
    List {
        #[arg(long)]
        store: Option<PathBuf>,

        /// Only issuers of this type
        #[arg(long = "type")]
        issuer_type: Option<IssuerType>,

        /// Only issuers eligible for this credential type
        #[arg(long)]
        eligible_for: Option<CredentialType>,

        /// Include revoked and inactive issuers
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand, Debug)]
enum AgentCommands {
    /// Add or replace an agent record
    Add {
        /// Agent record: inline JSON or a path to a JSON file
        agent: String,

        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Show an agent record
    Show {
        did: String,

        #[arg(long)]
        store: Option<PathBuf>,
    },
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let json = cli.json;

    let result = match cli.command {
        Commands::Assess {
            issuer,
            credential_type,
        } => load_engine(cli.policy_file.as_deref(), cli.lenient)
            .and_then(|engine| cmd_assess(&engine, &issuer, credential_type, json)),
        Commands::Policies => load_engine(cli.policy_file.as_deref(), cli.lenient)
            .and_then(|engine| cmd_policies(&engine, json)),
        Commands::Policy { credential_type } => {
            load_engine(cli.policy_file.as_deref(), cli.lenient)
                .and_then(|engine| cmd_policy(&engine, credential_type, json))
        }
        Commands::Brands => cmd_brands(&BrandRegistry::builtin(), json),
        Commands::BrandCheck { name } => cmd_brand_check(&BrandRegistry::builtin(), &name, json),
        Commands::Issuer { subcommand } => match subcommand {
            IssuerCommands::Add { issuer, store } => {
                store_dir(store).and_then(|dir| cmd_issuer_add(&dir, &issuer))
            }
            IssuerCommands::Show { did, store } => {
                store_dir(store).and_then(|dir| cmd_issuer_show(&dir, &did, json))
            }
            IssuerCommands::List {
                store,
                issuer_type,
                eligible_for,
                all,
            } => load_engine(cli.policy_file.as_deref(), cli.lenient).and_then(|engine| {
                let mut query = IssuerQuery::new();
                if let Some(t) = issuer_type {
                    query = query.issuer_type(t);
                }
                if let Some(ct) = eligible_for {
                    let policy = engine
                        .policy(ct)
                        .cloned()
                        .ok_or_else(|| anyhow!("no policy defined for {ct}"))?;
                    query = query.eligible_for(policy);
                }
                if !all {
                    query = query.active(true).revoked(false);
                }
                store_dir(store).and_then(|dir| cmd_issuer_list(&dir, &query, json))
            }),
        },
        Commands::Agent { subcommand } => match subcommand {
            AgentCommands::Add { agent, store } => {
                store_dir(store).and_then(|dir| cmd_agent_add(&dir, &agent))
            }
            AgentCommands::Show { did, store } => {
                store_dir(store).and_then(|dir| cmd_agent_show(&dir, &did, json))
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// `atrust assess --issuer JSON --credential-type TYPE`
fn cmd_assess(
    engine: &FraudPolicyEngine,
    issuer_arg: &str,
    credential_type: CredentialType,
    json: bool,
) -> Result<()> {
    let issuer = parse_issuer(issuer_arg)?;
    log::debug!("assessing {} for {}", issuer.did, credential_type);
    let assessment = engine.assess(&issuer, credential_type);

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    } else {
        print_assessment(&issuer, credential_type, &assessment);
    }

    if assessment.is_blocking() {
        std::io::stdout().flush()?;
        std::process::exit(2);
    }
    Ok(())
}

fn print_assessment(issuer: &Issuer, credential_type: CredentialType, a: &RiskAssessment) {
    println!("Assessment: {} for {}", issuer.did, credential_type);
    println!("  Score:          {}", a.score);
    match a.reason {
        Some(reason) => println!("  Reason:         {reason}"),
        None => println!("  Reason:         -"),
    }
    match a.recommendation {
        Some(rec) => println!("  Recommendation: {rec:?}"),
        None => println!("  Recommendation: -"),
    }
    for flag in &a.flags {
        println!("  Flag:           {flag}");
    }
}

/// `atrust policies`
fn cmd_policies(engine: &FraudPolicyEngine, json: bool) -> Result<()> {
    let policies: Vec<_> = engine.policies().iter().collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&policies)?);
        return Ok(());
    }

    println!("{:<24} {:<40} MIN ASSURANCE", "CREDENTIAL TYPE", "ISSUER TYPES");
    println!("{}", "-".repeat(86));
    for policy in policies {
        let types: Vec<&str> = policy
            .allowed_issuer_types
            .iter()
            .map(|t| t.as_str())
            .collect();
        println!(
            "{:<24} {:<40} {}",
            policy.credential_type,
            types.join(","),
            policy.min_assurance
        );
    }
    let missing = engine.policies().missing();
    if !missing.is_empty() {
        println!();
        println!("No policy: {missing:?}");
    }
    Ok(())
}

/// `atrust policy TYPE`
fn cmd_policy(engine: &FraudPolicyEngine, credential_type: CredentialType, json: bool) -> Result<()> {
    let policy = engine
        .policy(credential_type)
        .ok_or_else(|| anyhow!("no policy defined for {credential_type}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(policy)?);
        return Ok(());
    }

    println!("Policy: {}", policy.credential_type);
    println!("  Description:   {}", policy.description);
    let types: Vec<&str> = policy
        .allowed_issuer_types
        .iter()
        .map(|t| t.as_str())
        .collect();
    println!("  Issuer types:  {}", types.join(", "));
    match &policy.required_domains {
        Some(domains) => {
            let names: Vec<&str> = domains.iter().map(|d| d.as_str()).collect();
            println!("  Domains:       any of {}", names.join(", "));
        }
        None => println!("  Domains:       any"),
    }
    println!("  Min assurance: {}", policy.min_assurance);
    Ok(())
}

/// `atrust brands`
fn cmd_brands(brands: &BrandRegistry, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(brands.brands())?);
        return Ok(());
    }

    println!("{:<20} {:<14} {:<18} ALIASES", "BRAND", "MIN TYPE", "MIN ASSURANCE");
    println!("{}", "-".repeat(80));
    for brand in brands.brands() {
        println!(
            "{:<20} {:<14} {:<18} {}",
            brand.brand_name,
            brand.min_type,
            brand.min_assurance,
            brand.aliases.join(", ")
        );
    }
    Ok(())
}

/// `atrust brand-check NAME`
fn cmd_brand_check(brands: &BrandRegistry, name: &str, json: bool) -> Result<()> {
    let matched = brands.find(name);
    if json {
        println!("{}", serde_json::to_string_pretty(&matched)?);
        return Ok(());
    }
    match matched {
        Some(brand) => {
            println!("'{}' matches well-known brand {}", name, brand.brand_name);
            println!("  Requires: {} with {} assurance", brand.min_type, brand.min_assurance);
        }
        None => println!("'{name}' does not match any well-known brand"),
    }
    Ok(())
}

/// `atrust issuer add JSON [--store DIR]`
fn cmd_issuer_add(store: &Path, issuer_arg: &str) -> Result<()> {
    let issuer = parse_issuer(issuer_arg)?;
    let repo = FileIssuerRepository::open(store).context("failed to open issuer store")?;
    let created = repo.put(&issuer)?;
    log::info!("stored issuer {} in {}", issuer.did, store.display());
    let verb = if created { "Stored" } else { "Replaced" };
    println!("{verb} issuer {}", issuer.did);
    Ok(())
}

/// `atrust issuer show DID [--store DIR]`
fn cmd_issuer_show(store: &Path, did: &str, json: bool) -> Result<()> {
    let repo = FileIssuerRepository::open(store).context("failed to open issuer store")?;
    let issuer = repo
        .get(did)?
        .ok_or_else(|| anyhow!("issuer '{}' not found in {}", did, store.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&issuer)?);
        return Ok(());
    }

    println!("Issuer: {}", issuer.did);
    println!("  Legal name: {}", issuer.legal_name);
    println!("  Type:       {}", issuer.issuer_type);
    println!("  Assurance:  {}", issuer.assurance);
    let domains: Vec<&str> = issuer.domains.iter().map(|d| d.as_str()).collect();
    println!("  Domains:    {}", domains.join(", "));
    if let Some(ref brand) = issuer.claimed_brand_name {
        println!("  Brand:      {brand}");
    }
    if let Some(ref jurisdiction) = issuer.jurisdiction {
        println!("  Jurisdiction: {jurisdiction}");
    }
    println!("  Created:    {}", issuer.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let status = if issuer.is_revoked {
        "REVOKED"
    } else if !issuer.is_active {
        "inactive"
    } else {
        "active"
    };
    println!("  Status:     {status}");
    Ok(())
}

/// `atrust issuer list [--store DIR] [--type T] [--eligible-for CT] [--all]`
fn cmd_issuer_list(store: &Path, query: &IssuerQuery, json: bool) -> Result<()> {
    let repo = FileIssuerRepository::open(store).context("failed to open issuer store")?;
    let issuers: Vec<Issuer> = repo
        .list()?
        .into_iter()
        .filter(|i| query.matches(i))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&issuers)?);
        return Ok(());
    }
    if issuers.is_empty() {
        println!("No issuers found in {}", store.display());
        return Ok(());
    }

    println!("{:<40} {:<18} {:<18} NAME", "DID", "TYPE", "ASSURANCE");
    println!("{}", "-".repeat(100));
    for issuer in &issuers {
        println!(
            "{:<40} {:<18} {:<18} {}",
            issuer.did, issuer.issuer_type, issuer.assurance, issuer.legal_name
        );
    }
    Ok(())
}

/// `atrust agent add JSON [--store DIR]`
fn cmd_agent_add(store: &Path, agent_arg: &str) -> Result<()> {
    let agent = parse_agent(agent_arg)?;
    let repo = FileAgentRepository::open(store).context("failed to open agent store")?;
    let verb = if repo.put(&agent)? { "Stored" } else { "Replaced" };
    println!("{verb} agent {}", agent.did);
    Ok(())
}

/// `atrust agent show DID [--store DIR]`
fn cmd_agent_show(store: &Path, did: &str, json: bool) -> Result<()> {
    let repo = FileAgentRepository::open(store).context("failed to open agent store")?;
    let agent = repo
        .get(did)?
        .ok_or_else(|| anyhow!("agent '{}' not found in {}", did, store.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&agent)?);
        return Ok(());
    }

    println!("Agent: {}", agent.did);
    if let Some(ref id) = agent.agent_id {
        println!("  ID:           {id}");
    }
    println!("  Role:         {}", agent.role);
    if let Some(ref parent) = agent.parent_issuer_did {
        println!("  Issuer:       {parent}");
    }
    if let Some(ref description) = agent.description {
        println!("  Description:  {description}");
    }
    println!("  Capabilities: {}", agent.capabilities.join(", "));
    println!("  System agent: {}", agent.is_system_agent);
    println!("  Active:       {}", agent.is_active);
    Ok(())
}
