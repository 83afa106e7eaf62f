//! Simulate command - run an audit round trip against loopback adapters
//!
//! `veilaudit simulate complete` lets the loopback service answer the
//! decryption request. `veilaudit simulate timeout` lets the deadline pass
//! instead, expires the request, withdraws the refund and then shows the
//! late answer being rejected. Both print the resulting audit record and
//! the event trail.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use veilaudit_core::config::Config;
use veilaudit_core::domain::{
    AuditId, AuditRecord, AuditStandard, DataCategories, Principal, ProfileSubmission, RequestId,
    RevealedFindings, Role,
};
use veilaudit_core::ports::IEncryptor;
use veilaudit_engine::{AuditOrchestrator, Collaborators, LedgerSummary};
use veilaudit_journal::{EventJournal, FanoutSink, JournalEntry, TracingEventSink};
use veilaudit_loopback::{DigestProofVerifier, LoopbackCipher, ManualClock, StaticRoleDirectory};

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum SimulateCommand {
    /// The decryption service answers and the audit completes
    Complete {
        /// Number of findings the auditor records
        #[arg(long, default_value_t = 5)]
        findings: u32,
        #[command(flatten)]
        scenario: ScenarioArgs,
    },
    /// The decryption service never answers in time
    Timeout {
        #[command(flatten)]
        scenario: ScenarioArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ScenarioArgs {
    /// Compliance score of the audited entity before the audit
    #[arg(long, default_value_t = 90)]
    score: u32,
    /// Stake paid with the decryption request
    #[arg(long, default_value_t = 100)]
    stake: u64,
    /// Regulatory standard of the audit
    #[arg(long, value_enum, default_value_t = StandardArg::Gdpr)]
    standard: StandardArg,
    /// Override decryption.timeout_secs from the configuration
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StandardArg {
    Gdpr,
    Hipaa,
    Sox,
    PciDss,
    Iso27001,
    Ccpa,
}

impl From<StandardArg> for AuditStandard {
    fn from(value: StandardArg) -> Self {
        match value {
            StandardArg::Gdpr => AuditStandard::Gdpr,
            StandardArg::Hipaa => AuditStandard::Hipaa,
            StandardArg::Sox => AuditStandard::Sox,
            StandardArg::PciDss => AuditStandard::PciDss,
            StandardArg::Iso27001 => AuditStandard::Iso27001,
            StandardArg::Ccpa => AuditStandard::Ccpa,
        }
    }
}

/// Outcome of one simulated round trip
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub audit: AuditRecord,
    pub revealed: Option<RevealedFindings>,
    pub refund_withdrawn: Option<u64>,
    /// Error code returned to the service's late answer, if one was sent
    pub late_callback: Option<String>,
    pub summary: LedgerSummary,
    pub events: Vec<JournalEntry>,
}

impl SimulateCommand {
    pub fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let report = match self {
            SimulateCommand::Complete { findings, scenario } => {
                run_complete(config, scenario, *findings)?
            }
            SimulateCommand::Timeout { scenario } => run_timeout(config, scenario)?,
        };
        print_report(&report, format)
    }
}

/// An orchestrator wired to loopback adapters with three actors
struct Simulation {
    engine: AuditOrchestrator,
    cipher: Arc<LoopbackCipher>,
    clock: Arc<ManualClock>,
    journal: Arc<EventJournal>,
    auditor: Principal,
    controller: Principal,
    keeper: Principal,
}

impl Simulation {
    fn new(config: &Config, scenario: &ScenarioArgs) -> Result<Self> {
        let mut config = config.clone();
        if let Some(secs) = scenario.timeout_secs {
            config.decryption.timeout_secs = Some(secs);
        }

        let cipher = Arc::new(LoopbackCipher::new());
        let roles = Arc::new(StaticRoleDirectory::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let journal = Arc::new(EventJournal::new());
        let auditor = Principal::new("auditor@veilaudit.local")?;
        let controller = Principal::new("controller@veilaudit.local")?;
        let keeper = Principal::new("keeper@veilaudit.local")?;
        roles.grant(&auditor, Role::AuthorizedAuditor);
        roles.grant(&controller, Role::DataController);

        let events = FanoutSink::new()
            .with(journal.clone())
            .with(Arc::new(TracingEventSink));
        let ports = Collaborators {
            decryption: cipher.clone(),
            verifier: Arc::new(DigestProofVerifier),
            encryptor: cipher.clone(),
            roles,
            clock: clock.clone(),
            events: Arc::new(events),
        };
        let engine = AuditOrchestrator::from_config(&config, ports)
            .context("Cannot start the simulated orchestrator")?;
        Ok(Self {
            engine,
            cipher,
            clock,
            journal,
            auditor,
            controller,
            keeper,
        })
    }

    /// Registers the controller and drives an audit up to a pending decryption
    fn pending_audit(
        &mut self,
        scenario: &ScenarioArgs,
        findings: u32,
    ) -> Result<(AuditId, RequestId)> {
        let submission = ProfileSubmission {
            data_points: self.cipher.encrypt(25_000)?,
            risk_score: self.cipher.encrypt(3)?,
            compliance_score: self.cipher.encrypt(u64::from(scenario.score))?,
            derived_magnitude: 25_000,
            categories: DataCategories {
                personal: true,
                ..Default::default()
            },
        };
        self.engine.register_profile(&self.controller, &submission)?;

        let id = self
            .engine
            .schedule_audit(&self.auditor, &self.controller, scenario.standard.into())?;
        self.engine.start_audit(&self.auditor, id)?;
        let findings_handle = self.cipher.encrypt(u64::from(findings))?;
        let penalty_handle = self.cipher.encrypt(u64::from(findings) * 1_000)?;
        self.engine
            .record_findings(&self.auditor, id, findings_handle, penalty_handle)?;
        let request = self
            .engine
            .request_decryption(&self.auditor, id, scenario.stake)?;
        info!(audit_id = %id, request_id = %request, "Simulated audit pending decryption");
        Ok((id, request))
    }

    fn answer(&mut self, request: RequestId) -> Result<veilaudit_core::Result<RevealedFindings>> {
        let (cleartext, proof) = self.cipher.fulfil(request)?;
        Ok(self.engine.apply_callback(request, &cleartext, &proof))
    }

    fn report(
        &self,
        id: AuditId,
        revealed: Option<RevealedFindings>,
        refund_withdrawn: Option<u64>,
        late_callback: Option<String>,
    ) -> Result<SimulationReport> {
        Ok(SimulationReport {
            audit: self.engine.audit(id)?.clone(),
            revealed,
            refund_withdrawn,
            late_callback,
            summary: self.engine.summary(),
            events: self.journal.entries(),
        })
    }
}

fn run_complete(config: &Config, scenario: &ScenarioArgs, findings: u32) -> Result<SimulationReport> {
    let mut sim = Simulation::new(config, scenario)?;
    let (id, request) = sim.pending_audit(scenario, findings)?;
    let revealed = sim.answer(request)??;
    sim.report(id, Some(revealed), None, None)
}

fn run_timeout(config: &Config, scenario: &ScenarioArgs) -> Result<SimulationReport> {
    let mut sim = Simulation::new(config, scenario)?;
    let (id, request) = sim.pending_audit(scenario, 3)?;

    let timeout = sim
        .engine
        .settings()
        .timeout()
        .context("decryption timeout does not fit the clock")?;
    sim.clock.advance(timeout);
    let keeper = sim.keeper.clone();
    let expired = sim.engine.expire_overdue(&keeper);
    for (audit_id, outcome) in &expired {
        if let Err(e) = outcome {
            anyhow::bail!("expiring audit {audit_id} failed: {e}");
        }
    }
    let auditor = sim.auditor.clone();
    let withdrawn = sim.engine.withdraw_refund(&auditor)?;
    let late = sim.answer(request)?.err().map(|e| e.code().to_string());
    sim.report(id, None, Some(withdrawn), late)
}

fn print_report(report: &SimulationReport, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    if format.is_json() {
        let json = serde_json::to_value(report).context("Failed to serialize simulation report")?;
        formatter.print_json(&json);
        return Ok(());
    }

    let audit = &report.audit;
    formatter.success(&format!(
        "Audit {} ({}) ended {}",
        audit.id(),
        audit.standard(),
        audit.status()
    ));
    if let Some(tier) = audit.risk_tier() {
        formatter.field("Risk tier", &tier);
    }
    if audit.remediation_required() {
        formatter.warn("Remediation required");
    }
    if let Some(revealed) = &report.revealed {
        formatter.field("Findings", &revealed.findings_count);
        formatter.field("Penalty", &revealed.penalty);
        if let (Some(before), Some(after)) = (revealed.score_before, revealed.score_after) {
            formatter.field("Compliance score", &format!("{before} -> {after}"));
        }
    }
    if let Some(amount) = report.refund_withdrawn {
        formatter.field("Refund withdrawn", &amount);
    }
    if let Some(code) = &report.late_callback {
        formatter.field("Late callback", &format!("rejected ({code})"));
    }
    formatter.info("");
    formatter.info("Events:");
    for entry in &report.events {
        let scope = entry
            .audit_id
            .map(|id| format!("audit {id}"))
            .unwrap_or_else(|| "-".to_string());
        formatter.info(&format!("  {:<22} {scope}", entry.event_type));
    }
    Ok(())
}
