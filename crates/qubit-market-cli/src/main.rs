// crates/qubit-market-cli/src/main.rs
// ============================================================================
// Module: Qubit Market CLI Entry Point
// Description: Command dispatcher for market ledger operations and queries.
// Purpose: Provide a safe, localized CLI over the durable market ledger.
// Dependencies: clap, qubit-market-core, qubit-market-config, serde, thiserror.
// ============================================================================

//! ## Overview
//! The Qubit Market CLI drives the market engine against a `SQLite` ledger.
//! Every mutating command takes an explicit `--caller` principal and
//! `--height` block height; results are written to stdout as canonical JSON
//! so they can be piped into other tools. All user-facing strings are routed
//! through the i18n catalog. Inputs are untrusted and validated by the engine.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use qubit_market_cli::i18n::Locale;
use qubit_market_cli::i18n::set_locale;
use qubit_market_cli::t;
use qubit_market_config::AuditConfig;
use qubit_market_config::MarketConfig;
use qubit_market_config::config_toml_example;
use qubit_market_core::AllocateResourcesRequest;
use qubit_market_core::AllocationId;
use qubit_market_core::AuditSink;
use qubit_market_core::BlockHeight;
use qubit_market_core::CallContext;
use qubit_market_core::ChallengeVerificationRequest;
use qubit_market_core::CompleteParallelJobRequest;
use qubit_market_core::ConsensusVerifyRequest;
use qubit_market_core::CreateGroupRequest;
use qubit_market_core::FileAuditSink;
use qubit_market_core::GroupId;
use qubit_market_core::HashDigest;
use qubit_market_core::JobId;
use qubit_market_core::MaintenanceRequest;
use qubit_market_core::Market;
use qubit_market_core::MarketError;
use qubit_market_core::MarketId;
use qubit_market_core::NoopAuditSink;
use qubit_market_core::PrincipalId;
use qubit_market_core::ProcessorId;
use qubit_market_core::ProcessorStatus;
use qubit_market_core::RegisterProcessorRequest;
use qubit_market_core::ResultId;
use qubit_market_core::StderrAuditSink;
use qubit_market_core::SubmitParallelJobRequest;
use qubit_market_core::SubmitProcessorResultRequest;
use qubit_market_core::SubmitResultRequest;
use qubit_market_core::SubmitTaskRequest;
use qubit_market_core::SynchronizeGroupRequest;
use qubit_market_core::TaskExecutionRequest;
use qubit_market_core::TaskId;
use qubit_market_core::TaskStatus;
use qubit_market_core::UpdateProcessorStatusRequest;
use qubit_market_core::VerificationId;
use qubit_market_core::VerifyResultRequest;
use qubit_market_store_sqlite::SqliteLedgerStore;
use qubit_market_store_sqlite::SqliteStoreConfig;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "QUBIT_MARKET_LANG";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "qubit-market", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `QUBIT_MARKET_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Processor registry operations.
    Processor {
        /// Selected processor subcommand.
        #[command(subcommand)]
        command: ProcessorCommand,
    },
    /// Entangled group operations.
    Group {
        /// Selected group subcommand.
        #[command(subcommand)]
        command: GroupCommand,
    },
    /// Parallel job operations on entangled groups.
    Job {
        /// Selected job subcommand.
        #[command(subcommand)]
        command: JobCommand,
    },
    /// Computation task and allocation operations.
    Task {
        /// Selected task subcommand.
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Result submission and verification operations.
    #[command(name = "result")]
    Results {
        /// Selected result subcommand.
        #[command(subcommand)]
        command: ResultCommand,
    },
    /// Ledger inspection utilities.
    Ledger {
        /// Selected ledger subcommand.
        #[command(subcommand)]
        command: LedgerCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a qubit-market.toml file.
    Validate(ConfigValidateCommand),
    /// Print an annotated example configuration.
    Example,
}

/// Processor subcommands.
#[derive(Subcommand, Debug)]
enum ProcessorCommand {
    /// Register a processor owned by the caller.
    Register(ProcessorRegisterCommand),
    /// Change a processor's operating status.
    Status(ProcessorStatusCommand),
    /// Record maintenance and lower the error rate.
    Maintain(ProcessorMaintainCommand),
    /// Report whether a processor accepts allocations.
    Available(ProcessorQueryCommand),
    /// Show a processor record.
    Show(ProcessorQueryCommand),
}

/// Group subcommands.
#[derive(Subcommand, Debug)]
enum GroupCommand {
    /// Create an entangled group from registered processors.
    Create(GroupCreateCommand),
    /// Re-synchronize a group at the caller's height.
    Sync(GroupSyncCommand),
    /// Report whether a group is entangled at a height.
    Entangled(GroupEntangledCommand),
    /// Show a group record.
    Show(GroupShowCommand),
}

/// Job subcommands.
#[derive(Subcommand, Debug)]
enum JobCommand {
    /// Submit a parallel job to an entangled group.
    Submit(JobSubmitCommand),
    /// Record one processor's partial result.
    #[command(name = "result")]
    Report(JobResultCommand),
    /// Complete a job once every member has reported.
    Complete(JobCompleteCommand),
    /// Show a job record.
    Show(JobShowCommand),
}

/// Task subcommands.
#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// Submit a computation task.
    Submit(TaskSubmitCommand),
    /// Allocate a processor to a pending task.
    Allocate(TaskAllocateCommand),
    /// Start an allocated task.
    Start(TaskExecutionCommand),
    /// Complete a running task.
    Complete(TaskExecutionCommand),
    /// Estimate a task's completion time.
    Estimate(TaskQueryCommand),
    /// Show a task record.
    Show(TaskQueryCommand),
}

/// Result subcommands.
#[derive(Subcommand, Debug)]
enum ResultCommand {
    /// Submit a result for a task.
    Submit(ResultSubmitCommand),
    /// Attest to a result.
    Verify(ResultVerifyCommand),
    /// Promote a result by verifier consensus.
    Consensus(ResultConsensusCommand),
    /// Challenge an attestation.
    Challenge(ResultChallengeCommand),
    /// Report whether a result is verified.
    Verified(ResultQueryCommand),
    /// Show a result record.
    Show(ResultQueryCommand),
    /// Show a verification record.
    Attestation(AttestationShowCommand),
}

/// Ledger subcommands.
#[derive(Subcommand, Debug)]
enum LedgerCommand {
    /// Print the ledger snapshot.
    Show(LedgerShowCommand),
    /// Print the ledger's canonical digest.
    Hash(LedgerHashCommand),
    /// List retained ledger versions.
    History(LedgerHashCommand),
}

/// Supported CLI language selections.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

/// Processor status selections.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum StatusArg {
    /// Accepts allocations.
    Active,
    /// Under maintenance.
    Maintenance,
    /// Offline.
    Offline,
}

impl From<StatusArg> for ProcessorStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Active => Self::Active,
            StatusArg::Maintenance => Self::Maintenance,
            StatusArg::Offline => Self::Offline,
        }
    }
}

// ============================================================================
// SECTION: Shared Arguments
// ============================================================================

/// Store location inputs for ledger commands.
#[derive(Args, Debug, Clone, Default)]
struct StoreLocationArgs {
    /// Optional config file path (defaults to qubit-market.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Optional direct `SQLite` ledger path (overrides config).
    #[arg(long = "store-path", value_name = "PATH")]
    store_path: Option<PathBuf>,
}

/// Caller identity and block height for mutating commands.
#[derive(Args, Debug, Clone)]
struct CallArgs {
    /// Principal issuing the call.
    #[arg(long, value_name = "PRINCIPAL")]
    caller: String,
    /// Block height at which the call executes.
    #[arg(long, value_name = "HEIGHT")]
    height: u64,
}

impl CallArgs {
    /// Builds the engine call context.
    fn context(&self) -> CallContext {
        CallContext::new(self.caller.as_str(), self.height)
    }
}

// ============================================================================
// SECTION: Command Arguments
// ============================================================================

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to qubit-market.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `processor register`.
#[derive(Args, Debug)]
struct ProcessorRegisterCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Processor display name.
    #[arg(long, value_name = "NAME")]
    name: String,
    /// Qubit capacity.
    #[arg(long, value_name = "COUNT")]
    qubits: u32,
    /// Error rate in whole percent.
    #[arg(long = "error-rate", value_name = "PERCENT")]
    error_rate: u8,
}

/// Arguments for `processor status`.
#[derive(Args, Debug)]
struct ProcessorStatusCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Target processor.
    #[arg(long, value_name = "ID")]
    processor: ProcessorId,
    /// New status.
    #[arg(long, value_enum, value_name = "STATUS")]
    status: StatusArg,
}

/// Arguments for `processor maintain`.
#[derive(Args, Debug)]
struct ProcessorMaintainCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Target processor.
    #[arg(long, value_name = "ID")]
    processor: ProcessorId,
    /// Maintenance label (e.g. "calibration").
    #[arg(long = "maintenance-type", value_name = "LABEL")]
    maintenance_type: String,
    /// Error rate after maintenance.
    #[arg(long = "new-error-rate", value_name = "PERCENT")]
    new_error_rate: u8,
}

/// Arguments for processor queries.
#[derive(Args, Debug)]
struct ProcessorQueryCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Target processor.
    #[arg(long, value_name = "ID")]
    processor: ProcessorId,
}

/// Arguments for `group create`.
#[derive(Args, Debug)]
struct GroupCreateCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Group display name.
    #[arg(long, value_name = "NAME")]
    name: String,
    /// Member processors (repeat for each member).
    #[arg(long = "processor", value_name = "ID", required = true)]
    processors: Vec<ProcessorId>,
    /// Entanglement scheme label.
    #[arg(long = "entanglement-type", value_name = "LABEL")]
    entanglement_type: String,
}

/// Arguments for `group sync`.
#[derive(Args, Debug)]
struct GroupSyncCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Target group.
    #[arg(long, value_name = "ID")]
    group: GroupId,
}

/// Arguments for `group entangled`.
#[derive(Args, Debug)]
struct GroupEntangledCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Target group.
    #[arg(long, value_name = "ID")]
    group: GroupId,
    /// Height to evaluate the window at.
    #[arg(long, value_name = "HEIGHT")]
    height: u64,
}

/// Arguments for `group show`.
#[derive(Args, Debug)]
struct GroupShowCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Target group.
    #[arg(long, value_name = "ID")]
    group: GroupId,
}

/// Arguments for `job submit`.
#[derive(Args, Debug)]
struct JobSubmitCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Executing group.
    #[arg(long, value_name = "ID")]
    group: GroupId,
    /// Job display name.
    #[arg(long, value_name = "NAME")]
    name: String,
    /// Number of data partitions.
    #[arg(long, value_name = "COUNT")]
    partitions: u32,
}

/// Arguments for `job result`.
#[derive(Args, Debug)]
struct JobResultCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Target job.
    #[arg(long, value_name = "ID")]
    job: JobId,
    /// Reporting member processor.
    #[arg(long, value_name = "ID")]
    processor: ProcessorId,
    /// Opaque partial result hash.
    #[arg(long = "result-hash", value_name = "HASH")]
    result_hash: String,
}

/// Arguments for `job complete`.
#[derive(Args, Debug)]
struct JobCompleteCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Target job.
    #[arg(long, value_name = "ID")]
    job: JobId,
}

/// Arguments for `job show`.
#[derive(Args, Debug)]
struct JobShowCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Target job.
    #[arg(long, value_name = "ID")]
    job: JobId,
}

/// Arguments for `task submit`.
#[derive(Args, Debug)]
struct TaskSubmitCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Task display name.
    #[arg(long, value_name = "NAME")]
    name: String,
    /// Qubits the task needs.
    #[arg(long, value_name = "COUNT")]
    qubits: u32,
    /// Superposition states the task explores.
    #[arg(long, value_name = "COUNT")]
    states: u32,
}

/// Arguments for `task allocate`.
#[derive(Args, Debug)]
struct TaskAllocateCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Target task.
    #[arg(long, value_name = "ID")]
    task: TaskId,
    /// Processor to allocate.
    #[arg(long, value_name = "ID")]
    processor: ProcessorId,
}

/// Arguments for `task start` and `task complete`.
#[derive(Args, Debug)]
struct TaskExecutionCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Target task.
    #[arg(long, value_name = "ID")]
    task: TaskId,
}

/// Arguments for task queries.
#[derive(Args, Debug)]
struct TaskQueryCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Target task.
    #[arg(long, value_name = "ID")]
    task: TaskId,
}

/// Arguments for `result submit`.
#[derive(Args, Debug)]
struct ResultSubmitCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Answered task.
    #[arg(long, value_name = "ID")]
    task: TaskId,
    /// Producing processor.
    #[arg(long, value_name = "ID")]
    processor: ProcessorId,
    /// Opaque result hash.
    #[arg(long = "result-hash", value_name = "HASH")]
    result_hash: String,
}

/// Arguments for `result verify`.
#[derive(Args, Debug)]
struct ResultVerifyCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Attested result.
    #[arg(long, value_name = "ID")]
    result: ResultId,
    /// Verification method label.
    #[arg(long, value_name = "LABEL")]
    method: String,
    /// Verdict.
    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    valid: bool,
}

/// Arguments for `result consensus`.
#[derive(Args, Debug)]
struct ResultConsensusCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Candidate result.
    #[arg(long, value_name = "ID")]
    result: ResultId,
    /// Counted verifiers (repeat for each).
    #[arg(long = "verifier", value_name = "PRINCIPAL", required = true)]
    verifiers: Vec<String>,
    /// Threshold in whole percent.
    #[arg(long, value_name = "PERCENT")]
    threshold: u8,
}

/// Arguments for `result challenge`.
#[derive(Args, Debug)]
struct ResultChallengeCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Caller and height.
    #[command(flatten)]
    call: CallArgs,
    /// Challenged attestation.
    #[arg(long, value_name = "ID")]
    verification: VerificationId,
}

/// Arguments for result queries.
#[derive(Args, Debug)]
struct ResultQueryCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Target result.
    #[arg(long, value_name = "ID")]
    result: ResultId,
}

/// Arguments for `result attestation`.
#[derive(Args, Debug)]
struct AttestationShowCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Target verification.
    #[arg(long, value_name = "ID")]
    verification: VerificationId,
}

/// Arguments for `ledger show`.
#[derive(Args, Debug)]
struct LedgerShowCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
    /// Retained version to show instead of the latest.
    #[arg(long = "at-version", value_name = "VERSION")]
    version: Option<u64>,
    /// Pretty-print instead of canonical JSON.
    #[arg(long, action = ArgAction::SetTrue)]
    pretty: bool,
}

/// Arguments for `ledger hash` and `ledger history`.
#[derive(Args, Debug)]
struct LedgerHashCommand {
    /// Ledger location.
    #[command(flatten)]
    store: StoreLocationArgs,
}

// ============================================================================
// SECTION: Outputs
// ============================================================================

/// Output for `processor register`.
#[derive(Serialize)]
struct ProcessorRegisteredOutput {
    /// Assigned processor identifier.
    processor_id: ProcessorId,
}

/// Output for `processor status`.
#[derive(Serialize)]
struct ProcessorStatusOutput {
    /// Target processor.
    processor_id: ProcessorId,
    /// Status before the change.
    previous: ProcessorStatus,
    /// Status after the change.
    status: ProcessorStatus,
}

/// Output for `processor available`.
#[derive(Serialize)]
struct AvailabilityOutput {
    /// Target processor.
    processor_id: ProcessorId,
    /// True when the processor accepts allocations.
    available: bool,
}

/// Output for `group create`.
#[derive(Serialize)]
struct GroupCreatedOutput {
    /// Assigned group identifier.
    group_id: GroupId,
}

/// Output for `group sync`.
#[derive(Serialize)]
struct GroupSyncedOutput {
    /// Target group.
    group_id: GroupId,
    /// Recorded synchronization height.
    last_sync: BlockHeight,
}

/// Output for `group entangled`.
#[derive(Serialize)]
struct EntangledOutput {
    /// Target group.
    group_id: GroupId,
    /// Evaluated height.
    block_height: BlockHeight,
    /// True when the group is inside its window.
    entangled: bool,
}

/// Output for `job submit`.
#[derive(Serialize)]
struct JobSubmittedOutput {
    /// Assigned job identifier.
    job_id: JobId,
}

/// Output for `job result`.
#[derive(Serialize)]
struct JobResultOutput {
    /// Target job.
    job_id: JobId,
    /// Partial results recorded so far.
    results: usize,
}

/// Output for `job complete`.
#[derive(Serialize)]
struct JobCompletedOutput {
    /// Target job.
    job_id: JobId,
    /// Completion height.
    completed_at: BlockHeight,
}

/// Output for `task submit`.
#[derive(Serialize)]
struct TaskSubmittedOutput {
    /// Assigned task identifier.
    task_id: TaskId,
}

/// Output for `task allocate`.
#[derive(Serialize)]
struct AllocationOutput {
    /// Target task.
    task_id: TaskId,
    /// Assigned allocation identifier.
    allocation_id: AllocationId,
}

/// Output for `task start` and `task complete`.
#[derive(Serialize)]
struct TaskStatusOutput {
    /// Target task.
    task_id: TaskId,
    /// Status after the transition.
    status: TaskStatus,
}

/// Output for `task estimate`.
#[derive(Serialize)]
struct EstimateOutput {
    /// Target task.
    task_id: TaskId,
    /// Estimated completion time units.
    estimate: u64,
}

/// Output for `result submit`.
#[derive(Serialize)]
struct ResultSubmittedOutput {
    /// Assigned result identifier.
    result_id: ResultId,
}

/// Output for `result verify`.
#[derive(Serialize)]
struct VerificationOutput {
    /// Attested result.
    result_id: ResultId,
    /// Assigned verification identifier.
    verification_id: VerificationId,
}

/// Output for `result consensus`.
#[derive(Serialize)]
struct ConsensusOutput {
    /// Promoted result.
    result_id: ResultId,
    /// Endorsing verifiers counted.
    approvals: usize,
}

/// Output for `result challenge`.
#[derive(Serialize)]
struct ChallengeOutput {
    /// Challenged attestation.
    verification_id: VerificationId,
    /// Confidence after the challenge.
    confidence: u8,
}

/// Output for `result verified`.
#[derive(Serialize)]
struct VerifiedOutput {
    /// Target result.
    result_id: ResultId,
    /// True when the result is verified.
    verified: bool,
}

/// Output for `ledger hash`.
#[derive(Serialize)]
struct LedgerHashOutput {
    /// Market identifier.
    market_id: MarketId,
    /// Canonical ledger digest.
    ledger_hash: HashDigest,
    /// Accepted operation count.
    operations: usize,
    /// Height of the latest accepted operation.
    last_block_height: Option<BlockHeight>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Market engine as driven by the CLI.
type CliMarket = Market<SqliteLedgerStore, Box<dyn AuditSink>>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Config {
            command,
        } => command_config(&command),
        Commands::Processor {
            command,
        } => command_processor(&command),
        Commands::Group {
            command,
        } => command_group(&command),
        Commands::Job {
            command,
        } => command_job(&command),
        Commands::Task {
            command,
        } => command_task(&command),
        Commands::Results {
            command,
        } => command_result(&command),
        Commands::Ledger {
            command,
        } => command_ledger(&command),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(command),
        ConfigCommand::Example => {
            write_stdout_line(config_toml_example().trim_end())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = MarketConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Processor Commands
// ============================================================================

/// Dispatches processor subcommands.
fn command_processor(command: &ProcessorCommand) -> CliResult<ExitCode> {
    match command {
        ProcessorCommand::Register(command) => {
            let market = open_market(&command.store)?;
            let processor_id = market
                .register_processor(&RegisterProcessorRequest {
                    context: command.call.context(),
                    name: command.name.clone(),
                    qubits: command.qubits,
                    error_rate: command.error_rate,
                })
                .map_err(market_error)?;
            emit_json(&ProcessorRegisteredOutput {
                processor_id,
            })
        }
        ProcessorCommand::Status(command) => {
            let market = open_market(&command.store)?;
            let status = ProcessorStatus::from(command.status);
            let previous = market
                .update_processor_status(&UpdateProcessorStatusRequest {
                    context: command.call.context(),
                    processor_id: command.processor,
                    status,
                })
                .map_err(market_error)?;
            emit_json(&ProcessorStatusOutput {
                processor_id: command.processor,
                previous,
                status,
            })
        }
        ProcessorCommand::Maintain(command) => {
            let market = open_market(&command.store)?;
            let record = market
                .perform_maintenance(&MaintenanceRequest {
                    context: command.call.context(),
                    processor_id: command.processor,
                    maintenance_type: command.maintenance_type.clone(),
                    new_error_rate: command.new_error_rate,
                })
                .map_err(market_error)?;
            emit_json(&record)
        }
        ProcessorCommand::Available(command) => {
            let market = open_market(&command.store)?;
            let available = market.is_processor_available(command.processor).map_err(market_error)?;
            emit_json(&AvailabilityOutput {
                processor_id: command.processor,
                available,
            })
        }
        ProcessorCommand::Show(command) => {
            let market = open_market(&command.store)?;
            emit_json(&market.get_processor(command.processor).map_err(market_error)?)
        }
    }
}

// ============================================================================
// SECTION: Group and Job Commands
// ============================================================================

/// Dispatches group subcommands.
fn command_group(command: &GroupCommand) -> CliResult<ExitCode> {
    match command {
        GroupCommand::Create(command) => {
            let market = open_market(&command.store)?;
            let group_id = market
                .create_entangled_group(&CreateGroupRequest {
                    context: command.call.context(),
                    name: command.name.clone(),
                    processor_ids: command.processors.clone(),
                    entanglement_type: command.entanglement_type.clone(),
                })
                .map_err(market_error)?;
            emit_json(&GroupCreatedOutput {
                group_id,
            })
        }
        GroupCommand::Sync(command) => {
            let market = open_market(&command.store)?;
            let last_sync = market
                .synchronize_group(&SynchronizeGroupRequest {
                    context: command.call.context(),
                    group_id: command.group,
                })
                .map_err(market_error)?;
            emit_json(&GroupSyncedOutput {
                group_id: command.group,
                last_sync,
            })
        }
        GroupCommand::Entangled(command) => {
            let market = open_market(&command.store)?;
            let block_height = BlockHeight::new(command.height);
            let entangled =
                market.is_group_entangled(command.group, block_height).map_err(market_error)?;
            emit_json(&EntangledOutput {
                group_id: command.group,
                block_height,
                entangled,
            })
        }
        GroupCommand::Show(command) => {
            let market = open_market(&command.store)?;
            emit_json(&market.get_group(command.group).map_err(market_error)?)
        }
    }
}

/// Dispatches job subcommands.
fn command_job(command: &JobCommand) -> CliResult<ExitCode> {
    match command {
        JobCommand::Submit(command) => {
            let market = open_market(&command.store)?;
            let job_id = market
                .submit_parallel_job(&SubmitParallelJobRequest {
                    context: command.call.context(),
                    group_id: command.group,
                    name: command.name.clone(),
                    data_partitions: command.partitions,
                })
                .map_err(market_error)?;
            emit_json(&JobSubmittedOutput {
                job_id,
            })
        }
        JobCommand::Report(command) => {
            let market = open_market(&command.store)?;
            let results = market
                .submit_processor_result(&SubmitProcessorResultRequest {
                    context: command.call.context(),
                    job_id: command.job,
                    processor_id: command.processor,
                    result_hash: command.result_hash.clone(),
                })
                .map_err(market_error)?;
            emit_json(&JobResultOutput {
                job_id: command.job,
                results,
            })
        }
        JobCommand::Complete(command) => {
            let market = open_market(&command.store)?;
            let completed_at = market
                .complete_parallel_job(&CompleteParallelJobRequest {
                    context: command.call.context(),
                    job_id: command.job,
                })
                .map_err(market_error)?;
            emit_json(&JobCompletedOutput {
                job_id: command.job,
                completed_at,
            })
        }
        JobCommand::Show(command) => {
            let market = open_market(&command.store)?;
            emit_json(&market.get_job(command.job).map_err(market_error)?)
        }
    }
}

// ============================================================================
// SECTION: Task Commands
// ============================================================================

/// Dispatches task subcommands.
fn command_task(command: &TaskCommand) -> CliResult<ExitCode> {
    match command {
        TaskCommand::Submit(command) => {
            let market = open_market(&command.store)?;
            let task_id = market
                .submit_task(&SubmitTaskRequest {
                    context: command.call.context(),
                    name: command.name.clone(),
                    qubits_required: command.qubits,
                    superposition_states: command.states,
                })
                .map_err(market_error)?;
            emit_json(&TaskSubmittedOutput {
                task_id,
            })
        }
        TaskCommand::Allocate(command) => {
            let market = open_market(&command.store)?;
            let allocation_id = market
                .allocate_resources(&AllocateResourcesRequest {
                    context: command.call.context(),
                    task_id: command.task,
                    processor_id: command.processor,
                })
                .map_err(market_error)?;
            emit_json(&AllocationOutput {
                task_id: command.task,
                allocation_id,
            })
        }
        TaskCommand::Start(command) => {
            let market = open_market(&command.store)?;
            let status = market
                .start_task(&TaskExecutionRequest {
                    context: command.call.context(),
                    task_id: command.task,
                })
                .map_err(market_error)?;
            emit_json(&TaskStatusOutput {
                task_id: command.task,
                status,
            })
        }
        TaskCommand::Complete(command) => {
            let market = open_market(&command.store)?;
            let status = market
                .complete_task(&TaskExecutionRequest {
                    context: command.call.context(),
                    task_id: command.task,
                })
                .map_err(market_error)?;
            emit_json(&TaskStatusOutput {
                task_id: command.task,
                status,
            })
        }
        TaskCommand::Estimate(command) => {
            let market = open_market(&command.store)?;
            let estimate = market.estimate_completion_time(command.task).map_err(market_error)?;
            emit_json(&EstimateOutput {
                task_id: command.task,
                estimate,
            })
        }
        TaskCommand::Show(command) => {
            let market = open_market(&command.store)?;
            emit_json(&market.get_task(command.task).map_err(market_error)?)
        }
    }
}

// ============================================================================
// SECTION: Result Commands
// ============================================================================

/// Dispatches result subcommands.
fn command_result(command: &ResultCommand) -> CliResult<ExitCode> {
    match command {
        ResultCommand::Submit(command) => {
            let market = open_market(&command.store)?;
            let result_id = market
                .submit_result(&SubmitResultRequest {
                    context: command.call.context(),
                    task_id: command.task,
                    processor_id: command.processor,
                    result_hash: command.result_hash.clone(),
                })
                .map_err(market_error)?;
            emit_json(&ResultSubmittedOutput {
                result_id,
            })
        }
        ResultCommand::Verify(command) => {
            let market = open_market(&command.store)?;
            let verification_id = market
                .verify_result(&VerifyResultRequest {
                    context: command.call.context(),
                    result_id: command.result,
                    method: command.method.clone(),
                    is_valid: command.valid,
                })
                .map_err(market_error)?;
            emit_json(&VerificationOutput {
                result_id: command.result,
                verification_id,
            })
        }
        ResultCommand::Consensus(command) => {
            let market = open_market(&command.store)?;
            let approvals = market
                .consensus_verify(&ConsensusVerifyRequest {
                    context: command.call.context(),
                    result_id: command.result,
                    verifiers: command.verifiers.iter().map(PrincipalId::new).collect(),
                    threshold: command.threshold,
                })
                .map_err(market_error)?;
            emit_json(&ConsensusOutput {
                result_id: command.result,
                approvals,
            })
        }
        ResultCommand::Challenge(command) => {
            let market = open_market(&command.store)?;
            let confidence = market
                .challenge_verification(&ChallengeVerificationRequest {
                    context: command.call.context(),
                    verification_id: command.verification,
                })
                .map_err(market_error)?;
            emit_json(&ChallengeOutput {
                verification_id: command.verification,
                confidence,
            })
        }
        ResultCommand::Verified(command) => {
            let market = open_market(&command.store)?;
            let verified = market.is_result_verified(command.result).map_err(market_error)?;
            emit_json(&VerifiedOutput {
                result_id: command.result,
                verified,
            })
        }
        ResultCommand::Show(command) => {
            let market = open_market(&command.store)?;
            emit_json(&market.get_result(command.result).map_err(market_error)?)
        }
        ResultCommand::Attestation(command) => {
            let market = open_market(&command.store)?;
            emit_json(&market.get_verification(command.verification).map_err(market_error)?)
        }
    }
}

// ============================================================================
// SECTION: Ledger Commands
// ============================================================================

/// Dispatches ledger subcommands.
fn command_ledger(command: &LedgerCommand) -> CliResult<ExitCode> {
    match command {
        LedgerCommand::Show(command) => command_ledger_show(command),
        LedgerCommand::Hash(command) => {
            let market = open_market(&command.store)?;
            let ledger = market.snapshot().map_err(market_error)?;
            let ledger_hash = market.ledger_hash().map_err(market_error)?;
            emit_json(&LedgerHashOutput {
                market_id: ledger.market_id,
                ledger_hash,
                operations: ledger.operations.len(),
                last_block_height: ledger.last_block_height,
            })
        }
        LedgerCommand::History(command) => {
            let config = resolve_config(&command.store)?;
            let store = open_sqlite_store(&config, &command.store)?;
            let versions = store
                .versions(&config.market_id())
                .map_err(|err| CliError::new(t!("ledger.history.failed", error = err)))?;
            emit_json(&versions)
        }
    }
}

/// Executes `ledger show`.
fn command_ledger_show(command: &LedgerShowCommand) -> CliResult<ExitCode> {
    let ledger = if let Some(version) = command.version {
        let config = resolve_config(&command.store)?;
        let store = open_sqlite_store(&config, &command.store)?;
        store
            .load_version(&config.market_id(), version)
            .map_err(|err| CliError::new(t!("ledger.history.failed", error = err)))?
            .ok_or_else(|| CliError::new(t!("ledger.version.not_found", version = version)))?
    } else {
        open_market(&command.store)?.snapshot().map_err(market_error)?
    };
    if command.pretty {
        let rendered = serde_json::to_string_pretty(&ledger)
            .map_err(|err| CliError::new(t!("output.json_failed", error = err)))?;
        write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }
    emit_json(&ledger)
}

// ============================================================================
// SECTION: Market Wiring
// ============================================================================

/// Loads configuration for a ledger command.
///
/// A direct `--store-path` without `--config` runs on built-in defaults so
/// the ledger can be driven without any config file.
fn resolve_config(location: &StoreLocationArgs) -> CliResult<MarketConfig> {
    if location.store_path.is_some() && location.config.is_none() {
        return Ok(MarketConfig::default());
    }
    MarketConfig::load(location.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

/// Resolves `SQLite` settings from flags and configuration.
fn resolve_sqlite_store_config(
    config: &MarketConfig,
    location: &StoreLocationArgs,
) -> CliResult<SqliteStoreConfig> {
    if let Some(store_path) = &location.store_path {
        return Ok(config.store.sqlite_config().map_or_else(
            || SqliteStoreConfig::new(store_path.clone()),
            |sqlite| SqliteStoreConfig {
                path: store_path.clone(),
                ..sqlite
            },
        ));
    }
    config
        .store
        .sqlite_config()
        .ok_or_else(|| CliError::new(t!("store.config.unsupported_backend")))
}

/// Opens the `SQLite` ledger store.
fn open_sqlite_store(
    config: &MarketConfig,
    location: &StoreLocationArgs,
) -> CliResult<SqliteLedgerStore> {
    let sqlite = resolve_sqlite_store_config(config, location)?;
    SqliteLedgerStore::new(sqlite).map_err(|err| CliError::new(t!("store.open_failed", error = err)))
}

/// Builds the audit sink selected by `[audit]`.
fn build_audit_sink(audit: &AuditConfig) -> CliResult<Box<dyn AuditSink>> {
    if !audit.enabled {
        return Ok(Box::new(NoopAuditSink));
    }
    match &audit.path {
        Some(path) => {
            let sink = FileAuditSink::new(path).map_err(|err| {
                CliError::new(t!("audit.open_failed", path = path.display(), error = err))
            })?;
            Ok(Box::new(sink))
        }
        None => Ok(Box::new(StderrAuditSink)),
    }
}

/// Opens the market engine over the configured ledger.
fn open_market(location: &StoreLocationArgs) -> CliResult<CliMarket> {
    let config = resolve_config(location)?;
    let store = open_sqlite_store(&config, location)?;
    let audit = build_audit_sink(&config.audit)?;
    Market::new(config.market_id(), store, audit, config.to_policy())
        .map_err(|err| CliError::new(t!("market.open_failed", error = err)))
}

/// Formats an engine rejection.
fn market_error(error: MarketError) -> CliError {
    CliError::new(t!("market.operation_failed", kind = error.kind(), error = error))
}

// ============================================================================
// SECTION: Locale
// ============================================================================

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

/// Resolves the CLI locale from flags and environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes canonical JSON followed by a newline to stdout.
fn emit_json<T: Serialize>(value: &T) -> CliResult<ExitCode> {
    let mut bytes = canonical_output_bytes(value)?;
    bytes.push(b'\n');
    let mut stdout = std::io::stdout();
    stdout.write_all(&bytes).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Computes canonical JSON bytes for output rendering.
fn canonical_output_bytes<T: Serialize>(value: &T) -> CliResult<Vec<u8>> {
    serde_jcs::to_vec(value).map_err(|err| CliError::new(t!("output.json_failed", error = err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
