//! agent-company: ask a simulated software company to draft a project.
//!
//! Prompts for a headcount and a requirement, runs the team over it, prints
//! the deliverable, then keeps refining from feedback until `quit`.
//!
//! Requires DEEPSEEK_API_KEY (or --api-key). Ctrl+C stops the current pass; a
//! second Ctrl+C exits at once.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use agent_company::cli::{self, Args, Prompter};
use agent_company::company::{Company, CompanyError};
use agent_company::config::{FileConfig, RunConfig};
use agent_company::deliverable::Deliverable;
use agent_company::llm::{CompletionBackend, LlmClient};
use agent_company::output::{self, BANNER, ConsoleObserver};
use agent_company::roles::{RoleCatalog, RoleColor};
use agent_company::roster::build_roster;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));
    // A stdin read still parked on a blocking thread must not keep us alive.
    runtime.shutdown_background();
    result
}

async fn run(args: Args) -> Result<()> {
    let file = FileConfig::load(args.config.as_deref());
    let settings = RunConfig::resolve(&args, &file)?;
    let catalog = match &settings.roles {
        Some(path) => RoleCatalog::load(path),
        None => RoleCatalog::builtin(),
    };
    let client = LlmClient::with_timeout(settings.api_key.clone(), settings.timeout)?
        .with_base_url(&settings.base_url);
    let backend: Arc<dyn CompletionBackend> = Arc::new(client);

    tracing::info!(
        base_url = %settings.base_url,
        model = %settings.agent.model,
        "Starting agent-company"
    );

    println!("{}", output::paint_bold(BANNER, RoleColor::Cyan));

    let cancel = CancellationToken::new();
    tokio::spawn(cli::handle_interrupts(
        tokio::signal::ctrl_c,
        cancel.clone(),
        || std::process::exit(130),
    ));

    let mut prompter = Prompter::new(BufReader::new(tokio::io::stdin()), std::io::stdout());

    let headcount = match args.agents {
        Some(n) => n,
        None => match interruptible(&cancel, prompter.ask_headcount()).await? {
            Some(n) => n,
            None => return stopped(),
        },
    };

    let roster = build_roster(headcount, &catalog, backend, &settings.agent)?;
    let mut company = Company::with_observer(roster, ConsoleObserver)?;

    let requirement = match args.requirement.clone() {
        Some(r) => r,
        None => match interruptible(&cancel, prompter.ask_requirement()).await? {
            Some(r) => r,
            None => return stopped(),
        },
    };

    let deliverable = match company.develop(&requirement, &cancel).await {
        Ok(text) => text,
        Err(e) => return finish_on_error(e),
    };
    export(&args, &deliverable).await?;

    loop {
        let feedback = match interruptible(&cancel, prompter.ask_feedback()).await? {
            Some(f) => f,
            None => break,
        };
        let refined = match company.refine(&feedback, &cancel).await {
            Ok(text) => text,
            Err(e) => return finish_on_error(e),
        };
        export(&args, &refined).await?;
    }

    println!("{}", output::paint("程序执行完毕，即将退出。", RoleColor::Cyan));
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agent_company=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Await a prompt, treating Ctrl+C like end of input.
async fn interruptible<T>(
    cancel: &CancellationToken,
    prompt: impl std::future::Future<Output = Result<Option<T>>>,
) -> Result<Option<T>> {
    tokio::select! {
        _ = cancel.cancelled() => Ok(None),
        answer = prompt => answer,
    }
}

fn stopped() -> Result<()> {
    println!("\n程序被强制停止");
    Ok(())
}

fn finish_on_error(err: CompanyError) -> Result<()> {
    match err {
        CompanyError::Cancelled { kind, partial } => {
            println!("\n程序被强制停止");
            let keys: Vec<&str> = partial.keys().collect();
            if !keys.is_empty() {
                println!("{kind} pass stopped after: {}", keys.join(", "));
            }
            Ok(())
        }
        other => Err(other.into()),
    }
}

async fn export(args: &Args, text: &str) -> Result<()> {
    let Some(dir) = &args.out_dir else {
        return Ok(());
    };
    let deliverable = Deliverable::parse(text);
    if deliverable.files.is_empty() {
        tracing::warn!("Deliverable has no file blocks, nothing to export");
        return Ok(());
    }
    let written = deliverable
        .export(dir)
        .await
        .with_context(|| format!("Failed to export into {}", dir.display()))?;
    let summary = format!("已写入 {} 个文件到 {}", written.len(), dir.display());
    println!("{}", output::paint(&summary, RoleColor::Green));
    Ok(())
}
