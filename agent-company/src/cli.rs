//! Command-line arguments and the interactive prompts.

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio_util::sync::CancellationToken;

use crate::output::paint;
use crate::roles::RoleColor;
use crate::roster::{MIN_AGENTS, RECOMMENDED_MAX_AGENTS};

#[derive(Debug, Parser)]
#[command(
    name = "agent-company",
    about = "A software company of LLM agents that turns a requirement into a project draft"
)]
pub struct Args {
    /// API key for the chat completion service
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "AGENT_COMPANY_BASE_URL")]
    pub base_url: Option<String>,

    /// Model identifier
    #[arg(long)]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Role catalog file (TOML, or JSON with a .json extension)
    #[arg(long)]
    pub roles: Option<PathBuf>,

    /// Settings file [default: ~/.config/agent-company/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Exchanges of history each agent keeps
    #[arg(long)]
    pub history_limit: Option<usize>,

    /// Write the deliverable's files into this directory
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Number of agents (skips the prompt)
    #[arg(long)]
    pub agents: Option<usize>,

    /// Software requirement (skips the prompt)
    #[arg(long)]
    pub requirement: Option<String>,

    /// Log as JSON
    #[arg(long)]
    pub log_json: bool,
}

/// Verdict on a headcount typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadcountCheck {
    Invalid,
    TooFew,
    NeedsConfirmation(usize),
    Accepted(usize),
}

pub fn parse_headcount(input: &str) -> HeadcountCheck {
    match input.trim().parse::<i64>() {
        Err(_) => HeadcountCheck::Invalid,
        Ok(n) if n < MIN_AGENTS as i64 => HeadcountCheck::TooFew,
        Ok(n) => match usize::try_from(n) {
            Ok(n) if n > RECOMMENDED_MAX_AGENTS => HeadcountCheck::NeedsConfirmation(n),
            Ok(n) => HeadcountCheck::Accepted(n),
            Err(_) => HeadcountCheck::Invalid,
        },
    }
}

/// True for the words that end the feedback loop.
pub fn is_quit(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "quit" | "exit" | "q")
}

const HEADCOUNT_PROMPT: &str = "请输入软件公司的员工数量（至少2人，建议3-7人）: ";
const HEADCOUNT_INVALID: &str = "请输入有效的数字。";
const HEADCOUNT_TOO_FEW: &str = "员工数量必须至少为2人。请重新输入。";
const HEADCOUNT_CONFIRM: &str = "员工数量过多可能会影响系统性能。建议不超过10人。是否继续？(y/n) ";
const REQUIREMENT_PROMPT: &str = "请输入您的软件需求（尽量详细描述功能和特点）: ";
const FEEDBACK_PROMPT: &str = "请输入您的反馈意见（输入 quit 退出）: ";

pub const SAMPLE_REQUIREMENTS: [&str; 3] = [
    "开发一个在线书店系统",
    "创建一个健康追踪应用",
    "设计一个智能家居控制平台",
];

/// Line-oriented prompts over any async reader and sync writer.
pub struct Prompter<R, W> {
    lines: Lines<R>,
    out: W,
}

impl<R: AsyncBufRead + Unpin, W: Write> Prompter<R, W> {
    pub fn new(reader: R, out: W) -> Self {
        Self {
            lines: reader.lines(),
            out,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Print `prompt` and read one line. `None` means end of input.
    pub async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;
        Ok(self.lines.next_line().await?)
    }

    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    /// Keep asking until an acceptable headcount is given.
    pub async fn ask_headcount(&mut self) -> Result<Option<usize>> {
        loop {
            let Some(line) = self.ask(HEADCOUNT_PROMPT).await? else {
                return Ok(None);
            };
            match parse_headcount(&line) {
                HeadcountCheck::Accepted(n) => return Ok(Some(n)),
                HeadcountCheck::Invalid => {
                    self.say(&paint(HEADCOUNT_INVALID, RoleColor::Red))?;
                }
                HeadcountCheck::TooFew => {
                    self.say(&paint(HEADCOUNT_TOO_FEW, RoleColor::Yellow))?;
                }
                HeadcountCheck::NeedsConfirmation(n) => {
                    let question = paint(HEADCOUNT_CONFIRM, RoleColor::Yellow);
                    match self.ask(&question).await? {
                        Some(answer) if answer.trim().eq_ignore_ascii_case("y") => {
                            return Ok(Some(n));
                        }
                        Some(_) => continue,
                        None => return Ok(None),
                    }
                }
            }
        }
    }

    /// Show the sample requirements and read a non-empty requirement.
    pub async fn ask_requirement(&mut self) -> Result<Option<String>> {
        self.say(&paint("软件需求示例：", RoleColor::Cyan))?;
        for (i, sample) in SAMPLE_REQUIREMENTS.iter().enumerate() {
            self.say(&format!("{}. {sample}", i + 1))?;
        }
        loop {
            let Some(line) = self.ask(REQUIREMENT_PROMPT).await? else {
                return Ok(None);
            };
            let line = line.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    /// Read feedback for the next refine pass. `None` on quit or end of input.
    pub async fn ask_feedback(&mut self) -> Result<Option<String>> {
        loop {
            let Some(line) = self.ask(FEEDBACK_PROMPT).await? else {
                return Ok(None);
            };
            if is_quit(&line) {
                return Ok(None);
            }
            let line = line.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }
}

/// First interrupt cancels `cancel` so the session can wind down; a second
/// one calls `force_exit`.
pub async fn handle_interrupts<F, Fut>(
    mut next_interrupt: F,
    cancel: CancellationToken,
    force_exit: impl FnOnce(),
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_interrupt().await.is_err() {
        return;
    }
    cancel.cancel();
    if next_interrupt().await.is_ok() {
        tracing::warn!("Interrupted again, exiting immediately");
        force_exit();
    }
}
