//! Terminal output formatting.
//!
//! Agents' replies are shown as a labelled block in the role's color. The
//! [`ConsoleObserver`] prints a company's progress as it happens.

use crossterm::style::{Color, Stylize};

use crate::agent::{Agent, Reply};
use crate::company::CompanyObserver;
use crate::roles::RoleColor;
use crate::state::PassKind;

pub const BANNER: &str = r#"
  ______    _     _ _     _
 |  ____|  | |   | (_)   ( )
 | |__   __| | __| |_  __|/ ___
 |  __| / _` |/ _` | |/ __| / __|
 | |___| (_| | (_| | | (__  \__ \
 |______\__,_|\__,_|_|\___| |___/

  _____
 / ____|
| |     ___  _ __ ___  _ __   __ _ _ __  _   _
| |    / _ \| '_ ` _ \| '_ \ / _` | '_ \| | | |
| |___| (_) | | | | | | |_) | (_| | | | | |_| |
 \_____\___/|_| |_| |_| .__/ \__,_|_| |_|\__, |
                      | |                 __/ |
                      |_|                |___/
"#;

/// Terminal color for a role color. Uses the standard (non-bright) palette.
pub fn terminal_color(color: RoleColor) -> Color {
    match color {
        RoleColor::Blue => Color::DarkBlue,
        RoleColor::Green => Color::DarkGreen,
        RoleColor::Yellow => Color::DarkYellow,
        RoleColor::Magenta => Color::DarkMagenta,
        RoleColor::Cyan => Color::DarkCyan,
        RoleColor::Red => Color::DarkRed,
        RoleColor::White => Color::Grey,
    }
}

pub fn paint(text: &str, color: RoleColor) -> String {
    text.with(terminal_color(color)).to_string()
}

pub fn paint_bold(text: &str, color: RoleColor) -> String {
    text.with(terminal_color(color)).bold().to_string()
}

/// `[<title>的回复]` followed by every reply line indented two spaces.
pub fn render_reply(title: &str, raw: &str, color: RoleColor) -> String {
    let mut lines = vec![paint(&format!("[{title}的回复]"), color)];
    for line in raw.split('\n') {
        lines.push(paint(&format!("  {line}"), color));
    }
    lines.join("\n")
}

/// Prints progress to stdout.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl CompanyObserver for ConsoleObserver {
    fn on_pass_started(&mut self, kind: PassKind) {
        let banner = match kind {
            PassKind::Develop => "--- 开始软件开发流程 ---",
            PassKind::Refine => "--- 开始项目优化流程 ---",
        };
        println!("{}", paint_bold(banner, RoleColor::White));
    }

    fn on_agent_started(&mut self, agent: &Agent) {
        let role = agent.role();
        let line = format!("{} ({}) 正在处理消息...", agent.name(), role.title);
        println!("{}", paint(&line, role.color));
    }

    fn on_agent_reply(&mut self, _agent: &Agent, reply: &Reply, _transcript: &str) {
        println!("{}", reply.formatted);
    }

    fn on_deliverable(&mut self, kind: PassKind, text: &str) {
        let heading = match kind {
            PassKind::Develop => "\n最终项目结构和代码:",
            PassKind::Refine => "\n优化后的项目结构和代码:",
        };
        println!("{}", paint_bold(heading, RoleColor::White));
        println!("{text}");
    }

    fn on_pass_finished(&mut self, kind: PassKind) {
        let banner = match kind {
            PassKind::Develop => "--- 软件开发流程结束 ---",
            PassKind::Refine => "--- 项目优化流程结束 ---",
        };
        println!("{}", paint_bold(banner, RoleColor::White));
    }
}
