//! Role catalog: who sits in the company and how each role is prompted.
//!
//! The catalog can be supplied as a TOML or JSON file with one table per
//! role. Anything wrong with that file falls back to the builtin table, so a
//! session can always start.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifies a role in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKey {
    Analyst,
    Architect,
    Frontend,
    Backend,
    Dba,
    Tester,
    Manager,
}

/// Worker roles handed out to roster slots, cycled by slot index.
pub const WORKER_SEQUENCE: [RoleKey; 6] = [
    RoleKey::Analyst,
    RoleKey::Architect,
    RoleKey::Frontend,
    RoleKey::Backend,
    RoleKey::Dba,
    RoleKey::Tester,
];

impl RoleKey {
    pub const ALL: [RoleKey; 7] = [
        RoleKey::Analyst,
        RoleKey::Architect,
        RoleKey::Frontend,
        RoleKey::Backend,
        RoleKey::Dba,
        RoleKey::Tester,
        RoleKey::Manager,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoleKey::Analyst => "analyst",
            RoleKey::Architect => "architect",
            RoleKey::Frontend => "frontend",
            RoleKey::Backend => "backend",
            RoleKey::Dba => "dba",
            RoleKey::Tester => "tester",
            RoleKey::Manager => "manager",
        }
    }

    pub fn is_manager(self) -> bool {
        self == RoleKey::Manager
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleKey {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownRole(s.to_string()))
    }
}

/// Display colors available to roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleColor {
    Blue,
    Green,
    Yellow,
    Magenta,
    Cyan,
    Red,
    White,
}

/// Everything the company knows about one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    pub key: RoleKey,
    /// Human-facing title, used in prompts and transcript headings.
    pub title: String,
    /// Role-specific instructions appended to the system prompt.
    pub prompt: String,
    pub color: RoleColor,
    pub skills: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown role key: {0}")]
    UnknownRole(String),
    #[error("role catalog is missing a definition for '{0}'")]
    MissingRole(RoleKey),
    #[error("invalid TOML role catalog: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON role catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("can't read role catalog: {0}")]
    Io(#[from] std::io::Error),
}

/// On-disk shape of a catalog file.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    roles: BTreeMap<String, RoleEntry>,
}

#[derive(Debug, Deserialize)]
struct RoleEntry {
    title: String,
    prompt: String,
    color: RoleColor,
    #[serde(default)]
    skills: Vec<String>,
}

/// Immutable table of role definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCatalog {
    roles: BTreeMap<RoleKey, RoleDefinition>,
}

impl RoleCatalog {
    /// The embedded fallback table.
    pub fn builtin() -> Self {
        let roles = BUILTIN
            .iter()
            .map(|b| {
                let def = RoleDefinition {
                    key: b.key,
                    title: b.title.to_string(),
                    prompt: b.prompt.to_string(),
                    color: b.color,
                    skills: b.skills.iter().map(|s| s.to_string()).collect(),
                };
                (b.key, def)
            })
            .collect();
        Self { roles }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(s)?;
        Self::from_file(file)
    }

    pub fn from_json_str(s: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(s)?;
        Self::from_file(file)
    }

    fn from_file(file: CatalogFile) -> Result<Self, CatalogError> {
        let mut roles = BTreeMap::new();
        for (name, entry) in file.roles {
            let key: RoleKey = name.parse()?;
            roles.insert(
                key,
                RoleDefinition {
                    key,
                    title: entry.title,
                    prompt: entry.prompt,
                    color: entry.color,
                    skills: entry.skills,
                },
            );
        }
        if let Some(missing) = RoleKey::ALL.into_iter().find(|k| !roles.contains_key(k)) {
            return Err(CatalogError::MissingRole(missing));
        }
        Ok(Self { roles })
    }

    /// Read a catalog file, JSON when the extension says so and TOML otherwise.
    pub fn try_load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    /// Like [`RoleCatalog::try_load`], but any failure yields the builtin table.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(catalog) => {
                tracing::info!(path = %path.display(), "Loaded role catalog");
                catalog
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Role catalog unusable, falling back to builtin roles"
                );
                Self::builtin()
            }
        }
    }

    pub fn get(&self, key: RoleKey) -> Option<&RoleDefinition> {
        self.roles.get(&key)
    }

    pub fn require(&self, key: RoleKey) -> Result<&RoleDefinition, CatalogError> {
        self.get(key).ok_or(CatalogError::MissingRole(key))
    }
}

struct BuiltinRole {
    key: RoleKey,
    title: &'static str,
    prompt: &'static str,
    color: RoleColor,
    skills: &'static [&'static str],
}

const BUILTIN: &[BuiltinRole] = &[
    BuiltinRole {
        key: RoleKey::Analyst,
        title: "需求分析师",
        prompt: "作为需求分析师，请分析并细化以下软件需求。输出格式：\n1. 功能需求：[列出主要功能]\n2. 非功能需求：[性能、安全性等]\n3. 用户故事：[描述主要用户场景]\n4. 优先级：[列出功能优先级]",
        color: RoleColor::Blue,
        skills: &["需求获取", "用户故事", "优先级排序"],
    },
    BuiltinRole {
        key: RoleKey::Architect,
        title: "系统架构师",
        prompt: "作为系统架构师，请根据以下需求设计系统架构。输出格式：\n1. 系统组件：[列出主要组件]\n2. 技术栈选择：[前端、后端、数据库等]\n3. 系统交互图：[简要描述组件间交互]\n4. 扩展性考虑：[描述如何支持未来扩展]",
        color: RoleColor::Green,
        skills: &["系统设计", "技术选型", "可扩展性"],
    },
    BuiltinRole {
        key: RoleKey::Frontend,
        title: "前端开发",
        prompt: "作为前端开发工程师，请根据以下需求和架构设计前端代码。输出格式：\n1. 技术栈：[列出使用的前端框架和库]\n2. 组件结构：[描述主要组件及其关系]\n3. 示例代码：[提供关键组件的代码片段]\n4. UI/UX考虑：[描述用户界面和体验设计]",
        color: RoleColor::Yellow,
        skills: &["组件设计", "状态管理", "UI/UX"],
    },
    BuiltinRole {
        key: RoleKey::Backend,
        title: "后端开发",
        prompt: "作为后端开发工程师，请根据以下需求和架构设计后端代码。输出格式：\n1. API设计：[列出主要API端点及其功能]\n2. 数据模型：[描述主要数据实体及关系]\n3. 示例代码：[提供关键功能的代码片段]\n4. 性能优化：[描述性能优化策略]",
        color: RoleColor::Magenta,
        skills: &["API设计", "数据建模", "性能优化"],
    },
    BuiltinRole {
        key: RoleKey::Dba,
        title: "数据库专家",
        prompt: "作为数据库专家，请根据以下需求设计数据库结构。输出格式：\n1. 数据库选择：[推荐的数据库类型及原因]\n2. 表结构设计：[列出主要表及其字段]\n3. 索引策略：[描述主要索引及其用途]\n4. 查询优化：[提供常见查询的优化建议]",
        color: RoleColor::Cyan,
        skills: &["表结构设计", "索引策略", "查询优化"],
    },
    BuiltinRole {
        key: RoleKey::Tester,
        title: "测试工程师",
        prompt: "作为测试工程师，请根据以下需求和实现设计测试用例。输出格式：\n1. 功能测试：[列出主要功能的测试用例]\n2. 性能测试：[描述性能测试策略]\n3. 安全测试：[列出安全相关的测试用例]\n4. 自动化测试：[提供自动化测试建议]",
        color: RoleColor::Red,
        skills: &["测试用例设计", "性能测试", "自动化测试"],
    },
    BuiltinRole {
        key: RoleKey::Manager,
        title: "项目经理",
        prompt: "作为项目经理，请整合以下团队成员的建议，生成一个完整的项目计划和代码结构。输出格式：\n1. 项目概述：[简要描述项目目标和范围]\n2. 里程碑计划：[列出主要项目里程碑]\n3. 资源分配：[描述团队角色和职责]\n4. 风险管理：[识别潜在风险和缓解策略]\n5. 代码结构：[提供项目的文件夹和文件结构]\n6. 完整代码：[为每个文件提供完整的代码内容]",
        color: RoleColor::White,
        skills: &["项目规划", "风险管理", "团队协调"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_TOML: &str = r#"
[roles.analyst]
title = "Analyst"
prompt = "Analyze."
color = "blue"
skills = ["interviews"]

[roles.architect]
title = "Architect"
prompt = "Design."
color = "green"

[roles.frontend]
title = "Frontend"
prompt = "Build UI."
color = "yellow"

[roles.backend]
title = "Backend"
prompt = "Build API."
color = "magenta"

[roles.dba]
title = "DBA"
prompt = "Model data."
color = "cyan"

[roles.tester]
title = "Tester"
prompt = "Test."
color = "red"

[roles.manager]
title = "PM"
prompt = "Integrate."
color = "white"
"#;

    #[test]
    fn builtin_covers_every_role() {
        let catalog = RoleCatalog::builtin();
        for key in RoleKey::ALL {
            assert!(catalog.require(key).is_ok(), "missing {key}");
        }
        assert_eq!(catalog.get(RoleKey::Manager).unwrap().title, "项目经理");
        assert_eq!(catalog.get(RoleKey::Tester).unwrap().color, RoleColor::Red);
    }

    #[test]
    fn lookup_is_stable() {
        let catalog = RoleCatalog::builtin();
        let first = catalog.get(RoleKey::Backend).cloned();
        let second = catalog.get(RoleKey::Backend).cloned();
        assert_eq!(first, second);
    }

    #[test]
    fn role_key_round_trips_through_str() {
        for key in RoleKey::ALL {
            assert_eq!(key.as_str().parse::<RoleKey>().unwrap(), key);
        }
        assert!(matches!(
            "janitor".parse::<RoleKey>(),
            Err(CatalogError::UnknownRole(_))
        ));
    }

    #[test]
    fn parses_toml_catalog() {
        let catalog = RoleCatalog::from_toml_str(MINIMAL_TOML).unwrap();
        let analyst = catalog.get(RoleKey::Analyst).unwrap();
        assert_eq!(analyst.title, "Analyst");
        assert_eq!(analyst.skills, vec!["interviews".to_string()]);
        assert!(catalog.get(RoleKey::Architect).unwrap().skills.is_empty());
    }

    #[test]
    fn parses_json_catalog() {
        let toml_value: toml::Value = toml::from_str(MINIMAL_TOML).unwrap();
        let json = serde_json::to_string(&toml_value).unwrap();
        let catalog = RoleCatalog::from_json_str(&json).unwrap();
        assert_eq!(catalog.get(RoleKey::Manager).unwrap().title, "PM");
    }

    #[test]
    fn incomplete_catalog_is_rejected() {
        let err = RoleCatalog::from_toml_str(
            r#"
[roles.analyst]
title = "Analyst"
prompt = "Analyze."
color = "blue"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::MissingRole(RoleKey::Architect)));
    }

    #[test]
    fn load_falls_back_on_malformed_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "roles = [not valid").unwrap();
        assert_eq!(RoleCatalog::load(file.path()), RoleCatalog::builtin());
    }

    #[test]
    fn load_falls_back_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = RoleCatalog::load(&dir.path().join("roles.toml"));
        assert_eq!(catalog, RoleCatalog::builtin());
    }

    #[test]
    fn load_reads_json_by_extension() {
        let toml_value: toml::Value = toml::from_str(MINIMAL_TOML).unwrap();
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let json = serde_json::to_string(&toml_value).unwrap();
        write!(file, "{json}").unwrap();
        let catalog = RoleCatalog::load(file.path());
        assert_eq!(catalog.get(RoleKey::Dba).unwrap().title, "DBA");
    }
}
