//! The manager's deliverable: a directory tree followed by fenced code
//! blocks whose info string names the file.
//!
//! ~~~text
//! todo/
//!   src/main.py
//!
//! ```src/main.py
//! print("hi")
//! ```
//! ~~~
//!
//! Files are written out as-is. Nothing is compiled or checked.

use std::path::{Component, Path, PathBuf};

/// Extensionless names that still count as files in a fence info string.
const BARE_FILE_NAMES: &[&str] = &["Dockerfile", "Makefile", "Procfile", "Gemfile", "LICENSE"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverableFile {
    pub path: String,
    pub contents: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deliverable {
    /// Everything before the first file block, usually the directory tree.
    pub overview: String,
    pub files: Vec<DeliverableFile>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("refusing to write outside the output directory: {0}")]
    UnsafePath(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Deliverable {
    pub fn parse(text: &str) -> Self {
        let mut overview = Vec::new();
        let mut files = Vec::new();
        // Path, body lines, and how many fences are open inside the body.
        let mut open: Option<(String, Vec<&str>, usize)> = None;
        let mut in_other_block = false;
        let mut seen_file = false;

        for line in text.lines() {
            let trimmed = line.trim();
            if let Some((path, body, depth)) = open.as_mut() {
                if let Some(info) = trimmed.strip_prefix("```") {
                    if !info.trim().is_empty() {
                        *depth += 1;
                    } else if *depth > 0 {
                        *depth -= 1;
                    } else {
                        files.push(DeliverableFile {
                            path: std::mem::take(path),
                            contents: body.join("\n") + "\n",
                        });
                        open = None;
                        continue;
                    }
                }
                body.push(line);
                continue;
            }

            if let Some(info) = trimmed.strip_prefix("```") {
                if in_other_block {
                    in_other_block = false;
                } else if let Some(path) = file_path_from_info(info) {
                    open = Some((path, Vec::new(), 0));
                    seen_file = true;
                    continue;
                } else {
                    in_other_block = true;
                }
            }

            if !seen_file {
                overview.push(line);
            }
        }

        if let Some((path, _, _)) = open {
            tracing::warn!(path = %path, "Deliverable ends inside an unterminated code block");
        }

        Self {
            overview: overview.join("\n").trim().to_string(),
            files,
        }
    }

    /// Write every file beneath `dir`, creating directories as needed.
    pub async fn export(&self, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        for file in &self.files {
            check_relative(&file.path)?;
        }

        let mut written = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let full = dir.join(&file.path);
            if let Some(parent) = full.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| ExportError::Io {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
            tokio::fs::write(&full, &file.contents)
                .await
                .map_err(|source| ExportError::Io {
                    path: full.clone(),
                    source,
                })?;
            tracing::info!(path = %full.display(), bytes = file.contents.len(), "Wrote file");
            written.push(full);
        }
        Ok(written)
    }
}

fn file_path_from_info(info: &str) -> Option<String> {
    let candidate = info.split_whitespace().next()?;
    let looks_like_file = candidate.contains('.')
        || candidate.contains('/')
        || BARE_FILE_NAMES.contains(&candidate);
    looks_like_file.then(|| candidate.to_string())
}

fn check_relative(path: &str) -> Result<(), ExportError> {
    let ok = !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if ok {
        Ok(())
    } else {
        Err(ExportError::UnsafePath(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "todo-app/\n  app.py\n  templates/\n    index.html\n\n```app.py\nfrom flask import Flask\n\napp = Flask(__name__)\n```\n\nSome notes.\n\n```templates/index.html\n<h1>Todo</h1>\n```\n";

    #[test]
    fn splits_overview_and_files() {
        let d = Deliverable::parse(SAMPLE);
        assert_eq!(
            d.overview,
            "todo-app/\n  app.py\n  templates/\n    index.html"
        );
        assert_eq!(d.files.len(), 2);
        assert_eq!(d.files[0].path, "app.py");
        assert_eq!(
            d.files[0].contents,
            "from flask import Flask\n\napp = Flask(__name__)\n"
        );
        assert_eq!(d.files[1].path, "templates/index.html");
    }

    #[test]
    fn language_fences_are_not_files() {
        let text = "tree\n```bash\nmkdir x\n```\n```Dockerfile\nFROM python\n```\n";
        let d = Deliverable::parse(text);
        assert_eq!(d.files.len(), 1);
        assert_eq!(d.files[0].path, "Dockerfile");
        assert!(d.overview.contains("mkdir x"));
    }

    #[test]
    fn fences_inside_a_file_stay_in_that_file() {
        let text = "```README.md\n# App\n\n```bash\npython main.py\n```\n```\n\n```main.py\nprint('hi')\n```\n";
        let d = Deliverable::parse(text);
        let paths: Vec<&str> = d.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "main.py"]);
        assert_eq!(
            d.files[0].contents,
            "# App\n\n```bash\npython main.py\n```\n"
        );
        assert_eq!(d.files[1].contents, "print('hi')\n");
    }

    #[test]
    fn unterminated_block_is_dropped() {
        let d = Deliverable::parse("```main.rs\nfn main() {}\n");
        assert!(d.files.is_empty());
    }

    #[test]
    fn rejects_escaping_paths() {
        assert!(check_relative("src/lib.rs").is_ok());
        assert!(check_relative("./a.txt").is_ok());
        assert!(check_relative("../etc/passwd").is_err());
        assert!(check_relative("/etc/passwd").is_err());
        assert!(check_relative("").is_err());
    }

    #[tokio::test]
    async fn export_writes_tree() {
        let dir = tempfile::tempdir().unwrap();
        let written = Deliverable::parse(SAMPLE).export(dir.path()).await.unwrap();
        assert_eq!(written.len(), 2);
        let page = dir.path().join("templates/index.html");
        let html = std::fs::read_to_string(page).unwrap();
        assert_eq!(html, "<h1>Todo</h1>\n");
    }

    #[tokio::test]
    async fn export_refuses_before_writing_anything() {
        let dir = tempfile::tempdir().unwrap();
        let d = Deliverable::parse("```ok.txt\nfine\n```\n```../evil.txt\nnope\n```\n");
        let err = d.export(dir.path()).await.unwrap_err();
        assert!(matches!(err, ExportError::UnsafePath(_)));
        assert!(!dir.path().join("ok.txt").exists());
    }
}
