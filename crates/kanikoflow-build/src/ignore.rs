//! .dockerignore の評価

use crate::error::ResolveError;
use glob::{MatchOptions, Pattern};
use std::path::Path;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
struct Rule {
    pattern: Pattern,
    /// `!` で始まる再包含ルール
    negate: bool,
}

/// ビルドコンテキストから除外するパスの集合
#[derive(Debug, Clone, Default)]
pub struct DockerIgnore {
    rules: Vec<Rule>,
}

impl DockerIgnore {
    pub fn parse(content: &str) -> Result<Self, ResolveError> {
        let mut rules = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (negate, raw) = match line.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, line),
            };
            let cleaned = raw
                .trim_start_matches("./")
                .trim_start_matches('/')
                .trim_end_matches('/');
            if cleaned.is_empty() {
                continue;
            }

            let pattern = Pattern::new(cleaned).map_err(|source| ResolveError::Pattern {
                pattern: raw.to_string(),
                source,
            })?;
            rules.push(Rule { pattern, negate });
        }

        Ok(Self { rules })
    }

    /// `<Dockerfile>.dockerignore` があればそれを、なければワークスペース直下の .dockerignore を使う
    pub fn load(workspace: &Path, dockerfile: &Path) -> Result<Self, ResolveError> {
        let mut candidates = Vec::new();
        if let Some(name) = dockerfile.file_name() {
            let mut specific = name.to_os_string();
            specific.push(".dockerignore");
            candidates.push(dockerfile.with_file_name(specific));
        }
        candidates.push(workspace.join(".dockerignore"));

        for candidate in candidates {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "Using ignore file");
                let content = std::fs::read_to_string(&candidate)?;
                return Self::parse(&content);
            }
        }

        Ok(Self::default())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 再包含ルールを含むか（除外ディレクトリの中も調べる必要がある）
    pub fn has_exceptions(&self) -> bool {
        self.rules.iter().any(|rule| rule.negate)
    }

    /// ワークスペース相対パスが除外対象か
    ///
    /// パス自身か、その親ディレクトリのいずれかにマッチした最後のルールで決まる。
    pub fn is_excluded(&self, relative: &Path) -> bool {
        if self.rules.is_empty() {
            return false;
        }

        let mut prefixes = Vec::new();
        let mut current = String::new();
        for component in relative.components() {
            if let std::path::Component::Normal(part) = component {
                if !current.is_empty() {
                    current.push('/');
                }
                current.push_str(&part.to_string_lossy());
                prefixes.push(current.clone());
            }
        }

        let mut excluded = false;
        for rule in &self.rules {
            if prefixes
                .iter()
                .any(|prefix| rule.pattern.matches_with(prefix, MATCH_OPTIONS))
            {
                excluded = !rule.negate;
            }
        }
        excluded
    }
}
