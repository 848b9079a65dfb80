//! アーティファクトの依存ファイル解決
//!
//! [`DependencyResolver`] はワークスペース相対のパス一覧を返します。
//! 既定の実装 [`DockerfileResolver`] は Dockerfile の COPY / ADD ソースを展開し、
//! .dockerignore で除外されたものを取り除きます。

use crate::dockerfile::{self, image_registry};
use crate::error::ResolveError;
use crate::exec::ExecContext;
use crate::ignore::DockerIgnore;
use async_trait::async_trait;
use kanikoflow_config::{BuildArgs, InsecureRegistries};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 依存ファイル解決の入力
#[derive(Debug, Clone, Copy)]
pub struct DependencyRequest<'a> {
    pub workspace: &'a Path,
    /// ワークスペース相対（または絶対）の Dockerfile パス
    pub dockerfile: &'a Path,
    pub build_args: &'a BuildArgs,
    /// ベースイメージの参照時に TLS 検証を緩めるレジストリ
    ///
    /// [`DockerfileResolver`] はレジストリに接続しない。
    /// ベースイメージが含まれるかをログに残すだけ。
    pub insecure_registries: &'a InsecureRegistries,
}

#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// 依存ファイルをワークスペース相対パスで返す
    async fn resolve(
        &self,
        ctx: &ExecContext,
        request: &DependencyRequest<'_>,
    ) -> Result<Vec<PathBuf>, ResolveError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DockerfileResolver;

impl DockerfileResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DependencyResolver for DockerfileResolver {
    async fn resolve(
        &self,
        ctx: &ExecContext,
        request: &DependencyRequest<'_>,
    ) -> Result<Vec<PathBuf>, ResolveError> {
        let walk = Walk {
            ctx: ctx.clone(),
            workspace: request.workspace.to_path_buf(),
            dockerfile: request.workspace.join(request.dockerfile),
            build_args: evaluate_build_args(request.build_args),
            insecure_registries: request.insecure_registries.clone(),
        };

        let handle = tokio::task::spawn_blocking(move || walk.run());
        match ctx.run(handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(ResolveError::Other(anyhow::anyhow!(
                "dependency walk aborted: {}",
                join_error
            ))),
            Err(reason) => {
                debug!(%reason, "Dependency resolution interrupted");
                Err(reason.into())
            }
        }
    }
}

/// ビルド引数の値を確定させる
///
/// 値のない引数は環境変数から取り、環境変数もなければ Dockerfile のデフォルトに任せる。
fn evaluate_build_args(build_args: &BuildArgs) -> BTreeMap<String, String> {
    let mut evaluated = BTreeMap::new();

    for (key, value) in build_args {
        warn_sensitive_build_arg(key);
        let value = match value {
            Some(value) => Some(value.clone()),
            None => std::env::var(key).ok(),
        };
        if let Some(value) = value {
            evaluated.insert(key.clone(), value);
        }
    }

    evaluated
}

/// ビルド引数の検証（機密情報の警告）
fn warn_sensitive_build_arg(key: &str) {
    let sensitive_patterns = ["password", "token", "secret", "api_key", "private_key"];

    let key_lower = key.to_lowercase();
    if sensitive_patterns
        .iter()
        .any(|pattern| key_lower.contains(pattern))
    {
        warn!(
            "ビルド引数 '{}' は機密情報を含む可能性があります。\
             ビルド引数はイメージ履歴に記録されます。",
            key
        );
    }
}

/// ブロッキングスレッド上で行うファイル走査
struct Walk {
    ctx: ExecContext,
    workspace: PathBuf,
    dockerfile: PathBuf,
    build_args: BTreeMap<String, String>,
    insecure_registries: InsecureRegistries,
}

impl Walk {
    fn run(self) -> Result<Vec<PathBuf>, ResolveError> {
        self.ctx.check()?;

        if !self.dockerfile.is_file() {
            return Err(ResolveError::DockerfileNotFound(self.dockerfile.clone()));
        }
        let content = std::fs::read_to_string(&self.dockerfile)?;
        let scan = dockerfile::scan(&self.dockerfile, &content, &self.build_args)?;

        for image in &scan.base_images {
            let registry = image_registry(image);
            if self.insecure_registries.contains(registry) {
                debug!(image = %image, registry, "Base image comes from an insecure registry");
            }
        }

        let ignore = DockerIgnore::load(&self.workspace, &self.dockerfile)?;
        let mut deps = BTreeSet::new();

        // Dockerfile 自身は除外設定に関わらず常に依存
        deps.insert(self.relative(&self.dockerfile));

        for source in &scan.sources {
            self.ctx.check()?;
            self.expand_source(source, &ignore, &mut deps)?;
        }

        debug!(
            dockerfile = %self.dockerfile.display(),
            sources = scan.sources.len(),
            files = deps.len(),
            "Resolved Dockerfile dependencies"
        );

        Ok(deps.into_iter().collect())
    }

    fn expand_source(
        &self,
        source: &str,
        ignore: &DockerIgnore,
        deps: &mut BTreeSet<PathBuf>,
    ) -> Result<(), ResolveError> {
        // COPY の絶対パスはコンテキストルート基準
        let cleaned = source.trim_start_matches('/');
        let cleaned = match cleaned {
            "" | "." | "./" => "",
            other => other.trim_start_matches("./"),
        };

        let matches = if has_glob_meta(cleaned) {
            let root = glob::Pattern::escape(&self.workspace.to_string_lossy());
            let pattern = format!("{}/{}", root.trim_end_matches('/'), cleaned);
            let paths = glob::glob(&pattern).map_err(|source| ResolveError::Pattern {
                pattern: source_pattern(cleaned),
                source,
            })?;

            let mut matches = Vec::new();
            for entry in paths {
                matches.push(entry.map_err(glob::GlobError::into_error)?);
            }
            matches
        } else {
            let path = self.workspace.join(cleaned);
            if path.exists() { vec![path] } else { Vec::new() }
        };

        if matches.is_empty() {
            return Err(ResolveError::NoMatch {
                pattern: source.to_string(),
            });
        }

        for path in matches {
            self.add_path(&path, ignore, deps)?;
        }
        Ok(())
    }

    fn add_path(
        &self,
        path: &Path,
        ignore: &DockerIgnore,
        deps: &mut BTreeSet<PathBuf>,
    ) -> Result<(), ResolveError> {
        self.ctx.check()?;

        let relative = self.relative(path);
        let metadata = std::fs::symlink_metadata(path)?;

        if metadata.is_dir() {
            // コンテキストルート自体は除外ルールの対象外
            let is_root = path == self.workspace;
            if !is_root && ignore.is_excluded(&relative) && !ignore.has_exceptions() {
                return Ok(());
            }

            let mut entries = std::fs::read_dir(path)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<Result<Vec<_>, _>>()?;
            entries.sort();

            for entry in entries {
                self.add_path(&entry, ignore, deps)?;
            }
        } else if !ignore.is_excluded(&relative) {
            deps.insert(relative);
        }

        Ok(())
    }

    /// ワークスペース外のパスはそのまま返す
    fn relative(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(&self.workspace) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
            _ => path.to_path_buf(),
        }
    }
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn source_pattern(cleaned: &str) -> String {
    if cleaned.is_empty() {
        ".".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn workspace(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = tempdir().unwrap();
        for (path, content) in files {
            let path = temp_dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        temp_dir
    }

    async fn resolve(
        dir: &Path,
        dockerfile: &str,
        build_args: &BuildArgs,
    ) -> Result<Vec<PathBuf>, ResolveError> {
        let registries = InsecureRegistries::new();
        let request = DependencyRequest {
            workspace: dir,
            dockerfile: Path::new(dockerfile),
            build_args,
            insecure_registries: &registries,
        };
        DockerfileResolver::new()
            .resolve(&ExecContext::new(), &request)
            .await
    }

    fn paths(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn test_resolve_copy_sources() {
        let dir = workspace(&[
            ("Dockerfile", "FROM golang\nCOPY go.mod main.go ./\nCOPY pkg /src/pkg\n"),
            ("go.mod", "module x"),
            ("main.go", "package main"),
            ("pkg/util/util.go", "package util"),
            ("pkg/util/util_test.go", "package util"),
            ("unrelated.txt", "x"),
        ]);

        let deps = resolve(dir.path(), "Dockerfile", &BuildArgs::new())
            .await
            .unwrap();

        assert_eq!(
            deps,
            paths(&[
                "Dockerfile",
                "go.mod",
                "main.go",
                "pkg/util/util.go",
                "pkg/util/util_test.go",
            ])
        );
    }

    #[tokio::test]
    async fn test_resolve_whole_context_with_dockerignore() {
        let dir = workspace(&[
            ("Dockerfile", "FROM node\nCOPY . /app\n"),
            (".dockerignore", "node_modules\n*.log\nDockerfile\n"),
            ("index.js", "//"),
            ("debug.log", "log"),
            ("node_modules/pkg/index.js", "//"),
        ]);

        let deps = resolve(dir.path(), "Dockerfile", &BuildArgs::new())
            .await
            .unwrap();

        assert_eq!(deps, paths(&[".dockerignore", "Dockerfile", "index.js"]));
    }

    #[tokio::test]
    async fn test_resolve_dockerignore_ignores_workspace_ancestors() {
        let dir = workspace(&[
            ("Dockerfile", "FROM golang\nCOPY . /app\n"),
            ("main.go", "package main"),
            ("vendor/lib.go", "package lib"),
        ]);

        // ワークスペースの先頭ディレクトリ名（/tmp なら "tmp"）に一致するルール
        let top = dir
            .path()
            .components()
            .find_map(|c| match c {
                std::path::Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .unwrap();
        fs::write(
            dir.path().join(".dockerignore"),
            format!("{}\nvendor\n", top),
        )
        .unwrap();

        let deps = resolve(dir.path(), "Dockerfile", &BuildArgs::new())
            .await
            .unwrap();

        assert_eq!(deps, paths(&[".dockerignore", "Dockerfile", "main.go"]));
    }

    #[tokio::test]
    async fn test_resolve_with_insecure_base_image() {
        let dir = workspace(&[
            ("Dockerfile", "FROM registry.local:5000/base:1\nCOPY main.go /\n"),
            ("main.go", "package main"),
        ]);
        let registries: InsecureRegistries = ["registry.local:5000"].into_iter().collect();
        let build_args = BuildArgs::new();
        let request = DependencyRequest {
            workspace: dir.path(),
            dockerfile: Path::new("Dockerfile"),
            build_args: &build_args,
            insecure_registries: &registries,
        };

        let deps = DockerfileResolver::new()
            .resolve(&ExecContext::new(), &request)
            .await
            .unwrap();

        assert_eq!(deps, paths(&["Dockerfile", "main.go"]));
    }

    #[tokio::test]
    async fn test_resolve_glob_and_build_args() {
        let dir = workspace(&[
            (
                "docker/app.Dockerfile",
                "FROM python\nARG APP=api\nCOPY services/${APP}/*.py /app/\n",
            ),
            ("services/api/main.py", ""),
            ("services/web/main.py", ""),
            ("services/web/views.py", ""),
            ("services/web/README.md", ""),
        ]);

        let mut build_args = BuildArgs::new();
        build_args.insert("APP".to_string(), Some("web".to_string()));

        let deps = resolve(dir.path(), "docker/app.Dockerfile", &build_args)
            .await
            .unwrap();

        assert_eq!(
            deps,
            paths(&[
                "docker/app.Dockerfile",
                "services/web/main.py",
                "services/web/views.py",
            ])
        );
    }

    #[tokio::test]
    async fn test_resolve_build_arg_from_environment() {
        let dir = workspace(&[
            ("Dockerfile", "FROM alpine\nARG KF_TEST_CONFIG_DIR=default\nCOPY $KF_TEST_CONFIG_DIR /etc/app\n"),
            ("default/app.conf", ""),
            ("custom/app.conf", ""),
        ]);

        let mut build_args = BuildArgs::new();
        build_args.insert("KF_TEST_CONFIG_DIR".to_string(), None);

        let deps = temp_env::async_with_vars(
            [("KF_TEST_CONFIG_DIR", Some("custom"))],
            resolve(dir.path(), "Dockerfile", &build_args),
        )
        .await
        .unwrap();
        assert_eq!(deps, paths(&["Dockerfile", "custom/app.conf"]));

        let deps = temp_env::async_with_vars(
            [("KF_TEST_CONFIG_DIR", None::<&str>)],
            resolve(dir.path(), "Dockerfile", &build_args),
        )
        .await
        .unwrap();
        assert_eq!(deps, paths(&["Dockerfile", "default/app.conf"]));
    }

    #[tokio::test]
    async fn test_resolve_missing_dockerfile() {
        let dir = workspace(&[]);

        let err = resolve(dir.path(), "Dockerfile", &BuildArgs::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::DockerfileNotFound(path) if path.ends_with("Dockerfile")));
    }

    #[tokio::test]
    async fn test_resolve_missing_source() {
        let dir = workspace(&[("Dockerfile", "FROM alpine\nCOPY missing.txt /\n")]);

        let err = resolve(dir.path(), "Dockerfile", &BuildArgs::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoMatch { ref pattern } if pattern == "missing.txt"));
    }

    #[tokio::test]
    async fn test_resolve_glob_without_matches() {
        let dir = workspace(&[("Dockerfile", "FROM alpine\nCOPY *.jar /\n")]);

        let err = resolve(dir.path(), "Dockerfile", &BuildArgs::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoMatch { .. }));
    }

    #[tokio::test]
    async fn test_resolve_cancelled() {
        let dir = workspace(&[("Dockerfile", "FROM alpine\n")]);
        let registries = InsecureRegistries::new();
        let build_args = BuildArgs::new();
        let request = DependencyRequest {
            workspace: dir.path(),
            dockerfile: Path::new("Dockerfile"),
            build_args: &build_args,
            insecure_registries: &registries,
        };

        let ctx = ExecContext::new();
        ctx.cancel();

        let err = DockerfileResolver::new()
            .resolve(&ctx, &request)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Interrupted(crate::exec::Interrupted::Cancelled)
        ));
    }

    #[test]
    fn test_evaluate_build_args() {
        let mut build_args = BuildArgs::new();
        build_args.insert("EXPLICIT".to_string(), Some("1".to_string()));
        build_args.insert("KF_TEST_UNSET_ARG".to_string(), None);

        let evaluated = temp_env::with_var_unset("KF_TEST_UNSET_ARG", || {
            evaluate_build_args(&build_args)
        });

        assert_eq!(evaluated.get("EXPLICIT").map(String::as_str), Some("1"));
        assert!(!evaluated.contains_key("KF_TEST_UNSET_ARG"));
    }
}
