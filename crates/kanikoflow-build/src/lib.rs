//! kanikoflow のクラスタビルダー
//!
//! Kubernetes 上の Kaniko でイメージをビルドするビルダーのうち、
//! クラスタに出す前の部分を提供します:
//!
//! - 実行コンテキストからのビルダー構築と検証
//! - Dockerfile の依存ファイル解決（再ビルドのトリガー判定用）
//! - ビルダー種別ラベルの付与
//! - リソース片付けフック（Kaniko では何もしない）
//!
//! ```text
//! RunContext ──► ClusterBuilder ──► DependencyResolver ──► Dockerfile / .dockerignore
//!                     │
//!                     └─► labels(), prune()
//! ```

pub mod builder;
pub mod dockerfile;
pub mod error;
pub mod exec;
pub mod ignore;
pub mod kaniko;
pub mod labels;
pub mod paths;
pub mod resolver;

pub use builder::ArtifactBuilder;
pub use error::{BuildError, ErrorKind, ResolveError, Result};
pub use exec::{ExecContext, Interrupted};
pub use ignore::DockerIgnore;
pub use kaniko::ClusterBuilder;
pub use paths::absolute_paths;
pub use resolver::{DependencyRequest, DependencyResolver, DockerfileResolver};
