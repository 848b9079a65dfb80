//! ビルドセッション単位の実行コンテキスト

use crate::model::{ClusterConfig, RunConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// TLS 検証を緩めて接続するレジストリのホスト名集合
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InsecureRegistries(BTreeSet<String>);

impl InsecureRegistries {
    pub fn new() -> Self {
        Self::default()
    }

    /// 前後の空白は取り除き、空文字列は無視する
    pub fn insert(&mut self, registry: impl AsRef<str>) -> bool {
        let registry = registry.as_ref().trim();
        if registry.is_empty() {
            return false;
        }
        self.0.insert(registry.to_string())
    }

    pub fn contains(&self, registry: &str) -> bool {
        self.0.contains(registry)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for InsecureRegistries {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut registries = Self::new();
        registries.extend(iter);
        registries
    }
}

impl<S: AsRef<str>> Extend<S> for InsecureRegistries {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for registry in iter {
            self.insert(registry);
        }
    }
}

/// 設定ファイルとコマンドライン指定をまとめたもの
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub config: RunConfig,
    pub insecure_registries: InsecureRegistries,
}

impl RunContext {
    /// 設定ファイルの insecureRegistries と `extra` を合わせた集合を持つコンテキストを作る
    pub fn new<I, S>(config: RunConfig, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut insecure_registries: InsecureRegistries =
            config.build.insecure_registries.iter().collect();
        insecure_registries.extend(extra);

        Self {
            config,
            insecure_registries,
        }
    }

    pub fn cluster(&self) -> Option<&ClusterConfig> {
        self.config.build.cluster.as_ref()
    }
}
