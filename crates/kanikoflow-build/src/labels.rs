//! イメージに付与するラベル

use std::collections::BTreeMap;

/// ビルダー種別を示すラベルキー
pub const BUILDER: &str = "skaffold.dev/builder";

/// Kaniko ビルダーのラベル値
pub const KANIKO: &str = "kaniko";

/// `BUILDER` に `kind` を入れたラベル
pub fn builder_labels(kind: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(BUILDER.to_string(), kind.to_string())])
}
