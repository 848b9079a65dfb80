use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// ワークスペース相対のパスを `workspace` 基準の絶対パスに変換
///
/// 既に絶対パスのものはそのまま。順序は保ち、重複は最初の1つだけ残す。
pub fn absolute_paths<I>(workspace: &Path, paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut seen = HashSet::new();

    paths
        .into_iter()
        .map(|path| {
            if path.is_absolute() {
                path
            } else {
                workspace.join(path)
            }
        })
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_paths() {
        let result = absolute_paths(
            Path::new("/ws"),
            vec![PathBuf::from("Dockerfile"), PathBuf::from("src/main.go")],
        );
        assert_eq!(
            result,
            vec![
                PathBuf::from("/ws/Dockerfile"),
                PathBuf::from("/ws/src/main.go")
            ]
        );
    }

    #[test]
    fn test_absolute_paths_keeps_absolute_and_dedups() {
        let result = absolute_paths(
            Path::new("/ws"),
            vec![
                PathBuf::from("b.txt"),
                PathBuf::from("/shared/Dockerfile"),
                PathBuf::from("a.txt"),
                PathBuf::from("/ws/b.txt"),
            ],
        );
        assert_eq!(
            result,
            vec![
                PathBuf::from("/ws/b.txt"),
                PathBuf::from("/shared/Dockerfile"),
                PathBuf::from("/ws/a.txt"),
            ]
        );
    }

    #[test]
    fn test_absolute_paths_empty() {
        assert!(absolute_paths(Path::new("/ws"), Vec::new()).is_empty());
    }
}
