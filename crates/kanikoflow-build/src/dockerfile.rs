//! Dockerfile の読み取り
//!
//! ビルドで参照されるローカルファイル（COPY / ADD のソース）とベースイメージを抜き出します。
//! ARG / ENV による変数展開はステージ単位で追跡します。

use crate::error::ResolveError;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Component, Path};

/// Dockerfile の1命令（継続行は連結済み）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// 命令が始まる行番号（1始まり）
    pub line: usize,
    /// 大文字に正規化したキーワード
    pub keyword: String,
    pub args: String,
}

/// Dockerfile の解析結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockerfileScan {
    /// ビルドコンテキスト基準のソースパス（glob を含み得る）
    pub sources: Vec<String>,
    /// FROM で参照される外部イメージ
    pub base_images: Vec<String>,
}

/// 命令列に分解
///
/// コメント・空行は捨て、行末の `\` による継続行を連結し、ヒアドキュメントの本文は読み飛ばす。
pub fn parse_instructions(content: &str) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    let mut lines = content.lines().enumerate();

    while let Some((index, raw)) = lines.next() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut logical = String::new();
        let mut current = trimmed.to_string();
        loop {
            match current.strip_suffix('\\') {
                Some(head) => {
                    logical.push_str(head.trim_end());
                    logical.push(' ');
                }
                None => {
                    logical.push_str(&current);
                    break;
                }
            }

            // 継続中のコメント行・空行は無視する
            let next = loop {
                match lines.next() {
                    Some((_, line)) => {
                        let line = line.trim();
                        if line.is_empty() || line.starts_with('#') {
                            continue;
                        }
                        break Some(line.to_string());
                    }
                    None => break None,
                }
            };
            match next {
                Some(line) => current = line,
                None => break,
            }
        }

        let logical = logical.trim().to_string();
        let (keyword, args) = match logical.split_once(char::is_whitespace) {
            Some((keyword, args)) => (keyword.to_ascii_uppercase(), args.trim().to_string()),
            None => (logical.to_ascii_uppercase(), String::new()),
        };

        for terminator in heredoc_terminators(&args) {
            for (_, line) in lines.by_ref() {
                if line.trim() == terminator {
                    break;
                }
            }
        }

        instructions.push(Instruction {
            line: index + 1,
            keyword,
            args,
        });
    }

    instructions
}

/// `<<EOF`, `<<-EOF`, `<<"EOF"` から終端語を取り出す
fn heredoc_terminators(args: &str) -> Vec<String> {
    args.split_whitespace()
        .filter_map(|token| token.strip_prefix("<<"))
        .map(|word| word.trim_start_matches('-').trim_matches(|c| c == '"' || c == '\''))
        .filter(|word| {
            !word.is_empty() && word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
        .map(str::to_string)
        .collect()
}

/// Dockerfile を解析し、ローカルソースとベースイメージを集める
///
/// `build_args` は評価済みの値（未設定のものは含まない）。
pub fn scan(
    path: &Path,
    content: &str,
    build_args: &BTreeMap<String, String>,
) -> Result<DockerfileScan, ResolveError> {
    let mut result = DockerfileScan::default();
    let mut global_args: HashMap<String, String> = HashMap::new();
    let mut vars: HashMap<String, String> = HashMap::new();
    let mut stages: HashSet<String> = HashSet::new();
    let mut in_stage = false;

    for instruction in parse_instructions(content) {
        let parse_error = |message: String| ResolveError::Parse {
            path: path.to_path_buf(),
            line: instruction.line,
            message,
        };

        match instruction.keyword.as_str() {
            "ARG" => {
                for (name, default) in split_assignments(&instruction.args, false) {
                    let scope = if in_stage { &vars } else { &global_args };
                    let value = build_args
                        .get(&name)
                        .cloned()
                        .or_else(|| default.map(|d| expand(&d, scope)))
                        .or_else(|| {
                            if in_stage {
                                global_args.get(&name).cloned()
                            } else {
                                None
                            }
                        });

                    let target = if in_stage { &mut vars } else { &mut global_args };
                    match value {
                        Some(value) => {
                            target.insert(name, value);
                        }
                        None => {
                            target.remove(&name);
                        }
                    }
                }
            }
            "ENV" if in_stage => {
                for (name, value) in split_assignments(&instruction.args, true) {
                    let value = expand(&value.unwrap_or_default(), &vars);
                    vars.insert(name, value);
                }
            }
            "FROM" => {
                let expanded = expand(&instruction.args, &global_args);
                let mut tokens = expanded
                    .split_whitespace()
                    .filter(|token| !token.starts_with("--"));
                let image = tokens
                    .next()
                    .ok_or_else(|| parse_error("FROM requires an image".to_string()))?
                    .to_string();

                if !stages.contains(&image.to_ascii_lowercase()) && image != "scratch" {
                    result.base_images.push(image);
                }
                if let (Some(keyword), Some(name)) = (tokens.next(), tokens.next())
                    && keyword.eq_ignore_ascii_case("as")
                {
                    stages.insert(name.to_ascii_lowercase());
                }

                vars.clear();
                in_stage = true;
            }
            "COPY" | "ADD" => {
                let (flags, operands) = split_copy_args(&instruction.args);
                if flags.iter().any(|flag| flag.starts_with("--from")) {
                    continue;
                }
                if operands.len() < 2 {
                    return Err(parse_error(format!(
                        "{} requires at least two arguments",
                        instruction.keyword
                    )));
                }

                let is_add = instruction.keyword == "ADD";
                for source in &operands[..operands.len() - 1] {
                    let source = expand(source, &vars);
                    if source.starts_with("<<") || (is_add && is_remote(&source)) {
                        continue;
                    }
                    if escapes_context(&source) {
                        return Err(parse_error(format!(
                            "forbidden path outside the build context: {}",
                            source
                        )));
                    }
                    result.sources.push(source);
                }
            }
            _ => {}
        }
    }

    Ok(result)
}

/// `KEY=VALUE KEY2=VALUE2` 形式（`legacy_env` なら `ENV KEY VALUE` 形式も）を分解
fn split_assignments(args: &str, legacy_env: bool) -> Vec<(String, Option<String>)> {
    let tokens = split_words(args);

    if legacy_env
        && let Some(first) = tokens.first()
        && !first.contains('=')
    {
        let value = args.trim()[first.len()..].trim();
        return vec![(first.clone(), Some(unquote(value)))];
    }

    tokens
        .into_iter()
        .filter(|token| !token.is_empty())
        .map(|token| match token.split_once('=') {
            Some((key, value)) => (key.to_string(), Some(unquote(value))),
            None => (token, None),
        })
        .collect()
}

/// 空白で分割（引用符内の空白は区切らない）
fn split_words(args: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in args.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                current.push(c);
            }
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                current.push(c);
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

/// COPY / ADD の引数をフラグとオペランドに分ける（JSON 形式にも対応）
fn split_copy_args(args: &str) -> (Vec<String>, Vec<String>) {
    let mut flags = Vec::new();
    let mut rest = args.trim();

    while rest.starts_with("--") {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        flags.push(rest[..end].to_string());
        rest = rest[end..].trim_start();
    }

    if rest.starts_with('[')
        && let Ok(operands) = serde_json::from_str::<Vec<String>>(rest)
    {
        return (flags, operands);
    }

    let operands = rest.split_whitespace().map(str::to_string).collect();
    (flags, operands)
}

fn is_remote(source: &str) -> bool {
    source.contains("://") || source.starts_with("git@")
}

fn escapes_context(source: &str) -> bool {
    let mut depth: i32 = 0;
    for component in Path::new(source.trim_start_matches('/')).components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            Component::Normal(_) => depth += 1,
            _ => {}
        }
    }
    false
}

/// `$VAR`, `${VAR}`, `${VAR:-default}`, `${VAR:+alt}` を展開（未定義は空文字列）
pub fn expand(input: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if chars.peek().map(|(_, next)| *next) == Some('$') => {
                out.push('$');
                chars.next();
            }
            '$' => match chars.peek().copied() {
                Some((_, '{')) => {
                    let body_start = i + 2;
                    match input[body_start..].find('}') {
                        Some(len) => {
                            let end = body_start + len;
                            out.push_str(&expand_braced(&input[body_start..end], vars));
                            // '{' から '}' まで読み飛ばす
                            for (j, _) in chars.by_ref() {
                                if j == end {
                                    break;
                                }
                            }
                        }
                        None => out.push('$'),
                    }
                }
                Some((_, next)) if next.is_ascii_alphabetic() || next == '_' => {
                    let mut name = String::new();
                    while let Some((_, n)) = chars.peek().copied() {
                        if n.is_ascii_alphanumeric() || n == '_' {
                            name.push(n);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if let Some(value) = vars.get(&name) {
                        out.push_str(value);
                    }
                }
                _ => out.push('$'),
            },
            _ => out.push(c),
        }
    }

    out
}

fn expand_braced(body: &str, vars: &HashMap<String, String>) -> String {
    if let Some((name, default)) = body.split_once(":-") {
        return match vars.get(name) {
            Some(value) if !value.is_empty() => value.clone(),
            _ => expand(default, vars),
        };
    }
    if let Some((name, alternative)) = body.split_once(":+") {
        return match vars.get(name) {
            Some(value) if !value.is_empty() => expand(alternative, vars),
            _ => String::new(),
        };
    }
    vars.get(body).cloned().unwrap_or_default()
}

/// イメージ名からレジストリを抽出
///
/// # Examples
/// - `ghcr.io/org/app:tag` -> `ghcr.io`
/// - `myuser/app:tag` -> `docker.io`
/// - `localhost:5000/app` -> `localhost:5000`
pub fn image_registry(image: &str) -> &str {
    if let Some((first, _)) = image.split_once('/')
        && (first.contains('.') || first.contains(':') || first == "localhost")
    {
        return first;
    }

    // デフォルトは Docker Hub
    "docker.io"
}
