//! Module manifest (go.mod) parsing, mutation and formatting
//!
//! Format:
//! ```text
//! module app.test
//!
//! go 1.17
//!
//! require (
//! 	mod.test/two v2
//! 	mod.test/one v1.2.4 // indirect
//! )
//!
//! replace mod.test/two => ../two
//! ```
//!
//! `require`, `exclude` and `replace` accept both the single-line and the
//! parenthesized block form. Entries keep their insertion order and are
//! never merged or de-duplicated.

use crate::{ModError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the manifest file at a module root
pub const MANIFEST_FILE: &str = "go.mod";

/// Directives that are carried through verbatim
const PASSTHROUGH: &[&str] = &["retract", "godebug", "tool", "ignore"];

/// A parsed module manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    path: PathBuf,
    module: String,
    go: Option<String>,
    toolchain: Option<String>,
    requires: Vec<Require>,
    excludes: Vec<ModuleVersion>,
    replaces: Vec<Replace>,
    directives: Vec<Directive>,
}

/// A single requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Require {
    /// Module import path
    pub path: String,

    /// Exact version
    pub version: String,

    /// Marked `// indirect`
    #[serde(default, skip_serializing_if = "is_false")]
    pub indirect: bool,
}

/// A module path with an optional version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleVersion {
    /// Import path, or a directory path on the right side of a replace
    pub path: String,

    /// Version, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A replace directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Replace {
    /// What is being replaced
    pub old: ModuleVersion,

    /// What replaces it
    pub new: ModuleVersion,
}

/// A directive kept as-is (`retract`, `godebug`, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Directive keyword
    pub verb: String,

    /// Remaining tokens
    pub args: Vec<String>,

    /// Trailing `//` comment, without the slashes
    pub comment: Option<String>,
}

impl ModuleVersion {
    fn new(path: &str, version: &str) -> Self {
        Self {
            path: path.to_string(),
            version: if version.is_empty() {
                None
            } else {
                Some(version.to_string())
            },
        }
    }

    /// Whether `path` names a module path or one of its subpackages
    pub fn covers(&self, import_path: &str) -> bool {
        has_path_prefix(import_path, &self.path)
    }
}

impl Replace {
    /// Whether the replacement is a local directory rather than a module
    pub fn is_local(&self) -> bool {
        is_directory_path(&self.new.path)
    }
}

impl Manifest {
    /// Create a manifest declaring `module`, to be stored at `path`
    pub fn new(path: impl Into<PathBuf>, module: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            module: module.into(),
            go: None,
            toolchain: None,
            requires: Vec::new(),
            excludes: Vec::new(),
            replaces: Vec::new(),
            directives: Vec::new(),
        }
    }

    /// Parse manifest text. `path` is used for error messages and `save`.
    pub fn parse(path: impl Into<PathBuf>, data: &[u8]) -> Result<Self> {
        let path = path.into();
        let text = std::str::from_utf8(data).map_err(|e| ModError::Parse {
            path: path.clone(),
            line: 1,
            message: format!("invalid UTF-8: {}", e),
        })?;
        Parser::new(path).parse(text)
    }

    /// Read and parse the manifest at `path`
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| ModError::io(path, e))?;
        Self::parse(path, &data)
    }

    /// Where this manifest lives
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declared module import path
    pub fn module(&self) -> &str {
        &self.module
    }

    /// `go` directive, if present
    pub fn go(&self) -> Option<&str> {
        self.go.as_deref()
    }

    /// `toolchain` directive, if present
    pub fn toolchain(&self) -> Option<&str> {
        self.toolchain.as_deref()
    }

    /// Requirements in insertion order
    pub fn requires(&self) -> &[Require] {
        &self.requires
    }

    /// Exclusions in insertion order
    pub fn excludes(&self) -> &[ModuleVersion] {
        &self.excludes
    }

    /// Replacements in insertion order
    pub fn replaces(&self) -> &[Replace] {
        &self.replaces
    }

    /// Directives carried through verbatim, in source order
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Requirement for exactly `module_path`. When the path is listed more
    /// than once, the last entry wins.
    pub fn require(&self, module_path: &str) -> Option<&Require> {
        self.requires.iter().rev().find(|r| r.path == module_path)
    }

    /// Set the `go` directive
    pub fn set_go(&mut self, version: impl Into<String>) {
        self.go = Some(version.into());
    }

    /// Append a requirement. Existing entries for the same path are kept.
    pub fn add_require(&mut self, module_path: &str, version: &str) {
        self.requires.push(Require {
            path: module_path.to_string(),
            version: version.to_string(),
            indirect: false,
        });
    }

    /// Append a replace directive. Empty versions mean "any version" on the
    /// left side and "none" on the right side (required for directories).
    pub fn add_replace(&mut self, old_path: &str, old_version: &str, new_path: &str, new_version: &str) {
        self.replaces.push(Replace {
            old: ModuleVersion::new(old_path, old_version),
            new: ModuleVersion::new(new_path, new_version),
        });
    }

    /// Serialize to canonical manifest text
    pub fn format(&self) -> Vec<u8> {
        let mut sections: Vec<String> = Vec::new();
        sections.push(format!("module {}\n", quote(&self.module)));

        if let Some(go) = &self.go {
            sections.push(format!("go {}\n", go));
        }
        if let Some(toolchain) = &self.toolchain {
            sections.push(format!("toolchain {}\n", toolchain));
        }

        if !self.requires.is_empty() {
            let mut block = String::from("require (\n");
            for req in &self.requires {
                block.push_str(&format!("\t{} {}", quote(&req.path), quote(&req.version)));
                if req.indirect {
                    block.push_str(" // indirect");
                }
                block.push('\n');
            }
            block.push_str(")\n");
            sections.push(block);
        }

        for exclude in &self.excludes {
            sections.push(format!("exclude {}\n", format_module_version(exclude)));
        }

        for replace in &self.replaces {
            sections.push(format!(
                "replace {} => {}\n",
                format_module_version(&replace.old),
                format_module_version(&replace.new)
            ));
        }

        for directive in &self.directives {
            let args: Vec<String> = directive.args.iter().map(|a| quote(a)).collect();
            let mut line = format!("{} {}", directive.verb, args.join(" "));
            if let Some(comment) = &directive.comment {
                line.push_str(" // ");
                line.push_str(comment);
            }
            line.push('\n');
            sections.push(line);
        }

        sections.join("\n").into_bytes()
    }

    /// Write the formatted manifest back to its path
    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, self.format()).map_err(|e| ModError::io(&self.path, e))?;
        debug!("Saved manifest: {:?}", self.path);
        Ok(())
    }

    /// JSON in the shape of `go mod edit -json`
    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct ModulePath<'a> {
            path: &'a str,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct EditJson<'a> {
            module: ModulePath<'a>,
            #[serde(skip_serializing_if = "Option::is_none")]
            go: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            toolchain: Option<&'a str>,
            require: &'a [Require],
            exclude: &'a [ModuleVersion],
            replace: &'a [Replace],
        }

        let json = EditJson {
            module: ModulePath { path: &self.module },
            go: self.go(),
            toolchain: self.toolchain(),
            require: &self.requires,
            exclude: &self.excludes,
            replace: &self.replaces,
        };
        serde_json::to_string_pretty(&json)
    }
}

/// Whether `import_path` equals `prefix` or lies below it
pub fn has_path_prefix(import_path: &str, prefix: &str) -> bool {
    import_path == prefix
        || (import_path.len() > prefix.len()
            && import_path.starts_with(prefix)
            && import_path.as_bytes()[prefix.len()] == b'/')
}

/// Whether a replacement target is a filesystem path rather than a module
pub fn is_directory_path(path: &str) -> bool {
    path == "."
        || path == ".."
        || path.starts_with("./")
        || path.starts_with("../")
        || Path::new(path).is_absolute()
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn quote(token: &str) -> String {
    let plain = !token.is_empty()
        && !token.contains("//")
        && !token.contains(|c: char| c.is_whitespace() || c == '"' || c == '`');
    if plain {
        return token.to_string();
    }
    let mut quoted = String::with_capacity(token.len() + 2);
    quoted.push('"');
    for c in token.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn format_module_version(mv: &ModuleVersion) -> String {
    match &mv.version {
        Some(version) => format!("{} {}", quote(&mv.path), quote(version)),
        None => quote(&mv.path),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Require,
    Exclude,
    Replace,
    Passthrough(&'static str),
}

/// Line-oriented manifest parser
struct Parser {
    path: PathBuf,
    module: Option<String>,
    manifest: Manifest,
}

impl Parser {
    fn new(path: PathBuf) -> Self {
        Self {
            manifest: Manifest::new(path.clone(), String::new()),
            path,
            module: None,
        }
    }

    fn parse(mut self, text: &str) -> Result<Manifest> {
        let mut block: Option<(Verb, usize)> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let (tokens, comment) = tokenize(raw).map_err(|msg| self.error(line, msg))?;
            if tokens.is_empty() {
                continue;
            }

            if let Some((verb, _)) = block {
                if tokens.len() == 1 && tokens[0] == ")" {
                    block = None;
                } else {
                    self.entry(verb, &tokens, comment.as_deref(), line)?;
                }
                continue;
            }

            let keyword = tokens[0].as_str();
            let args = &tokens[1..];
            match keyword {
                "module" => self.module_decl(args, line)?,
                "go" => self.manifest.go = Some(self.single(keyword, args, line)?),
                "toolchain" => self.manifest.toolchain = Some(self.single(keyword, args, line)?),
                "require" | "exclude" | "replace" => {
                    let verb = match keyword {
                        "require" => Verb::Require,
                        "exclude" => Verb::Exclude,
                        _ => Verb::Replace,
                    };
                    if args.len() == 1 && args[0] == "(" {
                        block = Some((verb, line));
                    } else {
                        self.entry(verb, args, comment.as_deref(), line)?;
                    }
                }
                other => match PASSTHROUGH.iter().copied().find(|v| *v == other) {
                    Some(verb) => {
                        if args.len() == 1 && args[0] == "(" {
                            block = Some((Verb::Passthrough(verb), line));
                        } else {
                            self.entry(Verb::Passthrough(verb), args, comment.as_deref(), line)?;
                        }
                    }
                    None => return Err(self.error(line, format!("unknown directive: {}", other))),
                },
            }
        }

        if let Some((_, start)) = block {
            return Err(self.error(start, "unterminated block: missing )".to_string()));
        }

        match self.module.take() {
            Some(module) => {
                self.manifest.module = module;
                Ok(self.manifest)
            }
            None => Err(self.error(1, "missing module declaration".to_string())),
        }
    }

    fn module_decl(&mut self, args: &[String], line: usize) -> Result<()> {
        if self.module.is_some() {
            return Err(self.error(line, "repeated module statement".to_string()));
        }
        let module = self.single("module", args, line)?;
        self.module = Some(module);
        Ok(())
    }

    fn single(&self, keyword: &str, args: &[String], line: usize) -> Result<String> {
        match args {
            [value] => Ok(value.clone()),
            _ => Err(self.error(line, format!("usage: {} <value>", keyword))),
        }
    }

    fn entry(&mut self, verb: Verb, args: &[String], comment: Option<&str>, line: usize) -> Result<()> {
        match verb {
            Verb::Require => match args {
                [path, version] => {
                    let indirect = comment
                        .map(|c| c == "indirect" || c.starts_with("indirect;"))
                        .unwrap_or(false);
                    self.manifest.requires.push(Require {
                        path: path.clone(),
                        version: version.clone(),
                        indirect,
                    });
                }
                _ => return Err(self.error(line, "usage: require module/path v1.2.3".to_string())),
            },
            Verb::Exclude => match args {
                [path, version] => self.manifest.excludes.push(ModuleVersion::new(path, version)),
                _ => return Err(self.error(line, "usage: exclude module/path v1.2.3".to_string())),
            },
            Verb::Replace => {
                let arrow = args
                    .iter()
                    .position(|a| a == "=>")
                    .ok_or_else(|| self.error(line, "usage: replace module/path [v1.2.3] => other/module v1.4 | dir/path".to_string()))?;
                let (old, new) = (&args[..arrow], &args[arrow + 1..]);
                let old = self.module_version(old, line)?;
                let new = self.module_version(new, line)?;
                if is_directory_path(&new.path) && new.version.is_some() {
                    return Err(self.error(
                        line,
                        "replacement directory path must not have a version".to_string(),
                    ));
                }
                self.manifest.replaces.push(Replace { old, new });
            }
            Verb::Passthrough(verb) => {
                if args.is_empty() {
                    return Err(self.error(line, format!("usage: {} <args>", verb)));
                }
                self.manifest.directives.push(Directive {
                    verb: verb.to_string(),
                    args: args.to_vec(),
                    comment: comment.filter(|c| !c.is_empty()).map(str::to_string),
                });
            }
        }
        Ok(())
    }

    fn module_version(&self, tokens: &[String], line: usize) -> Result<ModuleVersion> {
        match tokens {
            [path] => Ok(ModuleVersion::new(path, "")),
            [path, version] => Ok(ModuleVersion::new(path, version)),
            _ => Err(self.error(line, "usage: replace module/path [v1.2.3] => other/module v1.4 | dir/path".to_string())),
        }
    }

    fn error(&self, line: usize, message: String) -> ModError {
        ModError::Parse {
            path: self.path.clone(),
            line,
            message,
        }
    }
}

/// Split a line into tokens and a trailing `//` comment. Double-quoted and
/// back-quoted tokens are unquoted.
fn tokenize(line: &str) -> std::result::Result<(Vec<String>, Option<String>), String> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if line[start..].starts_with("//") {
            let comment = line[start + 2..].trim().to_string();
            return Ok((tokens, Some(comment)));
        }
        match c {
            '"' => {
                chars.next();
                let mut token = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some((_, escaped)) => token.push(escaped),
                            None => break,
                        },
                        other => token.push(other),
                    }
                }
                if !closed {
                    return Err("unterminated quoted string".to_string());
                }
                tokens.push(token);
            }
            '`' => {
                chars.next();
                let mut token = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '`' {
                        closed = true;
                        break;
                    }
                    token.push(c);
                }
                if !closed {
                    return Err("unterminated raw string".to_string());
                }
                tokens.push(token);
            }
            _ => {
                let mut end = line.len();
                while let Some(&(idx, c)) = chars.peek() {
                    if c.is_whitespace() || line[idx..].starts_with("//") && idx > start {
                        end = idx;
                        break;
                    }
                    chars.next();
                }
                tokens.push(line[start..end].to_string());
            }
        }
    }

    Ok((tokens, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Manifest> {
        Manifest::parse("go.mod", text.as_bytes())
    }

    #[test]
    fn test_parse_module_only() {
        let manifest = parse("module app.test").unwrap();
        assert_eq!(manifest.module(), "app.test");
        assert!(manifest.requires().is_empty());
        assert!(manifest.replaces().is_empty());
        assert_eq!(manifest.path(), Path::new("go.mod"));
    }

    #[test]
    fn test_parse_full() {
        let manifest = parse(
            r#"// app manifest
module github.com/livebud/bud

go 1.17

require (
	github.com/matryer/is v1.4.0
	golang.org/x/mod v0.5.1 // indirect
)

require github.com/Bowery/prompt v0.0.0-20190916142128-fa8279994f75

exclude golang.org/x/sync v0.0.1

replace github.com/livebud/bud-test-plugin => ./plugin
replace (
	golang.org/x/sync v0.0.2 => golang.org/x/sync v0.0.3
)
retract v0.1.0
"#,
        )
        .unwrap();

        assert_eq!(manifest.module(), "github.com/livebud/bud");
        assert_eq!(manifest.go(), Some("1.17"));
        assert_eq!(manifest.requires().len(), 3);
        assert_eq!(manifest.requires()[0].path, "github.com/matryer/is");
        assert!(!manifest.requires()[0].indirect);
        assert!(manifest.requires()[1].indirect);
        assert_eq!(manifest.requires()[2].path, "github.com/Bowery/prompt");
        assert_eq!(manifest.excludes()[0].version.as_deref(), Some("v0.0.1"));

        let replaces = manifest.replaces();
        assert_eq!(replaces.len(), 2);
        assert!(replaces[0].is_local());
        assert_eq!(replaces[0].old.version, None);
        assert_eq!(replaces[1].old.version.as_deref(), Some("v0.0.2"));
        assert_eq!(replaces[1].new.path, "golang.org/x/sync");
        assert!(!replaces[1].is_local());
    }

    #[test]
    fn test_parse_go_directive_without_trailing_newline() {
        let manifest = parse("module mod.test/module\n\ngo 1.12").unwrap();
        assert_eq!(manifest.module(), "mod.test/module");
        assert_eq!(manifest.go(), Some("1.12"));
    }

    #[test]
    fn test_parse_quoted_module() {
        let manifest = parse("module \"app.test/with space\"\n").unwrap();
        assert_eq!(manifest.module(), "app.test/with space");
        assert!(String::from_utf8(manifest.format())
            .unwrap()
            .starts_with("module \"app.test/with space\"\n"));
    }

    #[test]
    fn test_parse_errors() {
        let missing = parse("require mod.test/one v1.0.0\n").unwrap_err();
        assert!(matches!(missing, ModError::Parse { line: 1, .. }));

        let unknown = parse("module app.test\nbogus thing\n").unwrap_err();
        assert!(matches!(unknown, ModError::Parse { line: 2, .. }));

        let unterminated = parse("module app.test\nrequire (\n\tmod.test/one v1\n").unwrap_err();
        assert!(matches!(unterminated, ModError::Parse { line: 2, .. }));

        let repeated = parse("module a.test\nmodule b.test\n").unwrap_err();
        assert!(matches!(repeated, ModError::Parse { line: 2, .. }));

        let bad_require = parse("module app.test\nrequire mod.test/one\n").unwrap_err();
        assert!(matches!(bad_require, ModError::Parse { line: 2, .. }));

        let versioned_dir = parse("module app.test\nreplace a.test => ../a v1.0.0\n").unwrap_err();
        assert!(matches!(versioned_dir, ModError::Parse { line: 2, .. }));

        assert!(!missing.is_not_exist());
    }

    #[test]
    fn test_add_require_format() {
        let mut manifest = parse("module app.test").unwrap();
        manifest.add_require("mod.test/two", "v2");
        manifest.add_require("mod.test/one", "v1.2.4");
        assert_eq!(
            String::from_utf8(manifest.format()).unwrap(),
            "module app.test\n\nrequire (\n\tmod.test/two v2\n\tmod.test/one v1.2.4\n)\n"
        );
    }

    #[test]
    fn test_add_replace_format() {
        let mut manifest = parse("module app.test").unwrap();
        manifest.add_replace("mod.test/two", "", "mod.test/twotwo", "");
        manifest.add_replace("mod.test/one", "", "mod.test/oneone", "");
        assert_eq!(
            String::from_utf8(manifest.format()).unwrap(),
            "module app.test\n\nreplace mod.test/two => mod.test/twotwo\n\nreplace mod.test/one => mod.test/oneone\n"
        );
    }

    #[test]
    fn test_duplicates_are_preserved() {
        let mut manifest = parse("module app.test").unwrap();
        manifest.add_require("mod.test/one", "v1.0.0");
        manifest.add_require("mod.test/one", "v1.1.0");
        assert_eq!(manifest.requires().len(), 2);
        assert_eq!(manifest.require("mod.test/one").unwrap().version, "v1.1.0");
        assert_eq!(
            String::from_utf8(manifest.format()).unwrap(),
            "module app.test\n\nrequire (\n\tmod.test/one v1.0.0\n\tmod.test/one v1.1.0\n)\n"
        );
    }

    #[test]
    fn test_format_reparses_to_same_manifest() {
        let original = parse(
            "module app.test\ngo 1.17\nrequire mod.test/one v1.0.0 // indirect\nexclude mod.test/two v0.1.0\nreplace mod.test/one v1.0.0 => mod.test/uno v1.0.1\nreplace mod.test/three => ../three\nretract [v0.1.0, v0.2.0]\n",
        )
        .unwrap();
        let formatted = original.format();
        let reparsed = Manifest::parse("go.mod", &formatted).unwrap();
        assert_eq!(reparsed, original);
        assert_eq!(reparsed.format(), formatted);
    }

    #[test]
    fn test_passthrough_quoting_and_comments() {
        let original = parse(
            "module app.test\ntool \"a b\" // note\ngodebug (\n\tdefault=go1.21 // pinned\n)\nretract \"v1.0.0 \\\"bad\\\"\"\n",
        )
        .unwrap();
        let directives = original.directives();
        assert_eq!(directives.len(), 3);
        assert_eq!(directives[0].args, vec!["a b".to_string()]);
        assert_eq!(directives[0].comment.as_deref(), Some("note"));
        assert_eq!(directives[1].verb, "godebug");
        assert_eq!(directives[1].comment.as_deref(), Some("pinned"));
        assert_eq!(directives[2].args, vec!["v1.0.0 \"bad\"".to_string()]);
        assert_eq!(directives[2].comment, None);

        let formatted = String::from_utf8(original.format()).unwrap();
        assert!(formatted.contains("tool \"a b\" // note\n"));
        assert!(formatted.contains("godebug default=go1.21 // pinned\n"));
        assert_eq!(Manifest::parse("go.mod", formatted.as_bytes()).unwrap(), original);
    }

    #[test]
    fn test_versions_with_spaces_are_quoted() {
        let mut manifest = parse("module app.test\n").unwrap();
        manifest.add_require("mod.test/one", "v1 beta");
        manifest.add_replace("mod.test/two", "", "mod.test/deux", "v2 rc");
        let reparsed = Manifest::parse("go.mod", &manifest.format()).unwrap();
        assert_eq!(reparsed.requires()[0].version, "v1 beta");
        assert_eq!(reparsed.replaces()[0].new.version.as_deref(), Some("v2 rc"));
    }

    #[test]
    fn test_to_json() {
        let mut manifest = parse("module app.test\ngo 1.17").unwrap();
        manifest.add_require("mod.test/one", "v1.2.4");
        manifest.add_replace("mod.test/one", "", "../one", "");
        let json: serde_json::Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(json["Module"]["Path"], "app.test");
        assert_eq!(json["Go"], "1.17");
        assert_eq!(json["Require"][0]["Path"], "mod.test/one");
        assert_eq!(json["Require"][0]["Version"], "v1.2.4");
        assert!(json["Require"][0].get("Indirect").is_none());
        assert_eq!(json["Replace"][0]["New"]["Path"], "../one");
    }

    #[test]
    fn test_save() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        let mut manifest = Manifest::new(&path, "app.test");
        manifest.add_require("mod.test/one", "v1.2.4");
        manifest.save().unwrap();

        let loaded = Manifest::from_file(&path).unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_has_path_prefix() {
        assert!(has_path_prefix("golang.org/x/mod/modfile", "golang.org/x/mod"));
        assert!(has_path_prefix("golang.org/x/mod", "golang.org/x/mod"));
        assert!(!has_path_prefix("golang.org/x/modfile", "golang.org/x/mod"));
    }
}
