//! Resolution of the application id from the submission's manifests.
//!
//! A manifest is authoritative only when its declared id equals its own file
//! base name: `org.gnome.Maps.yml` declaring `app-id: org.gnome.Maps`.
//! Modules and shared fragments living next to it declare other ids (or none)
//! and are skipped.

use std::path::{Path, PathBuf};

use promotion::AppId;

/// Extensions searched, in order.
pub const MANIFEST_EXTENSIONS: [&str; 3] = ["yml", "yaml", "json"];

/// Keys holding the application id, in order of preference.
const ID_KEYS: [&str; 2] = ["app-id", "id"];

/// The self-naming manifest found in a clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedManifest {
    /// File name relative to the clone root.
    pub file_name: String,
    /// Declared id, equal to the file stem.
    pub app_id: AppId,
}

/// Finds the first self-naming manifest in `dir`.
///
/// Unreadable or unparsable candidates are logged and skipped. Only listing
/// the directory itself can fail.
pub fn resolve_app_id(dir: &Path) -> std::io::Result<Option<ResolvedManifest>> {
    for path in candidates(dir)? {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        tracing::info!(manifest = file_name, "parsing manifest candidate");

        let declared = match read_declared_id(&path) {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::info!(manifest = file_name, "no app-id or id field");
                continue;
            }
            Err(message) => {
                tracing::warn!(manifest = file_name, error = %message, "failed to parse manifest");
                continue;
            }
        };

        if declared != stem {
            tracing::info!(
                manifest = file_name,
                declared = %declared,
                "declared id differs from file name"
            );
            continue;
        }
        match AppId::parse(&declared) {
            Some(app_id) => {
                tracing::info!(manifest = file_name, %app_id, "resolved application id");
                return Ok(Some(ResolvedManifest {
                    file_name: file_name.to_string(),
                    app_id,
                }));
            }
            None => tracing::warn!(
                manifest = file_name,
                declared = %declared,
                "declared id is not usable as a repository name"
            ),
        }
    }
    Ok(None)
}

/// Regular files in `dir` with a manifest extension: by extension order, then by name.
fn candidates(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }

    let rank = |path: &PathBuf| {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| MANIFEST_EXTENSIONS.iter().position(|known| *known == e))
    };
    let mut ranked: Vec<(usize, PathBuf)> = files
        .into_iter()
        .filter_map(|p| rank(&p).map(|r| (r, p)))
        .collect();
    ranked.sort();
    Ok(ranked.into_iter().map(|(_, p)| p).collect())
}

fn read_declared_id(path: &Path) -> Result<Option<String>, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let is_json = path.extension().is_some_and(|e| e == "json");

    if is_json {
        let value: serde_json::Value =
            serde_json::from_str(&strip_json_comments(&text)).map_err(|e| e.to_string())?;
        Ok(first_declared(|key| value.get(key).and_then(|v| v.as_str())))
    } else {
        let value: serde_yaml::Value = serde_yaml::from_str(&text).map_err(|e| e.to_string())?;
        Ok(first_declared(|key| value.get(key).and_then(|v| v.as_str())))
    }
}

/// First non-empty string under [`ID_KEYS`], in key order.
fn first_declared<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Option<String> {
    ID_KEYS
        .iter()
        .filter_map(|key| lookup(*key))
        .find(|declared| !declared.is_empty())
        .map(str::to_string)
}

/// Removes `//` line comments and `/* */` block comments outside string literals.
///
/// Line breaks are preserved so parse errors keep their line numbers.
pub fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}
