use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::debug;
use volt_domain::{RepoId, VoltPaths};

use crate::fsutil;

/// Generates the skeleton plug-config for a repository. Remote templates are
/// not fetched; the skeleton carries the three hook functions the bundler
/// understands.
pub(crate) fn skeleton(repo: &RepoId) -> String {
    format!(
        r#"" Plugconf for {repo}
" vim:et:sw=2:ts=2

" Plugin configuration like the code written in vimrc.
function! s:config()
endfunction

" This function determines when a plugin is loaded.
" Return value must be one of 'start', 'filetype=<filetypes>',
" 'excmd=<excmds>'.
function! s:loaded_on()
  return 'start'
endfunction

" Dependencies of this plugin, as a list of repository identifiers.
function! s:depends()
  return []
endfunction
"#
    )
}

/// Writes the skeleton to the user plug-config path unless a file already
/// exists there.
pub(crate) fn install_skeleton(paths: &VoltPaths, repo: &RepoId) -> Result<()> {
    let path = paths.user_plugconf(repo);
    if path.exists() {
        debug!("plugconf '{}' exists... skip", path.display());
        return Ok(());
    }
    fsutil::atomic_write(&path, skeleton(repo).as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))
}

/// One repo's parsed plug-config: the body lines of each hook function.
struct ParsedPlugconf {
    repo: RepoId,
    config_body: Vec<String>,
}

/// Generates the bundled plug-config from every active repository's
/// plug-config, concatenated in repository order (callers pass a sorted
/// list). Unbalanced function blocks are fatal parse errors.
pub(crate) fn generate_bundle(
    paths: &VoltPaths,
    active: &[RepoId],
) -> Result<String, Vec<String>> {
    let mut parsed = Vec::new();
    let mut errors = Vec::new();
    for repo in active {
        let path = [paths.user_plugconf(repo), paths.system_plugconf(repo)]
            .into_iter()
            .find(|p| p.exists());
        let Some(path) = path else { continue };
        match parse_plugconf(repo, &path) {
            Ok(conf) => parsed.push(conf),
            Err(err) => errors.push(format!("{}: {err:#}", path.display())),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut out = String::new();
    out.push_str("\" This file was generated by volt. DO NOT EDIT.\n");
    out.push_str("if exists('g:loaded_volt_bundled_plugconf')\n  finish\nendif\n");
    out.push_str("let g:loaded_volt_bundled_plugconf = 1\n");
    for conf in &parsed {
        if conf.config_body.iter().all(|l| l.trim().is_empty()) {
            continue;
        }
        let suffix = identifier_suffix(&conf.repo);
        out.push_str(&format!("\n\" {}\n", conf.repo));
        out.push_str(&format!("function! s:config_{suffix}() abort\n"));
        for line in &conf.config_body {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("endfunction\n");
        out.push_str(&format!("call s:config_{suffix}()\n"));
    }
    Ok(out)
}

/// Extracts the `s:config()` body, validating that every `function` has a
/// matching `endfunction`.
fn parse_plugconf(repo: &RepoId, path: &Path) -> Result<ParsedPlugconf> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut config_body = Vec::new();
    let mut depth = 0usize;
    let mut in_config = false;
    for (lineno, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if is_function_start(trimmed) {
            depth += 1;
            if depth == 1 && trimmed.contains("s:config(") {
                in_config = true;
                continue;
            }
        } else if trimmed.starts_with("endfunction") {
            if depth == 0 {
                anyhow::bail!("line {}: endfunction without function", lineno + 1);
            }
            depth -= 1;
            if depth == 0 && in_config {
                in_config = false;
                continue;
            }
        }
        if in_config {
            config_body.push(line.to_string());
        }
    }
    if depth != 0 {
        anyhow::bail!("unbalanced function/endfunction");
    }
    Ok(ParsedPlugconf {
        repo: repo.clone(),
        config_body,
    })
}

fn is_function_start(trimmed: &str) -> bool {
    trimmed.starts_with("function!") || trimmed.starts_with("function ")
}

/// Maps a repository id to a vimscript identifier fragment.
fn identifier_suffix(repo: &RepoId) -> String {
    repo.to_string()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
