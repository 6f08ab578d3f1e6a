//! Renders the configuration templates of the supervised processes.
use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    config::{ProcessSpec, Settings},
    error::SupervisorError,
};

/// A (template, destination, token, value) tuple describing one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBinding {
    pub template: PathBuf,
    pub destination: PathBuf,
    pub token: String,
    pub value: String,
}

impl TemplateBinding {
    /// Binding for a process: its template rendered with the endpoint as value.
    pub fn for_process(spec: &ProcessSpec, settings: &Settings) -> Self {
        Self {
            template: spec.template.clone(),
            destination: spec.config.clone(),
            token: settings.token.clone(),
            value: settings.endpoint.to_string_lossy().into_owned(),
        }
    }
}

/// Outcome of a single render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    /// Number of occurrences of the token that were replaced.
    pub replacements: usize,
    /// Size of the rendered file in bytes.
    pub rendered_len: usize,
}

/// Replaces every non-overlapping occurrence of `token` with `value`.
///
/// Matching resumes right after each replaced occurrence, so a token that
/// appears inside `value` is never matched again. An empty token matches
/// nothing. Returns the rendered bytes and the number of replacements.
pub fn substitute(source: &[u8], token: &[u8], value: &[u8]) -> (Vec<u8>, usize) {
    if token.is_empty() || source.len() < token.len() {
        return (source.to_vec(), 0);
    }

    let mut rendered = Vec::with_capacity(source.len());
    let mut replacements = 0;
    let mut cursor = 0;

    while cursor < source.len() {
        if source[cursor..].starts_with(token) {
            rendered.extend_from_slice(value);
            cursor += token.len();
            replacements += 1;
        } else {
            rendered.push(source[cursor]);
            cursor += 1;
        }
    }

    (rendered, replacements)
}

/// Reads the template, substitutes the token and writes the destination file.
pub fn render(binding: &TemplateBinding) -> Result<RenderReport, SupervisorError> {
    let source = fs::read(&binding.template).map_err(|source| SupervisorError::TemplateRead {
        path: binding.template.clone(),
        source,
    })?;

    let (rendered, replacements) = substitute(
        &source,
        binding.token.as_bytes(),
        binding.value.as_bytes(),
    );

    fs::write(&binding.destination, &rendered).map_err(|source| {
        SupervisorError::TemplateWrite {
            path: binding.destination.clone(),
            source,
        }
    })?;

    debug!(
        "Rendered {:?} -> {:?} ({replacements} replacement(s), {} bytes)",
        binding.template,
        binding.destination,
        rendered.len()
    );

    Ok(RenderReport {
        replacements,
        rendered_len: rendered.len(),
    })
}

/// Creates `dir` (and parents) if it does not exist yet.
pub fn ensure_dir(dir: &Path) -> Result<(), SupervisorError> {
    fs::create_dir_all(dir).map_err(|source| SupervisorError::LogDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Renders both templates and prepares the log directory.
///
/// Any failure is fatal and happens before a single process is launched.
pub fn configure_all(settings: &Settings) -> Result<(), SupervisorError> {
    for spec in [&settings.independent, &settings.dependent] {
        info!("Configuring {}...", spec.name);
        render(&TemplateBinding::for_process(spec, settings))?;
    }

    if let Some(dir) = &settings.log_dir {
        debug!("Ensuring log directory {:?}", dir);
        ensure_dir(dir)?;
    }

    Ok(())
}
