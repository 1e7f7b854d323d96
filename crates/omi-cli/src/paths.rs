//! Input/output path resolution

use omi_document::OutputFormat;
use std::path::{Path, PathBuf};

/// Path resolution errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Input does not exist or is not a file
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Input is neither `.glb` nor `.gltf`
    #[error("unsupported input file: {} (expected .glb or .gltf)", .0.display())]
    UnsupportedInput(PathBuf),

    /// Output extension is neither `.glb` nor `.gltf`
    #[error("unsupported output file: {} (expected .glb or .gltf)", .0.display())]
    UnsupportedOutput(PathBuf),
}

/// Resolved paths of one conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Existing input document
    pub input: PathBuf,
    /// Layout of the input
    pub input_format: OutputFormat,
    /// Output document
    pub output: PathBuf,
    /// Layout of the output, from its extension
    pub output_format: OutputFormat,
    /// Output file stem, used to name generated resources
    pub basename: String,
}

impl Paths {
    /// Directory holding the input; relative locators resolve against it
    #[must_use]
    pub fn input_dir(&self) -> &Path {
        parent_dir(&self.input)
    }

    /// Directory receiving the output and its resources
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        parent_dir(&self.output)
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

fn format_of(path: &Path) -> Option<OutputFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(OutputFormat::from_extension)
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Resolve the output path and layouts for `input`
///
/// - No output: `<input-dir>/<input-stem>_out.<input-ext>`
/// - Output without extension: a directory; the input file name is used
///   inside it
/// - Otherwise the output must end in `.glb` or `.gltf`
///
/// # Errors
/// Returns `PathError` if the input is missing or either extension is
/// unsupported
pub fn resolve(input: &Path, output: Option<&Path>) -> Result<Paths, PathError> {
    if !input.is_file() {
        return Err(PathError::InputNotFound(input.to_path_buf()));
    }
    let input_format =
        format_of(input).ok_or_else(|| PathError::UnsupportedInput(input.to_path_buf()))?;

    let output = match output {
        None => {
            let name = format!("{}_out.{}", stem_of(input), input_format.extension());
            parent_dir(input).join(name)
        }
        Some(dir) if dir.extension().is_none() => match input.file_name() {
            Some(name) => dir.join(name),
            None => return Err(PathError::InputNotFound(input.to_path_buf())),
        },
        Some(path) => path.to_path_buf(),
    };
    let output_format =
        format_of(&output).ok_or_else(|| PathError::UnsupportedOutput(output.clone()))?;

    Ok(Paths {
        input: input.to_path_buf(),
        input_format,
        basename: stem_of(&output),
        output,
        output_format,
    })
}
