//! `result_output_file` support for data sources

use std::path::Path;

use tccloud_core::provider::ProviderError;

/// Write `data` as pretty JSON to `path`, creating parent directories
pub fn write_to_file(path: &str, data: &serde_json::Value) -> Result<(), ProviderError> {
    let path = Path::new(path);
    let write_err = |e: std::io::Error| {
        ProviderError::new(format!(
            "Failed to write result output file {}: {}",
            path.display(),
            e
        ))
        .with_cause(e)
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let content = serde_json::to_string_pretty(data)
        .map_err(|e| ProviderError::new(format!("Failed to encode result output: {}", e)))?;
    std::fs::write(path, content).map_err(write_err)?;

    log::debug!("wrote data source result to {}", path.display());
    Ok(())
}
