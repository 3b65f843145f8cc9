// # File Provider
//
// This crate renders the endpoint set into local files.
//
// ## Formats
//
// - `hosts`: `/etc/hosts` style lines of forward endpoints
// - `json`: the endpoint wire format, readable by the HTTP source
// - `ptr`: zone-file PTR lines of reverse endpoints, optionally restricted
//   to one reverse zone
//
// A file with a `template` is rendered by minijinja instead, with
// `endpoints` (forward) and `ptr_records` (reverse) in the context.
//
// ## Behavior
//
// - Every file is rendered before any is written; a rendering error leaves
//   all files untouched
// - Writes are atomic (temp file + rename) with the configured octal mode
// - The first write error aborts the update

pub mod render;
pub mod write;

use async_trait::async_trait;
use std::path::Path;
use tracing::{error, info};
use zonepop_core::config::{FileOutputConfig, FileProviderConfig, ProviderConfig, ProviderKind};
use zonepop_core::traits::{Provider, ProviderFactory};
use zonepop_core::{Endpoint, Error, ProviderFilters, Registry, Result};

/// Provider writing rendered endpoint files
#[derive(Debug)]
pub struct FileProvider {
    config: FileProviderConfig,
    filters: ProviderFilters,
}

impl FileProvider {
    /// Create a file provider
    ///
    /// # Errors
    ///
    /// `Error::Config` if a file entry has no filename, an invalid mode,
    /// a zone outside the reverse namespaces, or a template that does not
    /// parse.
    pub fn new(name: &str, config: FileProviderConfig, filters: ProviderFilters) -> Result<Self> {
        config.validate(name)?;
        for output in &config.files {
            if let Some(template) = &output.template {
                render::check_template(template).map_err(|e| {
                    Error::config(format!(
                        "Provider {name}: invalid template for {}: {e}",
                        output.filename
                    ))
                })?;
            }
        }
        Ok(Self { config, filters })
    }
}

#[async_trait]
impl Provider for FileProvider {
    async fn update_endpoints(&self, endpoints: &[Endpoint]) -> Result<()> {
        let forward = self.filters.forward.apply(endpoints);
        let reverse = self.filters.reverse.apply(endpoints);

        let mut rendered: Vec<(&FileOutputConfig, String)> = Vec::with_capacity(self.config.files.len());
        for output in &self.config.files {
            let contents = render::render(output, &forward, &reverse).inspect_err(|e| {
                error!(filename = %output.filename, error = %e, "Failed to render file");
            })?;
            rendered.push((output, contents));
        }

        for (output, contents) in rendered {
            let mode = output.mode().map_err(|e| {
                Error::config(format!("invalid permissions {:?}: {e}", output.permissions))
            })?;
            info!(
                filename = %output.filename,
                permissions = %output.permissions,
                format = ?output.format,
                "Saving file"
            );
            write::write_atomic(Path::new(&output.filename), &contents, mode)
                .await
                .inspect_err(|e| {
                    error!(filename = %output.filename, error = %e, "Failed to save file");
                })?;
        }
        Ok(())
    }
}

/// Factory for creating file providers
pub struct FileProviderFactory;

impl ProviderFactory for FileProviderFactory {
    fn create(&self, config: &ProviderConfig, filters: ProviderFilters) -> Result<Box<dyn Provider>> {
        match &config.kind {
            ProviderKind::File(settings) => Ok(Box::new(FileProvider::new(
                &config.name,
                settings.clone(),
                filters,
            )?)),
            _ => Err(Error::config(format!(
                "Invalid config for file provider {}",
                config.name
            ))),
        }
    }
}

/// Register the file provider with a registry
pub fn register(registry: &Registry) {
    registry.register_provider("file", Box::new(FileProviderFactory));
}
