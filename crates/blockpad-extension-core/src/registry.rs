//! # Extension Registry
//!
//! The load-time registration boundary between the host and its extensions.
//!
//! The registry stores extensions by their ID as trait objects and answers
//! the host's queries on their behalf, whether that is a descriptor for
//! palette rendering, a status report, or a block invocation dispatched by
//! selector. Registration is an explicit call the embedding boundary makes
//! once per extension, not a load-time side effect.

use crate::{Descriptor, Extension, ExtensionError, Reply, Result, StatusReport};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Registry for managing loaded extensions.
///
/// # Example
///
/// ```no_run
/// use blockpad_extension_core::prelude::*;
/// # struct WorldCupExtension;
/// # impl WorldCupExtension { fn default() -> Self { Self } }
/// # #[async_trait::async_trait]
/// # impl Extension for WorldCupExtension {
/// #     fn id(&self) -> &'static str { "worldcup" }
/// #     fn descriptor(&self) -> Descriptor {
/// #         Descriptor { display_name: String::new(), blocks: vec![], menus: vec![] }
/// #     }
/// #     fn status(&self) -> StatusReport { StatusReport::ready() }
/// #     async fn invoke(&self, _: &str, _: &[String]) -> Result<Reply> { Ok(Reply::Empty) }
/// # }
///
/// let mut registry = ExtensionRegistry::new();
/// registry.register(WorldCupExtension::default()).unwrap();
///
/// let extension = registry.get("worldcup").unwrap();
/// println!("Loaded extension: {}", extension.descriptor().display_name);
/// ```
pub struct ExtensionRegistry {
    extensions: HashMap<String, Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    /// Create a new empty extension registry.
    pub fn new() -> Self {
        Self {
            extensions: HashMap::new(),
        }
    }

    /// Register an extension, validating its descriptor first.
    ///
    /// An extension whose descriptor fails [`Descriptor::validate`] is
    /// refused, since the host could not render its palette entries.
    /// Registering an ID that already exists replaces the previous instance.
    pub fn register<E>(&mut self, extension: E) -> Result<()>
    where
        E: Extension + 'static,
    {
        let descriptor = extension.descriptor();
        if let Err(e) = descriptor.validate() {
            warn!("Refusing extension '{}': {}", extension.id(), e);
            return Err(e);
        }

        info!(
            "Registered extension: {} ({} block(s), {} menu(s))",
            extension.id(),
            descriptor.blocks.len(),
            descriptor.menus.len()
        );
        self.extensions
            .insert(extension.id().to_string(), Arc::new(extension));
        Ok(())
    }

    /// Get an extension by its ID.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Extension>> {
        self.extensions.get(id).cloned()
    }

    /// The descriptor of a registered extension, for palette rendering.
    pub fn descriptor_of(&self, id: &str) -> Option<Descriptor> {
        self.extensions.get(id).map(|e| e.descriptor())
    }

    /// The current status of a registered extension.
    pub fn status_of(&self, id: &str) -> Option<StatusReport> {
        self.extensions.get(id).map(|e| e.status())
    }

    /// Dispatch a block invocation to the named extension.
    pub async fn invoke(&self, id: &str, selector: &str, args: &[String]) -> Result<Reply> {
        let extension = self
            .get(id)
            .ok_or_else(|| ExtensionError::ExtensionNotFound(id.to_string()))?;
        extension.invoke(selector, args).await
    }

    /// List all registered extension IDs.
    pub fn list(&self) -> Vec<&str> {
        self.extensions.keys().map(|s| s.as_str()).collect()
    }

    /// Get the number of registered extensions.
    pub fn count(&self) -> usize {
        self.extensions.len()
    }

    /// Check if an extension with the given ID is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.extensions.contains_key(id)
    }

    /// Remove an extension from the registry.
    pub fn remove(&mut self, id: &str) -> Option<Arc<dyn Extension>> {
        self.extensions.remove(id)
    }

    /// Drop all extensions without running their teardown hooks.
    pub fn clear(&mut self) {
        self.extensions.clear();
    }

    /// Run every extension's teardown hook and clear the registry.
    pub fn shutdown_all(&mut self) {
        for extension in self.extensions.values() {
            extension.shutdown();
        }
        self.clear();
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
