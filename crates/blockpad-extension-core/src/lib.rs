//! # blockpad-extension-core
//!
//! Core traits and types for block extensions in the Blockpad ecosystem.
//!
//! This crate defines the contract between the Blockpad host and the
//! extensions that add blocks to its palette:
//!
//! - [`Extension`] - the trait every extension implements
//! - [`Descriptor`] - the static block/menu declaration handed to the host at
//!   load time
//! - [`StatusReport`] - the ready/not-ready handshake the host polls
//! - [`Reply`] - the single value a block invocation delivers back
//! - [`registry::ExtensionRegistry`] - the explicit load-time registration
//!   boundary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

pub mod registry;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum ExtensionError {
    #[error("Extension not found: {0}")]
    ExtensionNotFound(String),

    #[error("Unknown block selector: {0}")]
    UnknownSelector(String),

    #[error("Block '{selector}' takes {expected} argument(s), got {got}")]
    Arity {
        selector: String,
        expected: usize,
        got: usize,
    },

    #[error("Unknown menu option: {0}")]
    UnknownOption(String),

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream API error: {0}")]
    Upstream(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ExtensionError>;

// ============================================================================
// Status Handshake
// ============================================================================

/// Traffic-light readiness state an extension reports to the host.
///
/// [`code`](StatusLight::code) yields the numeric value the block palette
/// understands: 0 = not ready, 1 = degraded, 2 = ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLight {
    NotReady,
    Degraded,
    Ready,
}

impl StatusLight {
    pub fn code(&self) -> u8 {
        match self {
            StatusLight::NotReady => 0,
            StatusLight::Degraded => 1,
            StatusLight::Ready => 2,
        }
    }
}

/// Answer to the host's status query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub light: StatusLight,
    pub message: String,
    pub checked_at: Option<DateTime<Utc>>,
}

impl StatusReport {
    /// A green report with the conventional "Ready" message.
    pub fn ready() -> Self {
        Self {
            light: StatusLight::Ready,
            message: "Ready".to_string(),
            checked_at: Some(Utc::now()),
        }
    }

    pub fn degraded(message: &str) -> Self {
        Self {
            light: StatusLight::Degraded,
            message: message.to_string(),
            checked_at: Some(Utc::now()),
        }
    }

    pub fn not_ready(message: &str) -> Self {
        Self {
            light: StatusLight::NotReady,
            message: message.to_string(),
            checked_at: Some(Utc::now()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.light == StatusLight::Ready
    }
}

// ============================================================================
// Descriptor Types
// ============================================================================

/// The shape of a block, which determines how the palette renders it and
/// whether it reports a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockShape {
    /// Reports a value (`'R'` in the palette wire format).
    Reporter,
    /// Performs an action, reports nothing (`' '`).
    Command,
    /// Reports a boolean (`'b'`).
    Predicate,
}

impl BlockShape {
    pub fn code(&self) -> char {
        match self {
            BlockShape::Reporter => 'R',
            BlockShape::Command => ' ',
            BlockShape::Predicate => 'b',
        }
    }
}

/// One block declaration: the display template plus the selector the host
/// uses to invoke it.
///
/// Template placeholders follow the palette syntax: `%m.<menu>` is a
/// dropdown slot fed by the named menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub shape: BlockShape,
    pub template: String,
    pub selector: String,
}

impl BlockSpec {
    /// Declare a reporter block.
    pub fn reporter(template: &str, selector: &str) -> Self {
        Self {
            shape: BlockShape::Reporter,
            template: template.to_string(),
            selector: selector.to_string(),
        }
    }

    /// Names of the menus the template's `%m.` placeholders reference, in
    /// argument order.
    pub fn menu_references(&self) -> Vec<&str> {
        self.template
            .split_whitespace()
            .filter_map(|word| word.strip_prefix("%m."))
            .collect()
    }

    /// Number of argument slots in the template.
    pub fn arg_slots(&self) -> usize {
        self.template
            .split_whitespace()
            .filter(|word| word.starts_with('%'))
            .count()
    }
}

/// A selectable list of argument choices shown to the end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub name: String,
    pub options: Vec<String>,
}

impl Menu {
    pub fn new(name: &str, options: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            options,
        }
    }

    pub fn contains(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// The static declaration an extension hands the host at load time.
///
/// The host reads it once: it renders one palette entry per [`BlockSpec`]
/// and fills each `%m.` slot from the named [`Menu`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub display_name: String,
    pub blocks: Vec<BlockSpec>,
    pub menus: Vec<Menu>,
}

impl Descriptor {
    pub fn menu(&self, name: &str) -> Option<&Menu> {
        self.menus.iter().find(|m| m.name == name)
    }

    pub fn block(&self, selector: &str) -> Option<&BlockSpec> {
        self.blocks.iter().find(|b| b.selector == selector)
    }

    /// Check that the declaration is consumable by the host: selectors must
    /// be unique and every `%m.` placeholder must reference a declared menu.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for block in &self.blocks {
            if !seen.insert(block.selector.as_str()) {
                return Err(ExtensionError::InvalidDescriptor(format!(
                    "duplicate selector '{}'",
                    block.selector
                )));
            }
            for menu_name in block.menu_references() {
                if self.menu(menu_name).is_none() {
                    return Err(ExtensionError::InvalidDescriptor(format!(
                        "block '{}' references undeclared menu '{}'",
                        block.selector, menu_name
                    )));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Replies
// ============================================================================

/// The single value a block invocation delivers back to the host.
///
/// `Empty` is the explicit "no result" a lookup reports when its scan finds
/// nothing; the host renders it as a blank reporter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    Text(String),
    Empty,
}

impl Reply {
    pub fn is_empty(&self) -> bool {
        matches!(self, Reply::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text(text) => Some(text),
            Reply::Empty => None,
        }
    }
}

impl From<Option<String>> for Reply {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(text) => Reply::Text(text),
            None => Reply::Empty,
        }
    }
}

// ============================================================================
// Extension Trait
// ============================================================================

/// The contract between the Blockpad host and an extension.
///
/// An extension declares its blocks once through [`Descriptor`] and then
/// services block invocations by selector; the host polls [`status`] for the
/// palette's readiness indicator. Each invocation resolves exactly once,
/// with either a [`Reply`] or an [`ExtensionError`] - never both, never
/// twice.
///
/// [`status`]: Extension::status
#[async_trait]
pub trait Extension: Send + Sync {
    /// Unique identifier for this extension (e.g., "worldcup").
    fn id(&self) -> &'static str;

    /// The static block/menu declaration, read once at load time.
    fn descriptor(&self) -> Descriptor;

    /// Readiness handshake polled by the host.
    fn status(&self) -> StatusReport;

    /// Run the block named by `selector` with the user's menu choices.
    async fn invoke(&self, selector: &str, args: &[String]) -> Result<Reply>;

    /// Teardown hook called when the host unloads the extension.
    fn shutdown(&self) {}
}

// ============================================================================
// Re-exports
// ============================================================================

pub mod prelude {
    pub use crate::registry::ExtensionRegistry;
    pub use crate::{
        BlockShape, BlockSpec, Descriptor, Extension, ExtensionError, Menu, Reply, Result,
        StatusLight, StatusReport,
    };
}

// ============================================================================
// Tests
// ============================================================================
