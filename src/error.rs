//! Error types for scene setup, graph manipulation and configuration.

use hecs::Entity;
use thiserror::Error;

/// Boxed error produced by a host transport while loading a prerequisite.
pub type TransportError = Box<dyn std::error::Error + 'static>;

/// Errors raised while loading prerequisites or running setup hooks.
///
/// Any of these aborts scene initialization.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A single prerequisite failed; the whole batch is rejected.
    #[error("prerequisite '{label}' ({identity}) failed to load: {source}")]
    Prerequisite {
        label: String,
        identity: String,
        #[source]
        source: TransportError,
    },
    /// Two prerequisites in the same batch share a label.
    #[error("duplicate prerequisite label '{0}'")]
    DuplicateLabel(String),
    /// The scene's asynchronous setup hook failed.
    #[error("setup hook failed: {0}")]
    Setup(String),
    /// A scene graph operation failed while building the scene.
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Errors from scene graph operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0:?} does not exist")]
    NoSuchNode(Entity),
    /// The child is already attached somewhere; nodes are attached once.
    #[error("node {child:?} already has parent {parent:?}")]
    AlreadyParented { child: Entity, parent: Entity },
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: Entity, child: Entity },
    #[error("no node labelled '{0}'")]
    MissingLabel(String),
    /// A planar collider was requested for a node without flat geometry.
    #[error("node {0:?} has no planar shape")]
    NotPlanar(Entity),
}

/// Errors from parsing or validating a [`SceneConfig`](crate::SceneConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid scene config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("colour '{label}' has invalid hex value '{hex}'")]
    BadHex { label: String, hex: String },
    #[error("material '{material}' references unknown texture or colour '{texture}'")]
    UnknownTexture { material: String, texture: String },
    #[error("duplicate {kind} label '{label}'")]
    DuplicateLabel { kind: &'static str, label: String },
}
