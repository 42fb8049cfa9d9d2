//! Error types for the simulation core.
//!
//! Construction-time problems (missing geometry, unknown templates, bad
//! constructor arguments) are reported as values. The core never aborts the
//! process; the caller decides whether a failure is fatal.

use thiserror::Error;

use crate::entity::EntityKind;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Top-level error type for registry and level operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No template is registered under the requested name.
    #[error("Entity Registry: cannot find entity template '{0}'")]
    TemplateNotFound(String),

    /// The geometry collaborator could not load the template's mesh.
    #[error("Failed to load mesh '{mesh}': {reason}")]
    GeometryLoad {
        /// Mesh reference that failed to load.
        mesh: String,
        /// Reason reported by the geometry source.
        reason: String,
    },

    /// The entity's constructor rejected its arguments.
    #[error("Cannot construct entity from template '{template}': {source}")]
    Construction {
        /// Template the entity was being created from.
        template: String,
        /// What the constructor rejected.
        #[source]
        source: ConstructionError,
    },

    /// The template exists but cannot back the requested kind of entity.
    #[error("Template '{template}' cannot create a {requested} entity")]
    KindMismatch {
        /// Template name.
        template: String,
        /// Entity kind that was requested.
        requested: EntityKind,
    },

    /// A level description entry failed to load.
    #[error("Level entry {index} ({what}) failed: {source}")]
    Level {
        /// Position of the failing entry within its list.
        index: usize,
        /// Short description of the entry ("template 'Rock1'", "entity 'Murphy'").
        what: String,
        /// Underlying failure.
        #[source]
        source: Box<CoreError>,
    },

    /// The level description could not be parsed.
    #[error("Failed to parse level description: {0}")]
    LevelParse(#[from] serde_json::Error),

    /// A configuration override could not be parsed.
    #[error("Failed to parse simulation config: {0}")]
    ConfigParse(#[source] serde_json::Error),
}

/// Reasons an agent constructor refuses to build an entity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
    /// The template's geometry has fewer sub-parts than the agent animates.
    #[error("geometry has {available} nodes, at least {needed} required")]
    TooFewNodes {
        /// Node count the agent requires.
        needed: usize,
        /// Node count the geometry provides.
        available: usize,
    },

    /// A numeric constructor argument is out of range.
    #[error("invalid {name}: {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f32,
    },
}
