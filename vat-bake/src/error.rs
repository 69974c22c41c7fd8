//! Error taxonomy for the baking pipeline

/// Failure of a bake run
///
/// Every variant is fatal: a bake that returns an error produced no output,
/// and the mesh source has already been restored through its session guard.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BakeError {
    /// Nothing to bake, or a zero-sized layout request
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Element counts changed between sampled frames of a fixed-topology bake
    #[error(
        "polycount is changing per frame (frame {frame}: {found_vertices} vertices / \
         {found_triangles} triangles, expected {expected_vertices} / {expected_triangles}), \
         which is not allowed for fixed-topology VATs. Check your modifiers."
    )]
    TopologyDrift {
        frame: i32,
        expected_vertices: usize,
        found_vertices: usize,
        expected_triangles: usize,
        found_triangles: usize,
    },

    /// Output settings that cannot be honoured
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The mesh source could not provide a sample
    #[error("mesh source failed for object {object} at frame {frame}: {message}")]
    Source {
        object: usize,
        frame: i32,
        message: String,
    },
}

impl BakeError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn source(object: usize, frame: i32, message: impl std::fmt::Display) -> Self {
        Self::Source {
            object,
            frame,
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_drift_message() {
        let err = BakeError::TopologyDrift {
            frame: 3,
            expected_vertices: 10,
            found_vertices: 12,
            expected_triangles: 4,
            found_triangles: 5,
        };
        let message = err.to_string();
        assert!(message.starts_with("polycount is changing per frame"));
        assert!(message.contains("frame 3"));
        assert!(message.contains("Check your modifiers"));
    }

    #[test]
    fn test_source_error_keeps_context() {
        let err = BakeError::source(2, 17, "file missing");
        assert_eq!(
            err.to_string(),
            "mesh source failed for object 2 at frame 17: file missing"
        );
    }
}
