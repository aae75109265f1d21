//! Inference capability detection.
//!
//! The inference backend is resolved once at start-up and injected into the
//! engine. Setting `BT_INFERENCE_BACKEND=none` simulates a host without an
//! inference engine so the degradation path can be exercised end to end.

use serde::Serialize;

use crate::inference::{InferenceBackend, JunctionTreeBackend, UnavailableBackend};

/// Environment variable selecting the inference backend.
pub const ENV_BACKEND: &str = "BT_INFERENCE_BACKEND";

/// Which inference implementation is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    JunctionTree,
    Unavailable,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "jt" | "junction_tree" | "junction-tree" | "exact" => Ok(BackendKind::JunctionTree),
            "none" | "off" | "unavailable" => Ok(BackendKind::Unavailable),
            other => Err(format!("unknown inference backend: {other}")),
        }
    }
}

/// Resolved engine capabilities.
#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    pub backend: BackendKind,
    /// Joint-state budget handed to the junction-tree backend.
    pub max_clique_states: usize,
}

impl Capabilities {
    /// Detect capabilities from the environment.
    ///
    /// An unrecognised backend name falls back to the junction tree.
    pub fn detect(max_clique_states: usize) -> Self {
        let backend = std::env::var(ENV_BACKEND)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(BackendKind::JunctionTree);
        Self {
            backend,
            max_clique_states,
        }
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Whether exact inference can run at all.
    pub fn inference_available(&self) -> bool {
        self.backend == BackendKind::JunctionTree
    }

    /// Instantiate the backend these capabilities describe.
    pub fn backend(&self) -> Box<dyn InferenceBackend> {
        match self.backend {
            BackendKind::JunctionTree => Box::new(JunctionTreeBackend::new(self.max_clique_states)),
            BackendKind::Unavailable => Box::new(UnavailableBackend::new(format!(
                "disabled via {ENV_BACKEND}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("none".parse::<BackendKind>().unwrap(), BackendKind::Unavailable);
        assert_eq!("OFF".parse::<BackendKind>().unwrap(), BackendKind::Unavailable);
        assert_eq!(
            "junction-tree".parse::<BackendKind>().unwrap(),
            BackendKind::JunctionTree
        );
        assert!("gibbs".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_backend_instantiation() {
        let caps = Capabilities {
            backend: BackendKind::Unavailable,
            max_clique_states: 16,
        };
        assert!(!caps.inference_available());
        assert_eq!(caps.backend().kind(), BackendKind::Unavailable);

        let caps = caps.with_backend(BackendKind::JunctionTree);
        assert!(caps.inference_available());
        assert_eq!(caps.backend().kind(), BackendKind::JunctionTree);
    }
}
