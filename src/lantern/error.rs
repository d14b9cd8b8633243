use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("shape {shape} refers to material {index}, but the scene only has {count} materials")]
    InvalidMaterial {
        shape: usize,
        index: usize,
        count: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("invalid scene: {0}")]
    Scene(#[from] SceneError),

    #[error("camera supplied {actual} ray directions, viewport needs {expected}")]
    ViewportMismatch { expected: usize, actual: usize },
}
