/// Failures raised by the GPU-thread side of the renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer used before on_init")]
    NotInitialised,
    #[error("failed to compile {label}: {reason}")]
    ProgramCompile { label: &'static str, reason: String },
    #[error("off-screen target {width}x{height} is incomplete: {reason}")]
    IncompleteTarget {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("{width}x{height} exceeds the GPU max texture dimension {max}")]
    TextureTooLarge { width: u32, height: u32, max: u32 },
    #[error("decoded image {width}x{height} is empty or inconsistent")]
    InvalidImage { width: u32, height: u32 },
}
