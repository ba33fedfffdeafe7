/// Fences and semaphores

use crate::error::Result;

/// CPU-visible completion signal
pub trait Fence: Send + Sync {
    /// Block until the fence is signaled
    fn wait(&self) -> Result<()>;

    /// Return the fence to the unsignaled state
    fn reset(&self) -> Result<()>;

    fn is_signaled(&self) -> Result<bool>;
}

/// GPU-side signal between queue submissions
pub trait Semaphore: Send + Sync {}
