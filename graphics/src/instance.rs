//! Graphics instance.
//!
//! The [`GraphicsInstance`] is the top-level entry point for the graphics
//! system. It owns the backend and creates [`GraphicsDevice`]s. There is no
//! process-wide singleton: every consumer receives the instance or device it
//! should use explicitly, which is what makes multi-device setups and
//! GPU-free unit tests possible.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::backend::{self, GpuBackend};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;

/// The graphics instance manages devices and the backend.
///
/// # Thread Safety
///
/// `GraphicsInstance` is `Send + Sync` and can be safely shared across
/// threads.
///
/// # Example
///
/// ```
/// use nightshade_graphics::GraphicsInstance;
///
/// let instance = GraphicsInstance::new().unwrap();
/// let device = instance.create_device().unwrap();
/// assert_eq!(device.backend_name(), "Dummy");
/// ```
pub struct GraphicsInstance {
    /// Weak self-reference for creating devices.
    self_ref: RwLock<Weak<GraphicsInstance>>,
    /// Devices created by this instance.
    devices: RwLock<Vec<Arc<GraphicsDevice>>>,
    /// GPU backend for this instance.
    backend: Arc<dyn GpuBackend>,
}

impl GraphicsInstance {
    /// Create a new graphics instance with the default backend for the
    /// enabled feature set.
    ///
    /// # Errors
    ///
    /// Returns an error if the graphics system cannot be initialized.
    #[cfg(feature = "dummy")]
    pub fn new() -> Result<Arc<Self>, GraphicsError> {
        let backend = backend::create_backend()?;
        Ok(Self::with_backend(backend))
    }

    /// Create a graphics instance over an explicit backend.
    pub fn with_backend(backend: Arc<dyn GpuBackend>) -> Arc<Self> {
        log::info!("Creating GraphicsInstance (backend: {})", backend.name());

        let instance = Arc::new(Self {
            self_ref: RwLock::new(Weak::new()),
            devices: RwLock::new(Vec::new()),
            backend,
        });

        *instance.self_ref.write() = Arc::downgrade(&instance);
        instance
    }

    /// Get the GPU backend (internal use only).
    pub(crate) fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    /// Create a graphics device.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be created.
    pub fn create_device(&self) -> Result<Arc<GraphicsDevice>, GraphicsError> {
        let instance = self.self_ref.read().upgrade().ok_or_else(|| {
            GraphicsError::Internal("instance self-reference not initialized".to_string())
        })?;

        let device = Arc::new(GraphicsDevice::new(
            instance,
            format!("{} Device", self.backend.name()),
        ));
        self.devices.write().push(Arc::clone(&device));

        log::info!("Created device '{}'", device.name());
        Ok(device)
    }

    /// Number of devices created by this instance.
    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }
}

impl std::fmt::Debug for GraphicsInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsInstance")
            .field("backend", &self.backend.name())
            .field("devices", &self.device_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(GraphicsInstance: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_instance_and_device() {
        let instance = GraphicsInstance::new().unwrap();
        assert_eq!(instance.device_count(), 0);

        let device = instance.create_device().unwrap();
        assert_eq!(instance.device_count(), 1);
        assert_eq!(device.backend_name(), "Dummy");
    }

    #[test]
    fn test_multiple_independent_devices() {
        let instance = GraphicsInstance::new().unwrap();
        let a = instance.create_device().unwrap();
        let b = instance.create_device().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(instance.device_count(), 2);
    }
}
