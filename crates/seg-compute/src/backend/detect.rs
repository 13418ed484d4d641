//! Backend detection and auto-selection.

use tracing::{debug, warn};

use super::Backend;

/// Environment variable forcing the backend `Auto` resolves to.
pub const BACKEND_ENV: &str = "SEG_BACKEND";

/// Information about a compute backend.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Backend type.
    pub backend: Backend,
    /// Human-readable name.
    pub name: &'static str,
    /// Whether backend is available.
    pub available: bool,
    /// Priority for auto-selection (higher = preferred).
    pub priority: u32,
    /// Description.
    pub description: &'static str,
}

/// Detect all available backends.
pub fn detect_backends() -> Vec<BackendInfo> {
    let mut backends = vec![BackendInfo {
        backend: Backend::Cpu,
        name: "CPU",
        available: true,
        priority: 10,
        description: "CPU with rayon parallelization",
    }];

    #[cfg(feature = "wgpu")]
    {
        let wgpu_available = super::WgpuSurface::is_available();
        backends.push(BackendInfo {
            backend: Backend::Wgpu,
            name: "wgpu",
            available: wgpu_available,
            priority: if wgpu_available { 100 } else { 0 },
            description: "GPU via wgpu (Vulkan/Metal/DX12)",
        });
    }

    backends.sort_by(|a, b| b.priority.cmp(&a.priority));
    backends
}

/// Select the best available backend.
///
/// `SEG_BACKEND=cpu|wgpu` takes precedence when the named backend is
/// available.
pub fn select_best_backend() -> Backend {
    if let Ok(value) = std::env::var(BACKEND_ENV) {
        match value.parse::<Backend>() {
            Ok(Backend::Auto) => {}
            Ok(forced) if forced.is_available() => {
                debug!(backend = %forced, "backend forced by {BACKEND_ENV}");
                return forced;
            }
            Ok(forced) => warn!(backend = %forced, "{BACKEND_ENV} names an unavailable backend, ignoring"),
            Err(e) => warn!(error = %e, "invalid {BACKEND_ENV}, ignoring"),
        }
    }

    detect_backends()
        .into_iter()
        .filter(|b| b.available)
        .max_by_key(|b| b.priority)
        .map(|b| b.backend)
        .unwrap_or(Backend::Cpu)
}

/// Get description of available backends.
pub fn describe_backends() -> String {
    let mut desc = String::new();

    for info in detect_backends() {
        let status = if info.available { "+" } else { "-" };
        desc.push_str(&format!("[{}] {}: {}\n", status, info.name, info.description));
    }

    desc
}
