// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Adapter selection.

/// How [`WgpuOffscreen`](crate::WgpuOffscreen) picks its adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WgpuConfig {
    /// Backends the instance may use.
    pub backends: wgpu::Backends,
    /// Adapter preference.
    pub power_preference: wgpu::PowerPreference,
    /// Accept a software adapter when no hardware one is available.
    pub allow_fallback: bool,
}

impl WgpuConfig {
    /// Vulkan only, high-performance adapter.
    #[must_use]
    pub const fn vulkan() -> Self {
        Self {
            backends: wgpu::Backends::VULKAN,
            power_preference: wgpu::PowerPreference::HighPerformance,
            allow_fallback: false,
        }
    }

    /// Any primary backend, falling back to a software adapter. For headless
    /// runs on machines without a usable GPU.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            backends: wgpu::Backends::PRIMARY,
            power_preference: wgpu::PowerPreference::LowPower,
            allow_fallback: true,
        }
    }
}

impl Default for WgpuConfig {
    fn default() -> Self {
        Self::vulkan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_vulkan_only() {
        let config = WgpuConfig::default();
        assert_eq!(config.backends, wgpu::Backends::VULKAN);
        assert!(!config.allow_fallback);
        assert!(WgpuConfig::any().backends.contains(wgpu::Backends::VULKAN));
    }
}
