//! Explicit, caller-constructed stand-in for "device properties".
//!
//! The GEMM tile-selection rule is keyed by `(memory precisions,
//! device-class)`. Rather than reading device capabilities from ambient
//! global state, the caller constructs one `DeviceProfile` up front and
//! threads it through every synthesiser call.

/// Coarse class of GPU the tile-selection table is keyed on.
///
/// Mirrors the handful of device tiers the reference tile tables are
/// conditioned on; finer-grained capability queries are an external
/// driver concern, out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// Unified-memory consumer/mobile GPU class (the common case: favors
    /// smaller register tiles, fewer large threadgroups in flight).
    Integrated,
    /// Discrete, high-bandwidth GPU class (favors larger blocks, more
    /// aggressive async-copy usage).
    Discrete,
}

/// Caller-supplied device description threaded into tile-selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceProfile {
    class: DeviceClass,
    /// Upper bound on per-threadgroup memory, in bytes. Used by dispatch
    /// planners (see `kernelforge-dispatch`) to reject kernels whose
    /// computed threadgroup-memory allocation would not fit.
    pub max_threadgroup_memory_bytes: u32,
    /// Upper bound on threads per threadgroup.
    pub max_threadgroup_threads: u32,
}

impl DeviceProfile {
    /// A profile representative of an integrated / unified-memory GPU.
    pub const fn integrated() -> Self {
        Self {
            class: DeviceClass::Integrated,
            max_threadgroup_memory_bytes: 32 * 1024,
            max_threadgroup_threads: 1024,
        }
    }

    /// A profile representative of a discrete, high-bandwidth GPU.
    pub const fn discrete() -> Self {
        Self {
            class: DeviceClass::Discrete,
            max_threadgroup_memory_bytes: 64 * 1024,
            max_threadgroup_threads: 1024,
        }
    }

    /// The device class this profile represents.
    pub const fn class(&self) -> DeviceClass {
        self.class
    }

    /// Override the threadgroup-memory limit, keeping class and thread
    /// limit unchanged. Mainly useful for exercising dispatch-planner
    /// resource-limit rejection against an otherwise realistic profile.
    pub const fn with_max_threadgroup_memory_bytes(mut self, bytes: u32) -> Self {
        self.max_threadgroup_memory_bytes = bytes;
        self
    }
}

impl Default for DeviceProfile {
    /// Defaults to [`DeviceProfile::integrated`], the common case for the
    /// unified-memory GPUs this system targets.
    fn default() -> Self {
        Self::integrated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_integrated() {
        assert_eq!(DeviceProfile::default().class(), DeviceClass::Integrated);
    }

    #[test]
    fn discrete_allows_more_threadgroup_memory() {
        assert!(
            DeviceProfile::discrete().max_threadgroup_memory_bytes
                > DeviceProfile::integrated().max_threadgroup_memory_bytes
        );
    }
}
