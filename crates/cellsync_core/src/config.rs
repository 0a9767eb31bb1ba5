//! Synchronization behavior configuration.

/// Configuration for planning and submitting configuration changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Fold association changes into the parent's entity update.
    ///
    /// When disabled, association changes are emitted as separate updates
    /// after all entity updates, with association-set last.
    pub merge_association_updates: bool,

    /// Fail when a parent's association names a child that cannot be loaded.
    ///
    /// When disabled, such children are skipped with a warning.
    pub strict_child_loads: bool,

    /// Reject attaching an eNodeB that is already attached to another gateway.
    pub enforce_single_enodeb_attachment: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            merge_association_updates: true,
            strict_child_loads: true,
            enforce_single_enodeb_attachment: true,
        }
    }
}

impl SyncConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether association changes are folded into entity updates.
    #[must_use]
    pub const fn merge_association_updates(mut self, value: bool) -> Self {
        self.merge_association_updates = value;
        self
    }

    /// Sets whether unloadable children fail the operation.
    #[must_use]
    pub const fn strict_child_loads(mut self, value: bool) -> Self {
        self.strict_child_loads = value;
        self
    }

    /// Sets whether an eNodeB may be attached to only one gateway.
    #[must_use]
    pub const fn enforce_single_enodeb_attachment(mut self, value: bool) -> Self {
        self.enforce_single_enodeb_attachment = value;
        self
    }
}
