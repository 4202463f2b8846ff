//! Arena handles
//!
//! Resolvables reference each other through these indices into the
//! [`ResolutionContext`](super::ResolutionContext) arenas, never through
//! owned pointers, so cyclic graphs need no special ownership.

macro_rules! arena_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_handle!(
    /// An addin taking part in the current run.
    AddinHandle
);
arena_handle!(
    /// One physical assembly.
    AssemblyHandle
);
arena_handle!(
    /// A set of interchangeable assemblies with the same identity.
    AssemblySetHandle
);
arena_handle!(
    /// An extension point.
    PointHandle
);
arena_handle!(
    /// An extension builder.
    BuilderHandle
);
arena_handle!(
    /// An extension.
    ExtensionHandle
);
