//! Newtypes for controller resource identifiers to avoid stringly-typed code.
//!
//! Identifiers are generated client-side as `<prefix>-<uuid>` and handed to
//! the controller as the desired resource name, so the value returned from a
//! create call is exactly the value later accepted by the paired delete.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Prefix prepended to generated identifiers.
            pub const PREFIX: &'static str = $prefix;

            /// Generates a fresh identifier of the form `<prefix>-<uuid>`.
            #[must_use]
            pub fn generate() -> Self {
                Self(format!("{}-{}", Self::PREFIX, Uuid::new_v4()))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            /// Consumes the identifier and returns the owned string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

resource_id!(
    /// Name of a stemcell (base VM image) registered with the controller.
    StemcellId,
    "sc"
);
resource_id!(
    /// Name of a virtual machine created on the controller.
    VmId,
    "vm"
);
resource_id!(
    /// Name of a persistent disk.
    DiskId,
    "disk"
);
