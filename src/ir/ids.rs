//! Newtype IDs for images, annotations and categories.
//!
//! Image ids are drawn by the identity generator, annotation ids are dense
//! per manifest, category ids come from the labelmap. Keeping them apart at
//! the type level stops an annotation id from being written where an image
//! id belongs.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[inline]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value.
            #[inline]
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Identifier of an image record within a manifest.
    ImageId
);

id_newtype!(
    /// Identifier of an annotation record, dense from 1 within a manifest.
    AnnotationId
);

id_newtype!(
    /// Identifier of a category; 0 is the background sentinel.
    CategoryId
);

impl CategoryId {
    pub const BACKGROUND: CategoryId = CategoryId(0);

    pub fn is_background(&self) -> bool {
        *self == Self::BACKGROUND
    }
}
