//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```rust,ignore
//! use antighost::prelude::*;
//! ```

// Core image types
pub use crate::{BitPlane, ExposureItem, ExposureStack, Frame, Plane};

// Configuration
pub use crate::{Anchor, AntighostConfig, BlendDomain, ClassifierConfig, ClipCounts};

// Orchestration - main API
pub use crate::{
    Antighoster, Deghosted, Error, Mode, Outcome, ProgressCallback, Request, Result, Stage,
    deghost,
};
