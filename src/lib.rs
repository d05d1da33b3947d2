//! scene-description: description resolution and harmonization engine
//!
//! A scene description is a YAML attribute tree whose leaves may be
//! distributions (`range`, `set`, `folder`, ...), references (`$[/a/b~1]`),
//! expressions (`$[../size] * 2`) or harmonized attributes that several
//! attributes coordinate through a shared harmonizer. Per frame, every
//! attribute is resolved to a concrete value.
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_description::Description;
//!
//! let config = serde_yaml::from_str(r#"
//! seed: 4
//! size: { distribution_type: range, start: 1, end: 2 }
//! double: "$[size] * 2"
//! "#).unwrap();
//!
//! let mut description = Description::build(&config).unwrap();
//! let frame = description.resolve_frame(0).unwrap();
//! let size = frame.value["size"].as_f64().unwrap();
//! assert_eq!(frame.value["double"].as_f64().unwrap(), size * 2.0);
//! ```

// Core error handling
pub mod error;

// Document values and `$[...]` scanning
pub mod macros;
pub mod value;

// Reference paths and per-attribute seeding
pub mod reference;
pub mod seed;

// Document loading (version check, parent_config, count expansion)
pub mod config;

// Graph nodes, harmonizers and the frame driver
pub mod description;
pub mod element;
pub mod harmonizer;

pub use description::{Description, Outcome, ResolvedScene};
pub use element::{DistributionType, ElementId};
pub use error::{DescriptionError, Result};
pub use harmonizer::{HarmonizerStatus, HarmonizerType, PitchSource};
