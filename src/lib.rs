//! # NIBArchive
//!
//! Reader, writer and semantic differ for the NIBArchive container used by
//! compiled Interface Builder files.
//!
//! ## Modules
//!
//! - [`util`] - Error type and `Result` alias
//! - [`nib`] - Low-level binary format: flex numbers, sections, reader, writer
//! - [`graph`] - Object graph builder and its compilation into sections
//! - [`compare`] - Comparison graph and cycle-safe differ
//! - [`dump`] - Text and JSON listings of decoded archives
//!
//! ## Example
//!
//! ```ignore
//! use nibarchive::prelude::*;
//!
//! let mut g = NibGraph::new();
//! let root = g.object("NSObject");
//! let list = g.list([PropValue::Byte(1), PropValue::Byte(2)]);
//! g.edit(root)?.set("a", 1).set("b", list);
//! let bytes = g.compile(&[root])?;
//!
//! let graph = lift(&nib::decode(&bytes)?)?;
//! for issue in compare(&graph, &graph) {
//!     println!("{issue}");
//! }
//! ```

pub mod util;
pub mod nib;
pub mod graph;
pub mod compare;
pub mod dump;

// Re-export commonly used types
pub use util::{Error, Result};
pub use nib::{read_archive, write_archive, NibFile, Sections};
pub use graph::{compile, NibGraph, ObjectId, PropValue};
pub use compare::{compare, lift, CmpGraph, Issue, IssueKind};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::nib::{self, NibFile, Sections, Value, ValueType};
    pub use crate::graph::{ArrayClass, NibGraph, Number, ObjectId, PropValue};
    pub use crate::compare::{compare, lift, CmpGraph, CmpNode, Issue, IssueKind, NodeId};
    pub use crate::dump::DumpOptions;
}
