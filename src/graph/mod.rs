//! Object Graph Model: builder nodes and their compilation to sections.
//!
//! External translators describe an interface as a [`NibGraph`] of objects,
//! then [`compile`] numbers everything reachable from the roots and encodes
//! the resulting sections.
//!
//! ```ignore
//! let mut g = NibGraph::new();
//! let root = g.object("NSObject");
//! let list = g.list([PropValue::Byte(1), PropValue::Byte(2)]);
//! g.edit(root)?.set("a", 1).set("b", list);
//! let bytes = g.compile(&[root])?;
//! ```

mod compiler;
mod object;
mod value;

pub use compiler::*;
pub use object::*;
pub use value::*;
