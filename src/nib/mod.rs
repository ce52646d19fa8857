//! Low-level NIBArchive binary format implementation.
//!
//! ## File Structure
//!
//! ```text
//! +----------------------+
//! | Magic: "NIBArchive"  |  10 bytes
//! +----------------------+
//! | Format word          |  u32 LE (1)
//! +----------------------+
//! | Header words         |  u32 LE (9)
//! +----------------------+
//! | 4 x (count, offset)  |  u32 LE pairs: objects, keys, values, classes
//! +----------------------+
//! | Section bodies       |  flex-number encoded records
//! +----------------------+
//! ```

mod format;
mod sections;
pub mod varint;
mod reader;
mod writer;

pub use format::*;
pub use sections::*;
pub use reader::*;
pub use writer::*;
