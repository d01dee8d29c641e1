//! # DynaRec Codec
//!
//! Native attribute representation for DynaRec.
//!
//! The backing store is schemaless: every attribute travels as a tagged
//! value whose tag names its storage-level kind. This crate defines that
//! representation and nothing else:
//!
//! - [`NativeValue`] - a tagged scalar (`S`, `N`, `B`) or homogeneous set
//!   (`SS`, `NS`, `BS`)
//! - [`NativeKind`] - the tag alone, as declared by a column
//! - [`NativeItem`] - a whole item, attribute name to tagged value
//! - [`Number`] - parsed form of the decimal text carried by `N`/`NS`
//!
//! Numbers are carried as decimal text, exactly as on the wire, so that no
//! precision is lost between the record layer and the store.
//!
//! ## Usage
//!
//! ```
//! use dynarec_codec::{decode_item, encode_item, NativeItem, NativeValue};
//!
//! let mut item = NativeItem::new();
//! item.insert("id".to_string(), NativeValue::S("abc".to_string()));
//! item.insert("age".to_string(), NativeValue::N("42".to_string()));
//!
//! let bytes = encode_item(&item).unwrap();
//! assert_eq!(decode_item(&bytes).unwrap(), item);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod item;
mod number;
mod value;

pub use error::{CodecError, CodecResult};
pub use item::{decode_item, encode_item, NativeItem};
pub use number::{format_float, format_integer, Number};
pub use value::{NativeKind, NativeValue};
