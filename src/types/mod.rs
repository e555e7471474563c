//! Parameter values and types for twosql.
//!
//! This module provides the value model used on the template boundary:
//! the caller supplies a named [`Params`] set, rendering produces ordered
//! [`ParamValue`] bind lists together with their [`DataType`] tags for the
//! downstream driver layer.

mod datatype;
mod params;
mod value;

pub use datatype::DataType;
pub use params::Params;
pub use value::ParamValue;
