//! Email parsing: header decoding and rendering, and the MIME attachment
//! listing builder.

pub mod header;
pub mod mime;
