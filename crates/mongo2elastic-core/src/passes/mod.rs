//! Conversion pass modules.
//!
//! Each pass is a self-contained transformation over the schema tree.
//! Passes run in order (0-3) and each consumes the full output of the previous
//! one; only the last pass produces the Elasticsearch mapping.

pub mod p0_preprocess;
pub mod p1_omit;
pub mod p2_rename;
pub mod p3_convert;
