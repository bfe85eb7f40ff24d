// TL;DR Studio core library.
//
// The pipeline executor and media assembler are the heart of the crate;
// everything under `collab` is a thin client for an external generative
// service.

pub mod assembler;
pub mod collab;
pub mod error;
pub mod pipeline;
pub mod stages;
pub mod store;
