// Inkmark watermarking library
//
// `watermark` holds the renderers; the remaining modules are the local
// front end around them (configuration, logging, job bookkeeping).

pub mod config;
pub mod constants;
pub mod error;
pub mod file_type;
pub mod job;
pub mod logging;
pub mod pool;
pub mod task;
pub mod watermark;
