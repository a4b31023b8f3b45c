//! Runtime systems that sit beside the tracking pipeline.
//!
//! Currently only fatal error handling: the reload countdown that is the
//! sole recovery path for camera and target-loading failures.

/// Fatal session errors, the reload countdown and the page reload itself.
pub mod fatal_error;
