#![allow(clippy::new_without_default)]

pub mod args;
pub mod calc;
pub mod config;
pub mod fs_utils;
pub mod image;
pub mod image_formats;
pub mod image_prep;
pub mod log_utils;
pub mod repo;
pub mod task;
