#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use docbind_core as core;
pub use docbind_utils as utils;
pub use docbind_yaml as yaml;
