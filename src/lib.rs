//! Yatube: a community blog with groups, comments and a personalised follow feed.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
