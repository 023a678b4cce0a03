//! HTTP boundary: configuration, bearer authentication, route guards and the
//! thin resource routes they protect.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;
