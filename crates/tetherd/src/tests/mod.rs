//! Behaviour suites for the hub daemon.

mod behaviour;
mod support;
