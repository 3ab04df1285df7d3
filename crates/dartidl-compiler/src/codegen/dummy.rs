//! A system that renders nothing. Useful for timing the analysis passes.

use super::{System, SystemKind};

pub struct DummySystem;

impl System for DummySystem {
    fn kind(&self) -> SystemKind {
        SystemKind::Dummy
    }
}
