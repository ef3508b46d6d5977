//! Engine detection and bring-up.
//!
//! Each supported game has an [`EngineProbe`] that recognizes its installations and supplies a
//! [`LoadPlan`]. An [`EngineSession`] executes the plan against one installation.

pub mod kotor;
pub mod nwn2;
mod plan;
mod probe;
mod session;

pub use self::{
    plan::{CursorSpec, LoadPlan, LoadStep, SourceSpec, TypeAliasSpec},
    probe::{EngineProbe, FileList, detect_engine},
    session::EngineSession,
};

/// Probes for every supported engine, in the order they are tried.
pub fn builtin_probes() -> Vec<Box<dyn EngineProbe>> {
    vec![
        Box::new(nwn2::Nwn2Probe),
        Box::new(kotor::KotorProbe),
        Box::new(kotor::Kotor2Probe),
    ]
}

