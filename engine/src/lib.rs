pub mod config;
pub mod error;
pub mod evaluate;
pub mod render;
pub mod session;

pub use config::EngineConfig;
pub use error::{RenderError, RenderFailure, SimulationError};
pub use evaluate::{Evaluation, ScoredEvaluation, evaluate, evaluate_v2, score};
pub use render::{CmarkRenderer, DiagnosticCard, Panel, ProseRenderer, Renderer, Widget};
pub use session::{Outcome, Scenario, SimulationSession, SimulationState};
