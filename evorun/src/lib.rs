pub mod generation_engine;
pub mod utils;

pub use generation_engine::{
    BatchScheduler, Clock, CondorScheduler, EngineContext, ExperimentLayout, GenerationDriver,
    ProcessLauncher, SystemLauncher, TokioClock,
};
pub use utils::config::RunConfig;
pub use utils::{AppError, Result};
