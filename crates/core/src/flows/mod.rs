pub mod engine;
pub mod states;

pub use engine::{EstimateFlow, FlowDefinition, FlowEngine, FlowTransitionError, OrderFlow};
pub use states::{
    FlowAction, FlowContext, FlowEvent, FlowSession, FlowStep, FlowType, TransitionOutcome,
};
