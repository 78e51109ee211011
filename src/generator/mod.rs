pub mod context;
pub mod manager;
pub mod memory;
pub mod orchestrator;
pub mod outlet;
pub mod pipeline;
pub mod roster;
pub mod stages;
pub mod step_forward_agent;
pub mod tasks;
pub mod template;
pub mod types;
pub mod workflow;
