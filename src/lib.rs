//! # Cropflow: Graph-driven Farm Advisory Backend
//!
//! Cropflow answers farmer queries by orchestrating a directed acyclic graph
//! of asynchronous analysis steps (profile lookup, sensor readings, weather,
//! market price, crop health, disease risk, seasonal planning) and fanning
//! their results into one synthesized reply, persisting the conversation turn
//! along the way.
//!
//! ## Core Concepts
//!
//! - **Nodes**: Async units of work that read a state snapshot and return a
//!   partial update ([`node::Node`])
//! - **Run State**: Versioned, channel-based state threaded through one run
//!   ([`state::RunState`])
//! - **Graph**: Declarative topology validated at compile time — cycles,
//!   dangling edges and unreachable nodes are rejected before anything runs
//!   ([`graphs::GraphBuilder`])
//! - **Scheduler**: Concurrent superstep execution with strict fan-in — a
//!   node runs once all of its upstreams have completed, and at most once per
//!   run ([`schedulers::Scheduler`])
//! - **Providers**: The external collaborators (text generation, profile,
//!   sensors, weather, market, chat history) behind async traits
//!   ([`providers`])
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use cropflow::config::Settings;
//! use cropflow::providers::history::InMemoryHistoryStore;
//! use cropflow::providers::mock::{
//!     CannedGenerator, CannedMarketFeed, CannedWeatherFeed, SimulatedSensorFeed,
//!     StaticProfileStore,
//! };
//! use cropflow::workflow::{AdvisoryWorkflow, Collaborators};
//!
//! # async fn example() -> miette::Result<()> {
//! let collaborators = Collaborators {
//!     generator: Arc::new(CannedGenerator::new("advice")),
//!     profiles: Arc::new(StaticProfileStore::default()),
//!     sensors: Arc::new(SimulatedSensorFeed::default()),
//!     weather: Arc::new(CannedWeatherFeed::default()),
//!     market: Arc::new(CannedMarketFeed::default()),
//!     history: Arc::new(InMemoryHistoryStore::default()),
//! };
//! let workflow = AdvisoryWorkflow::new(collaborators, &Settings::offline())?;
//! let reply = workflow
//!     .submit_message("farmer123", "session1", "How is my wheat doing?")
//!     .await;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`state`] - Versioned run state and snapshots
//! - [`node`] - Node trait and execution primitives
//! - [`graphs`] - Workflow graph definition, validation and compilation
//! - [`schedulers`] - Concurrent superstep execution
//! - [`app`] - Compiled graph and barrier merges
//! - [`runtimes`] - The superstep loop and runtime configuration
//! - [`reducers`] - State merge strategies per channel
//! - [`channels`] - Versioned state channels and error events
//! - [`providers`] - Collaborator traits and shipped implementations
//! - [`nodes`] - The advisory node set (fetch, reasoning, synthesis)
//! - [`workflow`] - Graph wiring and the `submit_message` entry point
//! - [`format`] - Prompt-ready formatting and response cleaning
//! - [`intent`] - Intent labels and section predicates

pub mod app;
pub mod channels;
pub mod config;
pub mod event_bus;
pub mod format;
pub mod graphs;
pub mod intent;
pub mod message;
pub mod node;
pub mod nodes;
pub mod providers;
pub mod reducers;
pub mod runtimes;
pub mod schedulers;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod utils;
pub mod workflow;
