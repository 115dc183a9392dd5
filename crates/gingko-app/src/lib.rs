// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod close;
pub mod dirty;
pub mod error;
pub mod ids;
pub mod mode;
pub mod model;
pub mod ports;
pub mod queue;
pub mod state;
pub mod store;

pub use close::*;
pub use dirty::*;
pub use error::*;
pub use ids::*;
pub use mode::*;
pub use model::*;
pub use ports::*;
pub use queue::*;
pub use state::*;
pub use store::*;
