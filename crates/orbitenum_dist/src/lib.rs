//! Distributed variant of the dual-description driver.
//!
//! Every worker runs the same select/decompose/insert loop as the
//! single-process driver, but each discovered facet is routed to the worker
//! owning its hash. The transport sits behind [`comm::Communicator`]; the
//! in-tree implementation runs the workers as threads over channels with
//! per-pair FIFO delivery, and an MPI binding would implement the same trait
//! without touching the driver.

pub mod comm;
pub mod driver;
pub mod pool;
pub mod protocol;

pub use comm::{ChannelComm, Communicator};
pub use driver::{run_dual_desc_dist, run_on_local_cluster};
