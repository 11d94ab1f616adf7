//! Ports: the producer lifecycle it exposes (inbound) and the chain
//! collaborators it consumes (outbound).

pub mod inbound;
pub mod outbound;

pub use inbound::BlockProducer;
pub use outbound::{BlockAssembler, BlockProcessingQueue, BlockSink, BlockTree, ProductionStep, Sealer};
