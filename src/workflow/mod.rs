pub mod record_ctx;
pub mod record_flow;

pub use record_ctx::{RecordCtx, RecordStage};
pub use record_flow::RecordFlow;
