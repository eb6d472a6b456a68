pub mod enclave_identity;
pub mod quote;
pub mod report;
pub mod request;
pub mod tcb_info;

use tcb_info::TcbStatus;

/// What the advisory aggregator needs from a matched level, whichever document it came from:
/// TCB Info, Enclave Identity or a TDX Module Identity.
pub trait TcbLevelInfo {
    fn tcb_status(&self) -> TcbStatus;
    fn advisory_ids(&self) -> &[String];
}
