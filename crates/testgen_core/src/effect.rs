use std::time::Duration;

use crate::{ExportRequest, Msg, RunId};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start the event source for a new run.
    StartRun { run_id: RunId },
    /// Invoke the cancellation handle of a run.
    CancelRun { run_id: RunId },
    /// Feed `msg` back into `update` once `after` has elapsed.
    ScheduleMsg { after: Duration, msg: Msg },
    /// Fetch the generated test cases from the backend.
    LoadTestCases,
    Export { request: ExportRequest },
}
