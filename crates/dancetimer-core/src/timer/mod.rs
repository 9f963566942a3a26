mod clock;
mod driver;
mod machine;
mod session;
mod state;
mod wake_lock;

pub use clock::{Clock, ManualClock, SystemClock};
pub use driver::{Command, ServiceConfig, TimerHandle, TimerService};
pub use machine::{TimerMachine, TimerSettings, DEFAULT_AUTO_CONFIRM_SECONDS};
pub use session::NO_RULE_NAME;
pub use state::{FinishedState, RunningState, TimerState};
pub use wake_lock::{NoopWakeLock, WakeLock, WakeLockBackend, DEFAULT_MAX_HOLD};
