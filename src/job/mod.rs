mod handle;
mod state;
mod work;

pub use handle::JobHandle;
pub use state::JobState;
pub use work::{Job, JobContext};

pub(crate) use handle::TypedJobHandle;
