//! Domain model (IDs, statuses, tasks, analyses, outcomes, sampling, errors).
//!
//! I/O を一切含まない層です。ports / app はここで定義された型だけをやり取りします。

pub mod analysis;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod repository;
pub mod sampling;
pub mod status;
pub mod task;

pub use self::analysis::{
    Analysis, GitCommit, NewAnalysis, RepositoryRef, ResultDocument, ResultRecord,
};
pub use self::errors::{ErrorKind, ScaError};
pub use self::ids::{AnalysisId, RepositoryId, TaskId};
pub use self::outcome::{Outcome, OutcomeKind};
pub use self::repository::{BuildDefaults, Repository};
pub use self::sampling::sample_yearly_commits;
pub use self::status::{AnalysisStatus, OrderedStatus, StatusStamp, TaskStatus, check_transition};
pub use self::task::{NewTask, Task, TaskEnvelope, TaskLog, TaskType};
