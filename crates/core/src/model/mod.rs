mod ids;
mod learner;
mod quiz;

pub use ids::{LearnerId, LearnerIdError, ModuleId, ModuleIdError};
pub use learner::{LearnerRecord, LearnerRecordError};
pub use quiz::{QuizError, QuizResult, pass_mark, percentage};
