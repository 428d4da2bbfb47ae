pub mod submit;
pub mod types;
pub mod validator;

pub use submit::{delete_evaluation, edit_scores, purge_evaluations, submit_evaluation};
pub use types::{Evaluation, EvaluationInput, ValidEvaluation};
pub use validator::{validate_submission, SubmissionMode};
