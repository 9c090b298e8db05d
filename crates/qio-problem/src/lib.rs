//! QIO problem model
//!
//! Cost functions for the optimization service: [`Term`]s with a
//! [`Coefficient`] and the variables they couple, collected into a
//! [`Problem`] that serializes to the service's JSON format and uploads
//! itself to blob storage.
//!
//! # Example
//!
//! ```ignore
//! use qio_problem::{Problem, ProblemType, Term, UploadOptions};
//!
//! let mut problem = Problem::new("maxcut").with_problem_type(ProblemType::Ising);
//! problem.add_term(1, vec![0, 1])?;
//! problem.add_terms(vec![Term::new(-0.5, vec![1, 2])?]);
//!
//! let uri = problem
//!     .upload(workspace.as_ref(), storage.as_ref(), &UploadOptions::default())
//!     .await?;
//! ```

pub mod coefficient;
pub mod error;
mod file;
pub mod problem;
pub mod term;

pub use coefficient::Coefficient;
pub use error::{ProblemError, ProblemResult};
pub use problem::{
    DEFAULT_CONTAINER_NAME, EncodedProblem, PROBLEM_CONTENT_TYPE, Problem, ProblemType,
    UploadOptions,
};
pub use term::Term;
