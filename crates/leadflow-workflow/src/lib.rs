//! Leadflow Prospect Workflow
//!
//! The four-step prospect pipeline as an explicit state machine.
//!
//! # Steps
//!
//! - **Basic info**: name, phone, email
//! - **Appointment**: date, times, location, status
//! - **Sales meeting**: social, fact-find, presentation
//! - **Sales outcome**: successful, unsuccessful (with reason) or KIV
//!
//! # Architecture
//!
//! ```text
//! NEW --create--> PROSPECT --save--> APPOINTMENT <--undo-- SALES_OUTCOME
//!                                        |                      ^
//!                                        +---record outcome-----+
//! ```
//!
//! Edits are buffered in a [`ProspectEditor`] and only leave it through
//! [`ProspectEditor::prepare_save`]. Every mutation is checked against the
//! ownership guard first.
//!
//! # Example
//!
//! ```rust,ignore
//! use leadflow_workflow::{ProspectEditor, Outcome};
//!
//! let mut editor = ProspectEditor::open(actor, prospect);
//! editor.set_appointment_status(AppointmentStatus::Completed)?;
//! editor.record_outcome(Outcome::Kiv, vec![])?;
//! let update = editor.prepare_save()?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod clock;
pub mod create;
pub mod editor;
pub mod error;
pub mod state_machine;
pub mod validate;

pub use clock::{Clock, FixedClock, SystemClock};
pub use create::{can_create, create, CreateProspect, NewProspect};
pub use editor::{AppointmentInput, BasicInfoUpdate, ProspectEditor, ProspectUpdate};
pub use error::{Field, Step, ValidationErrors, WorkflowError};
pub use state_machine::{
    allowed_transitions, authorize_delete, can_edit, derived_stage, validate_transition,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the workflow
    pub use crate::{
        create, AppointmentInput, BasicInfoUpdate, Field, NewProspect, ProspectEditor,
        ProspectUpdate, Step, WorkflowError,
    };
}
